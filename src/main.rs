//! rAttendance main entrypoint.

use rattendance::run;
use rattendance::ui::messages::report;

#[tokio::main]
async fn main() {
    println!();
    if let Err(e) = run().await {
        report(&e);
        std::process::exit(1);
    }
}
