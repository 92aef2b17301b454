use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::initialize::init_db;
use crate::db::log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::warning;
use std::time::Duration;

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file
///  - the SQLite database (prod or test mode)
///  - all pending DB migrations
pub fn handle(cli: &Cli) -> AppResult<()> {
    let cfg = Config::init_all(cli.db.clone(), cli.test)?
        .with_overrides(None, cli.directory.as_deref());

    println!("⚙️  Initializing rAttendance…");
    println!("📄 Config file : {}", Config::config_file().display());
    println!("🗄️  Database   : {}", &cfg.database);
    println!("🗺️  Directory  : {}", &cfg.directory_file);

    let pool = DbPool::new(&cfg.database, Duration::from_millis(cfg.busy_timeout_ms))?;
    let conn = pool.lock();
    init_db(&conn)?;

    println!("✅ Database initialized at {}", &cfg.database);

    // internal log is best effort here
    if let Err(e) = log::ttlog(
        &conn,
        "init",
        "Database initialized",
        &format!("Database initialized at {}", &cfg.database),
    ) {
        warning(format!("Failed to write internal log: {e}"));
    }

    println!("🎉 rAttendance initialization completed!");
    Ok(())
}
