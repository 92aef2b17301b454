use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log::load_log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::utils::table::strip_ansi;
use ansi_term::Colour;
use std::time::Duration;

const MAX_OP_WIDTH: usize = 60;

/// Colour of an audit operation
fn color_for_operation(op: &str) -> Colour {
    match op {
        "clock_in" | "session_check_in" | "location_check_in" => Colour::Green,
        "clock_out" | "session_check_out" | "location_check_out" => Colour::Cyan,
        "flag" | "fraud_high" => Colour::Red,
        "fraud_medium" => Colour::Yellow,
        "migration_applied" => Colour::Purple,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if matches!(cmd, Commands::Log { print: true }) {
        let pool = DbPool::new(&cfg.database, Duration::from_millis(cfg.busy_timeout_ms))?;
        let entries = load_log(&pool.lock())?;
        print_log(&entries);
    }

    Ok(())
}

fn print_log(entries: &[crate::db::log::LogEntry]) {
    let rows: Vec<(i64, String, &str, String, &str)> = entries
        .iter()
        .map(|e| {
            let date = chrono::DateTime::parse_from_rfc3339(&e.date)
                .map(|dt| dt.format("%FT%T%:z").to_string())
                .unwrap_or_else(|_| e.date.clone());
            let op_target = if e.target.is_empty() {
                e.operation.clone()
            } else {
                format!("{} ({})", e.operation, e.target)
            };
            (e.id, date, e.operation.as_str(), op_target, e.message.as_str())
        })
        .collect();

    let op_w = rows
        .iter()
        .map(|r| r.3.chars().count())
        .max()
        .unwrap_or(10)
        .min(MAX_OP_WIDTH);
    let id_w = rows.iter().map(|r| r.0.to_string().len()).max().unwrap_or(1);
    let date_w = rows.iter().map(|r| r.1.len()).max().unwrap_or(10);

    println!("📜 Internal log:\n");

    for (id, date, operation, op_target, message) in rows {
        let color = color_for_operation(operation);

        let visible = if op_target.chars().count() > MAX_OP_WIDTH {
            let mut s: String = op_target.chars().take(MAX_OP_WIDTH - 3).collect();
            s.push_str("...");
            s
        } else {
            op_target
        };

        // only the operation word is coloured
        let painted = match visible.split_once(' ') {
            Some((op_word, rest)) => format!("{} {}", color.paint(op_word), rest),
            None => color.paint(visible.as_str()).to_string(),
        };

        let padding = " ".repeat(op_w.saturating_sub(strip_ansi(&painted).chars().count()));

        println!(
            "{:>id_w$}: {:<date_w$} | {}{} => {}",
            id,
            date,
            painted,
            padding,
            message,
            id_w = id_w,
            date_w = date_w
        );
    }
}
