use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::{Connection, OptionalExtension};
use std::fs;

fn count(conn: &Connection, sql: &str) -> AppResult<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

pub fn print_db_info(conn: &Connection, db_path: &str) -> AppResult<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) ROW COUNTS
    //
    let days = count(conn, "SELECT COUNT(*) FROM daily_attendance")?;
    let users = count(conn, "SELECT COUNT(DISTINCT user_id) FROM daily_attendance")?;
    let sessions = count(conn, "SELECT COUNT(*) FROM attendance_sessions")?;
    let visits = count(conn, "SELECT COUNT(*) FROM location_logs")?;
    let flagged = count(
        conn,
        "SELECT (SELECT COUNT(*) FROM daily_attendance WHERE is_flagged = 1)
              + (SELECT COUNT(*) FROM attendance_sessions WHERE is_flagged = 1)
              + (SELECT COUNT(*) FROM location_logs WHERE is_flagged = 1)",
    )?;

    println!("{}• Users:{} {}{}{}", CYAN, RESET, GREEN, users, RESET);
    println!("{}• Attendance days:{} {}{}{}", CYAN, RESET, GREEN, days, RESET);
    println!("{}• Sessions:{} {}", CYAN, RESET, sessions);
    println!("{}• Visits:{} {}", CYAN, RESET, visits);
    println!("{}• Flagged records:{} {}", CYAN, RESET, flagged);

    //
    // 3) DATE RANGE
    //
    let range: Option<(Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT MIN(date), MAX(date) FROM daily_attendance",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (first, last) = range.unwrap_or((None, None));
    let dash = || format!("{GREY}--{RESET}");

    println!("{}• Date range:{}", CYAN, RESET);
    println!("    from: {}", first.unwrap_or_else(dash));
    println!("    to:   {}", last.unwrap_or_else(dash));

    //
    // 4) SCHEMA
    //
    let migrations = count(
        conn,
        "SELECT COUNT(*) FROM log WHERE operation = 'migration_applied'",
    )?;
    println!("{}• Migrations applied:{} {}", CYAN, RESET, migrations);

    println!();
    Ok(())
}
