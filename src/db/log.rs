use crate::errors::AppResult;
use crate::utils::time::ts_to_db;
use chrono::{DateTime, Local};
use rusqlite::Connection;
use rusqlite::params;

/// One row of the internal audit log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub id: i64,
    pub date: String,
    pub operation: String,
    pub target: String,
    pub message: String,
}

/// Write an internal log line stamped with the wall clock.
pub fn ttlog(conn: &Connection, operation: &str, target: &str, message: &str) -> AppResult<()> {
    ttlog_at(conn, &Local::now(), operation, target, message)
}

/// Write an internal log line into the `log` table, stamped `at`.
///
/// Called with the open transaction, so the audit line commits or rolls back
/// together with the change it describes. Transitions pass their own clock
/// reading so the audit time matches the record time.
pub fn ttlog_at(
    conn: &Connection,
    at: &DateTime<Local>,
    operation: &str,
    target: &str,
    message: &str,
) -> AppResult<()> {
    let now = ts_to_db(at);

    let mut stmt = conn.prepare_cached(
        "INSERT INTO log (date, operation, target, message)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    stmt.execute(params![now, operation, target, message])?;
    tracing::debug!(operation, target, message, "audit");

    Ok(())
}

pub fn load_log(conn: &Connection) -> AppResult<Vec<LogEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, date, operation, COALESCE(target, ''), message FROM log ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(LogEntry {
            id: row.get(0)?,
            date: row.get(1)?,
            operation: row.get(2)?,
            target: row.get(3)?,
            message: row.get(4)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
