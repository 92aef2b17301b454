use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, OptionalExtension};

/// Ensure that the `log` table exists. It also records applied migrations.
fn ensure_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

struct Migration {
    version: &'static str,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250301_0001_daily_attendance",
        description: "Created daily_attendance table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS daily_attendance (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id              TEXT NOT NULL,
            date                 TEXT NOT NULL,
            clock_in_time        TEXT,
            clock_in_latitude    REAL,
            clock_in_longitude   REAL,
            clock_in_notes       TEXT,
            clock_out_time       TEXT,
            clock_out_latitude   REAL,
            clock_out_longitude  REAL,
            clock_out_notes      TEXT,
            entity_id            TEXT,
            work_location        TEXT NOT NULL DEFAULT 'OFFICE'
                                 CHECK(work_location IN ('OFFICE','REMOTE','FIELD')),
            remote_location      TEXT,
            is_within_radius     INTEGER,
            distance_from_entity REAL,
            is_flagged           INTEGER NOT NULL DEFAULT 0,
            flag_reason          TEXT,
            total_hours          REAL,
            travel_speed         REAL,
            status               TEXT NOT NULL DEFAULT 'clocked_in'
                                 CHECK(status IN ('clocked_in','clocked_out')),
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL,
            UNIQUE(user_id, date),
            CHECK(clock_out_time IS NULL OR clock_in_time IS NOT NULL)
        );

        CREATE INDEX IF NOT EXISTS idx_attendance_user_date ON daily_attendance(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_attendance_flagged ON daily_attendance(is_flagged);
        "#,
    },
    Migration {
        version: "20250301_0002_attendance_sessions",
        description: "Created attendance_sessions table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS attendance_sessions (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            attendance_id       INTEGER NOT NULL
                                REFERENCES daily_attendance(id) ON DELETE CASCADE,
            user_id             TEXT NOT NULL,
            session_type        TEXT NOT NULL DEFAULT 'work'
                                CHECK(session_type IN ('work','break','lunch','meeting','errand')),
            check_in_time       TEXT NOT NULL,
            check_in_latitude   REAL NOT NULL,
            check_in_longitude  REAL NOT NULL,
            check_out_time      TEXT,
            check_out_latitude  REAL,
            check_out_longitude REAL,
            entity_id           TEXT,
            is_within_radius    INTEGER,
            duration_minutes    INTEGER,
            travel_speed        REAL,
            is_flagged          INTEGER NOT NULL DEFAULT 0,
            flag_reason         TEXT,
            notes               TEXT,
            created_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_attendance ON attendance_sessions(attendance_id);
        CREATE UNIQUE INDEX IF NOT EXISTS ux_sessions_one_open
            ON attendance_sessions(attendance_id) WHERE check_out_time IS NULL;
        "#,
    },
    Migration {
        version: "20250301_0003_location_logs",
        description: "Created location_logs table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS location_logs (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            attendance_id        INTEGER NOT NULL
                                 REFERENCES daily_attendance(id) ON DELETE CASCADE,
            user_id              TEXT NOT NULL,
            entity_id            TEXT NOT NULL,
            check_in_time        TEXT NOT NULL,
            check_in_latitude    REAL NOT NULL,
            check_in_longitude   REAL NOT NULL,
            check_out_time       TEXT,
            check_out_latitude   REAL,
            check_out_longitude  REAL,
            distance_from_entity REAL NOT NULL,
            is_within_radius     INTEGER NOT NULL,
            duration_minutes     INTEGER,
            travel_speed         REAL,
            is_flagged           INTEGER NOT NULL DEFAULT 0,
            flag_reason          TEXT,
            purpose              TEXT,
            notes                TEXT,
            created_at           TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_location_logs_attendance ON location_logs(attendance_id);
        CREATE UNIQUE INDEX IF NOT EXISTS ux_location_logs_one_open
            ON location_logs(attendance_id) WHERE check_out_time IS NULL;
        "#,
    },
];

fn is_applied(conn: &Connection, version: &str) -> AppResult<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> AppResult<()> {
    let batch = format!(
        "BEGIN;\n{}\nINSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', '{}', '{}');\nCOMMIT;",
        m.sql, m.version, m.description
    );

    if let Err(e) = conn.execute_batch(&batch) {
        // leave the database as it was before this migration
        let _ = conn.execute_batch("ROLLBACK;");
        return Err(AppError::Migration(format!("{}: {}", m.version, e)));
    }

    tracing::info!(version = m.version, "{}", m.description);
    Ok(())
}

/// Public entry point: run all pending migrations.
/// Returns how many were applied on this call.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<usize> {
    ensure_log_table(conn)?;

    let mut applied = 0;
    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            apply(conn, m)?;
            applied += 1;
        }
    }
    Ok(applied)
}
