//! Row CRUD for daily attendance, sessions and location logs.
//!
//! Every function takes a plain `&Connection`; callers pass the open
//! transaction so reads and writes of one operation share a snapshot.

use crate::errors::{AppError, AppResult};
use crate::models::attendance::{AttendanceStatus, DailyAttendance};
use crate::models::location_log::LocationLog;
use crate::models::operation::RecordType;
use crate::models::session::AttendanceSession;
use crate::models::session_type::SessionType;
use crate::models::summary::{AttendanceSummary, FlaggedRecord};
use crate::models::work_location::WorkLocation;
use crate::utils::time::{ts_from_db, ts_to_db};
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Result, Row, params};

// ------------------------------------------------
// Column conversion helpers
// ------------------------------------------------

fn conversion_error(col: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(AppError::Internal(format!(
            "Invalid value '{}' in column {}",
            value, col
        ))),
    )
}

fn get_ts(row: &Row, col: &str) -> Result<DateTime<Local>> {
    let raw: String = row.get(col)?;
    ts_from_db(&raw).ok_or_else(|| conversion_error(col, &raw))
}

fn get_opt_ts(row: &Row, col: &str) -> Result<Option<DateTime<Local>>> {
    match row.get::<_, Option<String>>(col)? {
        Some(raw) => ts_from_db(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(col, &raw)),
        None => Ok(None),
    }
}

fn get_date(row: &Row, col: &str) -> Result<NaiveDate> {
    let raw: String = row.get(col)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| conversion_error(col, &raw))
}

fn get_opt_bool(row: &Row, col: &str) -> Result<Option<bool>> {
    Ok(row.get::<_, Option<i64>>(col)?.map(|v| v != 0))
}

fn date_str(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn opt_ts(ts: &Option<DateTime<Local>>) -> Option<String> {
    ts.as_ref().map(ts_to_db)
}

/// Unique-index violations mean another writer got there first.
fn conflict_on_constraint(what: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => AppError::Conflict(format!("{what} ({e})")),
        _ => AppError::from(e),
    }
}

// ------------------------------------------------
// Daily attendance
// ------------------------------------------------

pub fn map_attendance(row: &Row) -> Result<DailyAttendance> {
    let wl: String = row.get("work_location")?;
    let work_location =
        WorkLocation::from_db_str(&wl).ok_or_else(|| conversion_error("work_location", &wl))?;
    let st: String = row.get("status")?;
    let status = AttendanceStatus::from_db_str(&st).ok_or_else(|| conversion_error("status", &st))?;

    Ok(DailyAttendance {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        date: get_date(row, "date")?,
        clock_in_time: get_opt_ts(row, "clock_in_time")?,
        clock_in_latitude: row.get("clock_in_latitude")?,
        clock_in_longitude: row.get("clock_in_longitude")?,
        clock_in_notes: row.get("clock_in_notes")?,
        clock_out_time: get_opt_ts(row, "clock_out_time")?,
        clock_out_latitude: row.get("clock_out_latitude")?,
        clock_out_longitude: row.get("clock_out_longitude")?,
        clock_out_notes: row.get("clock_out_notes")?,
        entity_id: row.get("entity_id")?,
        work_location,
        remote_location: row.get("remote_location")?,
        is_within_radius: get_opt_bool(row, "is_within_radius")?,
        distance_from_entity: row.get("distance_from_entity")?,
        is_flagged: row.get::<_, i64>("is_flagged")? != 0,
        flag_reason: row.get("flag_reason")?,
        total_hours: row.get("total_hours")?,
        travel_speed: row.get("travel_speed")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn find_attendance(
    conn: &Connection,
    user_id: &str,
    date: &NaiveDate,
) -> AppResult<Option<DailyAttendance>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM daily_attendance WHERE user_id = ?1 AND date = ?2",
    )?;
    Ok(stmt
        .query_row(params![user_id, date_str(date)], map_attendance)
        .optional()?)
}

pub fn get_attendance(conn: &Connection, id: i64) -> AppResult<DailyAttendance> {
    let mut stmt = conn.prepare_cached("SELECT * FROM daily_attendance WHERE id = ?1")?;
    stmt.query_row([id], map_attendance)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("attendance #{id} not found")))
}

/// Insert a new row and return its id. `att.id` is ignored.
pub fn insert_attendance(conn: &Connection, att: &DailyAttendance) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO daily_attendance (
            user_id, date,
            clock_in_time, clock_in_latitude, clock_in_longitude, clock_in_notes,
            clock_out_time, clock_out_latitude, clock_out_longitude, clock_out_notes,
            entity_id, work_location, remote_location, is_within_radius, distance_from_entity,
            is_flagged, flag_reason, total_hours, travel_speed, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                 ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            att.user_id,
            date_str(&att.date),
            opt_ts(&att.clock_in_time),
            att.clock_in_latitude,
            att.clock_in_longitude,
            att.clock_in_notes,
            opt_ts(&att.clock_out_time),
            att.clock_out_latitude,
            att.clock_out_longitude,
            att.clock_out_notes,
            att.entity_id,
            att.work_location.to_db_str(),
            att.remote_location,
            att.is_within_radius,
            att.distance_from_entity,
            att.is_flagged,
            att.flag_reason,
            att.total_hours,
            att.travel_speed,
            att.status.to_db_str(),
            att.created_at,
            att.updated_at,
        ],
    )
    .map_err(conflict_on_constraint("attendance already exists for this date"))?;
    Ok(conn.last_insert_rowid())
}

/// Update all mutable columns (everything except id, user and date).
pub fn update_attendance(conn: &Connection, att: &DailyAttendance) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE daily_attendance
         SET clock_in_time = ?1, clock_in_latitude = ?2, clock_in_longitude = ?3,
             clock_in_notes = ?4,
             clock_out_time = ?5, clock_out_latitude = ?6, clock_out_longitude = ?7,
             clock_out_notes = ?8,
             entity_id = ?9, work_location = ?10, remote_location = ?11,
             is_within_radius = ?12, distance_from_entity = ?13,
             is_flagged = ?14, flag_reason = ?15, total_hours = ?16, travel_speed = ?17,
             status = ?18, updated_at = ?19
         WHERE id = ?20",
        params![
            opt_ts(&att.clock_in_time),
            att.clock_in_latitude,
            att.clock_in_longitude,
            att.clock_in_notes,
            opt_ts(&att.clock_out_time),
            att.clock_out_latitude,
            att.clock_out_longitude,
            att.clock_out_notes,
            att.entity_id,
            att.work_location.to_db_str(),
            att.remote_location,
            att.is_within_radius,
            att.distance_from_entity,
            att.is_flagged,
            att.flag_reason,
            att.total_hours,
            att.travel_speed,
            att.status.to_db_str(),
            att.updated_at,
            att.id,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("attendance #{} not found", att.id)));
    }
    Ok(())
}

pub fn attendance_history(
    conn: &Connection,
    user_id: &str,
    from: &NaiveDate,
    to: &NaiveDate,
) -> AppResult<Vec<DailyAttendance>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM daily_attendance
         WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
         ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![user_id, date_str(from), date_str(to)], map_attendance)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ------------------------------------------------
// Sessions
// ------------------------------------------------

pub fn map_session(row: &Row) -> Result<AttendanceSession> {
    let st: String = row.get("session_type")?;
    let session_type =
        SessionType::from_db_str(&st).ok_or_else(|| conversion_error("session_type", &st))?;

    Ok(AttendanceSession {
        id: row.get("id")?,
        attendance_id: row.get("attendance_id")?,
        user_id: row.get("user_id")?,
        session_type,
        check_in_time: get_ts(row, "check_in_time")?,
        check_in_latitude: row.get("check_in_latitude")?,
        check_in_longitude: row.get("check_in_longitude")?,
        check_out_time: get_opt_ts(row, "check_out_time")?,
        check_out_latitude: row.get("check_out_latitude")?,
        check_out_longitude: row.get("check_out_longitude")?,
        entity_id: row.get("entity_id")?,
        is_within_radius: get_opt_bool(row, "is_within_radius")?,
        duration_minutes: row.get("duration_minutes")?,
        travel_speed: row.get("travel_speed")?,
        is_flagged: row.get::<_, i64>("is_flagged")? != 0,
        flag_reason: row.get("flag_reason")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}

pub fn find_open_session(
    conn: &Connection,
    attendance_id: i64,
) -> AppResult<Option<AttendanceSession>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM attendance_sessions
         WHERE attendance_id = ?1 AND check_out_time IS NULL
         ORDER BY id DESC LIMIT 1",
    )?;
    Ok(stmt.query_row([attendance_id], map_session).optional()?)
}

pub fn get_session(conn: &Connection, id: i64) -> AppResult<AttendanceSession> {
    let mut stmt = conn.prepare_cached("SELECT * FROM attendance_sessions WHERE id = ?1")?;
    stmt.query_row([id], map_session)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("session #{id} not found")))
}

pub fn sessions_for_attendance(
    conn: &Connection,
    attendance_id: i64,
) -> AppResult<Vec<AttendanceSession>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM attendance_sessions WHERE attendance_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([attendance_id], map_session)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn insert_session(conn: &Connection, s: &AttendanceSession) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO attendance_sessions (
            attendance_id, user_id, session_type,
            check_in_time, check_in_latitude, check_in_longitude,
            check_out_time, check_out_latitude, check_out_longitude,
            entity_id, is_within_radius, duration_minutes, travel_speed,
            is_flagged, flag_reason, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            s.attendance_id,
            s.user_id,
            s.session_type.to_db_str(),
            ts_to_db(&s.check_in_time),
            s.check_in_latitude,
            s.check_in_longitude,
            opt_ts(&s.check_out_time),
            s.check_out_latitude,
            s.check_out_longitude,
            s.entity_id,
            s.is_within_radius,
            s.duration_minutes,
            s.travel_speed,
            s.is_flagged,
            s.flag_reason,
            s.notes,
            s.created_at,
        ],
    )
    .map_err(conflict_on_constraint("an open session already exists"))?;
    Ok(conn.last_insert_rowid())
}

/// Persist the check-out half of a session.
pub fn update_session(conn: &Connection, s: &AttendanceSession) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE attendance_sessions
         SET check_out_time = ?1, check_out_latitude = ?2, check_out_longitude = ?3,
             duration_minutes = ?4, travel_speed = ?5,
             is_flagged = ?6, flag_reason = ?7, notes = ?8
         WHERE id = ?9",
        params![
            opt_ts(&s.check_out_time),
            s.check_out_latitude,
            s.check_out_longitude,
            s.duration_minutes,
            s.travel_speed,
            s.is_flagged,
            s.flag_reason,
            s.notes,
            s.id,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("session #{} not found", s.id)));
    }
    Ok(())
}

// ------------------------------------------------
// Location logs
// ------------------------------------------------

pub fn map_location_log(row: &Row) -> Result<LocationLog> {
    Ok(LocationLog {
        id: row.get("id")?,
        attendance_id: row.get("attendance_id")?,
        user_id: row.get("user_id")?,
        entity_id: row.get("entity_id")?,
        check_in_time: get_ts(row, "check_in_time")?,
        check_in_latitude: row.get("check_in_latitude")?,
        check_in_longitude: row.get("check_in_longitude")?,
        check_out_time: get_opt_ts(row, "check_out_time")?,
        check_out_latitude: row.get("check_out_latitude")?,
        check_out_longitude: row.get("check_out_longitude")?,
        distance_from_entity: row.get("distance_from_entity")?,
        is_within_radius: row.get::<_, i64>("is_within_radius")? != 0,
        duration_minutes: row.get("duration_minutes")?,
        travel_speed: row.get("travel_speed")?,
        is_flagged: row.get::<_, i64>("is_flagged")? != 0,
        flag_reason: row.get("flag_reason")?,
        purpose: row.get("purpose")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}

pub fn find_open_location_log(
    conn: &Connection,
    attendance_id: i64,
) -> AppResult<Option<LocationLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM location_logs
         WHERE attendance_id = ?1 AND check_out_time IS NULL
         ORDER BY id DESC LIMIT 1",
    )?;
    Ok(stmt.query_row([attendance_id], map_location_log).optional()?)
}

/// Most recent closed visit of the day, excluding `except_id`.
pub fn find_last_completed_location_log(
    conn: &Connection,
    attendance_id: i64,
    except_id: i64,
) -> AppResult<Option<LocationLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM location_logs
         WHERE attendance_id = ?1 AND check_out_time IS NOT NULL AND id <> ?2
         ORDER BY id DESC LIMIT 1",
    )?;
    Ok(stmt
        .query_row(params![attendance_id, except_id], map_location_log)
        .optional()?)
}

pub fn get_location_log(conn: &Connection, id: i64) -> AppResult<LocationLog> {
    let mut stmt = conn.prepare_cached("SELECT * FROM location_logs WHERE id = ?1")?;
    stmt.query_row([id], map_location_log)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("location log #{id} not found")))
}

pub fn location_logs_for_attendance(
    conn: &Connection,
    attendance_id: i64,
) -> AppResult<Vec<LocationLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM location_logs WHERE attendance_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([attendance_id], map_location_log)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn insert_location_log(conn: &Connection, l: &LocationLog) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO location_logs (
            attendance_id, user_id, entity_id,
            check_in_time, check_in_latitude, check_in_longitude,
            check_out_time, check_out_latitude, check_out_longitude,
            distance_from_entity, is_within_radius, duration_minutes, travel_speed,
            is_flagged, flag_reason, purpose, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            l.attendance_id,
            l.user_id,
            l.entity_id,
            ts_to_db(&l.check_in_time),
            l.check_in_latitude,
            l.check_in_longitude,
            opt_ts(&l.check_out_time),
            l.check_out_latitude,
            l.check_out_longitude,
            l.distance_from_entity,
            l.is_within_radius,
            l.duration_minutes,
            l.travel_speed,
            l.is_flagged,
            l.flag_reason,
            l.purpose,
            l.notes,
            l.created_at,
        ],
    )
    .map_err(conflict_on_constraint("an open location visit already exists"))?;
    Ok(conn.last_insert_rowid())
}

pub fn update_location_log(conn: &Connection, l: &LocationLog) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE location_logs
         SET check_out_time = ?1, check_out_latitude = ?2, check_out_longitude = ?3,
             duration_minutes = ?4, travel_speed = ?5,
             is_flagged = ?6, flag_reason = ?7, notes = ?8
         WHERE id = ?9",
        params![
            opt_ts(&l.check_out_time),
            l.check_out_latitude,
            l.check_out_longitude,
            l.duration_minutes,
            l.travel_speed,
            l.is_flagged,
            l.flag_reason,
            l.notes,
            l.id,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("location log #{} not found", l.id)));
    }
    Ok(())
}

// ------------------------------------------------
// Flags
// ------------------------------------------------

/// `None` → no such record; `Some(None)` → record exists, no reason yet.
pub fn load_flag_reason(
    conn: &Connection,
    record_type: RecordType,
    id: i64,
) -> AppResult<Option<Option<String>>> {
    let sql = format!("SELECT flag_reason FROM {} WHERE id = ?1", record_type.table());
    Ok(conn
        .query_row(&sql, [id], |row| row.get::<_, Option<String>>(0))
        .optional()?)
}

pub fn store_flag_reason(
    conn: &Connection,
    record_type: RecordType,
    id: i64,
    reason: &str,
) -> AppResult<()> {
    let sql = format!(
        "UPDATE {} SET is_flagged = 1, flag_reason = ?1 WHERE id = ?2",
        record_type.table()
    );
    conn.execute(&sql, params![reason, id])?;
    Ok(())
}

pub fn list_flagged(conn: &Connection, limit: usize) -> AppResult<Vec<FlaggedRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT 'attendance' AS record_type, a.id, a.user_id, a.date,
                a.flag_reason, a.created_at
           FROM daily_attendance a WHERE a.is_flagged = 1
         UNION ALL
         SELECT 'session', s.id, s.user_id, a.date, s.flag_reason, s.created_at
           FROM attendance_sessions s
           JOIN daily_attendance a ON a.id = s.attendance_id
          WHERE s.is_flagged = 1
         UNION ALL
         SELECT 'location_log', l.id, l.user_id, a.date, l.flag_reason, l.created_at
           FROM location_logs l
           JOIN daily_attendance a ON a.id = l.attendance_id
          WHERE l.is_flagged = 1
         ORDER BY created_at DESC, id DESC
         LIMIT ?1",
    )?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map([limit], |row| {
        let rt: String = row.get(0)?;
        let record_type =
            RecordType::from_code(&rt).ok_or_else(|| conversion_error("record_type", &rt))?;
        Ok(FlaggedRecord {
            record_type,
            id: row.get(1)?,
            user_id: row.get(2)?,
            date: get_date(row, "date")?,
            flag_reason: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            created_at: row.get(5)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ------------------------------------------------
// Aggregation
// ------------------------------------------------

pub fn summarize(
    conn: &Connection,
    user_id: &str,
    from: &NaiveDate,
    to: &NaiveDate,
) -> AppResult<AttendanceSummary> {
    let (days_present, days_completed, flagged_days, total_hours) = conn.query_row(
        "SELECT COUNT(clock_in_time),
                COUNT(clock_out_time),
                COALESCE(SUM(is_flagged), 0),
                COALESCE(SUM(total_hours), 0.0)
           FROM daily_attendance
          WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3",
        params![user_id, date_str(from), date_str(to)],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        },
    )?;

    Ok(AttendanceSummary {
        user_id: user_id.to_string(),
        days_present,
        days_completed,
        flagged_days,
        total_hours,
    })
}
