//! The write half of each transition.
//!
//! Every function here runs inside the executor's transaction: it takes the
//! clock reading, asks the validator for a decision, applies the rows and
//! writes the audit line. Any error aborts the whole transaction.

use crate::core::clock::Clock;
use crate::core::fraud::{FraudAssessment, FraudEngine, RiskLevel, TravelPoint, merge_flag_reason};
use crate::core::geofence::GeoResolver;
use crate::core::validation::AttendanceValidator;
use crate::db::log::ttlog_at;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::attendance::{AttendanceStatus, DailyAttendance};
use crate::models::geo_point::GeoPoint;
use crate::models::location_log::LocationLog;
use crate::models::requests::{
    ClockInRequest, ClockOutRequest, LocationCheckInRequest, LocationCheckOutRequest,
    SessionRequest,
};
use crate::models::session::AttendanceSession;
use crate::models::work_location::WorkLocation;
use crate::utils::time::utc_stamp;
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::Connection;
use std::sync::Arc;

pub const AUTO_CLOSE_NOTE: &str = "auto-closed at clock-out";

/// Everything a transition needs besides the connection. Cheap to clone
/// into the blocking task.
#[derive(Clone)]
pub struct TransitionContext {
    pub resolver: GeoResolver,
    pub fraud: FraudEngine,
    pub clock: Arc<dyn Clock>,
}

impl TransitionContext {
    fn validator(&self) -> AttendanceValidator<'_> {
        AttendanceValidator::new(&self.resolver, &self.fraud)
    }
}

// ------------------------------------------------
// Daily clock
// ------------------------------------------------

pub fn clock_in(
    conn: &Connection,
    ctx: &TransitionContext,
    user_id: &str,
    point: GeoPoint,
    work_location: WorkLocation,
    req: ClockInRequest,
) -> AppResult<DailyAttendance> {
    let now = ctx.clock.now();
    let date = now.date_naive();
    let decision = ctx
        .validator()
        .validate_clock_in(conn, user_id, &date, point, work_location)?;

    let stamp = utc_stamp(&now);
    let mut att = decision
        .existing
        .unwrap_or_else(|| blank_attendance(user_id, date, &stamp));

    att.clock_in_time = Some(now);
    att.clock_in_latitude = Some(point.latitude);
    att.clock_in_longitude = Some(point.longitude);
    att.clock_in_notes = clean(req.notes);
    att.work_location = decision.work_location;
    att.remote_location = clean(req.remote_location);
    att.entity_id = decision.geofence.entity_id;
    att.is_within_radius = decision.geofence.is_within_radius;
    att.distance_from_entity = decision.geofence.distance_from_entity;
    att.status = AttendanceStatus::ClockedIn;
    att.updated_at = stamp;

    if let Some(reason) = &decision.geofence.flag_reason {
        raise_flag(&mut att.is_flagged, &mut att.flag_reason, reason);
        tracing::warn!(user_id, reason = reason.as_str(), "clock-in outside authorized radius");
    }

    let id = if att.id == 0 {
        queries::insert_attendance(conn, &att)?
    } else {
        queries::update_attendance(conn, &att)?;
        att.id
    };

    ttlog_at(
        conn,
        &now,
        "clock_in",
        user_id,
        &format!(
            "Clocked in at {} ({}{})",
            now.format("%H:%M"),
            att.work_location.to_db_str(),
            describe_entity(att.entity_id.as_deref(), att.distance_from_entity)
        ),
    )?;

    queries::get_attendance(conn, id)
}

pub fn clock_out(
    conn: &Connection,
    ctx: &TransitionContext,
    user_id: &str,
    point: GeoPoint,
    req: ClockOutRequest,
) -> AppResult<DailyAttendance> {
    let now = ctx.clock.now();
    let date = now.date_naive();
    let candidate = TravelPoint::new(point, now);
    let validator = ctx.validator();
    let decision = validator.validate_clock_out(conn, user_id, &date, candidate)?;

    // children close at the same instant and place as the day itself
    if let Some(session) = decision.open_session {
        let (close_at, minutes, fraud) = validator.assess_session_auto_close(&session, candidate)?;
        close_session(
            conn,
            user_id,
            session,
            close_at,
            minutes,
            &fraud,
            Some(AUTO_CLOSE_NOTE.to_string()),
        )?;
    }
    if let Some(log) = decision.open_location_log {
        let (close_at, minutes, fraud) =
            validator.assess_location_auto_close(conn, &log, candidate)?;
        close_location_log(
            conn,
            user_id,
            log,
            close_at,
            minutes,
            &fraud,
            Some(AUTO_CLOSE_NOTE.to_string()),
        )?;
    }

    let mut att = decision.attendance;
    att.clock_out_time = Some(now);
    att.clock_out_latitude = Some(point.latitude);
    att.clock_out_longitude = Some(point.longitude);
    att.clock_out_notes = clean(req.notes);
    att.total_hours = Some(decision.total_hours);
    att.status = AttendanceStatus::ClockedOut;
    att.updated_at = utc_stamp(&now);
    apply_fraud(
        conn,
        &now,
        user_id,
        "attendance",
        att.id,
        &decision.fraud,
        &mut att.travel_speed,
        &mut att.is_flagged,
        &mut att.flag_reason,
    )?;

    queries::update_attendance(conn, &att)?;

    ttlog_at(
        conn,
        &now,
        "clock_out",
        user_id,
        &format!(
            "Clocked out at {} after {:.2} h",
            now.format("%H:%M"),
            decision.total_hours
        ),
    )?;

    queries::get_attendance(conn, att.id)
}

// ------------------------------------------------
// Sessions
// ------------------------------------------------

pub fn session_check_in(
    conn: &Connection,
    ctx: &TransitionContext,
    user_id: &str,
    point: GeoPoint,
    req: SessionRequest,
) -> AppResult<AttendanceSession> {
    let now = ctx.clock.now();
    let date = now.date_naive();
    let decision = ctx
        .validator()
        .validate_session_check_in(conn, user_id, &date, point)?;

    let mut session = AttendanceSession {
        id: 0,
        attendance_id: decision.attendance.id,
        user_id: user_id.to_string(),
        session_type: req.session_type.unwrap_or_default(),
        check_in_time: now,
        check_in_latitude: point.latitude,
        check_in_longitude: point.longitude,
        check_out_time: None,
        check_out_latitude: None,
        check_out_longitude: None,
        entity_id: decision.geofence.entity_id,
        is_within_radius: decision.geofence.is_within_radius,
        duration_minutes: None,
        travel_speed: None,
        is_flagged: false,
        flag_reason: None,
        notes: clean(req.notes),
        created_at: utc_stamp(&now),
    };

    if let Some(reason) = &decision.geofence.flag_reason {
        raise_flag(&mut session.is_flagged, &mut session.flag_reason, reason);
    }

    let id = queries::insert_session(conn, &session)?;
    ttlog_at(
        conn,
        &now,
        "session_check_in",
        user_id,
        &format!(
            "Session #{} ({}) started at {}",
            id,
            session.session_type.to_db_str(),
            now.format("%H:%M")
        ),
    )?;

    queries::get_session(conn, id)
}

pub fn session_check_out(
    conn: &Connection,
    ctx: &TransitionContext,
    user_id: &str,
    point: GeoPoint,
    req: SessionRequest,
) -> AppResult<AttendanceSession> {
    let now = ctx.clock.now();
    let date = now.date_naive();
    let candidate = TravelPoint::new(point, now);
    let decision = ctx
        .validator()
        .validate_session_check_out(conn, user_id, &date, candidate)?;

    let id = close_session(
        conn,
        user_id,
        decision.session,
        candidate,
        decision.duration_minutes,
        &decision.fraud,
        clean(req.notes),
    )?;
    queries::get_session(conn, id)
}

fn close_session(
    conn: &Connection,
    user_id: &str,
    mut session: AttendanceSession,
    candidate: TravelPoint,
    duration_minutes: i64,
    fraud: &FraudAssessment,
    note: Option<String>,
) -> AppResult<i64> {
    session.check_out_time = Some(candidate.at);
    session.check_out_latitude = Some(candidate.point.latitude);
    session.check_out_longitude = Some(candidate.point.longitude);
    session.duration_minutes = Some(duration_minutes);
    session.notes = append_note(session.notes.take(), note);
    apply_fraud(
        conn,
        &candidate.at,
        user_id,
        "session",
        session.id,
        fraud,
        &mut session.travel_speed,
        &mut session.is_flagged,
        &mut session.flag_reason,
    )?;

    queries::update_session(conn, &session)?;
    ttlog_at(
        conn,
        &candidate.at,
        "session_check_out",
        user_id,
        &format!(
            "Session #{} ({}) closed after {} min",
            session.id,
            session.session_type.to_db_str(),
            duration_minutes
        ),
    )?;
    Ok(session.id)
}

// ------------------------------------------------
// Location visits
// ------------------------------------------------

pub fn location_check_in(
    conn: &Connection,
    ctx: &TransitionContext,
    user_id: &str,
    point: GeoPoint,
    req: LocationCheckInRequest,
) -> AppResult<LocationLog> {
    let now = ctx.clock.now();
    let date = now.date_naive();
    let decision = ctx.validator().validate_location_check_in(
        conn,
        user_id,
        &date,
        req.entity_id.trim(),
        point,
    )?;

    let log = LocationLog {
        id: 0,
        attendance_id: decision.attendance.id,
        user_id: user_id.to_string(),
        entity_id: decision.entity.entity.id.clone(),
        check_in_time: now,
        check_in_latitude: point.latitude,
        check_in_longitude: point.longitude,
        check_out_time: None,
        check_out_latitude: None,
        check_out_longitude: None,
        distance_from_entity: decision.entity.distance_meters,
        is_within_radius: decision.entity.is_within_radius,
        duration_minutes: None,
        travel_speed: None,
        is_flagged: false,
        flag_reason: None,
        purpose: clean(req.purpose),
        notes: clean(req.notes),
        created_at: utc_stamp(&now),
    };

    let id = queries::insert_location_log(conn, &log)?;
    ttlog_at(
        conn,
        &now,
        "location_check_in",
        user_id,
        &format!(
            "Visit #{} at {} started at {} ({:.1} m from center)",
            id,
            decision.entity.entity.name,
            now.format("%H:%M"),
            decision.entity.distance_meters
        ),
    )?;

    queries::get_location_log(conn, id)
}

pub fn location_check_out(
    conn: &Connection,
    ctx: &TransitionContext,
    user_id: &str,
    point: GeoPoint,
    req: LocationCheckOutRequest,
) -> AppResult<LocationLog> {
    let now = ctx.clock.now();
    let date = now.date_naive();
    let candidate = TravelPoint::new(point, now);
    let decision = ctx
        .validator()
        .validate_location_check_out(conn, user_id, &date, candidate)?;

    let id = close_location_log(
        conn,
        user_id,
        decision.log,
        candidate,
        decision.duration_minutes,
        &decision.fraud,
        clean(req.notes),
    )?;
    queries::get_location_log(conn, id)
}

fn close_location_log(
    conn: &Connection,
    user_id: &str,
    mut log: LocationLog,
    candidate: TravelPoint,
    duration_minutes: i64,
    fraud: &FraudAssessment,
    note: Option<String>,
) -> AppResult<i64> {
    log.check_out_time = Some(candidate.at);
    log.check_out_latitude = Some(candidate.point.latitude);
    log.check_out_longitude = Some(candidate.point.longitude);
    log.duration_minutes = Some(duration_minutes);
    log.notes = append_note(log.notes.take(), note);
    apply_fraud(
        conn,
        &candidate.at,
        user_id,
        "location_log",
        log.id,
        fraud,
        &mut log.travel_speed,
        &mut log.is_flagged,
        &mut log.flag_reason,
    )?;

    queries::update_location_log(conn, &log)?;
    ttlog_at(
        conn,
        &candidate.at,
        "location_check_out",
        user_id,
        &format!(
            "Visit #{} at '{}' closed after {} min",
            log.id, log.entity_id, duration_minutes
        ),
    )?;
    Ok(log.id)
}

// ------------------------------------------------
// helpers
// ------------------------------------------------

fn blank_attendance(user_id: &str, date: NaiveDate, stamp: &str) -> DailyAttendance {
    DailyAttendance {
        id: 0,
        user_id: user_id.to_string(),
        date,
        clock_in_time: None,
        clock_in_latitude: None,
        clock_in_longitude: None,
        clock_in_notes: None,
        clock_out_time: None,
        clock_out_latitude: None,
        clock_out_longitude: None,
        clock_out_notes: None,
        entity_id: None,
        work_location: WorkLocation::default(),
        remote_location: None,
        is_within_radius: None,
        distance_from_entity: None,
        is_flagged: false,
        flag_reason: None,
        total_hours: None,
        travel_speed: None,
        status: AttendanceStatus::ClockedIn,
        created_at: stamp.to_string(),
        updated_at: stamp.to_string(),
    }
}

/// Record the outcome of a speed check on a row about to be written.
/// High risk flags the row, medium risk only leaves an audit trace.
#[allow(clippy::too_many_arguments)]
fn apply_fraud(
    conn: &Connection,
    at: &DateTime<Local>,
    user_id: &str,
    record: &str,
    record_id: i64,
    fraud: &FraudAssessment,
    travel_speed: &mut Option<f64>,
    is_flagged: &mut bool,
    flag_reason: &mut Option<String>,
) -> AppResult<()> {
    if let Some(speed) = fraud.recorded_speed() {
        *travel_speed = Some(speed);
    }

    match fraud.risk_level {
        RiskLevel::High => {
            if let Some(reason) = &fraud.reason {
                raise_flag(is_flagged, flag_reason, reason);
            }
            tracing::warn!(
                user_id,
                record,
                record_id,
                speed_kmh = fraud.speed_kmh,
                distance_m = fraud.distance_meters,
                "suspicious travel speed"
            );
            ttlog_at(
                conn,
                at,
                "fraud_high",
                user_id,
                &format!(
                    "{} #{}: {:.2} km/h over {:.0} m in {:.1} min",
                    record, record_id, fraud.speed_kmh, fraud.distance_meters, fraud.elapsed_minutes
                ),
            )?;
        }
        RiskLevel::Medium => {
            tracing::info!(
                user_id,
                record,
                record_id,
                speed_kmh = fraud.speed_kmh,
                "elevated travel speed recorded for audit"
            );
            ttlog_at(
                conn,
                at,
                "fraud_medium",
                user_id,
                &format!(
                    "{} #{}: {:.2} km/h over {:.0} m in {:.1} min",
                    record, record_id, fraud.speed_kmh, fraud.distance_meters, fraud.elapsed_minutes
                ),
            )?;
        }
        RiskLevel::Low => {}
    }
    Ok(())
}

fn raise_flag(is_flagged: &mut bool, flag_reason: &mut Option<String>, reason: &str) {
    if let Some(merged) = merge_flag_reason(flag_reason.as_deref(), reason) {
        *flag_reason = Some(merged);
    }
    *is_flagged = true;
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn append_note(existing: Option<String>, note: Option<String>) -> Option<String> {
    match (existing, note) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (a, b) => a.or(b),
    }
}

fn describe_entity(entity_id: Option<&str>, distance: Option<f64>) -> String {
    match (entity_id, distance) {
        (Some(id), Some(d)) => format!(", {id} at {d:.1} m"),
        (Some(id), None) => format!(", {id}"),
        _ => String::new(),
    }
}

/// Reject a user id the identity layer should never have produced.
pub fn require_user(user_id: &str) -> AppResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::Validation("user id must not be empty".into()));
    }
    Ok(user_id)
}
