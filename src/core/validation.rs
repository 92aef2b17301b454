//! Business rules for every attendance transition.
//!
//! Validators run inside the transaction that will apply the write, read
//! the current state through it, and return a decision. They never write.

use crate::core::fraud::{FraudAssessment, FraudEngine, TravelPoint};
use crate::core::geofence::{EntityMatch, GeoResolver};
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::attendance::DailyAttendance;
use crate::models::geo_point::GeoPoint;
use crate::models::location_log::LocationLog;
use crate::models::session::AttendanceSession;
use crate::models::work_location::WorkLocation;
use crate::utils::time::{hours_between, rounded_minutes_between};
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::Connection;

const CLOCK_IN_FIRST: &str = "You must clock-in first";

/// Where a point sits relative to the user's authorized entities.
#[derive(Debug, Clone, Default)]
pub struct GeofenceOutcome {
    pub entity_id: Option<String>,
    pub is_within_radius: Option<bool>,
    pub distance_from_entity: Option<f64>,
    /// Set when the point is outside every authorized radius.
    pub flag_reason: Option<String>,
}

#[derive(Debug)]
pub struct ClockInDecision {
    /// A row for today that exists without a clock-in; updated instead of inserted.
    pub existing: Option<DailyAttendance>,
    pub work_location: WorkLocation,
    pub geofence: GeofenceOutcome,
}

#[derive(Debug)]
pub struct ClockOutDecision {
    pub attendance: DailyAttendance,
    pub total_hours: f64,
    pub fraud: FraudAssessment,
    pub open_session: Option<AttendanceSession>,
    pub open_location_log: Option<LocationLog>,
}

#[derive(Debug)]
pub struct SessionCheckInDecision {
    pub attendance: DailyAttendance,
    pub geofence: GeofenceOutcome,
}

#[derive(Debug)]
pub struct SessionCheckOutDecision {
    pub session: AttendanceSession,
    pub duration_minutes: i64,
    pub fraud: FraudAssessment,
}

#[derive(Debug)]
pub struct LocationCheckInDecision {
    pub attendance: DailyAttendance,
    pub entity: EntityMatch,
}

#[derive(Debug)]
pub struct LocationCheckOutDecision {
    pub log: LocationLog,
    pub duration_minutes: i64,
    pub fraud: FraudAssessment,
}

pub struct AttendanceValidator<'a> {
    resolver: &'a GeoResolver,
    fraud: &'a FraudEngine,
}

impl<'a> AttendanceValidator<'a> {
    pub fn new(resolver: &'a GeoResolver, fraud: &'a FraudEngine) -> Self {
        Self { resolver, fraud }
    }

    pub fn validate_clock_in(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
        point: GeoPoint,
        work_location: WorkLocation,
    ) -> AppResult<ClockInDecision> {
        let existing = queries::find_attendance(conn, user_id, date)?;
        if let Some(att) = &existing
            && let Some(t) = att.clock_in_time
        {
            return Err(AppError::Conflict(format!(
                "Already clocked in on {} at {}",
                att.date_str(),
                t.format("%H:%M")
            )));
        }

        let geofence = self.geofence(user_id, point, work_location)?;

        Ok(ClockInDecision {
            existing,
            work_location,
            geofence,
        })
    }

    pub fn validate_clock_out(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
        candidate: TravelPoint,
    ) -> AppResult<ClockOutDecision> {
        let attendance = self.require_attendance(conn, user_id, date)?;
        let clock_in = attendance.clock_in_time.ok_or_else(|| {
            AppError::Validation(format!("{CLOCK_IN_FIRST} before clocking out"))
        })?;
        if let Some(out) = attendance.clock_out_time {
            return Err(AppError::Validation(format!(
                "Already clocked out on {} at {}",
                attendance.date_str(),
                out.format("%H:%M")
            )));
        }
        if candidate.at <= clock_in {
            return Err(AppError::Validation(
                "Clock-out time must be after clock-in time".into(),
            ));
        }

        let total_hours = hours_between(&clock_in, &candidate.at);

        let reference = GeoPoint::from_columns(
            attendance.clock_in_latitude,
            attendance.clock_in_longitude,
        )
        .map(|p| TravelPoint::new(p, clock_in));
        let fraud = self.fraud.analyze(reference, candidate)?;

        let open_session = queries::find_open_session(conn, attendance.id)?;
        let open_location_log = queries::find_open_location_log(conn, attendance.id)?;

        Ok(ClockOutDecision {
            attendance,
            total_hours,
            fraud,
            open_session,
            open_location_log,
        })
    }

    pub fn validate_session_check_in(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
        point: GeoPoint,
    ) -> AppResult<SessionCheckInDecision> {
        let attendance = self.require_active_day(conn, user_id, date, "starting a session")?;

        if let Some(open) = queries::find_open_session(conn, attendance.id)? {
            return Err(AppError::Conflict(format!(
                "Session #{} ({}) is still open since {}",
                open.id,
                open.session_type.to_db_str(),
                open.check_in_time.format("%H:%M")
            )));
        }

        let geofence = self.geofence(user_id, point, attendance.work_location)?;

        Ok(SessionCheckInDecision {
            attendance,
            geofence,
        })
    }

    pub fn validate_session_check_out(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
        candidate: TravelPoint,
    ) -> AppResult<SessionCheckOutDecision> {
        let attendance = self.require_attendance(conn, user_id, date)?;
        let session = queries::find_open_session(conn, attendance.id)?
            .ok_or_else(|| AppError::NotFound("No active session to check out".into()))?;

        let (duration_minutes, fraud) = self.assess_session_close(&session, candidate)?;

        Ok(SessionCheckOutDecision {
            session,
            duration_minutes,
            fraud,
        })
    }

    pub fn validate_location_check_in(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
        entity_id: &str,
        point: GeoPoint,
    ) -> AppResult<LocationCheckInDecision> {
        let attendance = self.require_active_day(conn, user_id, date, "checking into a location")?;

        if let Some(open) = queries::find_open_location_log(conn, attendance.id)? {
            return Err(AppError::Conflict(format!(
                "Visit #{} at '{}' is still open since {}",
                open.id,
                open.entity_id,
                open.check_in_time.format("%H:%M")
            )));
        }

        let entity = self.resolver.check_entity(user_id, entity_id, point)?;

        Ok(LocationCheckInDecision { attendance, entity })
    }

    pub fn validate_location_check_out(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
        candidate: TravelPoint,
    ) -> AppResult<LocationCheckOutDecision> {
        let attendance = self.require_attendance(conn, user_id, date)?;
        let log = queries::find_open_location_log(conn, attendance.id)?
            .ok_or_else(|| AppError::NotFound("No active location visit to check out".into()))?;

        let (duration_minutes, fraud) = self.assess_location_close(conn, &log, candidate)?;

        Ok(LocationCheckOutDecision {
            log,
            duration_minutes,
            fraud,
        })
    }

    /// Duration and fraud check for closing `session` at `candidate`.
    /// The reference point is the session's own check-in.
    pub fn assess_session_close(
        &self,
        session: &AttendanceSession,
        candidate: TravelPoint,
    ) -> AppResult<(i64, FraudAssessment)> {
        let reference = TravelPoint::new(
            GeoPoint {
                latitude: session.check_in_latitude,
                longitude: session.check_in_longitude,
            },
            session.check_in_time,
        );
        let fraud = self.check_out_common(
            session.check_in_time,
            candidate,
            Some(reference),
            "Session check-out",
        )?;
        let minutes = rounded_minutes_between(&session.check_in_time, &candidate.at);
        Ok((minutes, fraud))
    }

    /// Duration and fraud check for closing `log` at `candidate`.
    /// The reference point is the previous completed visit of the day, so the
    /// check measures travel between visits rather than within one.
    ///
    /// Elapsed time runs from the previous visit's check-out to this
    /// check-out, so it includes the time spent at the current site. The
    /// speed is a lower bound on the travel speed between the two sites.
    pub fn assess_location_close(
        &self,
        conn: &Connection,
        log: &LocationLog,
        candidate: TravelPoint,
    ) -> AppResult<(i64, FraudAssessment)> {
        let reference = self.previous_visit_point(conn, log)?;
        let fraud =
            self.check_out_common(log.check_in_time, candidate, reference, "Location check-out")?;
        let minutes = rounded_minutes_between(&log.check_in_time, &candidate.at);
        Ok((minutes, fraud))
    }

    /// Close parameters for a session ended by clock-out.
    ///
    /// A session opened at or after the clock-out instant closes at its own
    /// check-in time with zero duration and no speed check, so it never
    /// blocks the day from closing.
    pub fn assess_session_auto_close(
        &self,
        session: &AttendanceSession,
        candidate: TravelPoint,
    ) -> AppResult<(TravelPoint, i64, FraudAssessment)> {
        if candidate.at <= session.check_in_time {
            let at = TravelPoint::new(candidate.point, session.check_in_time);
            return Ok((at, 0, FraudAssessment::skipped()));
        }
        let (minutes, fraud) = self.assess_session_close(session, candidate)?;
        Ok((candidate, minutes, fraud))
    }

    /// Close parameters for a visit ended by clock-out. Same clamping as
    /// [`AttendanceValidator::assess_session_auto_close`].
    pub fn assess_location_auto_close(
        &self,
        conn: &Connection,
        log: &LocationLog,
        candidate: TravelPoint,
    ) -> AppResult<(TravelPoint, i64, FraudAssessment)> {
        if candidate.at <= log.check_in_time {
            let at = TravelPoint::new(candidate.point, log.check_in_time);
            return Ok((at, 0, FraudAssessment::skipped()));
        }
        let (minutes, fraud) = self.assess_location_close(conn, log, candidate)?;
        Ok((candidate, minutes, fraud))
    }

    /// Check-out point of the visit completed before `log`, if any.
    pub fn previous_visit_point(
        &self,
        conn: &Connection,
        log: &LocationLog,
    ) -> AppResult<Option<TravelPoint>> {
        let prev = queries::find_last_completed_location_log(conn, log.attendance_id, log.id)?;
        Ok(prev.and_then(|p| {
            let at = p.check_out_time?;
            let point = GeoPoint::from_columns(p.check_out_latitude, p.check_out_longitude)?;
            Some(TravelPoint::new(point, at))
        }))
    }

    // ------------------------------------------------
    // helpers
    // ------------------------------------------------

    fn check_out_common(
        &self,
        check_in: DateTime<Local>,
        candidate: TravelPoint,
        reference: Option<TravelPoint>,
        what: &str,
    ) -> AppResult<FraudAssessment> {
        if candidate.at <= check_in {
            return Err(AppError::Validation(format!(
                "{what} time must be after check-in time"
            )));
        }
        self.fraud.analyze(reference, candidate)
    }

    fn require_attendance(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
    ) -> AppResult<DailyAttendance> {
        queries::find_attendance(conn, user_id, date)?.ok_or_else(|| {
            AppError::NotFound(format!(
                "No attendance record for {} on {}",
                user_id,
                date.format("%Y-%m-%d")
            ))
        })
    }

    /// Today's record, clocked in and not yet clocked out.
    fn require_active_day(
        &self,
        conn: &Connection,
        user_id: &str,
        date: &NaiveDate,
        action: &str,
    ) -> AppResult<DailyAttendance> {
        let attendance = queries::find_attendance(conn, user_id, date)?
            .filter(DailyAttendance::has_clock_in)
            .ok_or_else(|| AppError::Validation(format!("{CLOCK_IN_FIRST} before {action}")))?;

        if attendance.has_clock_out() {
            return Err(AppError::Validation(format!(
                "Already clocked out for {}; {} is not allowed",
                attendance.date_str(),
                action
            )));
        }
        Ok(attendance)
    }

    fn geofence(
        &self,
        user_id: &str,
        point: GeoPoint,
        work_location: WorkLocation,
    ) -> AppResult<GeofenceOutcome> {
        if !work_location.requires_geofence() {
            return Ok(GeofenceOutcome::default());
        }

        let access = self.resolver.validate_location_access(user_id, point)?;
        let flag_reason = (!access.is_valid).then(|| access.describe_rejection());

        Ok(match access.nearest {
            Some(m) => GeofenceOutcome {
                entity_id: Some(m.entity.id),
                is_within_radius: Some(m.is_within_radius),
                distance_from_entity: Some(m.distance_meters),
                flag_reason,
            },
            None => GeofenceOutcome {
                entity_id: None,
                is_within_radius: Some(false),
                distance_from_entity: None,
                flag_reason,
            },
        })
    }
}
