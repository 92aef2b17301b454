//! Public entry point of the attendance core.
//!
//! Every state transition goes through the executor under its
//! `(user, operation)` key; queries read through the pool directly.

use crate::config::Config;
use crate::core::clock::{Clock, SystemClock};
use crate::core::directory::{AccessDirectory, StaticDirectory};
use crate::core::executor::TransactionExecutor;
use crate::core::fraud::{self, FraudConfig, FraudEngine};
use crate::core::geofence::{GeoResolver, LocationAccess};
use crate::core::transitions::{self, TransitionContext, require_user};
use crate::db::log::ttlog_at;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::AppResult;
use crate::models::attendance::DailyAttendance;
use crate::models::geo_point::GeoPoint;
use crate::models::location_log::LocationLog;
use crate::models::operation::{OperationClass, RecordType};
use crate::models::requests::{
    ClockInRequest, ClockOutRequest, LocationCheckInRequest, LocationCheckOutRequest,
    SessionRequest,
};
use crate::models::session::AttendanceSession;
use crate::models::summary::{AttendanceSummary, FlaggedRecord};
use crate::models::work_location::WorkLocation;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Tunables of the service that do not come from the directory.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub lock_timeout: Duration,
    pub fraud: FraudConfig,
    pub default_work_location: WorkLocation,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            fraud: FraudConfig::default(),
            default_work_location: WorkLocation::Office,
        }
    }
}

impl ServiceSettings {
    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        cfg.fraud.validate()?;
        Ok(Self {
            lock_timeout: Duration::from_millis(cfg.lock_timeout_ms),
            fraud: cfg.fraud.clone(),
            default_work_location: cfg.work_location()?,
        })
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    executor: Arc<TransactionExecutor>,
    ctx: TransitionContext,
    default_work_location: WorkLocation,
}

impl AttendanceService {
    pub fn new(
        pool: DbPool,
        directory: Arc<dyn AccessDirectory>,
        settings: ServiceSettings,
    ) -> AppResult<Self> {
        Self::with_clock(pool, directory, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        pool: DbPool,
        directory: Arc<dyn AccessDirectory>,
        settings: ServiceSettings,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        settings.fraud.validate()?;
        Ok(Self {
            executor: Arc::new(TransactionExecutor::new(pool, settings.lock_timeout)),
            ctx: TransitionContext {
                resolver: GeoResolver::new(directory),
                fraud: FraudEngine::new(settings.fraud),
                clock,
            },
            default_work_location: settings.default_work_location,
        })
    }

    /// Build the service the CLI uses: database and directory paths come
    /// from the loaded configuration.
    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        let pool = DbPool::new(&cfg.database, Duration::from_millis(cfg.busy_timeout_ms))?;
        let directory = StaticDirectory::from_file(Path::new(&cfg.directory_file))?;
        Self::new(pool, Arc::new(directory), ServiceSettings::from_config(cfg)?)
    }

    pub fn pool(&self) -> &DbPool {
        self.executor.pool()
    }

    pub fn executor(&self) -> &TransactionExecutor {
        &self.executor
    }

    pub fn fraud_config(&self) -> &FraudConfig {
        self.ctx.fraud.config()
    }

    // ------------------------------------------------
    // Transitions
    // ------------------------------------------------

    pub async fn clock_in(&self, user_id: &str, req: ClockInRequest) -> AppResult<DailyAttendance> {
        let user = require_user(user_id)?.to_string();
        let point = GeoPoint::new(req.latitude, req.longitude)?;
        let work_location = req.work_location.unwrap_or(self.default_work_location);
        let ctx = self.ctx.clone();
        let u = user.clone();

        self.executor
            .execute(&user, OperationClass::ClockIn, move |tx| {
                transitions::clock_in(tx, &ctx, &u, point, work_location, req)
            })
            .await
    }

    pub async fn clock_out(&self, user_id: &str, req: ClockOutRequest) -> AppResult<DailyAttendance> {
        let user = require_user(user_id)?.to_string();
        let point = GeoPoint::new(req.latitude, req.longitude)?;
        let ctx = self.ctx.clone();
        let u = user.clone();

        self.executor
            .execute(&user, OperationClass::ClockOut, move |tx| {
                transitions::clock_out(tx, &ctx, &u, point, req)
            })
            .await
    }

    pub async fn session_check_in(
        &self,
        user_id: &str,
        req: SessionRequest,
    ) -> AppResult<AttendanceSession> {
        let user = require_user(user_id)?.to_string();
        let point = GeoPoint::new(req.latitude, req.longitude)?;
        let ctx = self.ctx.clone();
        let u = user.clone();

        self.executor
            .execute(&user, OperationClass::SessionCheckIn, move |tx| {
                transitions::session_check_in(tx, &ctx, &u, point, req)
            })
            .await
    }

    pub async fn session_check_out(
        &self,
        user_id: &str,
        req: SessionRequest,
    ) -> AppResult<AttendanceSession> {
        let user = require_user(user_id)?.to_string();
        let point = GeoPoint::new(req.latitude, req.longitude)?;
        let ctx = self.ctx.clone();
        let u = user.clone();

        self.executor
            .execute(&user, OperationClass::SessionCheckOut, move |tx| {
                transitions::session_check_out(tx, &ctx, &u, point, req)
            })
            .await
    }

    pub async fn location_check_in(
        &self,
        user_id: &str,
        req: LocationCheckInRequest,
    ) -> AppResult<LocationLog> {
        let user = require_user(user_id)?.to_string();
        let point = GeoPoint::new(req.latitude, req.longitude)?;
        let ctx = self.ctx.clone();
        let u = user.clone();

        self.executor
            .execute(&user, OperationClass::LocationCheckIn, move |tx| {
                transitions::location_check_in(tx, &ctx, &u, point, req)
            })
            .await
    }

    pub async fn location_check_out(
        &self,
        user_id: &str,
        req: LocationCheckOutRequest,
    ) -> AppResult<LocationLog> {
        let user = require_user(user_id)?.to_string();
        let point = GeoPoint::new(req.latitude, req.longitude)?;
        let ctx = self.ctx.clone();
        let u = user.clone();

        self.executor
            .execute(&user, OperationClass::LocationCheckOut, move |tx| {
                transitions::location_check_out(tx, &ctx, &u, point, req)
            })
            .await
    }

    /// Attach `reason` to a record, appending to whatever is already there.
    pub async fn flag_suspicious_activity(
        &self,
        record_id: i64,
        record_type: RecordType,
        reason: &str,
    ) -> AppResult<()> {
        let reason = reason.to_string();
        let now = self.ctx.clock.now();
        self.executor
            .execute_unkeyed("flag", move |tx| {
                fraud::flag_suspicious_activity(tx, record_id, record_type, &reason)?;
                ttlog_at(
                    tx,
                    &now,
                    "flag",
                    &format!("{record_type}#{record_id}"),
                    &reason,
                )
            })
            .await
    }

    // ------------------------------------------------
    // Queries
    // ------------------------------------------------

    /// The user's record for the clock's current date.
    pub async fn today(&self, user_id: &str) -> AppResult<Option<DailyAttendance>> {
        let user = require_user(user_id)?.to_string();
        let date = self.ctx.clock.now().date_naive();
        self.pool()
            .read(move |conn| queries::find_attendance(conn, &user, &date))
            .await
    }

    pub async fn open_session(&self, user_id: &str) -> AppResult<Option<AttendanceSession>> {
        let user = require_user(user_id)?.to_string();
        let date = self.ctx.clock.now().date_naive();
        self.pool()
            .read(move |conn| match queries::find_attendance(conn, &user, &date)? {
                Some(att) => queries::find_open_session(conn, att.id),
                None => Ok(None),
            })
            .await
    }

    pub async fn open_location_log(&self, user_id: &str) -> AppResult<Option<LocationLog>> {
        let user = require_user(user_id)?.to_string();
        let date = self.ctx.clock.now().date_naive();
        self.pool()
            .read(move |conn| match queries::find_attendance(conn, &user, &date)? {
                Some(att) => queries::find_open_location_log(conn, att.id),
                None => Ok(None),
            })
            .await
    }

    pub async fn history(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<DailyAttendance>> {
        let user = require_user(user_id)?.to_string();
        self.pool()
            .read(move |conn| queries::attendance_history(conn, &user, &from, &to))
            .await
    }

    pub async fn sessions_for(&self, attendance_id: i64) -> AppResult<Vec<AttendanceSession>> {
        self.pool()
            .read(move |conn| queries::sessions_for_attendance(conn, attendance_id))
            .await
    }

    pub async fn location_logs_for(&self, attendance_id: i64) -> AppResult<Vec<LocationLog>> {
        self.pool()
            .read(move |conn| queries::location_logs_for_attendance(conn, attendance_id))
            .await
    }

    /// Flagged rows of all three record types, newest first.
    pub async fn flagged(&self, limit: usize) -> AppResult<Vec<FlaggedRecord>> {
        self.pool()
            .read(move |conn| queries::list_flagged(conn, limit))
            .await
    }

    pub async fn summary(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<AttendanceSummary> {
        let user = require_user(user_id)?.to_string();
        self.pool()
            .read(move |conn| queries::summarize(conn, &user, &from, &to))
            .await
    }

    /// Nearest-entity lookup without recording anything.
    pub fn locate(&self, user_id: &str, latitude: f64, longitude: f64) -> AppResult<LocationAccess> {
        let user = require_user(user_id)?;
        let point = GeoPoint::new(latitude, longitude)?;
        self.ctx.resolver.validate_location_access(user, point)
    }
}
