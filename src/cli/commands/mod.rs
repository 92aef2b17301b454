pub mod attendance;
pub mod config;
pub mod db;
pub mod export;
pub mod flagged;
pub mod history;
pub mod init;
pub mod log;
pub mod status;

use crate::config::Config;
use crate::core::service::AttendanceService;
use crate::db::initialize::init_db;
use crate::errors::AppResult;

/// Open the configured database (bringing its schema up to date) and wire
/// the attendance service on top of it.
pub(crate) fn open_service(cfg: &Config) -> AppResult<AttendanceService> {
    let service = AttendanceService::from_config(cfg)?;
    init_db(&service.pool().lock())?;
    Ok(service)
}
