use super::session_type::SessionType;
use chrono::{DateTime, Local};
use serde::Serialize;

/// A bounded sub-activity (work, break, meeting, ...) inside a day.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSession {
    pub id: i64,
    pub attendance_id: i64,
    pub user_id: String,
    pub session_type: SessionType,

    pub check_in_time: DateTime<Local>,
    pub check_in_latitude: f64,
    pub check_in_longitude: f64,

    pub check_out_time: Option<DateTime<Local>>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,

    pub entity_id: Option<String>,
    pub is_within_radius: Option<bool>,
    pub duration_minutes: Option<i64>,
    pub travel_speed: Option<f64>,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl AttendanceSession {
    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }
}
