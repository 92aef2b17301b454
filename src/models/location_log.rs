use chrono::{DateTime, Local};
use serde::Serialize;

/// A bounded visit to an authorized entity.
#[derive(Debug, Clone, Serialize)]
pub struct LocationLog {
    pub id: i64,
    pub attendance_id: i64,
    pub user_id: String,
    pub entity_id: String,

    pub check_in_time: DateTime<Local>,
    pub check_in_latitude: f64,
    pub check_in_longitude: f64,

    pub check_out_time: Option<DateTime<Local>>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,

    pub distance_from_entity: f64,
    pub is_within_radius: bool,
    pub duration_minutes: Option<i64>,
    pub travel_speed: Option<f64>,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl LocationLog {
    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }
}
