// src/export/model.rs

use crate::models::attendance::DailyAttendance;
use crate::utils::time::ts_to_db;
use serde::Serialize;

/// Flat view of one attendance day, one column per field.
#[derive(Serialize, Clone, Debug)]
pub struct AttendanceExport {
    pub id: i64,
    pub user_id: String,
    pub date: String,
    pub work_location: String,
    pub clock_in_time: Option<String>,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub clock_out_time: Option<String>,
    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
    pub entity_id: Option<String>,
    pub remote_location: Option<String>,
    pub is_within_radius: Option<bool>,
    pub distance_from_entity: Option<f64>,
    pub total_hours: Option<f64>,
    pub travel_speed: Option<f64>,
    pub status: String,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
}

impl From<&DailyAttendance> for AttendanceExport {
    fn from(a: &DailyAttendance) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id.clone(),
            date: a.date_str(),
            work_location: a.work_location.to_db_str().to_string(),
            clock_in_time: a.clock_in_time.as_ref().map(ts_to_db),
            clock_in_latitude: a.clock_in_latitude,
            clock_in_longitude: a.clock_in_longitude,
            clock_out_time: a.clock_out_time.as_ref().map(ts_to_db),
            clock_out_latitude: a.clock_out_latitude,
            clock_out_longitude: a.clock_out_longitude,
            entity_id: a.entity_id.clone(),
            remote_location: a.remote_location.clone(),
            is_within_radius: a.is_within_radius,
            distance_from_entity: a.distance_from_entity,
            total_hours: a.total_hours.map(|h| (h * 100.0).round() / 100.0),
            travel_speed: a.travel_speed,
            status: a.status.to_db_str().to_string(),
            is_flagged: a.is_flagged,
            flag_reason: a.flag_reason.clone(),
        }
    }
}
