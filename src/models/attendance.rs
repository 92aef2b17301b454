use super::work_location::WorkLocation;
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    ClockedIn,
    ClockedOut,
}

impl AttendanceStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AttendanceStatus::ClockedIn => "clocked_in",
            AttendanceStatus::ClockedOut => "clocked_out",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "clocked_in" => Some(AttendanceStatus::ClockedIn),
            "clocked_out" => Some(AttendanceStatus::ClockedOut),
            _ => None,
        }
    }
}

/// One attendance envelope per user and calendar date.
#[derive(Debug, Clone, Serialize)]
pub struct DailyAttendance {
    pub id: i64,
    pub user_id: String,
    pub date: NaiveDate, // ⇔ daily_attendance.date (TEXT "YYYY-MM-DD")

    pub clock_in_time: Option<DateTime<Local>>,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub clock_in_notes: Option<String>,

    pub clock_out_time: Option<DateTime<Local>>,
    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
    pub clock_out_notes: Option<String>,

    pub entity_id: Option<String>, // NULL for remote work
    pub work_location: WorkLocation,
    pub remote_location: Option<String>,
    pub is_within_radius: Option<bool>,
    pub distance_from_entity: Option<f64>,

    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub total_hours: Option<f64>,
    pub travel_speed: Option<f64>,
    pub status: AttendanceStatus,

    pub created_at: String,
    pub updated_at: String,
}

impl DailyAttendance {
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn has_clock_in(&self) -> bool {
        self.clock_in_time.is_some()
    }

    pub fn has_clock_out(&self) -> bool {
        self.clock_out_time.is_some()
    }
}
