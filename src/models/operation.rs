use serde::Serialize;
use std::fmt;

/// Category of state transition. Together with the user id it forms the
/// partition key of the in-process exclusion lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    ClockIn,
    ClockOut,
    SessionCheckIn,
    SessionCheckOut,
    LocationCheckIn,
    LocationCheckOut,
}

impl OperationClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::ClockIn => "clock_in",
            OperationClass::ClockOut => "clock_out",
            OperationClass::SessionCheckIn => "session_check_in",
            OperationClass::SessionCheckOut => "session_check_out",
            OperationClass::LocationCheckIn => "location_check_in",
            OperationClass::LocationCheckOut => "location_check_out",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three attendance tables a fraud flag can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Attendance,
    Session,
    LocationLog,
}

impl RecordType {
    pub fn table(&self) -> &'static str {
        match self {
            RecordType::Attendance => "daily_attendance",
            RecordType::Session => "attendance_sessions",
            RecordType::LocationLog => "location_logs",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Attendance => "attendance",
            RecordType::Session => "session",
            RecordType::LocationLog => "location_log",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "attendance" => Some(RecordType::Attendance),
            "session" => Some(RecordType::Session),
            "location_log" | "location-log" | "visit" => Some(RecordType::LocationLog),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
