use super::operation::RecordType;
use chrono::NaiveDate;
use serde::Serialize;

/// Aggregate over a user's attendance in a date range.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AttendanceSummary {
    pub user_id: String,
    pub days_present: i64,
    pub days_completed: i64,
    pub flagged_days: i64,
    pub total_hours: f64,
}

/// One row of the cross-table flagged listing.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedRecord {
    pub record_type: RecordType,
    pub id: i64,
    pub user_id: String,
    pub date: NaiveDate,
    pub flag_reason: String,
    pub created_at: String,
}
