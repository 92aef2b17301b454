//! Transport-agnostic request payloads for the six transitions.

use super::session_type::SessionType;
use super::work_location::WorkLocation;

#[derive(Debug, Clone, Default)]
pub struct ClockInRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub notes: Option<String>,
    pub work_location: Option<WorkLocation>,
    pub remote_location: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClockOutRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub session_type: Option<SessionType>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationCheckInRequest {
    pub entity_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationCheckOutRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub notes: Option<String>,
}
