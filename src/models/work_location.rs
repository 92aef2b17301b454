use serde::{Deserialize, Serialize};

/// Where the employee declares to be working for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkLocation {
    #[default]
    Office,
    Remote,
    Field,
}

impl WorkLocation {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkLocation::Office => "OFFICE",
            WorkLocation::Remote => "REMOTE",
            WorkLocation::Field => "FIELD",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "OFFICE" => Some(WorkLocation::Office),
            "REMOTE" => Some(WorkLocation::Remote),
            "FIELD" => Some(WorkLocation::Field),
            _ => None,
        }
    }

    /// Helper: convert user input (any case) → enum
    pub fn from_code(code: &str) -> Option<Self> {
        Self::from_db_str(&code.trim().to_uppercase())
    }

    /// Office and field days are checked against the geofences.
    pub fn requires_geofence(&self) -> bool {
        !matches!(self, WorkLocation::Remote)
    }
}
