use serde::{Deserialize, Serialize};

/// Smallest and largest geofence radius an entity may declare, in meters.
pub const MIN_RADIUS_METERS: f64 = 10.0;
pub const MAX_RADIUS_METERS: f64 = 1000.0;

/// An authorized physical location: a point plus its geofence radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entity_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAssignment {
    pub user_id: String,
    pub department_id: String,
}

/// On-disk layout of the directory file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub users: Vec<UserAssignment>,
}
