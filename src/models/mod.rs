pub mod attendance;
pub mod entity;
pub mod geo_point;
pub mod location_log;
pub mod operation;
pub mod requests;
pub mod session;
pub mod session_type;
pub mod summary;
pub mod work_location;
