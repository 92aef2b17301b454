//! Attendance core: geometry, access, fraud heuristics, validation and the
//! serialized transaction path that applies every state change.

pub mod clock;
pub mod directory;
pub mod distance;
pub mod executor;
pub mod fraud;
pub mod geofence;
pub mod lock;
pub mod service;
pub mod transitions;
pub mod validation;
