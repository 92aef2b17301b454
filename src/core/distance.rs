//! Great-circle distance and speed helpers.
//!
//! Distances use the haversine formula on a spherical Earth; altitude is
//! ignored. All inputs are validated before any trigonometry happens.

use crate::errors::{AppError, AppResult};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Reject non-finite or out-of-range coordinates.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> AppResult<()> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(AppError::Geospatial(format!(
            "Coordinates must be finite numbers (lat={latitude}, lon={longitude})"
        )));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::Geospatial(format!(
            "Latitude {latitude} is outside [-90, 90]"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Geospatial(format!(
            "Longitude {longitude} is outside [-180, 180]"
        )));
    }
    Ok(())
}

/// Distance in meters between two coordinates.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> AppResult<f64> {
    validate_coordinates(lat1, lon1)?;
    validate_coordinates(lat2, lon2)?;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    Ok(EARTH_RADIUS_METERS * c)
}

/// Speed in km/h. A non-positive elapsed time yields 0.
pub fn speed_kmh(distance_meters: f64, elapsed_minutes: f64) -> f64 {
    if elapsed_minutes <= 0.0 || !elapsed_minutes.is_finite() || !distance_meters.is_finite() {
        return 0.0;
    }
    (distance_meters / 1000.0) / (elapsed_minutes / 60.0)
}
