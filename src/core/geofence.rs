//! Geospatial access resolver: which authorized entity a coordinate falls in.

use crate::core::directory::AccessDirectory;
use crate::core::distance::distance;
use crate::errors::{AppError, AppResult};
use crate::models::entity::Entity;
use crate::models::geo_point::GeoPoint;
use serde::Serialize;
use std::sync::Arc;

/// Distance from a point to one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityMatch {
    pub entity: Entity,
    pub distance_meters: f64,
    pub is_within_radius: bool,
}

/// Result of a nearest-entity search.
#[derive(Debug, Clone, Serialize)]
pub struct LocationAccess {
    /// True when at least one accessible entity contains the point.
    pub is_valid: bool,
    /// Nearest containing entity when valid, nearest overall otherwise.
    pub nearest: Option<EntityMatch>,
    /// Every accessible entity, closest first.
    pub candidates: Vec<EntityMatch>,
}

impl LocationAccess {
    /// Human readable explanation for an invalid result.
    pub fn describe_rejection(&self) -> String {
        match &self.nearest {
            None => "No authorized locations are configured for this user".to_string(),
            Some(m) => format!(
                "Outside all authorized locations (nearest: {} at {:.1} m, allowed radius {} m)",
                m.entity.name, m.distance_meters, m.entity.radius_meters
            ),
        }
    }
}

/// Pure distance-threshold test. A point exactly on the boundary is inside.
pub fn is_within_radius(
    entity_lat: f64,
    entity_lon: f64,
    lat: f64,
    lon: f64,
    radius_meters: f64,
) -> AppResult<bool> {
    let d = distance(entity_lat, entity_lon, lat, lon)?;
    Ok(d <= radius_meters)
}

#[derive(Clone)]
pub struct GeoResolver {
    directory: Arc<dyn AccessDirectory>,
}

impl GeoResolver {
    pub fn new(directory: Arc<dyn AccessDirectory>) -> Self {
        Self { directory }
    }

    pub fn validate_location_access(&self, user_id: &str, point: GeoPoint) -> AppResult<LocationAccess> {
        let mut candidates = self
            .directory
            .accessible_entities(user_id)?
            .into_iter()
            .map(|entity| measure(entity, point))
            .collect::<AppResult<Vec<_>>>()?;

        candidates.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

        let nearest_inside = candidates.iter().find(|m| m.is_within_radius).cloned();
        let is_valid = nearest_inside.is_some();
        let nearest = nearest_inside.or_else(|| candidates.first().cloned());

        Ok(LocationAccess {
            is_valid,
            nearest,
            candidates,
        })
    }

    pub fn has_entity_access(&self, user_id: &str, entity_id: &str) -> AppResult<bool> {
        self.directory.has_entity_access(user_id, entity_id)
    }

    /// Check a point against one specific entity the user asked for.
    ///
    /// Unknown entity → NotFound, no access → AccessDenied,
    /// outside the fence → Geospatial with the measured distance.
    pub fn check_entity(&self, user_id: &str, entity_id: &str, point: GeoPoint) -> AppResult<EntityMatch> {
        let entity = self
            .directory
            .find_entity(entity_id)?
            .ok_or_else(|| AppError::NotFound(format!("Entity '{entity_id}' not found")))?;

        if !self.has_entity_access(user_id, entity_id)? {
            return Err(AppError::AccessDenied(format!(
                "User '{user_id}' has no access to {} ({entity_id})",
                entity.name
            )));
        }

        let m = measure(entity, point)?;
        if !m.is_within_radius {
            return Err(AppError::Geospatial(format!(
                "You are {:.1} m from {}; allowed radius is {} m",
                m.distance_meters, m.entity.name, m.entity.radius_meters
            )));
        }
        Ok(m)
    }
}

fn measure(entity: Entity, point: GeoPoint) -> AppResult<EntityMatch> {
    let d = distance(entity.latitude, entity.longitude, point.latitude, point.longitude)?;
    Ok(EntityMatch {
        is_within_radius: d <= entity.radius_meters,
        distance_meters: d,
        entity,
    })
}
