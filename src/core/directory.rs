//! Department/entity directory.
//!
//! The attendance core never writes this data; it only asks which entities
//! a user may check into. `StaticDirectory` serves it from a YAML file.

use crate::core::distance::validate_coordinates;
use crate::errors::{AppError, AppResult};
use crate::models::entity::{DirectoryFile, Entity, MAX_RADIUS_METERS, MIN_RADIUS_METERS};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read-only view over the entities each user is allowed to access.
pub trait AccessDirectory: Send + Sync {
    /// Entities reachable through the user's department. Unknown users get none.
    fn accessible_entities(&self, user_id: &str) -> AppResult<Vec<Entity>>;

    /// Look up a single entity regardless of access.
    fn find_entity(&self, entity_id: &str) -> AppResult<Option<Entity>>;

    fn has_entity_access(&self, user_id: &str, entity_id: &str) -> AppResult<bool> {
        Ok(self
            .accessible_entities(user_id)?
            .iter()
            .any(|e| e.id == entity_id))
    }
}

#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    entities: HashMap<String, Entity>,
    department_entities: HashMap<String, Vec<String>>,
    user_departments: HashMap<String, String>,
}

impl StaticDirectory {
    /// Build and validate a directory. Any inconsistency rejects the whole file.
    pub fn new(file: DirectoryFile) -> AppResult<Self> {
        let mut entities = HashMap::new();
        for entity in file.entities {
            validate_entity(&entity)?;
            if entities.contains_key(&entity.id) {
                return Err(AppError::Config(format!(
                    "Duplicate entity id '{}'",
                    entity.id
                )));
            }
            entities.insert(entity.id.clone(), entity);
        }

        let mut department_entities = HashMap::new();
        for dept in file.departments {
            if let Some(missing) = dept.entity_ids.iter().find(|id| !entities.contains_key(*id)) {
                return Err(AppError::Config(format!(
                    "Department '{}' references unknown entity '{}'",
                    dept.id, missing
                )));
            }
            if department_entities
                .insert(dept.id.clone(), dept.entity_ids)
                .is_some()
            {
                return Err(AppError::Config(format!(
                    "Duplicate department id '{}'",
                    dept.id
                )));
            }
        }

        let mut user_departments = HashMap::new();
        for user in file.users {
            if !department_entities.contains_key(&user.department_id) {
                return Err(AppError::Config(format!(
                    "User '{}' assigned to unknown department '{}'",
                    user.user_id, user.department_id
                )));
            }
            user_departments.insert(user.user_id, user.department_id);
        }

        Ok(Self {
            entities,
            department_entities,
            user_departments,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> AppResult<Self> {
        let file: DirectoryFile = serde_yaml::from_str(yaml)?;
        Self::new(file)
    }

    /// Load from disk. A missing file yields an empty directory.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "directory file not found, no entities loaded");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

fn validate_entity(entity: &Entity) -> AppResult<()> {
    validate_coordinates(entity.latitude, entity.longitude)
        .map_err(|e| AppError::Config(format!("Entity '{}': {}", entity.id, e)))?;

    if !entity.radius_meters.is_finite()
        || !(MIN_RADIUS_METERS..=MAX_RADIUS_METERS).contains(&entity.radius_meters)
    {
        return Err(AppError::Config(format!(
            "Entity '{}': radius {} m is outside [{}, {}] m",
            entity.id, entity.radius_meters, MIN_RADIUS_METERS, MAX_RADIUS_METERS
        )));
    }
    Ok(())
}

impl AccessDirectory for StaticDirectory {
    fn accessible_entities(&self, user_id: &str) -> AppResult<Vec<Entity>> {
        let Some(dept) = self.user_departments.get(user_id) else {
            return Ok(Vec::new());
        };
        let ids = self
            .department_entities
            .get(dept)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(ids
            .iter()
            .filter_map(|id| self.entities.get(id).cloned())
            .collect())
    }

    fn find_entity(&self, entity_id: &str) -> AppResult<Option<Entity>> {
        Ok(self.entities.get(entity_id).cloned())
    }

    fn has_entity_access(&self, user_id: &str, entity_id: &str) -> AppResult<bool> {
        Ok(self
            .user_departments
            .get(user_id)
            .and_then(|dept| self.department_entities.get(dept))
            .is_some_and(|ids| ids.iter().any(|id| id == entity_id)))
    }
}
