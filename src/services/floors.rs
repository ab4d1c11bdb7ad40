use std::collections::BTreeSet;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{floor::Floor, registry::Registry},
    services::{
        ErrorCode,
        names::{name_taken, normalize_name},
    },
    storage::{Storage, StorageError},
};

fn floor_names(registry: &Registry) -> impl Iterator<Item = (Uuid, &str)> {
    registry.get_floors().map(|f| (f.floor_id, f.name.as_str()))
}

pub fn list_floors(registry: &Registry) -> impl Iterator<Item = &Floor> {
    registry.get_floors()
}

#[derive(Debug, Error)]
pub enum CreateFloorError {
    #[error("Floor name cannot be empty")]
    InvalidName,

    #[error("A floor named '{0}' already exists")]
    DuplicateName(String),

    #[error("Failed to create floor: {0}")]
    CreateFailed(#[from] StorageError),
}

impl ErrorCode for CreateFloorError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::DuplicateName(_) => "duplicate_name",
            Self::CreateFailed(_) => "create_failed",
        }
    }
}

#[derive(Default)]
pub struct CreateFloorParameters {
    pub name: String,
    pub icon: Option<String>,
    pub level: Option<i32>,
    pub aliases: BTreeSet<String>,
}

pub fn create_floor(
    registry: &mut Registry,
    storage: &impl Storage,
    parameters: CreateFloorParameters,
) -> Result<Floor, CreateFloorError> {
    let name = normalize_name(&parameters.name);
    if name.is_empty() {
        return Err(CreateFloorError::InvalidName);
    }
    if name_taken(floor_names(registry), &name, None) {
        return Err(CreateFloorError::DuplicateName(name));
    }

    let now = jiff::Timestamp::now();
    let floor = Floor {
        floor_id: registry.fresh_id(),
        name,
        icon: parameters.icon,
        level: parameters.level,
        aliases: parameters.aliases,
        created_at: now,
        modified_at: now,
    };

    registry.add_floor(floor.clone());

    if let Err(e) = storage.save(registry) {
        registry.floors.remove(&floor.floor_id);
        return Err(e.into());
    }

    Ok(floor)
}

#[derive(Debug, Error)]
pub enum UpdateFloorError {
    #[error("Floor '{0}' not found")]
    NotFound(String),

    #[error("Floor name cannot be empty")]
    InvalidName,

    #[error("A floor named '{0}' already exists")]
    DuplicateName(String),

    #[error("Failed to update floor: {0}")]
    UpdateFailed(#[from] StorageError),
}

impl ErrorCode for UpdateFloorError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidName => "invalid_name",
            Self::DuplicateName(_) => "duplicate_name",
            Self::UpdateFailed(_) => "update_failed",
        }
    }
}

#[derive(Default)]
pub struct UpdateFloorParameters {
    pub floor_id: String,
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub level: Option<Option<i32>>,
    pub aliases: Option<BTreeSet<String>>,
}

pub fn update_floor(
    registry: &mut Registry,
    storage: &impl Storage,
    parameters: UpdateFloorParameters,
) -> Result<Floor, UpdateFloorError> {
    let Some(current) = registry.parse_floor_id(&parameters.floor_id)
        .and_then(|id| registry.get_floor(id))
        .cloned()
    else {
        return Err(UpdateFloorError::NotFound(parameters.floor_id));
    };

    let mut updated = current.clone();

    if let Some(raw_name) = parameters.name {
        let name = normalize_name(&raw_name);
        if name.is_empty() {
            return Err(UpdateFloorError::InvalidName);
        }
        if name_taken(floor_names(registry), &name, Some(current.floor_id)) {
            return Err(UpdateFloorError::DuplicateName(name));
        }
        updated.name = name;
    }

    if let Some(icon) = parameters.icon {
        updated.icon = icon;
    }

    if let Some(level) = parameters.level {
        updated.level = level;
    }

    if let Some(aliases) = parameters.aliases {
        updated.aliases = aliases;
    }

    if updated.same_content(&current) {
        return Ok(current);
    }

    updated.modified_at = jiff::Timestamp::now();
    registry.add_floor(updated.clone());

    if let Err(e) = storage.save(registry) {
        registry.add_floor(current);
        return Err(e.into());
    }

    Ok(updated)
}

#[derive(Debug, Error)]
pub enum DeleteFloorError {
    #[error("Floor '{0}' not found")]
    NotFound(String),

    #[error("Floor '{name}' is still assigned to {area_count} area(s)")]
    FloorInUse { name: String, area_count: usize },

    #[error("Failed to delete floor: {0}")]
    DeleteFailed(#[from] StorageError),
}

impl ErrorCode for DeleteFloorError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::FloorInUse { .. } => "floor_in_use",
            Self::DeleteFailed(_) => "delete_failed",
        }
    }
}

pub struct DeleteFloorParameters {
    pub floor_id: String,
}

/// Remove a floor that no area references any more. Returns the removed floor.
pub fn delete_floor(
    registry: &mut Registry,
    storage: &impl Storage,
    parameters: DeleteFloorParameters,
) -> Result<Floor, DeleteFloorError> {
    let Some(floor_id) = registry.parse_floor_id(&parameters.floor_id) else {
        return Err(DeleteFloorError::NotFound(parameters.floor_id));
    };

    let area_count = registry.get_areas_on_floor(floor_id).count();
    if area_count > 0 {
        let name = registry
            .get_floor(floor_id)
            .map(|f| f.name.clone())
            .unwrap_or(parameters.floor_id);
        return Err(DeleteFloorError::FloorInUse { name, area_count });
    }

    let Some(floor) = registry.remove_floor(floor_id) else {
        return Err(DeleteFloorError::NotFound(parameters.floor_id));
    };

    if let Err(e) = storage.save(registry) {
        registry.restore_floor(floor);
        return Err(e.into());
    }

    Ok(floor)
}
