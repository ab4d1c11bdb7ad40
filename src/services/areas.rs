use std::collections::BTreeSet;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{area::Area, registry::Registry},
    services::{
        ErrorCode,
        names::{name_taken, normalize_name},
    },
    storage::{Storage, StorageError},
};

fn area_names(registry: &Registry) -> impl Iterator<Item = (Uuid, &str)> {
    registry.get_areas().map(|a| (a.id, a.name.as_str()))
}

pub fn list_areas(registry: &Registry) -> impl Iterator<Item = &Area> {
    registry.get_areas()
}

#[derive(Debug, Error)]
pub enum CreateAreaError {
    #[error("Room name cannot be empty")]
    InvalidName,

    #[error("A room named '{0}' already exists")]
    DuplicateName(String),

    #[error("Floor '{0}' does not exist")]
    InvalidFloor(String),

    #[error("Failed to create area: {0}")]
    CreateFailed(#[from] StorageError),
}

impl ErrorCode for CreateAreaError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::DuplicateName(_) => "duplicate_name",
            Self::InvalidFloor(_) => "invalid_floor",
            Self::CreateFailed(_) => "create_failed",
        }
    }
}

#[derive(Default)]
pub struct CreateAreaParameters {
    pub name: String,
    pub icon: Option<String>,
    pub floor_id: Option<String>,
    pub labels: BTreeSet<String>,
    pub aliases: BTreeSet<String>,
}

pub fn create_area(
    registry: &mut Registry,
    storage: &impl Storage,
    parameters: CreateAreaParameters,
) -> Result<Area, CreateAreaError> {
    let name = normalize_name(&parameters.name);
    if name.is_empty() {
        return Err(CreateAreaError::InvalidName);
    }
    if name_taken(area_names(registry), &name, None) {
        return Err(CreateAreaError::DuplicateName(name));
    }

    let floor_id = match parameters.floor_id {
        None => None,
        Some(raw) => match registry.parse_floor_id(&raw) {
            Some(floor_id) => Some(floor_id),
            None => return Err(CreateAreaError::InvalidFloor(raw)),
        },
    };

    let now = jiff::Timestamp::now();
    let area = Area {
        id: registry.fresh_id(),
        name,
        icon: parameters.icon,
        floor_id,
        labels: parameters.labels,
        aliases: parameters.aliases,
        created_at: now,
        modified_at: now,
    };

    registry.add_area(area.clone());

    if let Err(e) = storage.save(registry) {
        registry.areas.remove(&area.id);
        return Err(e.into());
    }

    Ok(area)
}

#[derive(Debug, Error)]
pub enum UpdateAreaError {
    #[error("Area '{0}' not found")]
    NotFound(String),

    #[error("Room name cannot be empty")]
    InvalidName,

    #[error("A room named '{0}' already exists")]
    DuplicateName(String),

    #[error("Floor '{0}' does not exist")]
    InvalidFloor(String),

    #[error("Failed to update area: {0}")]
    UpdateFailed(#[from] StorageError),
}

impl ErrorCode for UpdateAreaError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidName => "invalid_name",
            Self::DuplicateName(_) => "duplicate_name",
            Self::InvalidFloor(_) => "invalid_floor",
            Self::UpdateFailed(_) => "update_failed",
        }
    }
}

/// Partial update: `None` leaves a field untouched. For the nullable
/// fields `Some(None)` clears the value.
#[derive(Default)]
pub struct UpdateAreaParameters {
    pub area_id: String,
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub floor_id: Option<Option<String>>,
    pub labels: Option<BTreeSet<String>>,
    pub aliases: Option<BTreeSet<String>>,
}

pub fn update_area(
    registry: &mut Registry,
    storage: &impl Storage,
    parameters: UpdateAreaParameters,
) -> Result<Area, UpdateAreaError> {
    let Some(current) = registry.parse_area_id(&parameters.area_id)
        .and_then(|id| registry.get_area(id))
        .cloned()
    else {
        return Err(UpdateAreaError::NotFound(parameters.area_id));
    };

    let mut updated = current.clone();

    if let Some(raw_name) = parameters.name {
        let name = normalize_name(&raw_name);
        if name.is_empty() {
            return Err(UpdateAreaError::InvalidName);
        }
        if name_taken(area_names(registry), &name, Some(current.id)) {
            return Err(UpdateAreaError::DuplicateName(name));
        }
        updated.name = name;
    }

    if let Some(icon) = parameters.icon {
        updated.icon = icon;
    }

    if let Some(floor_ref) = parameters.floor_id {
        updated.floor_id = match floor_ref {
            None => None,
            Some(raw) => match registry.parse_floor_id(&raw) {
                Some(floor_id) => Some(floor_id),
                None => return Err(UpdateAreaError::InvalidFloor(raw)),
            },
        };
    }

    if let Some(labels) = parameters.labels {
        updated.labels = labels;
    }

    if let Some(aliases) = parameters.aliases {
        updated.aliases = aliases;
    }

    if updated.same_content(&current) {
        return Ok(current);
    }

    updated.modified_at = jiff::Timestamp::now();
    registry.add_area(updated.clone());

    if let Err(e) = storage.save(registry) {
        registry.add_area(current);
        return Err(e.into());
    }

    Ok(updated)
}

#[derive(Debug, Error)]
pub enum DeleteAreaError {
    #[error("Area '{0}' not found")]
    NotFound(String),

    #[error("Failed to delete area: {0}")]
    DeleteFailed(#[from] StorageError),
}

impl ErrorCode for DeleteAreaError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::DeleteFailed(_) => "delete_failed",
        }
    }
}

pub struct DeleteAreaParameters {
    pub area_id: String,
}

/// Remove an area and retire its id. Returns the removed area.
pub fn delete_area(
    registry: &mut Registry,
    storage: &impl Storage,
    parameters: DeleteAreaParameters,
) -> Result<Area, DeleteAreaError> {
    let Some(area) = registry.parse_area_id(&parameters.area_id)
        .and_then(|id| registry.remove_area(id))
    else {
        return Err(DeleteAreaError::NotFound(parameters.area_id));
    };

    if let Err(e) = storage.save(registry) {
        registry.restore_area(area);
        return Err(e.into());
    }

    Ok(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::floors::{CreateFloorParameters, create_floor},
        storage::memory::{FailingStorage, MemoryStorage},
    };

    fn create(registry: &mut Registry, name: &str) -> Result<Area, CreateAreaError> {
        create_area(
            registry,
            &MemoryStorage::new(),
            CreateAreaParameters {
                name: name.to_string(),
                ..CreateAreaParameters::default()
            },
        )
    }

    fn ground_floor(registry: &mut Registry) -> String {
        create_floor(
            registry,
            &MemoryStorage::new(),
            CreateFloorParameters {
                name: String::from("Ground"),
                level: Some(0),
                ..CreateFloorParameters::default()
            },
        )
        .unwrap()
        .floor_id
        .to_string()
    }

    #[test]
    fn test_create_area_lists_exactly_once() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "Living Room").unwrap();

        let matching: Vec<_> = list_areas(&registry)
            .filter(|a| a.name == "Living Room")
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, area.id);
        assert!(area.labels.is_empty());
        assert!(area.aliases.is_empty());
    }

    #[test]
    fn test_create_area_trims_name() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "  Den  ").unwrap();
        assert_eq!(area.name, "Den");
    }

    #[test]
    fn test_create_area_rejects_blank_name() {
        let mut registry = Registry::default();
        assert!(matches!(
            create(&mut registry, "   "),
            Err(CreateAreaError::InvalidName)
        ));
        assert_eq!(list_areas(&registry).count(), 0);
    }

    #[test]
    fn test_create_area_rejects_case_insensitive_duplicate() {
        let mut registry = Registry::default();
        create(&mut registry, "Kitchen").unwrap();

        let result = create(&mut registry, "kitchen");
        assert!(matches!(result, Err(CreateAreaError::DuplicateName(ref n)) if n == "kitchen"));
        assert_eq!(list_areas(&registry).count(), 1);
    }

    #[test]
    fn test_duplicate_check_uses_full_case_fold() {
        let mut registry = Registry::default();
        create(&mut registry, "Straße").unwrap();
        create(&mut registry, "ΟΔΟΣ").unwrap();

        assert!(matches!(
            create(&mut registry, "STRASSE"),
            Err(CreateAreaError::DuplicateName(_))
        ));
        assert!(matches!(
            create(&mut registry, "οδοσ"),
            Err(CreateAreaError::DuplicateName(_))
        ));
        assert_eq!(list_areas(&registry).count(), 2);
    }

    #[test]
    fn test_create_area_with_unknown_floor() {
        let mut registry = Registry::default();
        let result = create_area(
            &mut registry,
            &MemoryStorage::new(),
            CreateAreaParameters {
                name: String::from("Hall"),
                floor_id: Some(String::from("nonexistent")),
                ..CreateAreaParameters::default()
            },
        );

        assert!(matches!(result, Err(CreateAreaError::InvalidFloor(_))));
        assert_eq!(list_areas(&registry).count(), 0);
    }

    #[test]
    fn test_create_area_rolls_back_when_save_fails() {
        let mut registry = Registry::default();
        let result = create_area(
            &mut registry,
            &FailingStorage,
            CreateAreaParameters {
                name: String::from("Hall"),
                ..CreateAreaParameters::default()
            },
        );

        assert!(matches!(result, Err(CreateAreaError::CreateFailed(_))));
        assert_eq!(result.unwrap_err().code(), "create_failed");
        assert_eq!(list_areas(&registry).count(), 0);
    }

    #[test]
    fn test_update_same_name_is_noop() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "Kitchen").unwrap();
        let storage = MemoryStorage::new();

        let updated = update_area(
            &mut registry,
            &storage,
            UpdateAreaParameters {
                area_id: area.id.to_string(),
                name: Some(String::from("Kitchen")),
                ..UpdateAreaParameters::default()
            },
        )
        .unwrap();

        assert_eq!(updated, area);
        assert_eq!(registry.get_area(area.id), Some(&area));
        // A no-op never reaches storage.
        assert!(storage.load().unwrap().areas.is_empty());
    }

    #[test]
    fn test_update_can_change_case_of_own_name() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "kitchen").unwrap();

        let updated = update_area(
            &mut registry,
            &MemoryStorage::new(),
            UpdateAreaParameters {
                area_id: area.id.to_string(),
                name: Some(String::from("Kitchen")),
                ..UpdateAreaParameters::default()
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Kitchen");
        assert!(updated.modified_at >= area.modified_at);
    }

    #[test]
    fn test_update_rejects_other_areas_name() {
        let mut registry = Registry::default();
        create(&mut registry, "Kitchen").unwrap();
        let den = create(&mut registry, "Den").unwrap();

        let result = update_area(
            &mut registry,
            &MemoryStorage::new(),
            UpdateAreaParameters {
                area_id: den.id.to_string(),
                name: Some(String::from(" KITCHEN ")),
                ..UpdateAreaParameters::default()
            },
        );

        assert!(matches!(result, Err(UpdateAreaError::DuplicateName(_))));
        assert_eq!(registry.get_area(den.id).map(|a| a.name.as_str()), Some("Den"));
    }

    #[test]
    fn test_update_unknown_area() {
        let mut registry = Registry::default();
        for area_id in [Uuid::new_v4().to_string(), String::from("not-an-id")] {
            let result = update_area(
                &mut registry,
                &MemoryStorage::new(),
                UpdateAreaParameters {
                    area_id,
                    name: Some(String::new()),
                    floor_id: Some(Some(String::from("nowhere"))),
                    ..UpdateAreaParameters::default()
                },
            );
            assert!(matches!(result, Err(UpdateAreaError::NotFound(_))));
        }
    }

    #[test]
    fn test_update_partial_keeps_omitted_fields() {
        let mut registry = Registry::default();
        let floor_id = ground_floor(&mut registry);
        let area = create_area(
            &mut registry,
            &MemoryStorage::new(),
            CreateAreaParameters {
                name: String::from("Hall"),
                icon: Some(String::from("mdi:door")),
                floor_id: Some(floor_id.clone()),
                labels: ["entry".to_string()].into(),
                aliases: ["Foyer".to_string()].into(),
            },
        )
        .unwrap();

        let updated = update_area(
            &mut registry,
            &MemoryStorage::new(),
            UpdateAreaParameters {
                area_id: area.id.to_string(),
                labels: Some(["hallway".to_string(), "dark".to_string()].into()),
                ..UpdateAreaParameters::default()
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Hall");
        assert_eq!(updated.icon.as_deref(), Some("mdi:door"));
        assert_eq!(updated.floor_id.map(|id| id.to_string()), Some(floor_id));
        assert_eq!(updated.aliases, area.aliases);
        assert_eq!(
            updated.labels,
            ["dark".to_string(), "hallway".to_string()].into()
        );
    }

    #[test]
    fn test_update_null_clears_fields() {
        let mut registry = Registry::default();
        let floor_id = ground_floor(&mut registry);
        let area = create_area(
            &mut registry,
            &MemoryStorage::new(),
            CreateAreaParameters {
                name: String::from("Hall"),
                icon: Some(String::from("mdi:door")),
                floor_id: Some(floor_id),
                ..CreateAreaParameters::default()
            },
        )
        .unwrap();

        let updated = update_area(
            &mut registry,
            &MemoryStorage::new(),
            UpdateAreaParameters {
                area_id: area.id.to_string(),
                icon: Some(None),
                floor_id: Some(None),
                ..UpdateAreaParameters::default()
            },
        )
        .unwrap();

        assert_eq!(updated.icon, None);
        assert_eq!(updated.floor_id, None);
    }

    #[test]
    fn test_update_with_unknown_floor_leaves_area_untouched() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "Hall").unwrap();

        let result = update_area(
            &mut registry,
            &MemoryStorage::new(),
            UpdateAreaParameters {
                area_id: area.id.to_string(),
                name: Some(String::from("Entrance")),
                floor_id: Some(Some(Uuid::new_v4().to_string())),
                ..UpdateAreaParameters::default()
            },
        );

        assert!(matches!(result, Err(UpdateAreaError::InvalidFloor(_))));
        assert_eq!(registry.get_area(area.id), Some(&area));
    }

    #[test]
    fn test_reapplying_full_field_set_is_noop() {
        let mut registry = Registry::default();
        let floor_id = ground_floor(&mut registry);
        let area = create_area(
            &mut registry,
            &MemoryStorage::new(),
            CreateAreaParameters {
                name: String::from("Hall"),
                icon: Some(String::from("mdi:door")),
                floor_id: Some(floor_id),
                labels: ["entry".to_string()].into(),
                aliases: ["Foyer".to_string()].into(),
            },
        )
        .unwrap();

        let json = serde_json::to_value(&area).unwrap();
        let round_tripped: Area = serde_json::from_value(json).unwrap();

        let updated = update_area(
            &mut registry,
            &MemoryStorage::new(),
            UpdateAreaParameters {
                area_id: round_tripped.id.to_string(),
                name: Some(round_tripped.name),
                icon: Some(round_tripped.icon),
                floor_id: Some(round_tripped.floor_id.map(|id| id.to_string())),
                labels: Some(round_tripped.labels),
                aliases: Some(round_tripped.aliases),
            },
        )
        .unwrap();

        assert_eq!(updated, area);
        assert_eq!(registry.get_area(area.id), Some(&area));
    }

    #[test]
    fn test_update_rolls_back_when_save_fails() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "Hall").unwrap();

        let result = update_area(
            &mut registry,
            &FailingStorage,
            UpdateAreaParameters {
                area_id: area.id.to_string(),
                name: Some(String::from("Entrance")),
                ..UpdateAreaParameters::default()
            },
        );

        assert!(matches!(result, Err(UpdateAreaError::UpdateFailed(_))));
        assert_eq!(registry.get_area(area.id), Some(&area));
    }

    #[test]
    fn test_delete_area_retires_id() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "Hall").unwrap();

        let deleted = delete_area(
            &mut registry,
            &MemoryStorage::new(),
            DeleteAreaParameters {
                area_id: area.id.to_string(),
            },
        )
        .unwrap();

        assert_eq!(deleted.id, area.id);
        assert_eq!(list_areas(&registry).count(), 0);
        assert!(registry.retired_ids.contains(&area.id));

        let again = delete_area(
            &mut registry,
            &MemoryStorage::new(),
            DeleteAreaParameters {
                area_id: area.id.to_string(),
            },
        );
        assert!(matches!(again, Err(DeleteAreaError::NotFound(_))));

        let recreated = create(&mut registry, "Hall").unwrap();
        assert_ne!(recreated.id, area.id);
    }

    #[test]
    fn test_delete_area_rolls_back_when_save_fails() {
        let mut registry = Registry::default();
        let area = create(&mut registry, "Hall").unwrap();

        let result = delete_area(
            &mut registry,
            &FailingStorage,
            DeleteAreaParameters {
                area_id: area.id.to_string(),
            },
        );

        assert!(matches!(result, Err(DeleteAreaError::DeleteFailed(_))));
        assert_eq!(registry.get_area(area.id), Some(&area));
        assert!(!registry.retired_ids.contains(&area.id));
    }
}
