use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{area::Area, floor::Floor};

/// Current schema version
pub const CURRENT_VERSION: u32 = 1;

/// In-memory catalog of areas and floors.
///
/// The registry does no validation on its own; the services in
/// `crate::services` are the only writers and keep its invariants.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Registry {
    pub version: u32,
    #[serde(default)]
    pub areas: HashMap<Uuid, Area>,
    #[serde(default)]
    pub floors: HashMap<Uuid, Floor>,
    /// Ids of deleted entities. Never handed out again.
    #[serde(default)]
    pub retired_ids: HashSet<Uuid>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            areas: HashMap::new(),
            floors: HashMap::new(),
            retired_ids: HashSet::new(),
        }
    }
}

impl Registry {
    /// Generate an id that no live or retired entity has ever held.
    pub fn fresh_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if !self.is_known_id(id) {
                return id;
            }
        }
    }

    pub fn is_known_id(&self, id: Uuid) -> bool {
        self.areas.contains_key(&id) || self.floors.contains_key(&id) || self.retired_ids.contains(&id)
    }

    /// Resolve a textual area id to a live area. Unparsable ids resolve to nothing.
    pub fn parse_area_id(&self, raw_id: &str) -> Option<Uuid> {
        Uuid::parse_str(raw_id)
            .ok()
            .filter(|id| self.areas.contains_key(id))
    }

    /// Resolve a textual floor id to a live floor.
    pub fn parse_floor_id(&self, raw_id: &str) -> Option<Uuid> {
        Uuid::parse_str(raw_id)
            .ok()
            .filter(|id| self.has_floor(*id))
    }

    pub fn get_areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.values()
    }

    pub fn get_area(&self, id: Uuid) -> Option<&Area> {
        self.areas.get(&id)
    }

    pub fn add_area(&mut self, area: Area) {
        self.areas.insert(area.id, area);
    }

    /// Remove an area and retire its id.
    pub fn remove_area(&mut self, id: Uuid) -> Option<Area> {
        let area = self.areas.remove(&id)?;
        self.retired_ids.insert(id);
        Some(area)
    }

    /// Put back an area removed by `remove_area`, un-retiring its id.
    pub fn restore_area(&mut self, area: Area) {
        self.retired_ids.remove(&area.id);
        self.areas.insert(area.id, area);
    }

    pub fn get_areas_on_floor(&self, floor_id: Uuid) -> impl Iterator<Item = &Area> {
        self.areas
            .values()
            .filter(move |a| a.floor_id == Some(floor_id))
    }

    pub fn get_floors(&self) -> impl Iterator<Item = &Floor> {
        self.floors.values()
    }

    pub fn get_floor(&self, floor_id: Uuid) -> Option<&Floor> {
        self.floors.get(&floor_id)
    }

    pub fn has_floor(&self, floor_id: Uuid) -> bool {
        self.floors.contains_key(&floor_id)
    }

    pub fn add_floor(&mut self, floor: Floor) {
        self.floors.insert(floor.floor_id, floor);
    }

    pub fn remove_floor(&mut self, floor_id: Uuid) -> Option<Floor> {
        let floor = self.floors.remove(&floor_id)?;
        self.retired_ids.insert(floor_id);
        Some(floor)
    }

    pub fn restore_floor(&mut self, floor: Floor) {
        self.retired_ids.remove(&floor.floor_id);
        self.floors.insert(floor.floor_id, floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_area_retires_id() {
        let mut registry = Registry::default();
        let id = registry.fresh_id();
        registry.add_area(Area {
            id,
            name: String::from("Den"),
            ..Area::default()
        });

        let removed = registry.remove_area(id).unwrap();

        assert!(registry.get_area(id).is_none());
        assert!(registry.retired_ids.contains(&id));
        assert!(registry.is_known_id(id));

        registry.restore_area(removed);
        assert!(registry.get_area(id).is_some());
        assert!(!registry.retired_ids.contains(&id));
    }

    #[test]
    fn test_parse_ids_only_resolve_live_entities() {
        let mut registry = Registry::default();
        let floor_id = registry.fresh_id();
        registry.add_floor(Floor {
            floor_id,
            name: String::from("Ground"),
            ..Floor::default()
        });

        assert_eq!(registry.parse_floor_id(&floor_id.to_string()), Some(floor_id));
        assert_eq!(registry.parse_floor_id("ground"), None);
        assert_eq!(registry.parse_floor_id(&Uuid::new_v4().to_string()), None);
        assert_eq!(registry.parse_area_id(&floor_id.to_string()), None);

        registry.remove_floor(floor_id);
        assert_eq!(registry.parse_floor_id(&floor_id.to_string()), None);
    }

    #[test]
    fn test_areas_on_floor() {
        let mut registry = Registry::default();
        let floor_id = registry.fresh_id();
        registry.add_floor(Floor {
            floor_id,
            name: String::from("Ground"),
            ..Floor::default()
        });
        for name in ["Hall", "Kitchen"] {
            let id = registry.fresh_id();
            registry.add_area(Area {
                id,
                name: name.to_string(),
                floor_id: Some(floor_id),
                ..Area::default()
            });
        }
        let id = registry.fresh_id();
        registry.add_area(Area {
            id,
            name: String::from("Attic"),
            ..Area::default()
        });

        assert_eq!(registry.get_areas_on_floor(floor_id).count(), 2);
        assert_eq!(registry.get_areas().count(), 3);
    }
}
