use std::collections::BTreeSet;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct Area {
    /// UUID of the area, never reused once retired
    pub id: Uuid,
    /// Display name, stored trimmed
    pub name: String,
    /// Icon identifier (e.g. "mdi:sofa")
    pub icon: Option<String>,
    /// Floor this area sits on
    pub floor_id: Option<Uuid>,
    /// Free-form labels
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Alternative names
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// Created at timestamp of the area
    pub created_at: Timestamp,
    /// Last time an update actually changed the area
    pub modified_at: Timestamp,
}

impl Area {
    /// True when both areas hold the same user-editable fields.
    pub fn same_content(&self, other: &Area) -> bool {
        self.name == other.name
            && self.icon == other.icon
            && self.floor_id == other.floor_id
            && self.labels == other.labels
            && self.aliases == other.aliases
    }
}
