use std::collections::BTreeSet;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct Floor {
    pub floor_id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    /// Vertical ordering hint, 0 is usually the ground floor
    pub level: Option<i32>,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Floor {
    pub fn same_content(&self, other: &Floor) -> bool {
        self.name == other.name
            && self.icon == other.icon
            && self.level == other.level
            && self.aliases == other.aliases
    }
}
