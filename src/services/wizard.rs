//! Placeholder payloads for the setup wizard endpoints.
//!
//! Changesets are not generated, applied or tracked yet; every call answers
//! with the empty state the panel expects.

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct WizardPreview {
    pub areas_to_create: Vec<Value>,
    pub helpers_to_create: Vec<Value>,
    pub dashboards_to_create: Vec<Value>,
    pub entities_to_assign: Vec<Value>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct WizardApplyResult {
    pub success: bool,
    pub changeset_id: String,
    pub applied_at: Option<jiff::Timestamp>,
    pub rollback_id: Option<String>,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct WizardStatus {
    pub is_running: bool,
    pub current_step: Option<String>,
    pub pending_changesets: Vec<Value>,
    pub applied_changesets: Vec<Value>,
}

/// The profile is accepted but not inspected.
pub fn preview(_profile: &serde_json::Map<String, Value>) -> WizardPreview {
    WizardPreview::default()
}

pub fn apply(changeset_id: String) -> WizardApplyResult {
    WizardApplyResult {
        success: true,
        changeset_id,
        applied_at: None,
        rollback_id: None,
    }
}

pub fn status() -> WizardStatus {
    WizardStatus::default()
}
