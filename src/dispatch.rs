//! Request dispatcher: decodes tagged JSON requests into registry
//! operations and encodes their outcome as a result or error response.

use std::{collections::BTreeSet, fmt::Display};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    models::registry::Registry,
    services::{
        ErrorCode,
        areas::{
            CreateAreaParameters, DeleteAreaParameters, UpdateAreaParameters, create_area,
            delete_area, list_areas, update_area,
        },
        floors::{
            CreateFloorParameters, DeleteFloorParameters, UpdateFloorParameters, create_floor,
            delete_floor, list_floors, update_floor,
        },
        wizard,
    },
    storage::Storage,
};

pub const DOMAIN: &str = "roomwright";

/// Distinguishes an omitted field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "roomwright/areas/list")]
    ListAreas {},

    #[serde(rename = "roomwright/areas/create")]
    CreateArea {
        name: String,
        #[serde(default)]
        icon: Option<String>,
        #[serde(default)]
        floor_id: Option<String>,
        #[serde(default)]
        labels: Option<BTreeSet<String>>,
        #[serde(default)]
        aliases: Option<BTreeSet<String>>,
    },

    #[serde(rename = "roomwright/areas/update")]
    UpdateArea {
        area_id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, deserialize_with = "nullable")]
        icon: Option<Option<String>>,
        #[serde(default, deserialize_with = "nullable")]
        floor_id: Option<Option<String>>,
        #[serde(default)]
        labels: Option<BTreeSet<String>>,
        #[serde(default)]
        aliases: Option<BTreeSet<String>>,
    },

    #[serde(rename = "roomwright/areas/delete")]
    DeleteArea { area_id: String },

    #[serde(rename = "roomwright/floors/list")]
    ListFloors {},

    #[serde(rename = "roomwright/floors/create")]
    CreateFloor {
        name: String,
        #[serde(default)]
        icon: Option<String>,
        #[serde(default)]
        level: Option<i32>,
        #[serde(default)]
        aliases: Option<BTreeSet<String>>,
    },

    #[serde(rename = "roomwright/floors/update")]
    UpdateFloor {
        floor_id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, deserialize_with = "nullable")]
        icon: Option<Option<String>>,
        #[serde(default, deserialize_with = "nullable")]
        level: Option<Option<i32>>,
        #[serde(default)]
        aliases: Option<BTreeSet<String>>,
    },

    #[serde(rename = "roomwright/floors/delete")]
    DeleteFloor { floor_id: String },

    #[serde(rename = "roomwright/wizard/preview")]
    WizardPreview { profile: Map<String, Value> },

    #[serde(rename = "roomwright/wizard/apply")]
    WizardApply { changeset_id: String },

    #[serde(rename = "roomwright/wizard/status")]
    WizardStatus {},

    /// Any `type` not named above.
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn from_service<E: ErrorCode + Display>(error: &E) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn result(id: Option<u64>, result: Value) -> Self {
        Self {
            id,
            kind: "result",
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<u64>, error: ErrorBody) -> Self {
        Self {
            id,
            kind: "result",
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

fn unknown_command(kind: &str) -> ErrorBody {
    ErrorBody::new("unknown_command", format!("Unknown command '{kind}'"))
}

/// Routes requests to the registry services.
///
/// Owns nothing: the registry and its storage are borrowed from whoever
/// hosts the session, and requests are handled strictly one at a time.
pub struct Dispatcher<'a, S: Storage> {
    registry: &'a mut Registry,
    storage: &'a S,
}

impl<'a, S: Storage> Dispatcher<'a, S> {
    pub fn new(registry: &'a mut Registry, storage: &'a S) -> Self {
        Self { registry, storage }
    }

    /// Handle one raw JSON request line.
    pub fn handle_line(&mut self, line: &str) -> Response {
        match serde_json::from_str::<Value>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::warn!(error = %e, "request is not valid JSON");
                Response::error(None, ErrorBody::new("invalid_format", e.to_string()))
            }
        }
    }

    pub fn handle(&mut self, request: Value) -> Response {
        let id = request.get("id").and_then(Value::as_u64);
        let Some(kind) = request.get("type").and_then(Value::as_str) else {
            return Self::reject(id, ErrorBody::new("invalid_format", "Missing 'type' field"));
        };

        let decoded = Command::deserialize(&request);
        if matches!(decoded, Ok(Command::Unknown)) {
            return Self::reject(id, unknown_command(kind));
        }
        if id.is_none() {
            return Self::reject(
                None,
                ErrorBody::new("invalid_format", "Missing or invalid 'id' field"),
            );
        }

        tracing::debug!(id, kind, "handling request");

        let command = match decoded {
            Ok(command) => command,
            Err(e) => return Self::reject(id, ErrorBody::new("invalid_format", e.to_string())),
        };

        match self.execute(command) {
            Ok(result) => Response::result(id, result),
            Err(error) => Self::reject(id, error),
        }
    }

    fn reject(id: Option<u64>, error: ErrorBody) -> Response {
        tracing::warn!(id, code = %error.code, message = %error.message, "request failed");
        Response::error(id, error)
    }

    pub fn execute(&mut self, command: Command) -> Result<Value, ErrorBody> {
        let registry = &mut *self.registry;
        let storage = self.storage;

        let result = match command {
            Command::ListAreas {} => {
                json!({ "areas": list_areas(registry).collect::<Vec<_>>() })
            }
            Command::CreateArea {
                name,
                icon,
                floor_id,
                labels,
                aliases,
            } => {
                let parameters = CreateAreaParameters {
                    name,
                    icon,
                    floor_id,
                    labels: labels.unwrap_or_default(),
                    aliases: aliases.unwrap_or_default(),
                };
                let area = create_area(registry, storage, parameters)
                    .map_err(|e| ErrorBody::from_service(&e))?;
                json!({ "area": area })
            }
            Command::UpdateArea {
                area_id,
                name,
                icon,
                floor_id,
                labels,
                aliases,
            } => {
                let parameters = UpdateAreaParameters {
                    area_id,
                    name,
                    icon,
                    floor_id,
                    labels,
                    aliases,
                };
                let area = update_area(registry, storage, parameters)
                    .map_err(|e| ErrorBody::from_service(&e))?;
                json!({ "area": area })
            }
            Command::DeleteArea { area_id } => {
                let area = delete_area(registry, storage, DeleteAreaParameters { area_id })
                    .map_err(|e| ErrorBody::from_service(&e))?;
                json!({ "success": true, "area_id": area.id })
            }
            Command::ListFloors {} => {
                json!({ "floors": list_floors(registry).collect::<Vec<_>>() })
            }
            Command::CreateFloor {
                name,
                icon,
                level,
                aliases,
            } => {
                let parameters = CreateFloorParameters {
                    name,
                    icon,
                    level,
                    aliases: aliases.unwrap_or_default(),
                };
                let floor = create_floor(registry, storage, parameters)
                    .map_err(|e| ErrorBody::from_service(&e))?;
                json!({ "floor": floor })
            }
            Command::UpdateFloor {
                floor_id,
                name,
                icon,
                level,
                aliases,
            } => {
                let parameters = UpdateFloorParameters {
                    floor_id,
                    name,
                    icon,
                    level,
                    aliases,
                };
                let floor = update_floor(registry, storage, parameters)
                    .map_err(|e| ErrorBody::from_service(&e))?;
                json!({ "floor": floor })
            }
            Command::DeleteFloor { floor_id } => {
                let floor = delete_floor(registry, storage, DeleteFloorParameters { floor_id })
                    .map_err(|e| ErrorBody::from_service(&e))?;
                json!({ "success": true, "floor_id": floor.floor_id })
            }
            Command::WizardPreview { profile } => {
                json!({ "preview": wizard::preview(&profile) })
            }
            Command::WizardApply { changeset_id } => json!(wizard::apply(changeset_id)),
            Command::WizardStatus {} => json!(wizard::status()),
            Command::Unknown => return Err(ErrorBody::new("unknown_command", "Unknown command")),
        };

        Ok(result)
    }
}
