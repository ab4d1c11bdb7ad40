use std::path::PathBuf;

use thiserror::Error;

use crate::models::registry::Registry;

pub mod json;
pub mod memory;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not read the area registry at '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Area registry at '{path}' is not a valid registry document: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not write area registry changes to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not encode the area registry as JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not back up the area registry to '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not prune old area registry backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Area registry uses schema version {0}, newer than this build of roomwright understands. Upgrade roomwright to open it."
    )]
    FutureVersion(u32),
}

/// Persistence collaborator for the registry services.
///
/// Services call `save` after every successful mutation and roll the
/// in-memory change back when it fails.
pub trait Storage {
    fn load(&self) -> Result<Registry, StorageError>;
    fn save(&self, registry: &Registry) -> Result<(), StorageError>;
}
