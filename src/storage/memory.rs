use std::cell::RefCell;

use crate::{
    models::registry::Registry,
    storage::{Storage, StorageError},
};

/// Keeps the last saved registry in memory. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage {
    snapshot: RefCell<Option<Registry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Registry, StorageError> {
        Ok(self.snapshot.borrow().clone().unwrap_or_default())
    }

    fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        *self.snapshot.borrow_mut() = Some(registry.clone());
        Ok(())
    }
}

/// Storage whose saves always fail, for exercising rollback paths.
#[cfg(test)]
pub struct FailingStorage;

#[cfg(test)]
impl Storage for FailingStorage {
    fn load(&self) -> Result<Registry, StorageError> {
        Ok(Registry::default())
    }

    fn save(&self, _registry: &Registry) -> Result<(), StorageError> {
        Err(StorageError::SaveFailed {
            path: std::path::PathBuf::from("/unwritable/registry.json"),
            source: std::io::Error::other("disk full"),
        })
    }
}
