use std::{
    fs::{self, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde_json::{Value, to_string_pretty};
use uuid::Uuid;

use crate::{
    models::registry::{CURRENT_VERSION, Registry},
    storage::{Storage, StorageError},
};

const KEPT_BACKUPS: usize = 5;

/// Registry persisted as a single pretty-printed JSON document.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn create_backup(&self) -> Result<u64, StorageError> {
        let file_exists = fs::exists(&self.path).map_err(|e| StorageError::BackupFailed {
            path: self.path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(0);
        }

        let backups_dir = self.get_backup_dir();
        fs::create_dir_all(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir.clone(),
            source: e,
        })?;

        let backup_path = self.get_backup_path();
        let bytes = fs::copy(&self.path, &backup_path).map_err(|e| StorageError::BackupFailed {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %backup_path.display(), bytes, "registry backup written");
        Ok(bytes)
    }

    fn cleanup_old_backups(&self) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let cleanup_failed = |e| StorageError::CleanupFailed {
            dir: backup_dir.clone(),
            source: e,
        };

        if !fs::exists(&backup_dir).map_err(cleanup_failed)? {
            return Ok(());
        }

        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(cleanup_failed)?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        // Backup names end in a timestamp, so lexical order is age order.
        file_entries.sort();

        let excess = file_entries.len().saturating_sub(KEPT_BACKUPS);
        for file_path in file_entries.iter().take(excess) {
            fs::remove_file(file_path).map_err(cleanup_failed)?;
        }

        Ok(())
    }

    fn get_backup_dir(&self) -> PathBuf {
        let parent_path = self.path.parent().unwrap_or(Path::new("."));
        parent_path.join("backups")
    }

    fn get_backup_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("registry.json"));
        let timestamp = jiff::Timestamp::now().as_nanosecond();

        self.get_backup_dir().join(format!("{file_name}-{timestamp}"))
    }

    /// Replace the registry file with `temp_path` while holding the lock,
    /// rotating backups first.
    fn swap_in(&self, temp_path: &Path) -> Result<(), StorageError> {
        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        self.create_backup()?;
        self.cleanup_old_backups()?;

        rename(temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    fn parse_failed(&self, source: serde_json::Error) -> StorageError {
        StorageError::ParseFailed {
            path: self.path.clone(),
            source,
        }
    }
}

/// Version 1 documents predate the `version` field, so a missing field means 1.
fn detect_version(document: &Value) -> Option<u32> {
    match document.get("version") {
        None => Some(1),
        Some(v) => v.as_u64().and_then(|n| u32::try_from(n).ok()),
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Registry, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no registry file yet, starting empty");
                return Ok(Registry::default());
            }
            Err(e) => {
                return Err(StorageError::LoadFailed {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let mut document: Value =
            serde_json::from_str(&content).map_err(|e| self.parse_failed(e))?;

        let Some(file_version) = detect_version(&document) else {
            return Err(self.parse_failed(serde::de::Error::custom(
                "'version' must be a non-negative integer",
            )));
        };
        if file_version > CURRENT_VERSION {
            return Err(StorageError::FutureVersion(file_version));
        }

        if let Some(obj) = document.as_object_mut() {
            obj.insert("version".to_string(), Value::from(CURRENT_VERSION));
        }

        serde_json::from_value(document).map_err(|e| self.parse_failed(e))
    }

    fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        let json =
            to_string_pretty(registry).map_err(|e| StorageError::SerializeFailed { source: e })?;

        let temp_path = PathBuf::from(format!("{}.tmp.{}", self.path.display(), Uuid::new_v4()));
        let written = write(&temp_path, json)
            .map_err(|e| StorageError::SaveFailed {
                path: temp_path.clone(),
                source: e,
            })
            .and_then(|()| self.swap_in(&temp_path));

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %temp_path.display(), error = %cleanup, "could not remove temporary registry file");
            }
            return Err(e);
        }

        tracing::debug!(
            path = %self.path.display(),
            areas = registry.areas.len(),
            floors = registry.floors.len(),
            "registry saved"
        );
        Ok(())
    }
}
