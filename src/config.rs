//! Integration configuration: the single config entry created by the
//! setup flow, plus where the registry document lives.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::DOMAIN;

pub const DEFAULT_PROFILE_NAME: &str = "Default Profile";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("Failed to write configuration to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Already configured. Use `options` to change the profile")]
    AlreadyConfigured,

    #[error("Not configured yet. Run `setup` first")]
    NotConfigured,
}

/// Options chosen at setup time and editable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    #[serde(default = "default_profile_name")]
    pub profile_name: String,
    #[serde(default)]
    pub enable_advanced: bool,
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE_NAME.into()
}

impl Default for ConfigEntry {
    fn default() -> Self {
        Self {
            profile_name: default_profile_name(),
            enable_advanced: false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `registry.json`. Platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    /// Present once setup has run.
    pub entry: Option<ConfigEntry>,
}

impl Config {
    /// Config flow: create the entry. Only one entry may exist.
    pub fn setup(
        &mut self,
        profile_name: Option<String>,
        enable_advanced: bool,
    ) -> Result<&ConfigEntry, ConfigError> {
        if self.entry.is_some() {
            return Err(ConfigError::AlreadyConfigured);
        }
        let entry = self.entry.insert(ConfigEntry {
            profile_name: profile_name.unwrap_or_else(default_profile_name),
            enable_advanced,
        });
        Ok(entry)
    }

    /// Options flow: change fields of the existing entry, keeping the rest.
    pub fn update_options(
        &mut self,
        profile_name: Option<String>,
        enable_advanced: Option<bool>,
    ) -> Result<&ConfigEntry, ConfigError> {
        let entry = self.entry.as_mut().ok_or(ConfigError::NotConfigured)?;
        if let Some(profile_name) = profile_name {
            entry.profile_name = profile_name;
        }
        if let Some(enable_advanced) = enable_advanced {
            entry.enable_advanced = enable_advanced;
        }
        Ok(entry)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(DOMAIN)
            })
            .join("registry.json")
    }
}

/// Resolve the config file path via platform conventions.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DOMAIN)
        .join("config.toml")
}

/// Load the config from defaults, the TOML file, then `ROOMWRIGHT_*` env vars.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ROOMWRIGHT_").split("__"))
        .extract()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let write_failed = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(write_failed)?;

    tracing::debug!(path = %path.display(), "configuration saved");
    Ok(())
}
