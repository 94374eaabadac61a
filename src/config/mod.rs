//! Configuration record of a filesystem instance
//!
//! Stored as `tagfs.toml` in the instance root. Holds the three namespace
//! names and the id allocation counter. A missing file is replaced by the
//! defaults, so deleting it resets the names but never lets the store hand
//! out an id that is still in use (see `FileStore::allocate`).

use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::FileId;
use crate::query::is_tag_char;
use crate::vpath::NamespaceNames;

/// File name of the configuration record inside an instance root
pub const CONFIG_FILE: &str = "tagfs.toml";

fn default_tags_namespace() -> String {
    "tags".to_string()
}

fn default_files_namespace() -> String {
    "files".to_string()
}

fn default_action_namespace() -> String {
    "query".to_string()
}

/// Instance configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FsConfig {
    /// Top-level directory for tag administration
    #[serde(default = "default_tags_namespace")]
    pub tags_namespace: String,

    /// Top-level directory exposing raw storage
    #[serde(default = "default_files_namespace")]
    pub files_namespace: String,

    /// Top-level directory for queries
    #[serde(default = "default_action_namespace")]
    pub action_namespace: String,

    /// Next file id to hand out
    #[serde(default)]
    pub next_id: FileId,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            tags_namespace: default_tags_namespace(),
            files_namespace: default_files_namespace(),
            action_namespace: default_action_namespace(),
            next_id: 0,
        }
    }
}

impl FsConfig {
    /// Path of the configuration file for the instance at `root`
    #[must_use]
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }

    /// Load configuration from `root`, creating the default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, validated or created.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = Self::config_path(root);

        if !config_path.exists() {
            tracing::info!(path = %config_path.display(), "No configuration found, using defaults");
            let default_config = Self::default();
            default_config.save(root)?;
            return Ok(default_config);
        }

        let settings = Config::builder()
            .add_source(File::from(config_path).format(FileFormat::Toml))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `root`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the directory cannot be created, the configuration
    /// cannot be serialized to TOML, or the file cannot be written.
    pub fn save(&self, root: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(root)
            .map_err(|e| ConfigError::Message(format!("Failed to create instance directory: {e}")))?;

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        // Replace the file in one step so a crash never leaves it half written
        let path = Self::config_path(root);
        let staging = path.with_extension("toml.tmp");
        fs::write(&staging, toml_string)
            .and_then(|()| fs::rename(&staging, &path))
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Namespace names used by the path resolver
    #[must_use]
    pub fn namespaces(&self) -> NamespaceNames<'_> {
        NamespaceNames {
            tags: &self.tags_namespace,
            files: &self.files_namespace,
            query: &self.action_namespace,
        }
    }

    /// Check that namespace names are usable path segments and distinct
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the first offending name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("tags_namespace", &self.tags_namespace),
            ("files_namespace", &self.files_namespace),
            ("action_namespace", &self.action_namespace),
        ];

        for (field, name) in names {
            if name.is_empty() || !name.chars().all(is_tag_char) {
                return Err(ConfigError::Message(format!(
                    "{field} must be a non-empty name of letters, digits or '_', got '{name}'"
                )));
            }
        }

        for (i, (field, name)) in names.iter().enumerate() {
            if let Some((other, _)) = names[i + 1..].iter().find(|(_, n)| n == name) {
                return Err(ConfigError::Message(format!(
                    "{field} and {other} must differ, both are '{name}'"
                )));
            }
        }

        Ok(())
    }
}

/// Default instance root: `<data_local_dir>/tagfs`
///
/// # Errors
///
/// Returns `ConfigError` if the system data directory cannot be determined.
pub fn default_root() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| ConfigError::Message("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("tagfs"))
}
