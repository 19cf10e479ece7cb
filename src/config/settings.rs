//! Merge settings
//!
//! Layering: built-in defaults, then the settings file, then CLI flags.
//!
//! ```toml
//! [merge]
//! wildcard = "*"
//! delete_null_values = true
//! stage_env = "APP_ENV"
//! ```

use layerconf_merge::{MergeOptions, DEFAULT_STAGE_ENV, DEFAULT_WILDCARD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file looked up in the working directory
pub const SETTINGS_FILE: &str = "layerconf.toml";

/// Top-level settings document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSettings {
    pub merge: MergeSection,
}

/// The `[merge]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSection {
    /// Template key inside `_instances` nodes (default: "*")
    pub wildcard: String,

    /// Erase deleted nodes instead of rendering them as null (default: true)
    pub delete_null_values: bool,

    /// Environment variable matched against stage `env` (default: "APP_ENV")
    pub stage_env: String,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            wildcard: DEFAULT_WILDCARD.to_string(),
            delete_null_values: true,
            stage_env: DEFAULT_STAGE_ENV.to_string(),
        }
    }
}

/// CLI-level overrides, applied on top of the settings file
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub wildcard: Option<String>,
    pub stage_env: Option<String>,
    pub keep_null: bool,
}

impl MergeSettings {
    /// Parse settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_toml(&contents).map_err(|err| match err {
            SettingsError::Parse { source, .. } => SettingsError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        debug!(path = %path.display(), "loaded merge settings");
        Ok(settings)
    }

    /// Parse and validate settings text
    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(contents).map_err(|source| SettingsError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `explicit` if given, else `layerconf.toml` in `dir` if present,
    /// else built-in defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate: PathBuf = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply CLI overrides
    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Result<Self, SettingsError> {
        if let Some(wildcard) = &overrides.wildcard {
            self.merge.wildcard = wildcard.clone();
        }
        if let Some(stage_env) = &overrides.stage_env {
            self.merge.stage_env = stage_env.clone();
        }
        if overrides.keep_null {
            self.merge.delete_null_values = false;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.merge.wildcard.is_empty() {
            return Err(SettingsError::Invalid(
                "merge.wildcard must not be empty".to_string(),
            ));
        }
        if layerconf_merge::is_directive_key(&self.merge.wildcard) {
            return Err(SettingsError::Invalid(format!(
                "merge.wildcard must not be a directive key: {}",
                self.merge.wildcard
            )));
        }
        if self.merge.stage_env.is_empty() {
            return Err(SettingsError::Invalid(
                "merge.stage_env must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Core merge options for these settings
    pub fn to_options(&self) -> MergeOptions {
        MergeOptions::default()
            .with_wildcard(self.merge.wildcard.clone())
            .with_delete_null_values(self.merge.delete_null_values)
            .with_stage_env(self.merge.stage_env.clone())
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("settings parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),
}
