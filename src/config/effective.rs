//! Effective configuration with full provenance
//!
//! The effective config captures the merged configuration plus the sources
//! that produced it and the host facts that drove stage selection.

use chrono::{DateTime, Utc};
use layerconf_merge::{Environment, Merger};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use super::settings::{MergeSection, MergeSettings, SettingsError, SettingsOverrides};
use super::source::{ConfigSource, SourceError};

/// Host facts consulted by stage selection
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageContext {
    /// Hostname matched against stage `hosts`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Variable matched against stage `env`
    pub stage_env: String,

    /// Value of `stage_env` at build time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_value: Option<String>,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration (`null` when the root was deleted)
    pub config: Value,

    /// True when a `delete` directive removed the root itself
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub root_deleted: bool,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Merge settings in effect
    pub settings: MergeSection,

    /// Host facts used for stage selection
    pub stage: StageContext,
}

impl EffectiveConfig {
    /// Load, merge and sanitize the sources at `paths` (lowest precedence first)
    pub fn build<P: AsRef<Path>>(
        paths: &[P],
        settings: &MergeSettings,
        environment: &dyn Environment,
    ) -> Result<Self, ConfigError> {
        let mut sources = Vec::with_capacity(paths.len());
        let mut values = Vec::with_capacity(paths.len());
        for path in paths {
            let (source, value) = ConfigSource::load(path.as_ref())?;
            sources.push(source);
            values.push(value);
        }

        Ok(Self::from_sources(sources, values, settings, environment))
    }

    /// Discover settings (see [`MergeSettings::discover`]), apply `overrides`,
    /// then [`build`](Self::build). Returns the settings in effect as well.
    pub fn resolve<P: AsRef<Path>>(
        paths: &[P],
        settings_path: Option<&Path>,
        dir: &Path,
        overrides: &SettingsOverrides,
        environment: &dyn Environment,
    ) -> Result<Self, ConfigError> {
        let settings = MergeSettings::discover(settings_path, dir)?.with_overrides(overrides)?;
        Self::build(paths, &settings, environment)
    }

    /// Merge already-loaded sources
    pub fn from_sources(
        sources: Vec<ConfigSource>,
        values: Vec<Value>,
        settings: &MergeSettings,
        environment: &dyn Environment,
    ) -> Self {
        let stage_env = settings.merge.stage_env.clone();
        let stage = StageContext {
            hostname: environment.hostname(),
            stage_value: environment.var(&stage_env),
            stage_env,
        };

        let merger = Merger::new(settings.to_options());
        let merged = merger.merge_sources(values, environment);
        let root_deleted = merged.is_none();
        debug!(sources = sources.len(), root_deleted, "merged sources");

        Self {
            created_at: Utc::now(),
            config: merged.unwrap_or(Value::Null),
            root_deleted,
            sources,
            settings: settings.merge.clone(),
            stage,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated, numeric segments index arrays)
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.config, path)
    }

    /// Get a config value as u64
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Get a config value as bool
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }
}

/// Resolve a dotted path inside `value`. The empty path is the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            other => other.get(part)?,
        };
    }
    Some(current)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
