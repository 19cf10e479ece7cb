//! Configuration sources, merge settings and the effective config
//!
//! Layering for one `merge` run:
//! 1. Merge settings: built-in defaults, `layerconf.toml`, CLI flags
//! 2. Sources: JSON, TOML or YAML files, lowest precedence first
//! 3. Effective config: merged value plus provenance

mod effective;
mod settings;
mod source;

pub use effective::{lookup, ConfigError, EffectiveConfig, StageContext};
pub use settings::{MergeSection, MergeSettings, SettingsError, SettingsOverrides, SETTINGS_FILE};
pub use source::{parse, sha256_hex, toml_to_json, ConfigSource, SourceError, SourceFormat};
