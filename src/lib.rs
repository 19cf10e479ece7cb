//! layerconf - layered configuration merging
//!
//! Loads JSON, TOML and YAML sources from disk, folds them with the
//! directive-aware merge from `layerconf-merge`, and reports the result
//! together with its provenance.

pub mod config;
pub mod environment;

pub use config::{ConfigError, ConfigSource, EffectiveConfig, MergeSettings};
pub use environment::SystemEnvironment;
pub use layerconf_merge as merge;
