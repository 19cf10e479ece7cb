//! Merge options.

use serde_json::Value;
use std::fmt;

use crate::environment::Environment;
use crate::stages::default_preprocess;
use crate::strategy::{Strategy, StrategyResolver};

/// Default template key inside an `_instances` node.
pub const DEFAULT_WILDCARD: &str = "*";

/// Default environment variable consulted for stage selection.
pub const DEFAULT_STAGE_ENV: &str = "APP_ENV";

/// What a preprocessor may consult while transforming a source.
pub struct PreprocessContext<'a> {
    /// Name of the environment variable matched against a stage's `env`
    pub stage_env: &'a str,
    pub environment: &'a dyn Environment,
}

/// Source-level transform applied to every source before it is merged.
pub type Preprocessor = fn(Value, &PreprocessContext<'_>) -> Value;

/// Options controlling a merge.
#[derive(Clone)]
pub struct MergeOptions {
    /// Key holding the template of an `_instances` node
    pub wildcard: String,

    /// Resolver for `_strategy` directive names
    pub strategy: StrategyResolver,

    /// Transform applied to each source before merging
    pub preprocess: Preprocessor,

    /// Erase deleted nodes from the output (otherwise they render as `null`)
    pub delete_null_values: bool,

    /// Environment variable matched against stage `env` values
    pub stage_env: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            wildcard: DEFAULT_WILDCARD.to_string(),
            strategy: Strategy::resolve,
            preprocess: default_preprocess,
            delete_null_values: true,
            stage_env: DEFAULT_STAGE_ENV.to_string(),
        }
    }
}

impl fmt::Debug for MergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeOptions")
            .field("wildcard", &self.wildcard)
            .field("delete_null_values", &self.delete_null_values)
            .field("stage_env", &self.stage_env)
            .finish_non_exhaustive()
    }
}

impl MergeOptions {
    pub fn with_wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.wildcard = wildcard.into();
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyResolver) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_preprocess(mut self, preprocess: Preprocessor) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn with_delete_null_values(mut self, delete: bool) -> Self {
        self.delete_null_values = delete;
        self
    }

    pub fn with_stage_env(mut self, stage_env: impl Into<String>) -> Self {
        self.stage_env = stage_env.into();
        self
    }
}
