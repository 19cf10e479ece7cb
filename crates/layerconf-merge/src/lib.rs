//! Directive-driven deep merge of layered configuration trees.
//!
//! Sources are folded in order, lowest precedence first. Objects in a source
//! may carry directives that change how that node merges:
//!
//! - `_strategy`: `concat` (default), `noconcat`, `replace`, `ignore`, `delete`
//! - `_instances`: the node's wildcard child (`*` by default) is a template
//!   inherited by every sibling, including siblings added by later sources
//! - `_preprocess`: source-level transform, `stages` selects host or
//!   environment specific fragments
//!
//! The merged tree is sanitized once at the end, which removes deleted nodes
//! and every directive.
//!
//! ```
//! use layerconf_merge::{Merger, StaticEnvironment};
//! use serde_json::json;
//!
//! let base = json!({"servers": {"_instances": true, "*": {"port": 80}, "web": {}}});
//! let site = json!({"servers": {"web": {"name": "www"}}});
//!
//! let merged = Merger::default()
//!     .merge_sources(vec![base, site], &StaticEnvironment::new())
//!     .unwrap();
//! assert_eq!(merged, json!({"servers": {"web": {"port": 80, "name": "www"}}}));
//! ```

mod environment;
mod instances;
mod merge;
mod options;
mod sanitize;
mod stages;
mod strategy;
mod tree;

pub use environment::{Environment, StaticEnvironment};
pub use merge::Merger;
pub use options::{
    MergeOptions, PreprocessContext, Preprocessor, DEFAULT_STAGE_ENV, DEFAULT_WILDCARD,
};
pub use sanitize::sanitize;
pub use stages::{deep_merge, default_preprocess, select_stages, StageFragment, StageSelection};
pub use strategy::{Strategy, StrategyResolver};
pub use tree::{Table, Tree};

use serde_json::Value;

/// Directive selecting a node's merge strategy.
pub const STRATEGY_KEY: &str = "_strategy";

/// Marker enabling wildcard template expansion for a node's children.
pub const INSTANCES_KEY: &str = "_instances";

/// Directive selecting a source-level preprocessor.
pub const PREPROCESS_KEY: &str = "_preprocess";

/// `_preprocess` value selecting stage collapsing.
pub const STAGES_PREPROCESSOR: &str = "stages";

/// Whether `key` is reserved for merge directives.
pub fn is_directive_key(key: &str) -> bool {
    matches!(key, STRATEGY_KEY | INSTANCES_KEY | PREPROCESS_KEY)
}

/// Merge `sources` with the given options.
///
/// Shorthand for [`Merger::merge_sources`].
pub fn merge_sources<I>(sources: I, options: MergeOptions, environment: &dyn Environment) -> Option<Value>
where
    I: IntoIterator<Item = Value>,
{
    Merger::new(options).merge_sources(sources, environment)
}
