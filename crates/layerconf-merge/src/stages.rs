//! Stage preprocessing.
//!
//! A stages source lists conditional fragments in order:
//!
//! ```json
//! {
//!   "_preprocess": "stages",
//!   "prod": {"hosts": ["web-01"], "env": "production", "config": {}},
//!   "dev": {"hosts": ["laptop"], "env": "development", "config": {}}
//! }
//! ```
//!
//! Fragments are folded in declaration order up to and including the first
//! one whose `env` equals the stage variable or whose `hosts` contain the
//! current hostname. Fragments after the match are ignored.

use serde::Serialize;
use serde_json::{Map, Value};
use std::mem;
use tracing::debug;

use crate::options::PreprocessContext;
use crate::{PREPROCESS_KEY, STAGES_PREPROCESSOR};

/// One conditional fragment of a stages source.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFragment {
    pub name: String,
    pub hosts: Vec<String>,
    pub env: Option<String>,
    pub config: Option<Value>,
}

impl StageFragment {
    /// Read a fragment leniently: malformed fields are treated as absent.
    pub fn from_entry(name: &str, value: &Value) -> Self {
        let hosts = value
            .get("hosts")
            .and_then(Value::as_array)
            .map(|hosts| {
                hosts
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            hosts,
            env: value.get("env").and_then(Value::as_str).map(str::to_string),
            config: value.get("config").cloned(),
        }
    }

    /// Whether this fragment ends the fold for the given host facts.
    pub fn matches(&self, hostname: Option<&str>, env_value: Option<&str>) -> bool {
        let env_match = matches!((self.env.as_deref(), env_value), (Some(a), Some(b)) if a == b);
        let host_match = hostname.is_some_and(|host| self.hosts.iter().any(|h| h == host));
        env_match || host_match
    }
}

/// Result of collapsing a stages source.
#[derive(Debug, Clone, Serialize)]
pub struct StageSelection {
    /// Fragment names folded into `config`, in order
    pub applied: Vec<String>,

    /// Fragment that stopped the fold, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,

    /// The collapsed fragment
    pub config: Value,
}

/// Collapse the fragments of a stages source (without its `_preprocess` key).
///
/// The hostname and the stage variable are each read once.
pub fn select_stages(stages: Map<String, Value>, context: &PreprocessContext<'_>) -> StageSelection {
    let hostname = context.environment.hostname();
    let env_value = context.environment.var(context.stage_env);
    debug!(
        hostname = hostname.as_deref().unwrap_or("<unknown>"),
        stage_env = context.stage_env,
        value = env_value.as_deref().unwrap_or("<unset>"),
        "selecting stages"
    );

    let mut selection = StageSelection {
        applied: Vec::new(),
        matched: None,
        config: Value::Object(Map::new()),
    };

    for (name, entry) in &stages {
        let fragment = StageFragment::from_entry(name, entry);
        if let Some(config) = fragment.config.clone() {
            selection.config = deep_merge(mem::take(&mut selection.config), config);
        }
        selection.applied.push(fragment.name.clone());

        if fragment.matches(hostname.as_deref(), env_value.as_deref()) {
            debug!(stage = %fragment.name, "stage matched");
            selection.matched = Some(fragment.name);
            break;
        }
    }

    selection
}

/// Default preprocessor.
///
/// Strips a root `_preprocess` key and dispatches on its value: `"stages"`
/// collapses the source, anything else leaves it unchanged.
pub fn default_preprocess(source: Value, context: &PreprocessContext<'_>) -> Value {
    let Value::Object(mut map) = source else {
        return source;
    };

    match map.shift_remove(PREPROCESS_KEY) {
        Some(Value::String(kind)) if kind == STAGES_PREPROCESSOR => {
            select_stages(map, context).config
        }
        Some(other) => {
            debug!(preprocess = %other, "unknown preprocessor, source left unchanged");
            Value::Object(map)
        }
        None => Value::Object(map),
    }
}

/// Plain structural merge used between stage fragments.
///
/// Directives are not interpreted here; they survive into the real merge.
/// - Objects: deep-merge by key (recursive)
/// - Arrays: concatenate
/// - Scalars: override (overlay wins)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(mem::take(base_value), overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        (Value::Array(mut base_items), Value::Array(overlay_items)) => {
            base_items.extend(overlay_items);
            Value::Array(base_items)
        }

        (_, overlay) => overlay,
    }
}
