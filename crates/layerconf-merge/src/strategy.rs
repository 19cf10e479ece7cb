//! Merge strategy directives.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Behavior selected by a node's `_strategy` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Deep merge; arrays are concatenated (default).
    #[default]
    Concat,
    /// Deep merge; array children are replaced by the incoming array.
    #[serde(rename = "noconcat")]
    NoConcat,
    /// Drop the existing value and keep only the incoming one.
    Replace,
    /// Drop the incoming value and keep the existing one.
    Ignore,
    /// Remove the node.
    Delete,
}

/// Maps an optional directive name to a strategy.
///
/// The built-in resolver is [`Strategy::resolve`]; callers may install their
/// own through `MergeOptions`.
pub type StrategyResolver = fn(Option<&str>) -> Strategy;

impl Strategy {
    /// Parse a directive name. Returns `None` for unrecognized names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "concat" => Some(Self::Concat),
            "noconcat" => Some(Self::NoConcat),
            "replace" => Some(Self::Replace),
            "ignore" => Some(Self::Ignore),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Built-in resolver: absent and unknown names fall back to `Concat`.
    pub fn resolve(name: Option<&str>) -> Self {
        match name {
            None => Self::Concat,
            Some(name) => Self::parse(name).unwrap_or_else(|| {
                debug!(strategy = name, "unknown merge strategy, using concat");
                Self::Concat
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concat => "concat",
            Self::NoConcat => "noconcat",
            Self::Replace => "replace",
            Self::Ignore => "ignore",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(Strategy::parse("concat"), Some(Strategy::Concat));
        assert_eq!(Strategy::parse("noconcat"), Some(Strategy::NoConcat));
        assert_eq!(Strategy::parse("replace"), Some(Strategy::Replace));
        assert_eq!(Strategy::parse("ignore"), Some(Strategy::Ignore));
        assert_eq!(Strategy::parse("delete"), Some(Strategy::Delete));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Strategy::parse("Replace"), None);
        assert_eq!(Strategy::parse("no-concat"), None);
    }

    #[test]
    fn test_resolve_defaults_to_concat() {
        assert_eq!(Strategy::resolve(None), Strategy::Concat);
        assert_eq!(Strategy::resolve(Some("bogus")), Strategy::Concat);
        assert_eq!(Strategy::resolve(Some("")), Strategy::Concat);
        assert_eq!(Strategy::resolve(Some("delete")), Strategy::Delete);
    }

    #[test]
    fn test_display_matches_directive_name() {
        for strategy in [
            Strategy::Concat,
            Strategy::NoConcat,
            Strategy::Replace,
            Strategy::Ignore,
            Strategy::Delete,
        ] {
            assert_eq!(Strategy::parse(&strategy.to_string()), Some(strategy));
        }
    }

    #[test]
    fn test_serde_names() {
        let value = serde_json::to_value(Strategy::NoConcat).unwrap();
        assert_eq!(value, "noconcat");
        let parsed: Strategy = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(parsed, Strategy::Ignore);
    }
}
