//! Accumulator tree with an explicit deletion sentinel.

use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Insertion-ordered mapping used for object nodes.
pub type Table = IndexMap<String, Tree>;

/// A configuration tree as it flows through the fold.
///
/// Mirrors the JSON value shapes and adds [`Tree::Tombstone`], the marker
/// left behind by a `delete` directive. `Null` is ordinary data and is never
/// confused with a tombstone.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tree {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Tree>),
    Object(Table),
    /// Node removed by a `delete` directive, erased during sanitization
    Tombstone,
}

impl Tree {
    /// An object node with no entries.
    pub fn empty_object() -> Self {
        Tree::Object(Table::new())
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Tree::Object(_))
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Tree::Tombstone)
    }

    pub fn as_object(&self) -> Option<&Table> {
        match self {
            Tree::Object(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a direct child of an object node.
    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.as_object().and_then(|table| table.get(key))
    }

    /// Truthiness as configuration authors expect it for marker keys:
    /// `false`, `0`, `""`, `null` and tombstones are false, everything else
    /// (including empty objects and arrays) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Tree::Null | Tree::Tombstone => false,
            Tree::Bool(b) => *b,
            Tree::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
            Tree::String(s) => !s.is_empty(),
            Tree::Array(_) | Tree::Object(_) => true,
        }
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(b),
            Value::Number(n) => Tree::Number(n),
            Value::String(s) => Tree::String(s),
            Value::Array(items) => Tree::Array(items.into_iter().map(Tree::from).collect()),
            Value::Object(map) => {
                Tree::Object(map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect())
            }
        }
    }
}
