//! Directive-aware merge of configuration trees.
//!
//! Merge semantics without directives:
//! - Objects: deep-merge by key (recursive)
//! - Arrays: concatenate (existing ++ incoming)
//! - Scalars: override (incoming wins)
//!
//! An incoming object may carry a `_strategy` directive that changes the
//! behavior for that node, and either operand may carry `_instances`, which
//! expands the node's wildcard template into its siblings before merging.

use serde_json::Value;
use std::mem;
use tracing::debug;

use crate::environment::Environment;
use crate::options::{MergeOptions, PreprocessContext};
use crate::strategy::Strategy;
use crate::tree::{Table, Tree};
use crate::{INSTANCES_KEY, STRATEGY_KEY};

/// Folds configuration sources according to a set of [`MergeOptions`].
#[derive(Debug, Clone, Default)]
pub struct Merger {
    options: MergeOptions,
}

impl Merger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Preprocess, fold and sanitize `sources` (lowest precedence first).
    ///
    /// Returns `None` when a directive deleted the root itself and
    /// deleted values are being erased.
    pub fn merge_sources<I>(&self, sources: I, environment: &dyn Environment) -> Option<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        let merged = self.fold_all(sources, environment);
        self.sanitize(merged)
    }

    /// Fold `sources` onto an empty object without sanitizing the result.
    pub fn fold_all<I>(&self, sources: I, environment: &dyn Environment) -> Tree
    where
        I: IntoIterator<Item = Value>,
    {
        sources
            .into_iter()
            .fold(Tree::empty_object(), |accumulated, source| {
                self.fold(accumulated, source, environment)
            })
    }

    /// Preprocess one source and merge it onto the accumulated tree.
    pub fn fold(&self, accumulated: Tree, source: Value, environment: &dyn Environment) -> Tree {
        let source = self.preprocess(source, environment);
        self.merge(accumulated, Tree::from(source))
    }

    /// Run the configured preprocessor on a single source.
    pub fn preprocess(&self, source: Value, environment: &dyn Environment) -> Value {
        let context = PreprocessContext {
            stage_env: &self.options.stage_env,
            environment,
        };
        (self.options.preprocess)(source, &context)
    }

    /// Merge `incoming` onto `existing`.
    ///
    /// Directives are honored at every level, the root included.
    pub fn merge(&self, existing: Tree, incoming: Tree) -> Tree {
        self.merge_node(Some(existing), incoming)
    }

    /// `existing` is `None` when the key is absent on the existing side.
    pub(crate) fn merge_node(&self, existing: Option<Tree>, incoming: Tree) -> Tree {
        match incoming {
            Tree::Object(incoming) => self.merge_object(existing, incoming),
            Tree::Array(items) => match existing {
                Some(Tree::Array(mut current)) => {
                    current.extend(items);
                    Tree::Array(current)
                }
                _ => Tree::Array(items),
            },
            scalar => scalar,
        }
    }

    fn merge_object(&self, existing: Option<Tree>, mut incoming: Table) -> Tree {
        // Strip the directive before any child is visited
        let directive = incoming.shift_remove(STRATEGY_KEY);
        let strategy = (self.options.strategy)(directive.as_ref().and_then(Tree::as_str));
        if directive.is_some() {
            debug!(%strategy, "resolved merge directive");
        }

        match strategy {
            Strategy::Delete => Tree::Tombstone,
            Strategy::Ignore => existing.unwrap_or_else(Tree::empty_object),
            Strategy::Replace => self.combine(Some(Tree::empty_object()), incoming, true),
            Strategy::Concat => self.combine(existing, incoming, true),
            Strategy::NoConcat => self.combine(existing, incoming, false),
        }
    }

    /// Key-wise merge of `incoming` into `existing`.
    ///
    /// A non-object `existing` is discarded. Arrays directly under this node
    /// are concatenated when `concat_arrays` is set and replaced otherwise.
    fn combine(&self, existing: Option<Tree>, incoming: Table, concat_arrays: bool) -> Tree {
        let expand = existing.as_ref().is_some_and(declares_instances)
            || incoming.get(INSTANCES_KEY).is_some_and(Tree::is_truthy);

        let mut table = if expand {
            self.expand_instances(existing, &incoming)
        } else {
            match existing {
                Some(Tree::Object(table)) => table,
                _ => Table::new(),
            }
        };

        for (key, value) in incoming {
            // The incoming template was already folded in by the expander
            if expand && key == self.options.wildcard {
                continue;
            }

            match value {
                Tree::Object(_) => {
                    let current = table.get_mut(&key).map(mem::take);
                    let merged = self.merge_node(current, value);
                    table.insert(key, merged);
                }
                Tree::Array(items) if concat_arrays => match table.get_mut(&key) {
                    Some(Tree::Array(current)) => current.extend(items),
                    _ => {
                        table.insert(key, Tree::Array(items));
                    }
                },
                other => {
                    table.insert(key, other);
                }
            }
        }

        Tree::Object(table)
    }
}

/// Whether `tree` is an object carrying a truthy `_instances` marker.
pub(crate) fn declares_instances(tree: &Tree) -> bool {
    tree.get(INSTANCES_KEY).is_some_and(Tree::is_truthy)
}
