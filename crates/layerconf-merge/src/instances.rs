//! Wildcard template expansion for `_instances` nodes.
//!
//! A node marked with `_instances` holds a template under the wildcard key.
//! Every sibling key is an instance that inherits from the template, and the
//! template keeps accumulating across layers: each layer's template is folded
//! into the existing template and into every existing instance, and instances
//! first introduced by a layer start from the accumulated template.

use std::mem;
use tracing::trace;

use crate::merge::Merger;
use crate::tree::{Table, Tree};
use crate::is_directive_key;

impl Merger {
    /// First phase of an instance merge.
    ///
    /// Returns the existing table with `incoming`'s template applied to every
    /// existing entry and with every instance new in `incoming` seeded. The
    /// caller then merges `incoming` key by key, skipping its wildcard.
    pub(crate) fn expand_instances(&self, existing: Option<Tree>, incoming: &Table) -> Table {
        let wildcard = self.options().wildcard.as_str();

        let mut table = match existing {
            Some(Tree::Object(table)) => table,
            _ => Table::new(),
        };
        table
            .entry(wildcard.to_string())
            .or_insert_with(Tree::empty_object);

        // Existing instances and the existing template inherit this layer's template
        if let Some(template) = incoming.get(wildcard) {
            for (key, value) in table.iter_mut() {
                if is_directive_key(key) {
                    continue;
                }
                let current = mem::take(value);
                *value = self.merge_node(Some(current), template.clone());
            }
        }

        // The accumulated template is fully resolved, so seeds are plain copies
        let seed = table
            .get(wildcard)
            .cloned()
            .unwrap_or_else(Tree::empty_object);
        for key in incoming.keys() {
            if is_directive_key(key) || table.contains_key(key) {
                continue;
            }
            trace!(instance = %key, "seeding instance from template");
            table.insert(key.clone(), seed.clone());
        }

        table
    }
}
