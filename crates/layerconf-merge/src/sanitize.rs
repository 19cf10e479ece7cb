//! Final cleanup of a merged tree.

use serde_json::{Map, Value};

use crate::merge::Merger;
use crate::options::MergeOptions;
use crate::tree::Tree;
use crate::{INSTANCES_KEY, PREPROCESS_KEY, STRATEGY_KEY};

impl Merger {
    /// Convert a merged tree into plain output. See [`sanitize`].
    pub fn sanitize(&self, tree: Tree) -> Option<Value> {
        sanitize(tree, self.options())
    }
}

/// Strip merge scaffolding from a merged tree.
///
/// - Tombstones are erased when `delete_null_values` is set, otherwise they
///   become `null`. Literal `null` values are kept either way.
/// - `_instances` markers are removed, together with the wildcard template
///   of every node whose marker was truthy.
/// - Leftover `_strategy` and `_preprocess` keys are removed.
///
/// Arrays are traversed too; erased array elements are dropped. Returns
/// `None` only when the root itself was erased.
pub fn sanitize(tree: Tree, options: &MergeOptions) -> Option<Value> {
    match tree {
        Tree::Tombstone if options.delete_null_values => None,
        Tree::Tombstone | Tree::Null => Some(Value::Null),
        Tree::Bool(b) => Some(Value::Bool(b)),
        Tree::Number(n) => Some(Value::Number(n)),
        Tree::String(s) => Some(Value::String(s)),
        Tree::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .filter_map(|item| sanitize(item, options))
                .collect(),
        )),
        Tree::Object(mut table) => {
            let instanced = table
                .shift_remove(INSTANCES_KEY)
                .is_some_and(|marker| marker.is_truthy());
            if instanced {
                table.shift_remove(&options.wildcard);
            }
            table.shift_remove(STRATEGY_KEY);
            table.shift_remove(PREPROCESS_KEY);

            let map: Map<String, Value> = table
                .into_iter()
                .filter_map(|(key, value)| sanitize(value, options).map(|value| (key, value)))
                .collect();
            Some(Value::Object(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clean(value: Value) -> Option<Value> {
        sanitize(Tree::from(value), &MergeOptions::default())
    }

    fn tombstoned() -> Tree {
        let mut table = crate::tree::Table::new();
        table.insert("gone".to_string(), Tree::Tombstone);
        table.insert("kept".to_string(), Tree::Null);
        table.insert(
            "list".to_string(),
            Tree::Array(vec![Tree::from(json!(1)), Tree::Tombstone, Tree::from(json!(2))]),
        );
        Tree::Object(table)
    }

    #[test]
    fn test_tombstones_are_erased_by_default() {
        let result = sanitize(tombstoned(), &MergeOptions::default()).unwrap();
        assert_eq!(result, json!({"kept": null, "list": [1, 2]}));
    }

    #[test]
    fn test_tombstones_render_as_null_when_kept() {
        let options = MergeOptions::default().with_delete_null_values(false);
        let result = sanitize(tombstoned(), &options).unwrap();
        assert_eq!(result, json!({"gone": null, "kept": null, "list": [1, null, 2]}));
    }

    #[test]
    fn test_root_tombstone() {
        assert_eq!(sanitize(Tree::Tombstone, &MergeOptions::default()), None);
        let options = MergeOptions::default().with_delete_null_values(false);
        assert_eq!(sanitize(Tree::Tombstone, &options), Some(Value::Null));
    }

    #[test]
    fn test_strips_markers_at_every_depth() {
        let result = clean(json!({
            "_strategy": "replace",
            "outer": {
                "_instances": true,
                "*": {"a": 1},
                "one": {"_strategy": "noconcat", "a": 1}
            },
            "list": [{"_instances": "yes", "*": {}, "item": {"_strategy": "delete"}}]
        }))
        .unwrap();

        assert_eq!(
            result,
            json!({
                "outer": {"one": {"a": 1}},
                "list": [{"item": {}}]
            })
        );
    }

    #[test]
    fn test_strips_nested_preprocess_directive() {
        let result = clean(json!({
            "a": {"_preprocess": "stages", "x": 1},
            "list": [{"_preprocess": "zip", "y": 2}]
        }))
        .unwrap();

        assert_eq!(result, json!({"a": {"x": 1}, "list": [{"y": 2}]}));
    }

    #[test]
    fn test_preprocess_from_stage_fragment_is_stripped() {
        use crate::environment::StaticEnvironment;

        let source = json!({
            "_preprocess": "stages",
            "only": {"config": {"_preprocess": "x", "k": 1}}
        });
        let result = Merger::default()
            .merge_sources(vec![source], &StaticEnvironment::new())
            .unwrap();

        assert_eq!(result, json!({"k": 1}));
    }

    #[test]
    fn test_wildcard_kept_without_truthy_marker() {
        let result = clean(json!({"globs": {"*": "allow", "_instances": 0}})).unwrap();
        assert_eq!(result, json!({"globs": {"*": "allow"}}));

        let result = clean(json!({"globs": {"*": "allow"}})).unwrap();
        assert_eq!(result, json!({"globs": {"*": "allow"}}));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let input = json!({
            "a": null,
            "b": {"_instances": true, "*": {"x": 1}, "i": {"x": [1, {"_strategy": "ignore"}]}},
            "c": [[{"_strategy": "concat", "d": 1}]]
        });
        let once = clean(input).unwrap();
        let twice = clean(once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}
