//! Key-path access into configuration trees.

use crate::primitives::KeyPath;
use serde_json::{Map, Value};

/// Nested configuration value.
pub type ConfigTree = Value;

/// Returns the value at `path`, if every segment resolves through maps.
#[must_use]
pub fn get_path<'a>(tree: &'a ConfigTree, path: &KeyPath) -> Option<&'a ConfigTree> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| node.as_object()?.get(&**segment))
}

/// Returns true when `path` resolves to a value (including `null`).
#[must_use]
pub fn has_path(tree: &ConfigTree, path: &KeyPath) -> bool {
    get_path(tree, path).is_some()
}

/// Set the value at `path`, creating intermediate maps.
///
/// Intermediate nodes that are not maps are replaced by empty maps, as is the
/// root itself.
pub fn set_path(tree: &mut ConfigTree, path: &KeyPath, value: ConfigTree) {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return;
    };

    let mut node = tree;
    for segment in parents {
        let Some(map) = ensure_object(node) else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Some(map) = ensure_object(node) {
        map.insert(leaf.to_string(), value);
    }
}

/// Remove the value at `path`, returning it when present.
pub fn remove_path(tree: &mut ConfigTree, path: &KeyPath) -> Option<ConfigTree> {
    let (leaf, parents) = path.segments().split_last()?;
    let parent = parents
        .iter()
        .try_fold(tree, |node, segment| node.as_object_mut()?.get_mut(&**segment))?;
    parent.as_object_mut()?.remove(&**leaf)
}

fn ensure_object(node: &mut Value) -> Option<&mut Map<String, Value>> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::PrimitiveError;
    use serde_json::json;

    fn path(raw: &str) -> Result<KeyPath, PrimitiveError> {
        KeyPath::parse(raw)
    }

    #[test]
    fn get_path_walks_nested_maps() -> Result<(), PrimitiveError> {
        let tree = json!({"page": {"front": "/node", "403": null}});
        assert_eq!(get_path(&tree, &path("page.front")?), Some(&json!("/node")));
        assert_eq!(get_path(&tree, &path("page.403")?), Some(&Value::Null));
        assert!(get_path(&tree, &path("page.front.deep")?).is_none());
        assert!(get_path(&tree, &path("missing")?).is_none());
        Ok(())
    }

    #[test]
    fn set_path_creates_and_replaces_intermediates() -> Result<(), PrimitiveError> {
        let mut tree = json!({"a": 1});
        set_path(&mut tree, &path("a.b.c")?, json!(true));
        assert_eq!(tree, json!({"a": {"b": {"c": true}}}));

        let mut scalar = json!("root");
        set_path(&mut scalar, &path("x")?, json!(2));
        assert_eq!(scalar, json!({"x": 2}));
        Ok(())
    }

    #[test]
    fn remove_path_only_removes_leaf() -> Result<(), PrimitiveError> {
        let mut tree = json!({"page": {"front": "/node", "404": "/missing"}});
        let removed = remove_path(&mut tree, &path("page.front")?);
        assert_eq!(removed, Some(json!("/node")));
        assert_eq!(tree, json!({"page": {"404": "/missing"}}));
        assert!(remove_path(&mut tree, &path("page.front")?).is_none());
        assert!(remove_path(&mut tree, &path("nope.front")?).is_none());
        Ok(())
    }
}
