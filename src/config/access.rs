//! Dot-path access into configuration trees.
//!
//! Paths are `.`-separated segments; blank segments are ignored and the
//! empty path addresses the whole tree. Reads match keys case-insensitively,
//! writes store keys exactly as given.

use serde_json::{Map, Value};

/// Split a dot path into its non-blank segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.trim().is_empty())
}

/// Look up a key in a mapping, ignoring case.
fn get_prop<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.to_lowercase() == key.to_lowercase())
            .map(|(_, v)| v)
    })
}

/// Resolve `path` against `tree`.
///
/// Returns `None` as soon as a segment cannot be resolved, either because
/// the current node is not a mapping or because no key matches.
pub fn get_value<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(tree, |node, key| match node {
        Value::Object(map) => get_prop(map, key),
        _ => None,
    })
}

/// Return a copy of `base` with `value` written at `path`.
///
/// An empty path returns `value` itself. Missing intermediate mappings are
/// created, and a scalar or list standing in the way is replaced by a
/// mapping. `base` is left untouched.
pub fn set_value(path: &str, value: Value, base: Option<&Value>) -> Value {
    let parts: Vec<&str> = segments(path).collect();
    let Some((leaf, parents)) = parts.split_last() else {
        return value;
    };

    let mut result = match base {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    write_path(&mut result, parents, leaf, value);
    Value::Object(result)
}

fn write_path(node: &mut Map<String, Value>, parents: &[&str], leaf: &str, value: Value) {
    let Some((key, rest)) = parents.split_first() else {
        node.insert(leaf.to_string(), value);
        return;
    };

    let slot = node
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(child) => write_path(child, rest, leaf, value),
        other => {
            let mut child = Map::new();
            write_path(&mut child, rest, leaf, value);
            *other = Value::Object(child);
        }
    }
}
