//! Deep merge functionality for layered configuration trees.
//!
//! Implements field-by-field merging where later layers override earlier ones.
//! Arrays are replaced entirely, not concatenated. Which pairs of values
//! recurse and which replace is decided by [`merge_policy`].

use serde_json::{Map, Value};

/// Dynamic shape of a tree node, as seen by the merge policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Null,
    Scalar,
    List,
    Mapping,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Shape::Scalar,
            Value::Array(_) => Shape::List,
            Value::Object(_) => Shape::Mapping,
        }
    }
}

/// What to do when an incoming value meets an existing one at the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// The incoming value becomes the stored value.
    Replace,
    /// Both are mappings: merge them key by key.
    Recurse,
}

/// Merge decision table keyed by `(existing, incoming)` shapes.
///
/// Only mapping meets mapping recurses. Everything else, including an
/// incoming null, replaces: deletion is expressed as an explicit null.
pub fn merge_policy(existing: Shape, incoming: Shape) -> MergeAction {
    match (existing, incoming) {
        (Shape::Mapping, Shape::Mapping) => MergeAction::Recurse,
        (_, _) => MergeAction::Replace,
    }
}

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - A null in overlay replaces whatever base held
///
/// # Example
/// ```
/// use serde_json::json;
/// use aio_config::config::deep_merge;
///
/// let base = json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "features": ["a", "b"]
/// });
/// let overlay = json!({
///     "server": { "port": 9000 },
///     "features": ["c"]
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result, json!({
///     "server": { "port": 9000, "host": "localhost" },
///     "features": ["c"]
/// }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match merge_policy(Shape::of(&base), Shape::of(&overlay)) {
        MergeAction::Recurse => match (base, overlay) {
            (Value::Object(mut base_map), Value::Object(overlay_map)) => {
                for (key, overlay_value) in overlay_map {
                    let merged_value = if let Some(base_value) = base_map.remove(&key) {
                        deep_merge(base_value, overlay_value)
                    } else {
                        overlay_value
                    };
                    base_map.insert(key, merged_value);
                }
                Value::Object(base_map)
            }
            (_, overlay) => overlay,
        },
        MergeAction::Replace => overlay,
    }
}

/// Merge borrowed trees in order, with later trees taking precedence.
///
/// Every input is cloned before folding, so the result never aliases the
/// caller's trees. Inputs that are not mappings (including null) contribute
/// nothing at the top level; the result is always a mapping.
pub fn merge<'a>(trees: impl IntoIterator<Item = &'a Value>) -> Value {
    trees
        .into_iter()
        .filter(|tree| tree.is_object())
        .cloned()
        .fold(Value::Object(Map::new()), deep_merge)
}
