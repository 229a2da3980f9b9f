//! Recursive merge of JSON trees.

use serde_json::Value;

/// Merge `incoming` into `target`.
///
/// When both sides hold an object at the same key the objects are merged
/// key by key; in every other case the incoming value replaces the existing
/// one (arrays are replaced, not concatenated).
pub fn deep_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => deep_merge(slot, value),
                    _ => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}
