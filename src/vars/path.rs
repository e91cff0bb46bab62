//! Dotted-path access into the variable namespace.
//!
//! Segments are plain object keys. A numeric-looking segment only acts as an index when the
//! value it is applied to is already an array (for example the pre-seeded `styles.colors`).

use serde_json::{Map, Value};

/// Split `a.b.c` into segments; `None` for empty paths or empty segments.
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Canonical non-negative integer (`0`, `12`; not `01`, `+1`, `-1`).
fn array_index(seg: &str) -> Option<usize> {
    if !seg.bytes().all(|b| b.is_ascii_digit()) || (seg.len() > 1 && seg.starts_with('0')) {
        return None;
    }
    seg.parse().ok()
}

/// Resolve `path` against `root`.
///
/// Never fails: any missing key, non-container intermediate or malformed path yields `None`.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = split_path(path)?;
    let mut cur = root;
    for seg in segments {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(array_index(seg)?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Write `value` at `path`, creating missing intermediate objects.
///
/// Scalar intermediates are replaced by objects. Inside an existing array a numeric segment
/// addresses an existing index or appends at `len`; anything else into an array is not
/// written. Returns whether the value was stored.
pub fn set(root: &mut Value, path: &str, value: Value) -> bool {
    let Some(segments) = split_path(path) else {
        return false;
    };
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    if !is_container(root) {
        *root = Value::Object(Map::new());
    }
    let mut cur = root;
    for seg in parents {
        cur = match child_slot(cur, seg) {
            Some(slot) => slot,
            None => {
                tracing::debug!(path, segment = *seg, "path segment cannot address array");
                return false;
            }
        };
        if !is_container(cur) {
            *cur = Value::Object(Map::new());
        }
    }

    match child_slot(cur, last) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => {
            tracing::debug!(path, segment = *last, "path segment cannot address array");
            false
        }
    }
}

fn is_container(v: &Value) -> bool {
    matches!(v, Value::Object(_) | Value::Array(_))
}

fn child_slot<'a>(cur: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
    match cur {
        Value::Object(map) => Some(map.entry(seg.to_owned()).or_insert(Value::Null)),
        Value::Array(items) => {
            let idx = array_index(seg)?;
            if idx == items.len() {
                items.push(Value::Null);
            }
            items.get_mut(idx)
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vars/path.rs"]
mod tests;
