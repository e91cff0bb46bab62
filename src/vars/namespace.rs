use std::sync::Arc;

use serde_json::{Map, Value};

use crate::model::Template;
use crate::model::tree::iter_depth_first;
use crate::vars::path;

/// Path of the animation progress variable driven by animated exports.
pub const ANIMATION_PROGRESS_PATH: &str = "animation.progress";

/// Immutable snapshot of the variable namespace.
///
/// Updates happen on a working copy that is swapped in whole, so readers never observe a
/// partially written namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct Namespace(Arc<Value>);

impl Default for Namespace {
    fn default() -> Self {
        Self::empty()
    }
}

impl Namespace {
    /// Namespace with an empty root object.
    pub fn empty() -> Self {
        Self(Arc::new(Value::Object(Map::new())))
    }

    /// Wrap an existing JSON value.
    pub fn from_value(v: Value) -> Self {
        Self(Arc::new(v))
    }

    /// Root value.
    pub fn root(&self) -> &Value {
        &self.0
    }

    /// Resolve a dotted path.
    pub fn get(&self, p: &str) -> Option<&Value> {
        path::get(&self.0, p)
    }

    /// Owned copy to mutate before swapping back in with [`Namespace::from_value`].
    pub fn working_copy(&self) -> Value {
        (*self.0).clone()
    }

    /// New namespace with `value` written at `p`; `self` is untouched.
    pub fn with_value(&self, p: &str, value: Value) -> Self {
        let mut copy = self.working_copy();
        path::set(&mut copy, p, value);
        Self::from_value(copy)
    }

    /// Current animation progress in `0..=1` (0 when unset).
    pub fn progress(&self) -> f64 {
        self.get(ANIMATION_PROGRESS_PATH)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    /// `true` when both namespaces share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Ordered set of path writes; a later write to the same path replaces the earlier one and
/// moves to the end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Edits(Vec<(String, Value)>);

impl Edits {
    /// Empty edit list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write.
    pub fn insert(&mut self, p: impl Into<String>, value: Value) {
        let p = p.into();
        self.0.retain(|(k, _)| *k != p);
        self.0.push((p, value));
    }

    /// Drop the write for `p`, if any.
    pub fn remove(&mut self, p: &str) -> Option<Value> {
        let idx = self.0.iter().position(|(k, _)| k == p)?;
        Some(self.0.remove(idx).1)
    }

    /// Latest value recorded for `p`.
    pub fn get(&self, p: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == p).map(|(_, v)| v)
    }

    /// Writes in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of recorded writes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build from a JSON object, flattening nested objects into dotted paths.
    pub fn from_json_object(v: &Value) -> Self {
        fn walk(prefix: &str, v: &Value, out: &mut Edits) {
            match v {
                Value::Object(map) if !map.is_empty() => {
                    for (k, child) in map {
                        let p = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&p, child, out);
                    }
                }
                other if !prefix.is_empty() => out.insert(prefix, other.clone()),
                _ => {}
            }
        }
        let mut out = Edits::new();
        walk("", v, &mut out);
        out
    }
}

/// Assemble the namespace for `template`.
///
/// Layers, later winning: template styles (`styles.colors` as an array of hex strings,
/// `styles.effects` as an array of names), field defaults, type fallbacks for still-unset
/// value-like fields, live edits, uploaded-asset URLs.
pub fn build_namespace(template: &Template, edits: &Edits, uploads: &Edits) -> Namespace {
    let mut root = Value::Object(Map::new());

    let colors = template
        .styles
        .colors
        .iter()
        .map(|c| Value::String(c.to_hex()))
        .collect();
    path::set(&mut root, "styles.colors", Value::Array(colors));
    let effects = template
        .styles
        .effects
        .iter()
        .map(|e| Value::String(e.name.clone()))
        .collect();
    path::set(&mut root, "styles.effects", Value::Array(effects));

    let fields = iter_depth_first(&template.fields);
    for field in &fields {
        if let Some(v) = field.default_value() {
            path::set(&mut root, field.binding_path(), v);
        }
    }
    for field in &fields {
        let p = field.binding_path();
        let unset = matches!(path::get(&root, p), None | Some(Value::Null));
        if unset && let Some(v) = field.fallback_value() {
            path::set(&mut root, p, v);
        }
    }

    for (p, v) in edits.iter().chain(uploads.iter()) {
        if !path::set(&mut root, p, v.clone()) {
            tracing::debug!(path = p, "edit could not be applied to namespace");
        }
    }

    Namespace::from_value(root)
}

#[cfg(test)]
#[path = "../../tests/unit/vars/namespace.rs"]
mod tests;
