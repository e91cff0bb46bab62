//! `{{path}}` interpolation with `#if` / `#each` blocks over the variable namespace.
//!
//! Unresolved paths render as an empty string. Syntax errors are reported once for the whole
//! document.

mod parse;

use std::collections::BTreeSet;

use serde_json::Value;

use crate::foundation::error::CardResult;
use crate::vars::{Namespace, path};
use parse::Node;

/// Output language, controls escaping of `{{path}}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkupTarget {
    /// HTML: `{{path}}` is entity-escaped, `{{{path}}}` is not.
    Html,
    /// CSS: no escaping.
    Css,
    /// Script: no escaping.
    Script,
}

/// Parsed markup document.
#[derive(Clone, Debug, PartialEq)]
pub struct Markup {
    nodes: Vec<Node>,
}

struct Scope<'a> {
    this: &'a Value,
    index: usize,
    key: Option<&'a str>,
}

impl Markup {
    /// Parse a markup string.
    pub fn parse(src: &str) -> CardResult<Self> {
        Ok(Self {
            nodes: parse::parse(src)?,
        })
    }

    /// Interpolate against `ns`.
    pub fn render(&self, ns: &Namespace, target: MarkupTarget) -> String {
        let mut out = String::new();
        let mut scopes = Vec::new();
        render_nodes(&self.nodes, ns.root(), &mut scopes, target, &mut out);
        out
    }

    /// Every path referenced outside `#each` bodies, sorted and de-duplicated.
    pub fn referenced_paths(&self) -> Vec<String> {
        fn walk(nodes: &[Node], out: &mut BTreeSet<String>) {
            for node in nodes {
                match node {
                    Node::Text(_) => {}
                    Node::Var { path, .. } => {
                        out.insert(path.clone());
                    }
                    Node::If {
                        path,
                        then,
                        otherwise,
                    } => {
                        out.insert(path.clone());
                        walk(then, out);
                        walk(otherwise, out);
                    }
                    Node::Each { path, .. } => {
                        out.insert(path.clone());
                    }
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(&self.nodes, &mut out);
        out.into_iter().collect()
    }
}

fn render_nodes<'a>(
    nodes: &'a [Node],
    root: &'a Value,
    scopes: &mut Vec<Scope<'a>>,
    target: MarkupTarget,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Var { path: p, raw } => {
                let text = resolve(p, root, scopes).map(stringify).unwrap_or_default();
                if target == MarkupTarget::Html && !raw {
                    escape_html_into(&text, out);
                } else {
                    out.push_str(&text);
                }
            }
            Node::If {
                path: p,
                then,
                otherwise,
            } => {
                let branch = if resolve(p, root, scopes).is_some_and(truthy) {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, root, scopes, target, out);
            }
            Node::Each { path: p, body } => {
                let Some(Resolved::Value(value)) = resolve(p, root, scopes) else {
                    continue;
                };
                match value {
                    Value::Array(items) => {
                        for (index, item) in items.iter().enumerate() {
                            scopes.push(Scope {
                                this: item,
                                index,
                                key: None,
                            });
                            render_nodes(body, root, scopes, target, out);
                            scopes.pop();
                        }
                    }
                    Value::Object(map) => {
                        for (index, (k, item)) in map.iter().enumerate() {
                            scopes.push(Scope {
                                this: item,
                                index,
                                key: Some(k.as_str()),
                            });
                            render_nodes(body, root, scopes, target, out);
                            scopes.pop();
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

enum Resolved<'a> {
    Value(&'a Value),
    Owned(Value),
}

fn resolve<'a>(p: &str, root: &'a Value, scopes: &[Scope<'a>]) -> Option<Resolved<'a>> {
    if let Some(scope) = scopes.last() {
        match p {
            "this" | "." => return Some(Resolved::Value(scope.this)),
            "@index" => return Some(Resolved::Owned(Value::from(scope.index))),
            "@key" => return scope.key.map(|k| Resolved::Owned(Value::from(k))),
            _ => {}
        }
        if let Some(rest) = p.strip_prefix("this.") {
            return path::get(scope.this, rest).map(Resolved::Value);
        }
        if let Some(v) = path::get(scope.this, p) {
            return Some(Resolved::Value(v));
        }
    }
    path::get(root, p).map(Resolved::Value)
}

impl Resolved<'_> {
    fn as_value(&self) -> &Value {
        match self {
            Resolved::Value(v) => v,
            Resolved::Owned(v) => v,
        }
    }
}

fn truthy(r: Resolved<'_>) -> bool {
    match r.as_value() {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn stringify(r: Resolved<'_>) -> String {
    value_to_text(r.as_value())
}

/// Plain-text form of a namespace value, as interpolated into markup.
pub(crate) fn value_to_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => v.to_string(),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

fn escape_html_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/markup/markup.rs"]
mod tests;
