use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{CardError, CardResult};
use crate::model::style::{Direction, ObjectFit, StyleHints};
use crate::vars::path::split_path;

/// Stable field identifier, unique within a template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub String);

impl FieldId {
    /// Wrap a string id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Field type tag, mirrors the `type` key of the JSON form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text.
    Text,
    /// Uploaded or linked image.
    Image,
    /// Color picker.
    Color,
    /// One or more choices from a fixed list.
    Select,
    /// Bounded numeric value.
    Slider,
    /// Boolean toggle.
    Switch,
    /// Visual container for child fields.
    Group,
}

impl FieldType {
    /// Lowercase name used in ids and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Color => "color",
            Self::Select => "select",
            Self::Slider => "slider",
            Self::Switch => "switch",
            Self::Group => "group",
        }
    }
}

/// Options specific to image fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageOptions {
    /// Accepted MIME types; empty means the editor-wide default list.
    pub accept: Vec<String>,
    /// Maximum upload size; `None` means the editor-wide default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    /// Width / height ratio of the image box.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    /// Fit of the image inside its box.
    pub fit: ObjectFit,
}

fn default_separator() -> String {
    ", ".to_owned()
}

fn default_step() -> f64 {
    1.0
}

fn default_max() -> f64 {
    100.0
}

/// Per-type payload of a [`Field`]. Each variant carries only the options it uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum FieldKind {
    /// Text field.
    Text {
        /// Default text.
        #[serde(default, rename = "defaultValue", skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        /// Render as a multi-line block.
        #[serde(default)]
        multiline: bool,
        /// Optional length limit enforced on edits.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Image field.
    Image {
        /// Default image URL.
        #[serde(default, rename = "defaultValue", skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        /// Image options.
        #[serde(default)]
        options: ImageOptions,
    },
    /// Color field.
    Color {
        /// Default color.
        #[serde(default, rename = "defaultValue", skip_serializing_if = "Option::is_none")]
        default: Option<Rgba8>,
        /// Swatches offered by the picker.
        #[serde(default)]
        preset_colors: Vec<Rgba8>,
    },
    /// Select field.
    Select {
        /// Default selection.
        #[serde(default, rename = "defaultValue", skip_serializing_if = "Vec::is_empty")]
        default: Vec<String>,
        /// Available choices.
        choices: Vec<String>,
        /// Allow more than one selection.
        #[serde(default)]
        multiple: bool,
        /// Separator used when rendering multiple selections.
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// Slider field.
    Slider {
        /// Default value.
        #[serde(default, rename = "defaultValue", skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
        /// Lower bound.
        #[serde(default)]
        min: f64,
        /// Upper bound.
        #[serde(default = "default_max")]
        max: f64,
        /// Step size.
        #[serde(default = "default_step")]
        step: f64,
        /// Unit suffix shown after the value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    /// Switch field.
    Switch {
        /// Default state.
        #[serde(default, rename = "defaultValue", skip_serializing_if = "Option::is_none")]
        default: Option<bool>,
    },
    /// Group of child fields; nesting is visual only.
    Group {
        /// Child fields in display order.
        #[serde(default)]
        children: Vec<Arc<Field>>,
        /// Flow direction of the children.
        #[serde(default)]
        direction: Direction,
    },
}

impl FieldKind {
    /// Type tag of this payload.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text { .. } => FieldType::Text,
            Self::Image { .. } => FieldType::Image,
            Self::Color { .. } => FieldType::Color,
            Self::Select { .. } => FieldType::Select,
            Self::Slider { .. } => FieldType::Slider,
            Self::Switch { .. } => FieldType::Switch,
            Self::Group { .. } => FieldType::Group,
        }
    }
}

/// A typed, labeled template slot bound to a variable path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Stable id.
    pub id: FieldId,
    /// Label shown in the editor and used by placeholders.
    pub label: String,
    /// Whether the field must be filled before publishing.
    #[serde(default)]
    pub required: bool,
    /// Hidden fields keep their value but are not rendered.
    #[serde(default)]
    pub hidden: bool,
    /// Dotted binding path; falls back to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Layout hints.
    #[serde(default)]
    pub style: StyleHints,
    /// Type and type-specific options.
    #[serde(flatten)]
    pub kind: FieldKind,
}

pub(crate) const DEFAULT_SWATCH: Rgba8 = Rgba8::rgb(0xcc, 0xcc, 0xcc);

impl Field {
    /// Construct a field with empty style and no explicit path.
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: FieldId::new(id),
            label: label.into(),
            required: false,
            hidden: false,
            path: None,
            style: StyleHints::default(),
            kind,
        }
    }

    /// Builder: bind to an explicit path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builder: attach style hints.
    pub fn with_style(mut self, style: StyleHints) -> Self {
        self.style = style;
        self
    }

    /// Type tag.
    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Path used to read/write this field's value: `path`, or the id when absent.
    pub fn binding_path(&self) -> &str {
        match self.path.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => self.id.as_str(),
        }
    }

    /// Child fields (empty for non-groups).
    pub fn children(&self) -> &[Arc<Field>] {
        match &self.kind {
            FieldKind::Group { children, .. } => children,
            _ => &[],
        }
    }

    /// `true` for container types that accept drops "inside".
    pub fn accepts_children(&self) -> bool {
        matches!(self.kind, FieldKind::Group { .. })
    }

    /// Copy of this field with its children replaced. Non-groups are returned unchanged.
    pub fn with_children(&self, new_children: Vec<Arc<Field>>) -> Field {
        let mut out = self.clone();
        if let FieldKind::Group { children, .. } = &mut out.kind {
            *children = new_children;
        }
        out
    }

    /// Declared default as a namespace value.
    pub fn default_value(&self) -> Option<Value> {
        match &self.kind {
            FieldKind::Text { default, .. } | FieldKind::Image { default, .. } => {
                default.clone().map(Value::String)
            }
            FieldKind::Color { default, .. } => default.map(|c| Value::String(c.to_hex())),
            FieldKind::Select {
                default, multiple, ..
            } => {
                if default.is_empty() {
                    None
                } else if *multiple {
                    Some(Value::Array(
                        default.iter().cloned().map(Value::String).collect(),
                    ))
                } else {
                    Some(Value::String(default[0].clone()))
                }
            }
            FieldKind::Slider { default, .. } => {
                default.and_then(serde_json::Number::from_f64).map(Value::Number)
            }
            FieldKind::Switch { default } => default.map(Value::Bool),
            FieldKind::Group { .. } => None,
        }
    }

    /// Type fallback written into the namespace when no default exists.
    ///
    /// Only value-like types have one; text and image stay unset so the renderer shows its
    /// placeholder instead.
    pub fn fallback_value(&self) -> Option<Value> {
        match &self.kind {
            FieldKind::Color { preset_colors, .. } => Some(Value::String(
                preset_colors.first().copied().unwrap_or(DEFAULT_SWATCH).to_hex(),
            )),
            FieldKind::Select {
                choices, multiple, ..
            } => {
                let first = choices.first()?.clone();
                if *multiple {
                    Some(Value::Array(vec![Value::String(first)]))
                } else {
                    Some(Value::String(first))
                }
            }
            FieldKind::Slider { min, .. } => {
                serde_json::Number::from_f64(*min).map(Value::Number)
            }
            FieldKind::Switch { .. } => Some(Value::Bool(false)),
            FieldKind::Text { .. } | FieldKind::Image { .. } | FieldKind::Group { .. } => None,
        }
    }

    /// Validate this field and its subtree, including id uniqueness within the subtree.
    pub fn validate(&self) -> CardResult<()> {
        let mut seen = BTreeSet::new();
        self.validate_into(&mut seen)
    }

    pub(crate) fn validate_into<'a>(&'a self, seen: &mut BTreeSet<&'a str>) -> CardResult<()> {
        self.validate_shallow()?;
        if !seen.insert(self.id.as_str()) {
            return Err(CardError::validation(format!(
                "duplicate field id '{}'",
                self.id
            )));
        }
        for child in self.children() {
            child.validate_into(seen)?;
        }
        Ok(())
    }

    fn validate_shallow(&self) -> CardResult<()> {
        if self.id.0.trim().is_empty() {
            return Err(CardError::validation("field id must be non-empty"));
        }
        if self.label.trim().is_empty() {
            return Err(CardError::validation(format!(
                "field '{}' must have a label",
                self.id
            )));
        }
        if let Some(p) = self.path.as_deref()
            && !p.is_empty()
            && split_path(p).is_none()
        {
            return Err(CardError::validation(format!(
                "field '{}' has malformed path '{p}'",
                self.id
            )));
        }

        match &self.kind {
            FieldKind::Select {
                default,
                choices,
                multiple,
                ..
            } => {
                if choices.is_empty() {
                    return Err(CardError::validation(format!(
                        "select field '{}' must have at least one choice",
                        self.id
                    )));
                }
                if !multiple && default.len() > 1 {
                    return Err(CardError::validation(format!(
                        "select field '{}' allows a single selection",
                        self.id
                    )));
                }
                if let Some(bad) = default.iter().find(|d| !choices.contains(d)) {
                    return Err(CardError::validation(format!(
                        "select field '{}' default '{bad}' is not a choice",
                        self.id
                    )));
                }
            }
            FieldKind::Slider {
                default,
                min,
                max,
                step,
                ..
            } => {
                if !min.is_finite() || !max.is_finite() || min >= max {
                    return Err(CardError::validation(format!(
                        "slider field '{}' needs finite min < max",
                        self.id
                    )));
                }
                if !step.is_finite() || *step <= 0.0 {
                    return Err(CardError::validation(format!(
                        "slider field '{}' needs a positive step",
                        self.id
                    )));
                }
                if let Some(d) = default
                    && !(min..=max).contains(&d)
                {
                    return Err(CardError::validation(format!(
                        "slider field '{}' default {d} is outside [{min}, {max}]",
                        self.id
                    )));
                }
            }
            FieldKind::Image { options, .. } => {
                if let Some(r) = options.aspect_ratio
                    && (!r.is_finite() || r <= 0.0)
                {
                    return Err(CardError::validation(format!(
                        "image field '{}' aspect ratio must be > 0",
                        self.id
                    )));
                }
                if options.max_bytes == Some(0) {
                    return Err(CardError::validation(format!(
                        "image field '{}' maxBytes must be > 0",
                        self.id
                    )));
                }
            }
            FieldKind::Text { .. }
            | FieldKind::Color { .. }
            | FieldKind::Switch { .. }
            | FieldKind::Group { .. } => {}
        }
        Ok(())
    }
}

/// Partial update applied by [`crate::model::tree::update_field`].
///
/// `None` leaves the property untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldPatch {
    /// New label.
    pub label: Option<String>,
    /// New required flag.
    pub required: Option<bool>,
    /// New hidden flag.
    pub hidden: Option<bool>,
    /// New binding path; `Some(None)` clears it back to the id.
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub path: Option<Option<String>>,
    /// Replacement style hints.
    pub style: Option<StyleHints>,
    /// Replacement type payload. For groups, the current children are kept when the
    /// replacement carries none.
    pub kind: Option<FieldKind>,
}

impl FieldPatch {
    /// Apply onto a field, producing the patched copy.
    pub fn apply(&self, field: &Field) -> Field {
        let mut out = field.clone();
        if let Some(label) = &self.label {
            out.label = label.clone();
        }
        if let Some(required) = self.required {
            out.required = required;
        }
        if let Some(hidden) = self.hidden {
            out.hidden = hidden;
        }
        if let Some(path) = &self.path {
            out.path = path.clone();
        }
        if let Some(style) = &self.style {
            out.style = style.clone();
        }
        if let Some(kind) = &self.kind {
            let mut kind = kind.clone();
            if let FieldKind::Group { children, .. } = &mut kind
                && children.is_empty()
            {
                *children = field.children().to_vec();
            }
            out.kind = kind;
        }
        out
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S: Serializer>(
        v: &Option<Option<String>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        v.serialize(s)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Option<String>>, D::Error> {
        Option::<String>::deserialize(d).map(Some)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/field.rs"]
mod tests;
