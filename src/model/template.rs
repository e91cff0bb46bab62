use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8;
use crate::foundation::error::{CardError, CardResult};
use crate::markup::{Markup, MarkupTarget};
use crate::model::field::{Field, FieldId, FieldKind, FieldType};
use crate::model::palette::palette_field;
use crate::model::tree::{FieldTree, validate_tree};
use crate::vars::Namespace;

/// Named overlay animation driven by `animation.progress`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Diagonal highlight band sweeping across the card.
    Shimmer,
    /// Whole-card tint whose strength oscillates.
    Pulse,
    /// Tint fading in over the animation.
    Fade,
    /// Colored border glow oscillating in width.
    Glow,
}

/// One entry of `styles.effects`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    /// Effect name, exposed in the namespace under `styles.effects`.
    pub name: String,
    /// Animation kind.
    pub kind: EffectKind,
    /// Overlay color; the first palette color when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba8>,
    /// Peak overlay opacity in `0..=1`.
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

fn default_intensity() -> f64 {
    0.35
}

/// Template-level styles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateStyles {
    /// Ordered palette, exposed as the array `styles.colors`.
    pub colors: Vec<Rgba8>,
    /// Named overlay animations.
    pub effects: Vec<Effect>,
}

/// Card box the fields are laid out in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardCanvas {
    /// Logical width in px.
    pub width: f64,
    /// Logical height in px; `None` sizes to content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Card background.
    pub background: Rgba8,
    /// Inner padding in px.
    pub padding: f64,
    /// Corner radius in px.
    pub radius: f64,
    /// Gap between root fields in px.
    pub gap: f64,
}

impl Default for CardCanvas {
    fn default() -> Self {
        Self {
            width: 360.0,
            height: None,
            background: Rgba8::WHITE,
            padding: 24.0,
            radius: 16.0,
            gap: 12.0,
        }
    }
}

/// A card template: ordered fields, markup strings and styles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Persistence id; empty until first saved.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Root fields in display order.
    #[serde(default)]
    pub fields: FieldTree,
    /// HTML markup with `{{path}}` interpolation.
    #[serde(default)]
    pub html: String,
    /// CSS markup with `{{path}}` interpolation.
    #[serde(default)]
    pub css: String,
    /// Script markup with `{{path}}` interpolation.
    #[serde(default)]
    pub script: String,
    /// Palette and effects.
    #[serde(default)]
    pub styles: TemplateStyles,
    /// Card box.
    #[serde(default)]
    pub canvas: CardCanvas,
}

/// Markup strings after interpolation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderedMarkup {
    /// Interpolated HTML (values escaped).
    pub html: String,
    /// Interpolated CSS.
    pub css: String,
    /// Interpolated script.
    pub script: String,
}

impl Template {
    /// The "new template" starting point: a title, a photo, a message and an accent color.
    pub fn new_default() -> Self {
        let mut title = palette_field(FieldType::Text, FieldId::new("title"));
        title.label = "Title".to_owned();
        title.style.font_size = Some(24.0);
        title.style.bold = Some(true);

        let mut photo = palette_field(FieldType::Image, FieldId::new("photo"));
        photo.label = "Photo".to_owned();
        photo.path = Some("images.self".to_owned());

        let mut message = palette_field(FieldType::Text, FieldId::new("message"));
        message.label = "Message".to_owned();
        if let FieldKind::Text { multiline, .. } = &mut message.kind {
            *multiline = true;
        }

        let accent = palette_field(FieldType::Color, FieldId::new("accent"));

        Self {
            id: String::new(),
            name: "Untitled card".to_owned(),
            fields: vec![
                Arc::new(title),
                Arc::new(photo),
                Arc::new(message),
                Arc::new(accent),
            ],
            html: "<div class=\"card\"><h1>{{title}}</h1><img src=\"{{images.self}}\"/><p>{{message}}</p></div>".to_owned(),
            css: ".card { border-color: {{accent}}; }".to_owned(),
            script: String::new(),
            styles: TemplateStyles {
                colors: vec![Rgba8::rgb(0x25, 0x63, 0xeb), Rgba8::rgb(0xf5, 0x9e, 0x0b)],
                effects: Vec::new(),
            },
            canvas: CardCanvas::default(),
        }
    }

    /// Copy used when editing an existing template: fresh id, marked name.
    pub fn clone_for_edit(&self) -> Self {
        let mut out = self.clone();
        out.id = String::new();
        out.name = if self.name.is_empty() {
            "Untitled card (copy)".to_owned()
        } else {
            format!("{} (copy)", self.name)
        };
        out
    }

    /// Validate fields, canvas and markup syntax.
    pub fn validate(&self) -> CardResult<()> {
        validate_tree(&self.fields)?;
        let c = &self.canvas;
        if !c.width.is_finite() || c.width <= 0.0 {
            return Err(CardError::validation("canvas width must be finite and > 0"));
        }
        if let Some(h) = c.height
            && (!h.is_finite() || h <= 0.0)
        {
            return Err(CardError::validation("canvas height must be finite and > 0"));
        }
        if !c.padding.is_finite() || c.padding < 0.0 || !c.gap.is_finite() || c.gap < 0.0 {
            return Err(CardError::validation("canvas padding/gap must be >= 0"));
        }
        for effect in &self.styles.effects {
            if effect.name.trim().is_empty() {
                return Err(CardError::validation("effect name must be non-empty"));
            }
            if !(0.0..=1.0).contains(&effect.intensity) {
                return Err(CardError::validation(format!(
                    "effect '{}' intensity must be in [0, 1]",
                    effect.name
                )));
            }
        }
        Markup::parse(&self.html)?;
        Markup::parse(&self.css)?;
        Markup::parse(&self.script)?;
        Ok(())
    }

    /// Interpolate `html`, `css` and `script` against `ns`.
    pub fn render_markup(&self, ns: &Namespace) -> CardResult<RenderedMarkup> {
        Ok(RenderedMarkup {
            html: Markup::parse(&self.html)?.render(ns, MarkupTarget::Html),
            css: Markup::parse(&self.css)?.render(ns, MarkupTarget::Css),
            script: Markup::parse(&self.script)?.render(ns, MarkupTarget::Script),
        })
    }

    /// Parse a template from JSON and validate it.
    pub fn from_json(s: &str) -> CardResult<Self> {
        let t: Self = serde_json::from_str(s)
            .map_err(|e| CardError::serde(format!("corrupt template: {e}")))?;
        t.validate()?;
        Ok(t)
    }

    /// Field lookup by id anywhere in the tree.
    pub fn field(&self, id: &FieldId) -> Option<&Arc<Field>> {
        crate::model::tree::find_field(&self.fields, id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/template.rs"]
mod tests;
