use std::f64::consts::PI;
use std::sync::Arc;

use serde_json::Value;

use crate::foundation::core::Rgba8;
use crate::markup::value_to_text;
use crate::model::field::DEFAULT_SWATCH;
use crate::model::{Effect, EffectKind, Field, FieldKind, StyleHints, Template};
use crate::render::visual::{PLACEHOLDER_IMAGE_URL, RenderedCard, VisualKind, VisualNode};
use crate::vars::Namespace;

/// Map fields to visual nodes in array order.
///
/// Pure: the same fields and namespace always produce an equal result. Hidden fields are
/// skipped. Group children read from the same flat namespace as their parent.
pub fn render(fields: &[Arc<Field>], ns: &Namespace) -> Vec<VisualNode> {
    fields
        .iter()
        .filter(|f| !f.hidden)
        .map(|f| render_field(f, ns))
        .collect()
}

/// Render the fields plus the template's effect overlays at the namespace's
/// `animation.progress`.
pub fn render_card(template: &Template, ns: &Namespace) -> RenderedCard {
    let progress = ns.progress();
    let fallback_color = template
        .styles
        .colors
        .first()
        .copied()
        .unwrap_or(Rgba8::WHITE);
    RenderedCard {
        canvas: template.canvas.clone(),
        nodes: render(&template.fields, ns),
        overlays: template
            .styles
            .effects
            .iter()
            .map(|e| render_effect(e, progress, fallback_color))
            .collect(),
    }
}

/// `undefined`, `null` and `""` count as unset.
fn resolved<'a>(field: &Field, ns: &'a Namespace) -> Option<&'a Value> {
    match ns.get(field.binding_path()) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    }
}

fn type_defaults(kind: &FieldKind) -> StyleHints {
    match kind {
        FieldKind::Text { .. } => StyleHints {
            font_size: Some(16.0),
            color: Some(Rgba8::rgb(0x11, 0x18, 0x27)),
            ..StyleHints::default()
        },
        FieldKind::Image { .. } => StyleHints {
            radius: Some(8.0),
            ..StyleHints::default()
        },
        FieldKind::Color { .. } => StyleHints {
            height: Some(32.0),
            radius: Some(6.0),
            font_size: Some(12.0),
            ..StyleHints::default()
        },
        FieldKind::Select { .. } => StyleHints {
            font_size: Some(14.0),
            color: Some(Rgba8::rgb(0x37, 0x41, 0x51)),
            ..StyleHints::default()
        },
        FieldKind::Slider { .. } => StyleHints {
            radius: Some(5.0),
            font_size: Some(12.0),
            color: Some(Rgba8::rgb(0x25, 0x63, 0xeb)),
            background: Some(Rgba8::rgb(0xe5, 0xe7, 0xeb)),
            ..StyleHints::default()
        },
        FieldKind::Switch { .. } => StyleHints {
            height: Some(20.0),
            font_size: Some(14.0),
            color: Some(Rgba8::rgb(0x10, 0xb9, 0x81)),
            ..StyleHints::default()
        },
        FieldKind::Group { .. } => StyleHints {
            gap: Some(8.0),
            ..StyleHints::default()
        },
    }
}

fn render_field(field: &Field, ns: &Namespace) -> VisualNode {
    let value = resolved(field, ns);
    let mut placeholder = value.is_none();

    let kind = match &field.kind {
        FieldKind::Text {
            multiline,
            max_length,
            ..
        } => {
            let mut text = match value {
                Some(Value::Object(_)) | None => {
                    placeholder = true;
                    format!("sample {}", field.label)
                }
                Some(v) => value_to_text(v),
            };
            if let Some(max) = *max_length
                && text.chars().count() > max
            {
                text = text.chars().take(max).collect();
            }
            VisualKind::Text {
                text,
                multiline: *multiline,
            }
        }
        FieldKind::Image { options, .. } => {
            let src = match value {
                Some(Value::String(s)) => s.clone(),
                _ => {
                    placeholder = true;
                    PLACEHOLDER_IMAGE_URL.to_owned()
                }
            };
            VisualKind::Image {
                src,
                fit: options.fit,
                aspect_ratio: options.aspect_ratio,
            }
        }
        FieldKind::Color { .. } => {
            let color = match value {
                Some(Value::String(s)) => Rgba8::parse_hex(s).ok(),
                _ => None,
            };
            let color = color.unwrap_or_else(|| {
                placeholder = true;
                DEFAULT_SWATCH
            });
            VisualKind::Swatch {
                color,
                hex: color.to_hex(),
            }
        }
        FieldKind::Select {
            choices, separator, ..
        } => {
            let mut selected: Vec<String> = match value {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(value_to_text)
                    .filter(|s| !s.is_empty())
                    .collect(),
                Some(v) => vec![value_to_text(v)],
                None => Vec::new(),
            };
            if selected.is_empty() {
                placeholder = true;
                selected.extend(choices.first().cloned());
            }
            VisualKind::Select {
                display: selected.join(separator),
                selected,
            }
        }
        FieldKind::Slider { min, max, unit, .. } => {
            let raw = match value {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|v| v.is_finite());
            let v = raw.unwrap_or_else(|| {
                placeholder = true;
                *min
            });
            VisualKind::Slider {
                value: v,
                min: *min,
                max: *max,
                fill: slider_fill(v, *min, *max),
                label: format!("{}{}", format_slider_value(v), unit.as_deref().unwrap_or("")),
            }
        }
        FieldKind::Switch { .. } => {
            let on = match value {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => s == "true",
                Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
                _ => {
                    placeholder = true;
                    false
                }
            };
            VisualKind::Switch {
                on,
                label: field.label.clone(),
            }
        }
        FieldKind::Group {
            children,
            direction,
        } => {
            placeholder = false;
            VisualKind::Group {
                direction: *direction,
                children: render(children, ns),
            }
        }
    };

    VisualNode {
        field_id: Some(field.id.clone()),
        style: type_defaults(&field.kind).merged(&field.style),
        placeholder,
        kind,
    }
}

/// `(value - min) / (max - min)` clamped to `[0, 1]`; 0 for a degenerate range.
pub fn slider_fill(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if !span.is_finite() || span <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

fn format_slider_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned()
    }
}

fn render_effect(effect: &Effect, progress: f64, fallback: Rgba8) -> VisualNode {
    let p = progress.clamp(0.0, 1.0);
    let peak = effect.intensity.clamp(0.0, 1.0);
    let (opacity, phase) = match effect.kind {
        EffectKind::Shimmer => (peak, p),
        EffectKind::Pulse => (peak * (0.5 - 0.5 * (2.0 * PI * p).cos()), p),
        EffectKind::Fade => (peak * p, p),
        EffectKind::Glow => (peak * (PI * p).sin(), p),
    };
    VisualNode {
        field_id: None,
        style: StyleHints::default(),
        placeholder: false,
        kind: VisualKind::Overlay {
            effect: effect.kind,
            color: effect.color.unwrap_or(fallback),
            opacity,
            phase,
        },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
