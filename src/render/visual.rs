use serde::Serialize;

use crate::foundation::core::Rgba8;
use crate::model::{CardCanvas, Direction, EffectKind, FieldId, ObjectFit, StyleHints};

/// Built-in placeholder for image fields without a value.
pub const PLACEHOLDER_IMAGE_URL: &str = "cardforge://placeholder/image";

/// Built-in icon substituted for images that failed to load.
pub const BROKEN_IMAGE_URL: &str = "cardforge://placeholder/broken";

/// One painted element of the card.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualNode {
    /// Field that produced the node; `None` for effect overlays.
    pub field_id: Option<FieldId>,
    /// Per-type defaults merged with the field's hints.
    pub style: StyleHints,
    /// `true` when the value came from the placeholder policy.
    pub placeholder: bool,
    /// What to paint.
    pub kind: VisualKind,
}

/// Per-type presentation payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VisualKind {
    /// Text run.
    Text {
        /// Text content.
        text: String,
        /// Wrap across lines.
        multiline: bool,
    },
    /// Image box.
    Image {
        /// Source URL (may be one of the built-in placeholder URLs).
        src: String,
        /// Fit inside the box.
        fit: ObjectFit,
        /// Width / height ratio of the box.
        aspect_ratio: Option<f64>,
    },
    /// Color swatch with its hex label.
    Swatch {
        /// Swatch color.
        color: Rgba8,
        /// Hex label.
        hex: String,
    },
    /// Selected choices.
    Select {
        /// Selections joined with the field's separator.
        display: String,
        /// Individual selections.
        selected: Vec<String>,
    },
    /// Slider track with fill.
    Slider {
        /// Raw value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// `(value - min) / (max - min)` clamped to `[0, 1]`.
        fill: f64,
        /// Value label including unit.
        label: String,
    },
    /// Toggle.
    Switch {
        /// State.
        on: bool,
        /// Field label shown next to the toggle.
        label: String,
    },
    /// Container.
    Group {
        /// Flow direction.
        direction: Direction,
        /// Child nodes.
        children: Vec<VisualNode>,
    },
    /// Effect overlay covering the card.
    Overlay {
        /// Effect kind.
        effect: EffectKind,
        /// Overlay color.
        color: Rgba8,
        /// Overlay opacity at the current progress.
        opacity: f64,
        /// Effect-specific phase in `[0, 1]` (band position for shimmer).
        phase: f64,
    },
}

/// The whole card: canvas, field nodes and effect overlays.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedCard {
    /// Card box.
    pub canvas: CardCanvas,
    /// Field nodes in display order.
    pub nodes: Vec<VisualNode>,
    /// Overlays painted above the fields.
    pub overlays: Vec<VisualNode>,
}
