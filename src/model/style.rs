use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8;

/// Main-axis direction for groups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Children flow left to right.
    Row,
    /// Children flow top to bottom.
    #[default]
    Column,
}

/// Horizontal alignment for text-like content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left aligned.
    #[default]
    Start,
    /// Centered.
    Center,
    /// Right aligned.
    End,
}

/// How an image fills its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFit {
    /// Fill the box, cropping overflow.
    #[default]
    Cover,
    /// Fit inside the box, letterboxing.
    Contain,
    /// Stretch to the box.
    Fill,
}

/// Layout-only presentation hints attached to a field.
///
/// These are not CSS; the renderer merges them onto per-type defaults and the surface layout
/// turns them into box sizes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grow: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Rgba8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl StyleHints {
    /// Overlay `over` onto `self`; set values in `over` win.
    pub fn merged(&self, over: &StyleHints) -> StyleHints {
        StyleHints {
            width: over.width.or(self.width),
            height: over.height.or(self.height),
            padding: over.padding.or(self.padding),
            gap: over.gap.or(self.gap),
            grow: over.grow.or(self.grow),
            font_size: over.font_size.or(self.font_size),
            bold: over.bold.or(self.bold),
            align: over.align.or(self.align),
            color: over.color.or(self.color),
            background: over.background.or(self.background),
            radius: over.radius.or(self.radius),
            opacity: over.opacity.or(self.opacity),
        }
    }

    /// Effective font size in px.
    pub fn font_size_px(&self) -> f64 {
        self.font_size.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(16.0)
    }

    /// Effective opacity clamped to `0..=1`.
    pub fn opacity_or_one(&self) -> f64 {
        self.opacity
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(1.0)
    }
}
