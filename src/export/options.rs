use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::foundation::config::EditorConfig;
use crate::foundation::core::Rgba8;
use crate::foundation::error::{CardError, CardResult, FieldWarning};

/// Output encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    /// Animated output.
    Gif,
}

impl ExportFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
        }
    }

    /// Formats without a full alpha channel are flattened onto the background first.
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Png)
    }

    /// Parse a CLI-style name (`png`, `jpg`/`jpeg`, `gif`).
    pub fn parse(s: &str) -> CardResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            other => Err(CardError::validation(format!(
                "unknown export format '{other}'"
            ))),
        }
    }
}

/// Caller-supplied export options.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Device pixel scale applied to the logical card size.
    pub scale: f64,
    /// JPEG quality, `1..=100`.
    pub quality: u8,
    /// Flatten color for formats without alpha.
    pub background: Rgba8,
    /// Suggested file name; derived from the format when unset.
    pub filename: Option<String>,
    /// Bound on each image load.
    pub image_timeout: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl ExportOptions {
    /// Options seeded from the editor configuration.
    pub fn from_config(cfg: &EditorConfig) -> Self {
        Self {
            format: ExportFormat::Png,
            scale: cfg.export.scale,
            quality: cfg.export.quality,
            background: cfg.export.background,
            filename: None,
            image_timeout: cfg.image_load_timeout(),
        }
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn validate(&self) -> CardResult<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(CardError::validation("export scale must be finite and > 0"));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(CardError::validation("export quality must be in 1..=100"));
        }
        if self.image_timeout.is_zero() {
            return Err(CardError::validation("image timeout must be > 0"));
        }
        Ok(())
    }

    /// Effective file name for an artifact encoded as `format`.
    pub fn file_name(&self, format: ExportFormat) -> String {
        match &self.filename {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("card.{}", format.extension()),
        }
    }
}

/// Frame schedule for animated exports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationOptions {
    pub frame_count: usize,
    /// Real time waited before each capture; also the per-frame delay in the output.
    pub frame_duration_ms: u64,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            frame_count: 12,
            frame_duration_ms: 100,
        }
    }
}

impl AnimationOptions {
    pub fn validate(&self) -> CardResult<()> {
        if self.frame_count == 0 {
            return Err(CardError::validation("frame count must be >= 1"));
        }
        if self.frame_duration_ms == 0 {
            return Err(CardError::validation("frame duration must be > 0"));
        }
        Ok(())
    }

    /// Progress value of frame `i`: equal steps from 0 to 1, or 0 for a single frame.
    pub fn progress_at(&self, i: usize) -> f64 {
        if self.frame_count <= 1 {
            0.0
        } else {
            i as f64 / (self.frame_count - 1) as f64
        }
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms)
    }
}

/// A finished export.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    /// `data:` URL of the encoded image.
    pub url: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    pub filename: String,
    pub frame_count: usize,
    /// Per-image problems that were recovered from.
    pub warnings: Vec<FieldWarning>,
}

#[cfg(test)]
#[path = "../../tests/unit/export/options.rs"]
mod tests;
