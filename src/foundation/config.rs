use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8;
use crate::foundation::error::{CardError, CardResult};

/// Editor-wide tuning knobs.
///
/// Every field has a default; JSON config files only need to mention what they change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Pointer drag tuning.
    pub drag: DragConfig,
    /// Maximum number of undo steps retained.
    pub history_depth: usize,
    /// Per-image load timeout used by exports.
    pub image_load_timeout_ms: u64,
    /// Upload validation limits.
    pub upload: UploadConfig,
    /// Export defaults.
    pub export: ExportDefaults,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            drag: DragConfig::default(),
            history_depth: 50,
            image_load_timeout_ms: 8_000,
            upload: UploadConfig::default(),
            export: ExportDefaults::default(),
        }
    }
}

/// Drag activation and drop band configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragConfig {
    /// Pointer travel (px) before a press turns into a drag.
    pub activation_distance_px: f64,
    /// Fraction of the target height treated as the leading/trailing band.
    pub edge_band: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            activation_distance_px: 5.0,
            edge_band: 0.3,
        }
    }
}

/// Upload validation performed before the upload collaborator is called.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadConfig {
    /// Default maximum blob size when the field does not set one.
    pub max_bytes: u64,
    /// Accepted MIME types when the field does not set its own list.
    pub accepted: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            accepted: ["image/jpeg", "image/png", "image/gif", "image/webp"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// What to do when an export is requested while another one is in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentExport {
    /// Refuse the new request.
    Reject,
    /// Cancel the running job and let the new one own the result slot.
    #[default]
    Supersede,
}

/// Defaults applied to export requests that leave options unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportDefaults {
    /// Device pixel scale.
    pub scale: f64,
    /// Background used to flatten formats without alpha.
    pub background: Rgba8,
    /// JPEG quality (1..=100).
    pub quality: u8,
    /// Concurrency policy for the export result slot.
    pub concurrent: ConcurrentExport,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: Rgba8::WHITE,
            quality: 92,
            concurrent: ConcurrentExport::Supersede,
        }
    }
}

impl EditorConfig {
    /// Defaults overlaid with `CARDFORGE_*` environment variables.
    ///
    /// Unparseable or out-of-range values are ignored and the default is kept.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|k| std::env::var(k).ok())
    }

    /// Load a JSON config file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> CardResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a lookup function (environment in production, a map in tests).
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parse<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse::<T>().ok())
        }

        if let Some(v) = parse::<f64>(&lookup, "CARDFORGE_DRAG_ACTIVATION_PX")
            .filter(|v| v.is_finite() && *v >= 0.0)
        {
            self.drag.activation_distance_px = v;
        }
        if let Some(v) = parse::<usize>(&lookup, "CARDFORGE_HISTORY_DEPTH").filter(|&n| n > 0) {
            self.history_depth = v;
        }
        if let Some(v) = parse::<u64>(&lookup, "CARDFORGE_IMAGE_TIMEOUT_MS").filter(|&n| n > 0) {
            self.image_load_timeout_ms = v;
        }
        if let Some(v) = parse::<u64>(&lookup, "CARDFORGE_UPLOAD_MAX_BYTES").filter(|&n| n > 0) {
            self.upload.max_bytes = v;
        }
        if let Some(v) = parse::<f64>(&lookup, "CARDFORGE_EXPORT_SCALE")
            .filter(|v| v.is_finite() && *v > 0.0)
        {
            self.export.scale = v;
        }
        if let Some(v) =
            parse::<u8>(&lookup, "CARDFORGE_EXPORT_QUALITY").filter(|&q| (1..=100).contains(&q))
        {
            self.export.quality = v;
        }
        self
    }

    /// Reject nonsensical values.
    pub fn validate(&self) -> CardResult<()> {
        if !self.drag.activation_distance_px.is_finite() || self.drag.activation_distance_px < 0.0
        {
            return Err(CardError::validation(
                "drag.activationDistancePx must be finite and >= 0",
            ));
        }
        if !(self.drag.edge_band > 0.0 && self.drag.edge_band < 0.5) {
            return Err(CardError::validation("drag.edgeBand must be in (0, 0.5)"));
        }
        if self.history_depth == 0 {
            return Err(CardError::validation("historyDepth must be > 0"));
        }
        if !self.export.scale.is_finite() || self.export.scale <= 0.0 {
            return Err(CardError::validation("export.scale must be finite and > 0"));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(CardError::validation("export.quality must be in 1..=100"));
        }
        Ok(())
    }

    /// Image load timeout as a [`Duration`].
    pub fn image_load_timeout(&self) -> Duration {
        Duration::from_millis(self.image_load_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
