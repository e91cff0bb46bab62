//! Image loading for exports: fetch, decode, normalize to PNG, cache.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::foundation::error::{CardError, CardResult, FieldWarning, WarningKind};
use crate::render::{BROKEN_IMAGE_URL, PLACEHOLDER_IMAGE_URL, VisualKind};
use crate::surface::Surface;

/// Source of image bytes for a URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> CardResult<Vec<u8>>;
}

/// Fetcher for `data:` URLs, `file://` URLs and plain paths (relative to `root` when set).
#[derive(Clone, Debug, Default)]
pub struct LocalFetcher {
    root: Option<PathBuf>,
}

impl LocalFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

#[async_trait]
impl AssetFetcher for LocalFetcher {
    async fn fetch(&self, url: &str) -> CardResult<Vec<u8>> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(CardError::asset(format!(
                "remote url '{url}' needs a network fetcher"
            )));
        }
        let raw = url.strip_prefix("file://").unwrap_or(url);
        let mut path = PathBuf::from(raw);
        if path.is_relative()
            && let Some(root) = &self.root
        {
            path = root.join(path);
        }
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read image '{}'", path.display()))?;
        Ok(bytes)
    }
}

/// Payload of a `data:` URL; base64 and plain (unescaped) forms.
pub fn decode_data_url(url: &str) -> CardResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| CardError::asset("not a data url"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CardError::asset("data url without payload"))?;
    if meta.ends_with(";base64") {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| CardError::asset(format!("bad base64 in data url: {e}")))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// `data:` URL for `bytes`.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// A decoded image normalized to PNG for embedding into the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    /// `data:image/png;base64,...`
    pub data_url: Arc<str>,
}

impl LoadedImage {
    /// Decode any format `image` understands.
    pub fn decode(bytes: &[u8]) -> CardResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        Self::from_rgba(dyn_img.to_rgba8())
    }

    fn from_rgba(rgba: image::RgbaImage) -> CardResult<Self> {
        let (width, height) = rgba.dimensions();
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .context("re-encode image as png")?;
        Ok(Self {
            width,
            height,
            data_url: Arc::from(to_data_url("image/png", &png)),
        })
    }
}

/// Built-in raster shown for image fields without a value.
pub fn placeholder_image() -> CardResult<LoadedImage> {
    let img = image::RgbaImage::from_fn(64, 48, |x, y| {
        let inner = (16..48).contains(&x) && (12..36).contains(&y);
        if inner {
            image::Rgba([0xd1, 0xd5, 0xdb, 0xff])
        } else {
            image::Rgba([0xf3, 0xf4, 0xf6, 0xff])
        }
    });
    LoadedImage::from_rgba(img)
}

/// Built-in raster substituted for images that failed or timed out.
pub fn broken_image() -> CardResult<LoadedImage> {
    let img = image::RgbaImage::from_fn(48, 48, |x, y| {
        let (x, y) = (x as i32, y as i32);
        let on_cross = (x - y).abs() <= 2 || (x + y - 47).abs() <= 2;
        if on_cross && (8..40).contains(&x) {
            image::Rgba([0xdc, 0x26, 0x26, 0xff])
        } else {
            image::Rgba([0xfe, 0xe2, 0xe2, 0xff])
        }
    });
    LoadedImage::from_rgba(img)
}

/// Images resolved for one snapshot, keyed by source URL.
#[derive(Clone, Debug, Default)]
pub struct ImageSet {
    images: HashMap<String, LoadedImage>,
}

impl ImageSet {
    pub fn get(&self, src: &str) -> Option<&LoadedImage> {
        self.images.get(src)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Fetch-and-decode cache shared by exports.
///
/// Only successful loads are cached, so a timed-out image is retried by the next export.
pub struct ImageCache {
    fetcher: Arc<dyn AssetFetcher>,
    loaded: Mutex<HashMap<String, LoadedImage>>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("cached", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl ImageCache {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, LoadedImage>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cached images.
    pub fn cached(&self) -> usize {
        self.lock().len()
    }

    /// Load every image on `surface`, each bounded by `timeout`.
    ///
    /// Failures never abort: the broken-image raster is used and a warning is returned for
    /// each affected field.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn prepare(
        &self,
        surface: &Surface,
        timeout: Duration,
    ) -> CardResult<(ImageSet, Vec<FieldWarning>)> {
        let mut set = ImageSet::default();
        let mut warnings = Vec::new();
        let mut failed: HashMap<String, FieldWarning> = HashMap::new();

        for node in &surface.nodes {
            let VisualKind::Image { src, .. } = &node.kind else {
                continue;
            };
            let field_id = node
                .field_id
                .as_ref()
                .map(|id| id.as_str().to_owned())
                .unwrap_or_default();

            if let Some(w) = failed.get(src) {
                warnings.push(w.clone().for_field(field_id));
                continue;
            }
            if set.images.contains_key(src) {
                continue;
            }

            match self.load(src, timeout).await {
                Ok(img) => {
                    set.images.insert(src.clone(), img);
                }
                Err(warning) => {
                    tracing::warn!(src = %src, message = %warning.message, "image substituted");
                    set.images.insert(src.clone(), broken_image()?);
                    warnings.push(warning.clone().for_field(field_id));
                    failed.insert(src.clone(), warning);
                }
            }
        }
        Ok((set, warnings))
    }

    async fn load(&self, src: &str, timeout: Duration) -> Result<LoadedImage, FieldWarning> {
        let builtin = match src {
            PLACEHOLDER_IMAGE_URL => Some(placeholder_image()),
            BROKEN_IMAGE_URL => Some(broken_image()),
            _ => None,
        };
        if let Some(img) = builtin {
            return img.map_err(|e| load_warning(src, &e));
        }
        let cached = self.lock().get(src).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let bytes = match tokio::time::timeout(timeout, self.fetcher.fetch(src)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(load_warning(src, &e)),
            Err(_) => {
                return Err(FieldWarning::new(
                    WarningKind::ImageTimeout,
                    format!("image did not load within {} ms", timeout.as_millis()),
                )
                .at_path(src));
            }
        };
        let img = LoadedImage::decode(&bytes).map_err(|e| load_warning(src, &e))?;
        self.lock().insert(src.to_owned(), img.clone());
        Ok(img)
    }
}

fn load_warning(src: &str, e: &CardError) -> FieldWarning {
    FieldWarning::new(WarningKind::ImageLoad, e.to_string()).at_path(src)
}

#[cfg(test)]
#[path = "../../tests/unit/export/images.rs"]
mod tests;
