use std::sync::{Arc, OnceLock};

use crate::foundation::core::{PixelSize, Rgba8};
use crate::foundation::error::{CardError, CardResult};

/// Straight-alpha RGBA8 raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

/// SVG-to-pixels renderer backed by `resvg`.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::with_system_fonts()
    }
}

impl Rasterizer {
    /// Rasterizer using the system font database (loaded once per process).
    pub fn with_system_fonts() -> Self {
        static SYSTEM_FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
        let fontdb = SYSTEM_FONTS
            .get_or_init(|| {
                let mut db = usvg::fontdb::Database::new();
                db.load_system_fonts();
                tracing::debug!(faces = db.len(), "loaded system fonts");
                Arc::new(db)
            })
            .clone();
        Self { fontdb }
    }

    /// Rasterizer with an empty font database; text is not drawn.
    pub fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    /// Render `svg` into a raster of exactly `size` pixels.
    pub fn rasterize(&self, svg: &str, size: PixelSize) -> CardResult<RasterFrame> {
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &opts)
            .map_err(|e| CardError::export(format!("parse snapshot svg: {e}")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width, size.height)
            .ok_or_else(|| CardError::export("failed to allocate snapshot pixmap"))?;
        let sx = size.width as f32 / tree.size().width();
        let sy = size.height as f32 / tree.size().height();
        let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
        resvg::render(&tree, xform, &mut pixmap.as_mut());

        let mut rgba8 = pixmap.take();
        unpremultiply_rgba8_in_place(&mut rgba8);
        Ok(RasterFrame {
            width: size.width,
            height: size.height,
            rgba8,
        })
    }
}

/// Composite every pixel over an opaque `bg`; the result is fully opaque.
pub fn flatten_onto(frame: &mut RasterFrame, bg: Rgba8) {
    let bg = [u16::from(bg.r), u16::from(bg.g), u16::from(bg.b)];
    for px in frame.rgba8.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in 0..3 {
            px[c] = ((u16::from(px[c]) * a + bg[c] * (255 - a) + 127) / 255) as u8;
        }
        px[3] = 255;
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/raster.rs"]
mod tests;
