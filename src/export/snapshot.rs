//! Offscreen snapshot of a surface and its SVG serialization.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::export::images::ImageSet;
use crate::foundation::core::{Rect, Rgba8};
use crate::model::{EffectKind, ObjectFit, TextAlign};
use crate::render::{VisualKind, VisualNode};
use crate::surface::metrics::LINE_HEIGHT_EM;
use crate::surface::{Surface, SurfaceNode};

const FONT_FAMILY: &str = "Inter, Helvetica, Arial, sans-serif";
const SWITCH_OFF: Rgba8 = Rgba8::rgb(0xd1, 0xd5, 0xdb);
const TRACK_DEFAULT: Rgba8 = Rgba8::rgb(0xe5, 0xe7, 0xeb);
const TEXT_DEFAULT: Rgba8 = Rgba8::rgb(0x11, 0x18, 0x27);

/// Keeps track of mounted snapshot clones.
#[derive(Debug, Default)]
pub struct OffscreenHost {
    next_id: AtomicU64,
    mounted: AtomicUsize,
}

impl OffscreenHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a decoration-free clone of `surface`. The clone is unmounted when the guard drops,
    /// including on early returns and errors.
    pub fn mount(&self, surface: &Surface) -> OffscreenGuard<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.mounted.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(id, "offscreen clone mounted");
        OffscreenGuard {
            host: self,
            id,
            surface: surface.without_decorations(),
        }
    }

    /// Clones currently mounted.
    pub fn mounted(&self) -> usize {
        self.mounted.load(Ordering::SeqCst)
    }
}

/// Scoped offscreen clone.
#[derive(Debug)]
pub struct OffscreenGuard<'a> {
    host: &'a OffscreenHost,
    id: u64,
    surface: Surface,
}

impl OffscreenGuard<'_> {
    pub fn surface(&self) -> &Surface {
        &self.surface
    }
}

impl Drop for OffscreenGuard<'_> {
    fn drop(&mut self) {
        self.host.mounted.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(id = self.id, "offscreen clone unmounted");
    }
}

/// Serialize a surface to a standalone SVG document in logical px.
///
/// Output is a pure function of the surface and the resolved images; decorations are never
/// written.
pub fn to_svg(surface: &Surface, images: &ImageSet) -> String {
    let (w, h) = (surface.size.width, surface.size.height);
    let canvas = &surface.canvas;
    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        num(w),
        num(h),
        num(w),
        num(h)
    );
    out.push_str("<defs>");
    let _ = write!(
        out,
        r#"<clipPath id="card-clip"><rect x="0" y="0" width="{}" height="{}" rx="{}"/></clipPath>"#,
        num(w),
        num(h),
        num(canvas.radius.max(0.0))
    );
    for (i, node) in surface.nodes.iter().enumerate() {
        if matches!(node.kind, VisualKind::Image { .. }) {
            let r = node.rect;
            let _ = write!(
                out,
                r#"<clipPath id="clip-{i}"><rect x="{}" y="{}" width="{}" height="{}" rx="{}"/></clipPath>"#,
                num(r.x0),
                num(r.y0),
                num(r.width()),
                num(r.height()),
                num(node.style.radius.unwrap_or(0.0).max(0.0))
            );
        }
    }
    for (i, overlay) in surface.overlays.iter().enumerate() {
        if let VisualKind::Overlay {
            effect: EffectKind::Shimmer,
            color,
            opacity,
            phase,
        } = &overlay.kind
        {
            let center = -0.25 + 1.5 * phase;
            let _ = write!(
                out,
                r#"<linearGradient id="fx-{i}" x1="0" y1="0" x2="1" y2="1">{}{}{}</linearGradient>"#,
                stop(center - 0.15, *color, 0.0),
                stop(center, *color, *opacity),
                stop(center + 0.15, *color, 0.0)
            );
        }
    }
    out.push_str("</defs>");

    out.push_str(r#"<g clip-path="url(#card-clip)">"#);
    let _ = write!(
        out,
        r#"<rect x="0" y="0" width="{}" height="{}" {}/>"#,
        num(w),
        num(h),
        paint("fill", canvas.background)
    );
    for (i, node) in surface.nodes.iter().enumerate() {
        write_node(&mut out, i, node, images);
    }
    for (i, overlay) in surface.overlays.iter().enumerate() {
        write_overlay(&mut out, i, overlay, w, h);
    }
    out.push_str("</g></svg>");
    out
}

fn write_node(out: &mut String, i: usize, node: &SurfaceNode, images: &ImageSet) {
    let r = node.rect;
    let s = &node.style;
    let opacity = s.opacity_or_one();
    if opacity < 1.0 {
        let _ = write!(out, r#"<g opacity="{}">"#, num(opacity));
    }
    if let Some(bg) = s.background
        && !matches!(node.kind, VisualKind::Slider { .. })
    {
        write_rect(out, r, s.radius.unwrap_or(0.0), &paint("fill", bg));
    }

    let pad = s.padding.unwrap_or(0.0).max(0.0);
    let content = Rect::new(r.x0 + pad, r.y0 + pad, r.x1 - pad, r.y1 - pad);
    let font_size = s.font_size_px();
    let bold = s.bold.unwrap_or(false);
    let color = s.color.unwrap_or(TEXT_DEFAULT);

    match &node.kind {
        VisualKind::Text { .. } | VisualKind::Select { .. } => {
            let align = s.align.unwrap_or_default();
            for (line_no, line) in node.lines.iter().enumerate() {
                write_text(
                    out,
                    content,
                    line_no,
                    line,
                    font_size,
                    bold,
                    align,
                    color,
                );
            }
        }
        VisualKind::Image { src, fit, .. } => {
            if let Some(img) = images.get(src) {
                let _ = write!(
                    out,
                    r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="{}" clip-path="url(#clip-{i})" href="{}"/>"#,
                    num(r.x0),
                    num(r.y0),
                    num(r.width()),
                    num(r.height()),
                    aspect_attr(*fit),
                    img.data_url
                );
            }
        }
        VisualKind::Swatch { color: swatch, hex } => {
            let chip = content.height().min(24.0);
            let y = content.y0 + (content.height() - chip) / 2.0;
            write_rect(
                out,
                Rect::new(content.x0, y, content.x0 + chip, y + chip),
                s.radius.unwrap_or(0.0),
                &format!(
                    r##"{} stroke="#000000" stroke-opacity="0.1""##,
                    paint("fill", *swatch)
                ),
            );
            let label = Rect::new(content.x0 + chip + 8.0, content.y0, content.x1, content.y1);
            write_text(out, label, 0, hex, font_size, false, TextAlign::Start, color);
        }
        VisualKind::Slider { fill, label, .. } => {
            let track_h = 10.0f64.min(content.height());
            let radius = s.radius.unwrap_or(track_h / 2.0);
            let track = Rect::new(content.x0, content.y0, content.x1, content.y0 + track_h);
            write_rect(out, track, radius, &paint("fill", s.background.unwrap_or(TRACK_DEFAULT)));
            if *fill > 0.0 {
                let filled = Rect::new(
                    track.x0,
                    track.y0,
                    track.x0 + track.width() * fill.clamp(0.0, 1.0),
                    track.y1,
                );
                write_rect(out, filled, radius, &paint("fill", color));
            }
            let label_box = Rect::new(content.x0, track.y1 + 4.0, content.x1, content.y1);
            write_text(out, label_box, 0, label, font_size, false, TextAlign::Start, TEXT_DEFAULT);
        }
        VisualKind::Switch { on, label } => {
            let toggle_h = content.height().min(20.0);
            let toggle_w = toggle_h * 1.8;
            let y = content.y0 + (content.height() - toggle_h) / 2.0;
            let pill = Rect::new(content.x0, y, content.x0 + toggle_w, y + toggle_h);
            let track = if *on { color } else { SWITCH_OFF };
            write_rect(out, pill, toggle_h / 2.0, &paint("fill", track));
            let knob_r = toggle_h / 2.0 - 2.0;
            let knob_x = if *on {
                pill.x1 - toggle_h / 2.0
            } else {
                pill.x0 + toggle_h / 2.0
            };
            let _ = write!(
                out,
                r##"<circle cx="{}" cy="{}" r="{}" fill="#ffffff"/>"##,
                num(knob_x),
                num(y + toggle_h / 2.0),
                num(knob_r.max(0.0))
            );
            let label_box = Rect::new(pill.x1 + 8.0, content.y0, content.x1, content.y1);
            write_text(out, label_box, 0, label, font_size, bold, TextAlign::Start, TEXT_DEFAULT);
        }
        VisualKind::Group { .. } | VisualKind::Overlay { .. } => {}
    }

    if opacity < 1.0 {
        out.push_str("</g>");
    }
}

fn write_overlay(out: &mut String, i: usize, overlay: &VisualNode, w: f64, h: f64) {
    let VisualKind::Overlay {
        effect,
        color,
        opacity,
        ..
    } = &overlay.kind
    else {
        return;
    };
    if *opacity <= 0.0 {
        return;
    }
    let full = Rect::new(0.0, 0.0, w, h);
    match effect {
        EffectKind::Shimmer => {
            write_rect(out, full, 0.0, &format!(r#"fill="url(#fx-{i})""#));
        }
        EffectKind::Pulse | EffectKind::Fade => {
            let _ = write!(
                out,
                r#"<rect x="0" y="0" width="{}" height="{}" fill="{}" fill-opacity="{}"/>"#,
                num(w),
                num(h),
                rgb_hex(*color),
                num(opacity * color.alpha_f32() as f64)
            );
        }
        EffectKind::Glow => {
            let width = 2.0 + 6.0 * opacity;
            let inset = width / 2.0;
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}"/>"#,
                num(inset),
                num(inset),
                num((w - width).max(0.0)),
                num((h - width).max(0.0)),
                rgb_hex(*color),
                num(width),
                num(*opacity)
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn write_text(
    out: &mut String,
    area: Rect,
    line_no: usize,
    text: &str,
    font_size: f64,
    bold: bool,
    align: TextAlign,
    color: Rgba8,
) {
    if text.is_empty() {
        return;
    }
    let line_h = LINE_HEIGHT_EM as f64 * font_size;
    // Baseline sits at the font's approximate ascent inside the line box.
    let baseline = area.y0 + line_h * line_no as f64 + (line_h - font_size) / 2.0 + font_size * 0.8;
    let (x, anchor) = match align {
        TextAlign::Start => (area.x0, "start"),
        TextAlign::Center => ((area.x0 + area.x1) / 2.0, "middle"),
        TextAlign::End => (area.x1, "end"),
    };
    let _ = write!(
        out,
        r#"<text x="{}" y="{}" font-family="{FONT_FAMILY}" font-size="{}" font-weight="{}" text-anchor="{anchor}" {}>{}</text>"#,
        num(x),
        num(baseline),
        num(font_size),
        if bold { "700" } else { "400" },
        paint("fill", color),
        escape_xml(text)
    );
}

fn write_rect(out: &mut String, r: Rect, radius: f64, attrs: &str) {
    let _ = write!(
        out,
        r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" {attrs}/>"#,
        num(r.x0),
        num(r.y0),
        num(r.width().max(0.0)),
        num(r.height().max(0.0)),
        num(radius.max(0.0))
    );
}

fn stop(offset: f64, color: Rgba8, opacity: f64) -> String {
    format!(
        r#"<stop offset="{}" stop-color="{}" stop-opacity="{}"/>"#,
        num(offset.clamp(0.0, 1.0)),
        rgb_hex(color),
        num(opacity.clamp(0.0, 1.0))
    )
}

fn aspect_attr(fit: ObjectFit) -> &'static str {
    match fit {
        ObjectFit::Cover => "xMidYMid slice",
        ObjectFit::Contain => "xMidYMid meet",
        ObjectFit::Fill => "none",
    }
}

fn paint(attr: &str, c: Rgba8) -> String {
    if c.a == 255 {
        format!(r#"{attr}="{}""#, rgb_hex(c))
    } else {
        format!(
            r#"{attr}="{}" {attr}-opacity="{}""#,
            rgb_hex(c),
            num(f64::from(c.alpha_f32()))
        )
    }
}

fn rgb_hex(c: Rgba8) -> String {
    format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
}

/// Fixed-precision number; trailing zeros trimmed so equal values print equally.
fn num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_owned();
    }
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_owned() } else { s.to_owned() }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/export/snapshot.rs"]
mod tests;
