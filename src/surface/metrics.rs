//! Deterministic text metrics.
//!
//! Layout must not depend on which fonts happen to be installed, so text boxes are sized from
//! fixed per-character advances. The rasterizer draws real glyphs inside these boxes.

/// Average advance of a regular glyph, in em.
pub const CHAR_ADVANCE_EM: f32 = 0.56;
/// Average advance of a bold glyph, in em.
pub const BOLD_CHAR_ADVANCE_EM: f32 = 0.6;
/// Line box height, in em.
pub const LINE_HEIGHT_EM: f32 = 1.3;

/// Width of `text` on a single line.
pub fn text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let advance = if bold {
        BOLD_CHAR_ADVANCE_EM
    } else {
        CHAR_ADVANCE_EM
    };
    text.chars().count() as f32 * advance * font_size
}

/// Height of one line box.
pub fn line_height(font_size: f32) -> f32 {
    LINE_HEIGHT_EM * font_size
}

/// Break `text` into lines.
///
/// Single-line text is returned as one line (newlines become spaces). Multi-line text keeps
/// explicit newlines and greedily wraps words at `max_width`; a word wider than the line is
/// split by characters.
pub fn wrap_lines(
    text: &str,
    font_size: f32,
    bold: bool,
    multiline: bool,
    max_width: Option<f32>,
) -> Vec<String> {
    if !multiline {
        return vec![text.replace('\n', " ")];
    }
    let limit = max_width.filter(|w| w.is_finite() && *w > 0.0);
    let mut out = Vec::new();
    for para in text.split('\n') {
        let Some(limit) = limit else {
            out.push(para.to_owned());
            continue;
        };
        let mut line = String::new();
        for word in para.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if line.is_empty() {
                word.to_owned()
            } else {
                format!("{line} {word}")
            };
            if text_width(&candidate, font_size, bold) <= limit {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            for ch in word.chars() {
                line.push(ch);
                if text_width(&line, font_size, bold) > limit && line.chars().count() > 1 {
                    line.pop();
                    out.push(std::mem::take(&mut line));
                    line.push(ch);
                }
            }
        }
        out.push(line);
    }
    out
}

/// `(width, height)` of the wrapped block.
pub fn measure_block(lines: &[String], font_size: f32, bold: bool) -> (f32, f32) {
    let width = lines
        .iter()
        .map(|l| text_width(l, font_size, bold))
        .fold(0.0f32, f32::max);
    let height = lines.len().max(1) as f32 * line_height(font_size);
    (width, height)
}

#[cfg(test)]
#[path = "../../tests/unit/surface/metrics.rs"]
mod tests;
