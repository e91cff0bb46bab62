use std::io::Cursor;

use anyhow::Context;
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{Delay, ExtendedColorType, Frame, ImageEncoder, RgbaImage};

use crate::export::options::ExportFormat;
use crate::export::raster::RasterFrame;
use crate::foundation::error::{CardError, CardResult};

/// NeuQuant sampling speed; 10 trades a little palette quality for much faster encodes.
const GIF_SPEED: i32 = 10;

/// Encode a single frame as PNG or JPEG.
pub fn encode_still(frame: &RasterFrame, format: ExportFormat, quality: u8) -> CardResult<Vec<u8>> {
    match format {
        ExportFormat::Png => encode_png(frame),
        ExportFormat::Jpeg => encode_jpeg(frame, quality),
        ExportFormat::Gif => encode_gif(std::slice::from_ref(frame), 0),
    }
}

pub fn encode_png(frame: &RasterFrame) -> CardResult<Vec<u8>> {
    check_len(frame)?;
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&frame.rgba8, frame.width, frame.height, ExtendedColorType::Rgba8)
        .context("encode png")?;
    Ok(out)
}

/// JPEG has no alpha; callers flatten first, the alpha byte is dropped here.
pub fn encode_jpeg(frame: &RasterFrame, quality: u8) -> CardResult<Vec<u8>> {
    check_len(frame)?;
    let rgb: Vec<u8> = frame
        .rgba8
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .write_image(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .context("encode jpeg")?;
    Ok(out)
}

/// Looping GIF with a fixed per-frame delay.
pub fn encode_gif(frames: &[RasterFrame], delay_ms: u32) -> CardResult<Vec<u8>> {
    if frames.is_empty() {
        return Err(CardError::export("gif needs at least one frame"));
    }
    let mut out = Vec::new();
    {
        let mut enc = GifEncoder::new_with_speed(Cursor::new(&mut out), GIF_SPEED);
        enc.set_repeat(Repeat::Infinite).context("gif repeat")?;
        for frame in frames {
            check_len(frame)?;
            let img = RgbaImage::from_raw(frame.width, frame.height, frame.rgba8.clone())
                .ok_or_else(|| CardError::export("frame buffer does not match its size"))?;
            let delay = Delay::from_numer_denom_ms(delay_ms, 1);
            enc.encode_frame(Frame::from_parts(img, 0, 0, delay))
                .context("encode gif frame")?;
        }
    }
    Ok(out)
}

fn check_len(frame: &RasterFrame) -> CardResult<()> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.rgba8.len() != expected {
        return Err(CardError::export(format!(
            "frame buffer is {} bytes, expected {expected}",
            frame.rgba8.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/export/encode.rs"]
mod tests;
