use crate::export::encode::encode_gif;
use crate::export::raster::RasterFrame;
use crate::foundation::error::{CardError, CardResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    /// Display time of each frame.
    pub frame_delay_ms: u32,
}

/// Consumer of captured animation frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing indices starting at 0.
/// `abort` discards everything pushed since `begin`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CardResult<()>;
    /// Push one frame in order.
    fn push_frame(&mut self, idx: usize, frame: &RasterFrame) -> CardResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> CardResult<()>;
    /// Drop partial output after a cancellation or failure.
    fn abort(&mut self) {}
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(usize, RasterFrame)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(usize, RasterFrame)] {
        &self.frames
    }

    /// `true` once `end` was called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CardResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: usize, frame: &RasterFrame) -> CardResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> CardResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
    }
}

/// Collects frames and encodes a looping GIF on `end`.
#[derive(Debug, Default)]
pub struct GifSink {
    cfg: Option<SinkConfig>,
    frames: Vec<RasterFrame>,
    bytes: Option<Vec<u8>>,
}

impl GifSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded bytes once `end` succeeded.
    pub fn take_bytes(&mut self) -> Option<Vec<u8>> {
        self.bytes.take()
    }
}

impl FrameSink for GifSink {
    fn begin(&mut self, cfg: SinkConfig) -> CardResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.bytes = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: usize, frame: &RasterFrame) -> CardResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| CardError::export("gif sink used before begin"))?;
        if idx != self.frames.len() {
            return Err(CardError::export(format!(
                "gif frame {idx} out of order (expected {})",
                self.frames.len()
            )));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(CardError::export(format!(
                "gif frame {idx} is {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> CardResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| CardError::export("gif sink used before begin"))?;
        let bytes = encode_gif(&self.frames, cfg.frame_delay_ms)?;
        self.frames.clear();
        self.bytes = Some(bytes);
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.bytes = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/sink.rs"]
mod tests;
