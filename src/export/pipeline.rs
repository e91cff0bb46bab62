//! Static and animated export.

use std::sync::Arc;

use serde_json::Value;
use xxhash_rust::xxh3::xxh3_64;

use crate::export::encode::encode_still;
use crate::export::images::{AssetFetcher, ImageCache, LocalFetcher, to_data_url};
use crate::export::job::{ActiveJob, ExportProgress, ExportSlot, ExportStatus, JobToken};
use crate::export::options::{AnimationOptions, ExportArtifact, ExportFormat, ExportOptions};
use crate::export::raster::{RasterFrame, Rasterizer, flatten_onto};
use crate::export::sink::{FrameSink, GifSink, SinkConfig};
use crate::export::snapshot::{OffscreenHost, to_svg};
use crate::foundation::config::ConcurrentExport;
use crate::foundation::core::{PixelSize, Size};
use crate::foundation::error::{CardError, CardResult, FieldWarning};
use crate::model::Template;
use crate::render::render_card;
use crate::surface::{Surface, layout};
use crate::vars::{ANIMATION_PROGRESS_PATH, Namespace};

/// Progress callback; invoked on every status change and after every captured frame.
pub type ProgressFn<'a> = dyn FnMut(ExportProgress) + Send + 'a;

/// Produces the surface for a given animation progress.
pub trait FrameSource: Send + Sync {
    fn surface_at(&self, progress: f64) -> CardResult<Surface>;
}

/// Re-renders a template with `animation.progress` set for each frame.
#[derive(Clone, Debug)]
pub struct TemplateFrames {
    template: Arc<Template>,
    namespace: Namespace,
}

impl TemplateFrames {
    pub fn new(template: Arc<Template>, namespace: Namespace) -> Self {
        Self {
            template,
            namespace,
        }
    }
}

impl FrameSource for TemplateFrames {
    fn surface_at(&self, progress: f64) -> CardResult<Surface> {
        let value = serde_json::Number::from_f64(progress.clamp(0.0, 1.0))
            .map(Value::Number)
            .unwrap_or(Value::Null);
        let ns = self.namespace.with_value(ANIMATION_PROGRESS_PATH, value);
        layout(&render_card(&self.template, &ns))
    }
}

/// Export pipeline: image loading, offscreen snapshot, rasterization and encoding.
///
/// Every job runs through the shared [`ExportSlot`]. Cloning shares the cache, host and
/// slot.
#[derive(Clone, Debug)]
pub struct Exporter {
    images: Arc<ImageCache>,
    host: Arc<OffscreenHost>,
    rasterizer: Rasterizer,
    slot: ExportSlot,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(
            Arc::new(LocalFetcher::new()),
            Rasterizer::with_system_fonts(),
            ConcurrentExport::default(),
        )
    }
}

impl Exporter {
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        rasterizer: Rasterizer,
        policy: ConcurrentExport,
    ) -> Self {
        Self {
            images: Arc::new(ImageCache::new(fetcher)),
            host: Arc::new(OffscreenHost::new()),
            rasterizer,
            slot: ExportSlot::new(policy),
        }
    }

    pub fn slot(&self) -> &ExportSlot {
        &self.slot
    }

    pub fn host(&self) -> &OffscreenHost {
        &self.host
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// Export the current surface as a single image.
    #[tracing::instrument(level = "info", skip_all, fields(format = ?opts.format, scale = opts.scale))]
    pub async fn export_static(
        &self,
        surface: &Surface,
        opts: &ExportOptions,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<ExportArtifact> {
        opts.validate()?;
        let job = self.slot.start()?;
        let outcome = self.run_static(surface, opts, job.token(), progress).await;
        self.publish(job, outcome, progress)
    }

    /// Export `frame_count` frames as an animated GIF.
    #[tracing::instrument(level = "info", skip_all, fields(frames = anim.frame_count))]
    pub async fn export_animated(
        &self,
        source: &dyn FrameSource,
        anim: &AnimationOptions,
        opts: &ExportOptions,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<ExportArtifact> {
        opts.validate()?;
        anim.validate()?;
        let job = self.slot.start()?;
        let outcome = self.run_animated(source, anim, opts, job.token(), progress).await;
        self.publish(job, outcome, progress)
    }

    /// Drive `source` through the frame schedule into `sink`.
    ///
    /// Cancellation is checked between frames; a cancelled run aborts the sink so partial
    /// frame sets are never emitted.
    pub async fn export_animated_into(
        &self,
        source: &dyn FrameSource,
        anim: &AnimationOptions,
        opts: &ExportOptions,
        sink: &mut dyn FrameSink,
        token: &JobToken,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<AnimatedRun> {
        anim.validate()?;
        let result = self
            .capture_frames(source, anim, opts, sink, token, progress)
            .await;
        if result.is_err() {
            sink.abort();
        }
        result
    }

    async fn run_animated(
        &self,
        source: &dyn FrameSource,
        anim: &AnimationOptions,
        opts: &ExportOptions,
        token: &JobToken,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<ExportArtifact> {
        let mut sink = GifSink::new();
        let run = self
            .export_animated_into(source, anim, opts, &mut sink, token, progress)
            .await?;
        let bytes = sink
            .take_bytes()
            .ok_or_else(|| CardError::export("gif sink produced no output"))?;
        Ok(artifact(
            ExportFormat::Gif,
            opts,
            bytes,
            run.size,
            run.frames,
            run.warnings,
        ))
    }

    async fn capture_frames(
        &self,
        source: &dyn FrameSource,
        anim: &AnimationOptions,
        opts: &ExportOptions,
        sink: &mut dyn FrameSink,
        token: &JobToken,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<AnimatedRun> {
        let n = anim.frame_count;
        let mut warnings = Vec::new();
        let mut logical: Option<Size> = None;
        let mut pixels: Option<PixelSize> = None;
        let mut previous: Option<(u64, RasterFrame)> = None;

        self.emit(token, progress, ExportStatus::Capturing, 0.0, 0);
        for i in 0..n {
            token.check()?;
            let p = anim.progress_at(i);
            tokio::time::sleep(anim.frame_duration()).await;
            token.check()?;

            let mut surface = source.surface_at(p)?;
            let size = *logical.get_or_insert(surface.size);
            surface.size = size;
            let px = match pixels {
                Some(px) => px,
                None => {
                    let px = PixelSize::scaled(size.width, size.height, opts.scale)?;
                    sink.begin(SinkConfig {
                        width: px.width,
                        height: px.height,
                        frame_count: n,
                        frame_delay_ms: u32::try_from(anim.frame_duration_ms).unwrap_or(u32::MAX),
                    })?;
                    pixels = Some(px);
                    px
                }
            };

            let guard = self.host.mount(&surface);
            let (images, mut frame_warnings) =
                self.images.prepare(guard.surface(), opts.image_timeout).await?;
            let svg = to_svg(guard.surface(), &images);
            drop(guard);
            let fingerprint = xxh3_64(svg.as_bytes());

            let frame = match previous.take() {
                Some((fp, raster)) if fp == fingerprint => {
                    tracing::trace!(frame = i, "snapshot unchanged; reusing raster");
                    raster
                }
                _ => {
                    let mut raster = self.rasterizer.rasterize(&svg, px)?;
                    flatten_onto(&mut raster, opts.background);
                    raster
                }
            };
            sink.push_frame(i, &frame)?;
            previous = Some((fingerprint, frame));
            if i == 0 {
                warnings.append(&mut frame_warnings);
            }

            self.emit(
                token,
                progress,
                ExportStatus::Capturing,
                (i + 1) as f64 / n as f64,
                i + 1,
            );
        }

        token.check()?;
        self.emit(token, progress, ExportStatus::Encoding, 1.0, n);
        sink.end()?;
        Ok(AnimatedRun {
            size: pixels.unwrap_or(PixelSize {
                width: 1,
                height: 1,
            }),
            frames: n,
            warnings,
        })
    }

    async fn run_static(
        &self,
        surface: &Surface,
        opts: &ExportOptions,
        token: &JobToken,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<ExportArtifact> {
        self.emit(token, progress, ExportStatus::Capturing, 0.0, 0);
        let guard = self.host.mount(surface);
        let (images, warnings) = self
            .images
            .prepare(guard.surface(), opts.image_timeout)
            .await?;
        token.check()?;
        let svg = to_svg(guard.surface(), &images);
        let size = guard.surface().size;
        drop(guard);

        self.emit(token, progress, ExportStatus::Encoding, 0.5, 1);
        let px = PixelSize::scaled(size.width, size.height, opts.scale)?;
        let mut raster = self.rasterizer.rasterize(&svg, px)?;
        if !opts.format.has_alpha() {
            flatten_onto(&mut raster, opts.background);
        }
        let bytes = encode_still(&raster, opts.format, opts.quality)?;
        token.check()?;
        Ok(artifact(opts.format, opts, bytes, px, 1, warnings))
    }

    fn emit(
        &self,
        token: &JobToken,
        progress: &mut ProgressFn<'_>,
        status: ExportStatus,
        value: f64,
        frames_captured: usize,
    ) {
        let p = ExportProgress {
            status,
            progress: value,
            frames_captured,
        };
        self.slot.report(token, p);
        progress(p);
    }

    fn publish(
        &self,
        job: ActiveJob<'_>,
        outcome: CardResult<ExportArtifact>,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<ExportArtifact> {
        let generation = job.token().generation();
        if let Err(e) = &outcome {
            if e.is_cancelled() {
                tracing::info!("export cancelled");
            } else {
                tracing::error!(error = %e, "export failed");
            }
        }
        let published = job.finish(outcome);
        let job = self.slot.job();
        if job.generation == generation {
            progress(ExportProgress {
                status: job.status,
                progress: job.progress,
                frames_captured: job.frames_captured,
            });
        }
        published
    }
}

/// Outcome of [`Exporter::export_animated_into`].
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedRun {
    /// Pixel size of every frame.
    pub size: PixelSize,
    pub frames: usize,
    /// Image warnings from the first frame.
    pub warnings: Vec<FieldWarning>,
}

fn artifact(
    format: ExportFormat,
    opts: &ExportOptions,
    bytes: Vec<u8>,
    size: PixelSize,
    frame_count: usize,
    warnings: Vec<FieldWarning>,
) -> ExportArtifact {
    ExportArtifact {
        url: to_data_url(format.mime(), &bytes),
        bytes,
        mime: format.mime(),
        width: size.width,
        height: size.height,
        filename: opts.file_name(format),
        frame_count,
        warnings,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
