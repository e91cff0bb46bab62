//! Export pipeline: snapshot a surface offscreen, rasterize it and encode PNG, JPEG or an
//! animated GIF, with progress reporting, per-image timeouts and cancellation.

pub(crate) mod encode;
pub(crate) mod images;
pub(crate) mod job;
pub(crate) mod options;
pub(crate) mod pipeline;
pub(crate) mod raster;
pub(crate) mod sink;
pub(crate) mod snapshot;

pub use encode::{encode_gif, encode_jpeg, encode_png, encode_still};
pub use images::{
    AssetFetcher, ImageCache, ImageSet, LoadedImage, LocalFetcher, broken_image, decode_data_url,
    placeholder_image, to_data_url,
};
pub use job::{ActiveJob, ExportJob, ExportProgress, ExportSlot, ExportStatus, JobToken};
pub use options::{AnimationOptions, ExportArtifact, ExportFormat, ExportOptions};
pub use pipeline::{AnimatedRun, Exporter, FrameSource, ProgressFn, TemplateFrames};
pub use raster::{RasterFrame, Rasterizer, flatten_onto};
pub use sink::{FrameSink, GifSink, InMemorySink, SinkConfig};
pub use snapshot::{OffscreenGuard, OffscreenHost, to_svg};
