//! cardforge is a card template engine.
//!
//! A [`Template`] is an ordered tree of typed fields plus HTML/CSS/script markup strings. Field
//! values live in a path-addressed [`Namespace`]; rendering interpolates markup and turns every
//! field into a [`RenderedCard`] node, which the [`surface`] lays out for hit testing and drag
//! reordering. The [`export`] pipeline rasterizes a laid-out card to PNG, JPEG or an animated GIF.
//!
//! The editing workflow is session-oriented:
//!
//! - Load or create a [`Template`]
//! - Open an [`EditorSession`] and edit fields, values and markup (undoable)
//! - Reorder fields with pointer events routed through the [`DragEngine`]
//! - Export the card, optionally as an animation driven by `animation.progress`
#![forbid(unsafe_code)]

mod foundation;

/// Collaboration seams: template persistence, asset upload and content generation.
pub mod collab;
/// Drop-position geometry and the drag/reorder state machine.
pub mod drag;
/// Static and animated card export.
pub mod export;
/// `{{path}}` markup interpolation.
pub mod markup;
/// Field and template model.
pub mod model;
/// Field-to-visual rendering.
pub mod render;
/// Undoable editor session.
pub mod session;
/// Laid-out editing surface.
pub mod surface;
/// Variable namespace and path resolution.
pub mod vars;

pub use crate::foundation::config::{
    ConcurrentExport, DragConfig, EditorConfig, ExportDefaults, UploadConfig,
};
pub use crate::foundation::core::{PixelSize, Point, Rect, Rgba8, Size};
pub use crate::foundation::error::{CardError, CardResult, FieldWarning, WarningKind};

pub use crate::collab::{
    AssetUploader, Blob, ContentGenerator, InMemoryTemplateStore, InlineUploader, JsonDirStore,
    TemplatePatch, TemplateStore, UploadOutcome,
};
pub use crate::drag::{DragEngine, DragState, DropPosition};
pub use crate::export::{
    AnimationOptions, ExportArtifact, ExportFormat, ExportJob, ExportOptions, ExportStatus,
    Exporter, FrameSink, GifSink, InMemorySink, SinkConfig,
};
pub use crate::markup::{Markup, MarkupTarget};
pub use crate::model::{Field, FieldId, FieldKind, FieldPatch, FieldType, Template};
pub use crate::render::{RenderedCard, render, render_card};
pub use crate::session::EditorSession;
pub use crate::surface::Surface;
pub use crate::vars::{Edits, Namespace, build_namespace};
