//! Template renderer: `(fields, namespace) -> visual nodes`.

pub(crate) mod renderer;
pub(crate) mod visual;

pub use renderer::{render, render_card, slider_fill};
pub use visual::{BROKEN_IMAGE_URL, PLACEHOLDER_IMAGE_URL, RenderedCard, VisualKind, VisualNode};
