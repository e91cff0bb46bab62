//! Field model: typed field definitions, the persistent field tree and templates.

pub(crate) mod field;
pub(crate) mod palette;
pub(crate) mod style;
pub(crate) mod template;
pub mod tree;

pub use field::{Field, FieldId, FieldKind, FieldPatch, FieldType, ImageOptions};
pub use palette::{PALETTE, palette_field};
pub use style::{Direction, ObjectFit, StyleHints, TextAlign};
pub use template::{CardCanvas, Effect, EffectKind, RenderedMarkup, Template, TemplateStyles};
pub use tree::FieldTree;
