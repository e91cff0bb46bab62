//! Variable resolver and namespace assembly.

pub(crate) mod namespace;
pub mod path;

pub use namespace::{ANIMATION_PROGRESS_PATH, Edits, Namespace, build_namespace};
