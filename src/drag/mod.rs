//! Drag and reorder: pure drop geometry plus the pointer state machine.

pub(crate) mod engine;
pub mod geometry;

pub use engine::{DragEngine, DragSession, DragSource, DragState, DropCommand, apply_drop};
pub use geometry::{DropPosition, drop_position, insertion_index, reorder};
