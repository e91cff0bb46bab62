//! Editing session and its bounded undo history.

pub(crate) mod editor;
pub(crate) mod history;

pub use editor::EditorSession;
pub use history::History;
