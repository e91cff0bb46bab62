use serde::Serialize;

use crate::drag::geometry::{DropPosition, drop_position_in_band};
use crate::foundation::config::DragConfig;
use crate::foundation::core::Point;
use crate::foundation::error::CardResult;
use crate::model::tree::{FieldTree, add_field, find_field, move_field, next_field_id};
use crate::model::{FieldId, FieldType, palette_field};
use crate::surface::Surface;

/// What is being dragged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum DragSource {
    /// A field already in the tree.
    Existing(FieldId),
    /// A new component from the palette.
    Palette(FieldType),
}

impl DragSource {
    /// `true` for palette drags.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Palette(_))
    }

    fn field_id(&self) -> Option<&FieldId> {
        match self {
            Self::Existing(id) => Some(id),
            Self::Palette(_) => None,
        }
    }
}

/// Live drag state. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSession {
    pub source: DragSource,
    /// Field under the pointer, if it is a valid target.
    pub over: Option<FieldId>,
    pub position: Option<DropPosition>,
    pub pointer: Point,
}

/// Engine state.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is down but has not travelled the activation distance yet.
    Pressed { source: DragSource, origin: Point },
    Dragging(DragSession),
}

/// A committed drop, ready for [`apply_drop`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropCommand {
    pub source: DragSource,
    pub target: FieldId,
    pub position: DropPosition,
}

/// Pointer-driven drag state machine.
///
/// Geometry comes from the laid-out [`Surface`] passed with each event. Any geometry failure
/// resets the engine to [`DragState::Idle`] without producing a command.
#[derive(Clone, Debug, Default)]
pub struct DragEngine {
    config: DragConfig,
    state: DragState,
}

impl DragEngine {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Current session while dragging.
    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Press on a drag handle or palette item. Any previous session is discarded.
    pub fn pointer_down(&mut self, source: DragSource, at: Point) {
        if !matches!(self.state, DragState::Idle) {
            tracing::debug!("pointer_down while a drag is active; restarting");
        }
        self.state = DragState::Pressed { source, origin: at };
    }

    /// Track the pointer. Activates the drag once the pointer travelled far enough and
    /// recomputes the target and drop position on every move.
    pub fn pointer_move(&mut self, at: Point, surface: &Surface) {
        if let DragState::Pressed { source, origin } = &self.state {
            if origin.distance(at) < self.config.activation_distance_px {
                return;
            }
            tracing::debug!(source = ?source, "drag activated");
            self.state = DragState::Dragging(DragSession {
                source: source.clone(),
                over: None,
                position: None,
                pointer: at,
            });
        }

        let DragState::Dragging(session) = &mut self.state else {
            return;
        };
        session.pointer = at;

        let Some(node) = surface.hit_test(at) else {
            session.over = None;
            session.position = None;
            return;
        };
        if node.field_id.as_ref() == session.source.field_id() {
            session.over = None;
            session.position = None;
            return;
        }

        let rect = node.rect;
        match drop_position_in_band(
            at.y,
            rect.y0,
            rect.height(),
            node.accepts_children(),
            self.config.edge_band,
        ) {
            Ok(position) => {
                session.over = node.field_id.clone();
                session.position = Some(position);
            }
            Err(e) => {
                tracing::warn!(error = %e, "drag geometry failed; cancelling drag");
                self.state = DragState::Idle;
            }
        }
    }

    /// Release the pointer. Returns a command when the drag ended over a target that is still
    /// on `surface`; otherwise the drag is discarded.
    pub fn pointer_up(&mut self, surface: &Surface) -> Option<DropCommand> {
        let state = std::mem::take(&mut self.state);
        let DragState::Dragging(session) = state else {
            return None;
        };
        let (Some(target), Some(position)) = (session.over, session.position) else {
            tracing::debug!("drop outside any target; discarded");
            return None;
        };
        if surface.droppable(&target).is_none() {
            tracing::warn!(drop_target = %target, "drop target vanished mid-drag; discarded");
            return None;
        }
        Some(DropCommand {
            source: session.source,
            target,
            position,
        })
    }

    /// Explicit cancel (e.g. Escape).
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

/// Apply a drop to `tree`.
///
/// Palette drops insert a fresh field with the next free id; existing drops move the field.
/// Unknown source or target ids leave the tree unchanged.
pub fn apply_drop(tree: &FieldTree, cmd: &DropCommand) -> CardResult<FieldTree> {
    if find_field(tree, &cmd.target).is_none() {
        tracing::warn!(drop_target = %cmd.target, "drop target not in tree; ignored");
        return Ok(tree.clone());
    }
    match &cmd.source {
        DragSource::Existing(id) => {
            if find_field(tree, id).is_none() {
                tracing::warn!(source = %id, "dragged field not in tree; ignored");
                return Ok(tree.clone());
            }
            Ok(move_field(tree, id, &cmd.target, cmd.position))
        }
        DragSource::Palette(ty) => {
            let field = palette_field(*ty, next_field_id(tree, *ty));
            add_field(tree, field, Some(&cmd.target), cmd.position)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/drag/engine.rs"]
mod tests;
