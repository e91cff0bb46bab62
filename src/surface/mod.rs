//! Laid-out editing surface: absolute rects for every rendered node, hit testing and the
//! transient interaction decorations drawn on top while editing.

pub(crate) mod layout;
pub(crate) mod metrics;

use serde::Serialize;

use crate::drag::geometry::DropPosition;
use crate::foundation::core::{Point, Rect, Size};
use crate::model::{CardCanvas, FieldId, StyleHints};
use crate::render::{VisualKind, VisualNode};

pub use layout::layout;
pub use metrics::{line_height, text_width, wrap_lines};

/// Thickness of the drop indicator bar in px.
pub const DROP_INDICATOR_PX: f64 = 2.0;

/// One laid-out field node. Group children are separate entries that follow their group.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceNode {
    pub field_id: Option<FieldId>,
    /// Owning group; `None` for root fields.
    pub parent: Option<FieldId>,
    /// Index within the owning list of visible fields.
    pub index: usize,
    pub depth: usize,
    /// Absolute rect in logical px.
    pub rect: Rect,
    pub style: StyleHints,
    pub placeholder: bool,
    /// Paint payload; a group's `children` are empty here.
    pub kind: VisualKind,
    /// Wrapped lines for text-like nodes.
    pub lines: Vec<String>,
}

impl SurfaceNode {
    /// Whether this node can receive `Inside` drops.
    pub fn accepts_children(&self) -> bool {
        matches!(self.kind, VisualKind::Group { .. })
    }
}

/// Editing-only chrome. Never part of an export.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Decoration {
    /// Outline around the hovered field.
    Hover { field_id: FieldId, rect: Rect },
    /// Insertion marker for the current drag.
    DropIndicator {
        field_id: FieldId,
        position: DropPosition,
        rect: Rect,
    },
}

/// A field the drag engine may drop onto.
#[derive(Clone, Debug, PartialEq)]
pub struct Droppable {
    pub field_id: FieldId,
    pub parent: Option<FieldId>,
    pub index: usize,
    pub rect: Rect,
    pub accepts_children: bool,
}

/// The laid-out card.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    pub canvas: CardCanvas,
    /// Card size in logical px.
    pub size: Size,
    /// Field nodes in paint order (pre-order).
    pub nodes: Vec<SurfaceNode>,
    /// Effect overlays covering the whole card.
    pub overlays: Vec<VisualNode>,
    pub decorations: Vec<Decoration>,
}

impl Surface {
    /// Card bounds at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.size)
    }

    /// Node for `id`, if it is visible.
    pub fn node(&self, id: &FieldId) -> Option<&SurfaceNode> {
        self.nodes.iter().find(|n| n.field_id.as_ref() == Some(id))
    }

    /// Every field node as a drop target, in paint order.
    pub fn droppable_targets(&self) -> Vec<Droppable> {
        self.nodes.iter().filter_map(droppable).collect()
    }

    /// Drop target for `id`; `None` when the field is not on the surface.
    pub fn droppable(&self, id: &FieldId) -> Option<Droppable> {
        self.node(id).and_then(droppable)
    }

    /// Deepest field node containing `p`.
    pub fn hit_test(&self, p: Point) -> Option<&SurfaceNode> {
        self.nodes
            .iter()
            .filter(|n| n.field_id.is_some() && n.rect.contains(p))
            .max_by_key(|n| n.depth)
    }

    /// Replace the hover outline.
    pub fn set_hover(&mut self, id: Option<&FieldId>) {
        self.decorations
            .retain(|d| !matches!(d, Decoration::Hover { .. }));
        if let Some(id) = id
            && let Some(rect) = self.node(id).map(|n| n.rect)
        {
            self.decorations.push(Decoration::Hover {
                field_id: id.clone(),
                rect,
            });
        }
    }

    /// Replace the drop indicator.
    pub fn set_drop_indicator(&mut self, target: Option<(&FieldId, DropPosition)>) {
        self.decorations
            .retain(|d| !matches!(d, Decoration::DropIndicator { .. }));
        let Some((id, position)) = target else {
            return;
        };
        let Some(r) = self.node(id).map(|n| n.rect) else {
            return;
        };
        let half = DROP_INDICATOR_PX / 2.0;
        let rect = match position {
            DropPosition::Before => Rect::new(r.x0, r.y0 - half, r.x1, r.y0 + half),
            DropPosition::After => Rect::new(r.x0, r.y1 - half, r.x1, r.y1 + half),
            DropPosition::Inside => r,
        };
        self.decorations.push(Decoration::DropIndicator {
            field_id: id.clone(),
            position,
            rect,
        });
    }

    /// Copy with all interaction chrome removed.
    pub fn without_decorations(&self) -> Surface {
        Surface {
            decorations: Vec::new(),
            ..self.clone()
        }
    }
}

fn droppable(node: &SurfaceNode) -> Option<Droppable> {
    Some(Droppable {
        field_id: node.field_id.clone()?,
        parent: node.parent.clone(),
        index: node.index,
        rect: node.rect,
        accepts_children: node.accepts_children(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/surface/surface.rs"]
mod tests;
