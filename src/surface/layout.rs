use taffy::geometry::{Rect as TRect, Size as TSize};
use taffy::prelude::{AvailableSpace, NodeId};
use taffy::style::{Dimension, FlexDirection, LengthPercentage, Style};

use crate::foundation::core::{Rect, Size};
use crate::foundation::error::{CardError, CardResult};
use crate::model::{Direction, FieldId};
use crate::render::{RenderedCard, VisualKind, VisualNode};
use crate::surface::metrics::{line_height, measure_block, text_width, wrap_lines};
use crate::surface::{Surface, SurfaceNode};

const DEFAULT_IMAGE_ASPECT: f32 = 4.0 / 3.0;
const UNBOUNDED_IMAGE_WIDTH: f32 = 160.0;
const SLIDER_TRACK_PX: f32 = 10.0;
const SLIDER_MIN_WIDTH_PX: f32 = 120.0;
const SWITCH_TOGGLE_WIDTH_PX: f32 = 36.0;
const LABEL_GAP_PX: f32 = 8.0;
const SWATCH_CHIP_PX: f32 = 24.0;

/// Intrinsic sizing rule attached to a Taffy leaf.
#[derive(Debug, Clone)]
enum Measure {
    Text {
        text: String,
        font_size: f32,
        bold: bool,
        multiline: bool,
    },
    /// Fill the available width, height from width / ratio.
    Aspect(f32),
    Fixed(TSize<f32>),
}

impl Measure {
    fn for_node(node: &VisualNode) -> Option<Self> {
        let font_size = node.style.font_size_px() as f32;
        let bold = node.style.bold.unwrap_or(false);
        Some(match &node.kind {
            VisualKind::Text { text, multiline } => Self::Text {
                text: text.clone(),
                font_size,
                bold,
                multiline: *multiline,
            },
            VisualKind::Select { display, .. } => Self::Text {
                text: display.clone(),
                font_size,
                bold,
                multiline: false,
            },
            VisualKind::Image { aspect_ratio, .. } => Self::Aspect(
                aspect_ratio
                    .map(|r| r as f32)
                    .filter(|r| r.is_finite() && *r > 0.0)
                    .unwrap_or(DEFAULT_IMAGE_ASPECT),
            ),
            VisualKind::Swatch { hex, .. } => Self::Fixed(TSize {
                width: SWATCH_CHIP_PX + LABEL_GAP_PX + text_width(hex, font_size, false),
                height: SWATCH_CHIP_PX.max(line_height(font_size)),
            }),
            VisualKind::Slider { label, .. } => Self::Fixed(TSize {
                width: SLIDER_MIN_WIDTH_PX.max(text_width(label, font_size, false)),
                height: SLIDER_TRACK_PX + LABEL_GAP_PX / 2.0 + line_height(font_size),
            }),
            VisualKind::Switch { label, .. } => Self::Fixed(TSize {
                width: SWITCH_TOGGLE_WIDTH_PX + LABEL_GAP_PX + text_width(label, font_size, bold),
                height: line_height(font_size),
            }),
            VisualKind::Group { .. } | VisualKind::Overlay { .. } => return None,
        })
    }

    fn measure(&self, max_width: Option<f32>) -> TSize<f32> {
        match self {
            Self::Text {
                text,
                font_size,
                bold,
                multiline,
            } => {
                let lines = wrap_lines(text, *font_size, *bold, *multiline, max_width);
                let (w, h) = measure_block(&lines, *font_size, *bold);
                TSize {
                    width: max_width.map_or(w, |m| w.min(m)),
                    height: h,
                }
            }
            Self::Aspect(ratio) => {
                let width = max_width.unwrap_or(UNBOUNDED_IMAGE_WIDTH);
                TSize {
                    width,
                    height: width / ratio,
                }
            }
            Self::Fixed(size) => *size,
        }
    }
}

struct Entry {
    taffy: NodeId,
    parent_entry: Option<usize>,
    node: SurfaceNode,
}

struct Builder {
    taffy: taffy::TaffyTree<Measure>,
    entries: Vec<Entry>,
}

/// Lay a rendered card out with flexbox.
///
/// The card is a column with the canvas padding and gap; groups become nested flex
/// containers in their own direction. Text is sized with the fixed metrics of
/// [`crate::surface::metrics`], so the same card always produces the same rects.
#[tracing::instrument(level = "trace", skip_all, fields(nodes = card.nodes.len()))]
pub fn layout(card: &RenderedCard) -> CardResult<Surface> {
    let canvas = &card.canvas;
    let mut b = Builder {
        taffy: taffy::TaffyTree::new(),
        entries: Vec::new(),
    };
    // Rects must agree with the fractional line heights of the text metrics.
    b.taffy.disable_rounding();

    let gap = LengthPercentage::length(non_negative(canvas.gap));
    let root_style = Style {
        flex_direction: FlexDirection::Column,
        padding: uniform(non_negative(canvas.padding)),
        gap: TSize {
            width: gap,
            height: gap,
        },
        size: TSize {
            width: Dimension::length(canvas.width as f32),
            height: canvas
                .height
                .map_or(Dimension::auto(), |h| Dimension::length(h as f32)),
        },
        ..Style::default()
    };
    let root = b.taffy.new_leaf(root_style).map_err(layout_err)?;
    for (index, node) in card.nodes.iter().enumerate() {
        let child = b.build(node, None, None, index, 0)?;
        b.taffy.add_child(root, child).map_err(layout_err)?;
    }

    let available = TSize {
        width: AvailableSpace::Definite(canvas.width as f32),
        height: canvas
            .height
            .map_or(AvailableSpace::MaxContent, |h| AvailableSpace::Definite(h as f32)),
    };
    b.taffy
        .compute_layout_with_measure(
            root,
            available,
            |known, avail, _node_id, ctx, _style| {
                let Some(ctx) = ctx else {
                    return known.unwrap_or(TSize::ZERO);
                };
                let max_width = known.width.or(match avail.width {
                    AvailableSpace::Definite(w) => Some(w),
                    _ => None,
                });
                let m = ctx.measure(max_width);
                TSize {
                    width: known.width.unwrap_or(m.width),
                    height: known.height.unwrap_or(m.height),
                }
            },
        )
        .map_err(layout_err)?;

    let root_size = b.taffy.layout(root).map_err(layout_err)?.size;
    let size = Size::new(
        canvas.width,
        canvas.height.unwrap_or(f64::from(root_size.height)),
    );

    let mut nodes: Vec<SurfaceNode> = Vec::with_capacity(b.entries.len());
    for entry in b.entries {
        let l = b.taffy.layout(entry.taffy).map_err(layout_err)?;
        let (ox, oy) = entry
            .parent_entry
            .and_then(|i| nodes.get(i))
            .map_or((0.0, 0.0), |p| (p.rect.x0, p.rect.y0));
        let x0 = ox + f64::from(l.location.x);
        let y0 = oy + f64::from(l.location.y);
        let mut node = entry.node;
        node.rect = Rect::new(
            x0,
            y0,
            x0 + f64::from(l.size.width),
            y0 + f64::from(l.size.height),
        );
        node.lines = final_lines(&node);
        nodes.push(node);
    }

    Ok(Surface {
        canvas: canvas.clone(),
        size,
        nodes,
        overlays: card.overlays.clone(),
        decorations: Vec::new(),
    })
}

impl Builder {
    fn build(
        &mut self,
        node: &VisualNode,
        parent_entry: Option<usize>,
        parent_field: Option<&FieldId>,
        index: usize,
        depth: usize,
    ) -> CardResult<NodeId> {
        let style = node_style(node);
        let id = match Measure::for_node(node) {
            Some(m) => self.taffy.new_leaf_with_context(style, m),
            None => self.taffy.new_leaf(style),
        }
        .map_err(layout_err)?;

        let kind = match &node.kind {
            VisualKind::Group { direction, .. } => VisualKind::Group {
                direction: *direction,
                children: Vec::new(),
            },
            other => other.clone(),
        };
        let me = self.entries.len();
        self.entries.push(Entry {
            taffy: id,
            parent_entry,
            node: SurfaceNode {
                field_id: node.field_id.clone(),
                parent: parent_field.cloned(),
                index,
                depth,
                rect: Rect::ZERO,
                style: node.style.clone(),
                placeholder: node.placeholder,
                kind,
                lines: Vec::new(),
            },
        });

        if let VisualKind::Group { children, .. } = &node.kind {
            for (i, child) in children.iter().enumerate() {
                let cid = self.build(child, Some(me), node.field_id.as_ref(), i, depth + 1)?;
                self.taffy.add_child(id, cid).map_err(layout_err)?;
            }
        }
        Ok(id)
    }
}

fn node_style(node: &VisualNode) -> Style {
    let s = &node.style;
    let mut style = Style {
        size: TSize {
            width: dimension(s.width),
            height: dimension(s.height),
        },
        padding: uniform(s.padding.map_or(0.0, non_negative)),
        flex_grow: s.grow.map_or(0.0, non_negative),
        ..Style::default()
    };
    if let VisualKind::Group { direction, .. } = &node.kind {
        style.flex_direction = match direction {
            Direction::Row => FlexDirection::Row,
            Direction::Column => FlexDirection::Column,
        };
        let gap = LengthPercentage::length(s.gap.map_or(0.0, non_negative));
        style.gap = TSize {
            width: gap,
            height: gap,
        };
    }
    style
}

fn final_lines(node: &SurfaceNode) -> Vec<String> {
    let pad = node.style.padding.map_or(0.0, non_negative);
    let content_width = (node.rect.width() as f32 - 2.0 * pad).max(0.0);
    let font_size = node.style.font_size_px() as f32;
    let bold = node.style.bold.unwrap_or(false);
    match &node.kind {
        VisualKind::Text { text, multiline } => {
            wrap_lines(text, font_size, bold, *multiline, Some(content_width))
        }
        VisualKind::Select { display, .. } => vec![display.clone()],
        _ => Vec::new(),
    }
}

fn dimension(v: Option<f64>) -> Dimension {
    v.filter(|v| v.is_finite() && *v >= 0.0)
        .map_or(Dimension::auto(), |v| Dimension::length(v as f32))
}

fn uniform(v: f32) -> TRect<LengthPercentage> {
    TRect {
        left: LengthPercentage::length(v),
        right: LengthPercentage::length(v),
        top: LengthPercentage::length(v),
        bottom: LengthPercentage::length(v),
    }
}

fn non_negative(v: f64) -> f32 {
    if v.is_finite() { v.max(0.0) as f32 } else { 0.0 }
}

fn layout_err(e: taffy::TaffyError) -> CardError {
    CardError::Other(anyhow::anyhow!("layout failed: {e}"))
}

#[cfg(test)]
#[path = "../../tests/unit/surface/layout.rs"]
mod tests;
