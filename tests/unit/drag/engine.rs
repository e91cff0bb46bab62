use std::sync::Arc;

use super::*;
use crate::model::{Field, FieldKind, Template};
use crate::render::render_card;
use crate::surface::layout;
use crate::vars::Namespace;

fn text(id: &str) -> Arc<Field> {
    Arc::new(Field::new(
        id,
        id,
        FieldKind::Text {
            default: None,
            multiline: false,
            max_length: None,
        },
    ))
}

fn ids(tree: &FieldTree) -> Vec<&str> {
    tree.iter().map(|f| f.id.as_str()).collect()
}

fn fixture() -> (FieldTree, Surface) {
    let tree = vec![text("a"), text("b"), text("c")];
    let t = Template {
        fields: tree.clone(),
        ..Template::new_default()
    };
    let surface = layout(&render_card(&t, &Namespace::empty())).unwrap();
    (tree, surface)
}

fn point_in(surface: &Surface, id: &str, frac: f64) -> Point {
    let r = surface.node(&FieldId::new(id)).unwrap().rect;
    Point::new(r.center().x, r.y0 + r.height() * frac)
}

#[test]
fn press_below_activation_distance_is_a_click() {
    let (_, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    let start = point_in(&surface, "a", 0.5);
    engine.pointer_down(DragSource::Existing(FieldId::new("a")), start);
    engine.pointer_move(Point::new(start.x + 2.0, start.y), &surface);
    assert!(matches!(engine.state(), DragState::Pressed { .. }));
    assert_eq!(engine.pointer_up(&surface), None);
    assert_eq!(engine.state(), &DragState::Idle);
}

#[test]
fn drag_existing_field_before_first() {
    let (tree, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    engine.pointer_down(
        DragSource::Existing(FieldId::new("c")),
        point_in(&surface, "c", 0.5),
    );
    engine.pointer_move(point_in(&surface, "a", 0.1), &surface);
    let session = engine.session().unwrap();
    assert_eq!(session.over, Some(FieldId::new("a")));
    assert_eq!(session.position, Some(DropPosition::Before));

    let cmd = engine.pointer_up(&surface).unwrap();
    let out = apply_drop(&tree, &cmd).unwrap();
    assert_eq!(ids(&out), vec!["c", "a", "b"]);
    assert_eq!(ids(&tree), vec!["a", "b", "c"]);
}

#[test]
fn drag_existing_field_after_last() {
    let (tree, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    engine.pointer_down(
        DragSource::Existing(FieldId::new("a")),
        point_in(&surface, "a", 0.5),
    );
    engine.pointer_move(point_in(&surface, "c", 0.9), &surface);
    let cmd = engine.pointer_up(&surface).unwrap();
    assert_eq!(cmd.position, DropPosition::After);
    assert_eq!(ids(&apply_drop(&tree, &cmd).unwrap()), vec!["b", "c", "a"]);
}

#[test]
fn palette_drop_after_middle_inserts_at_two() {
    let (tree, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    engine.pointer_down(DragSource::Palette(FieldType::Switch), Point::new(-50.0, 0.0));
    engine.pointer_move(point_in(&surface, "b", 0.9), &surface);
    let cmd = engine.pointer_up(&surface).unwrap();
    assert!(cmd.source.is_new());

    let out = apply_drop(&tree, &cmd).unwrap();
    assert_eq!(ids(&out), vec!["a", "b", "switch_1", "c"]);
}

#[test]
fn hovering_the_dragged_field_is_not_a_target() {
    let (_, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    engine.pointer_down(
        DragSource::Existing(FieldId::new("b")),
        point_in(&surface, "a", 0.5),
    );
    engine.pointer_move(point_in(&surface, "b", 0.5), &surface);
    assert_eq!(engine.session().unwrap().over, None);
    assert_eq!(engine.pointer_up(&surface), None);
}

#[test]
fn release_outside_any_target_cancels() {
    let (_, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    engine.pointer_down(
        DragSource::Existing(FieldId::new("a")),
        point_in(&surface, "a", 0.5),
    );
    engine.pointer_move(point_in(&surface, "c", 0.5), &surface);
    engine.pointer_move(Point::new(2.0, 2.0), &surface);
    assert_eq!(engine.pointer_up(&surface), None);
    assert!(!engine.is_dragging());
}

#[test]
fn explicit_cancel_discards_session() {
    let (_, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    engine.pointer_down(
        DragSource::Existing(FieldId::new("a")),
        point_in(&surface, "a", 0.5),
    );
    engine.pointer_move(point_in(&surface, "c", 0.5), &surface);
    assert!(engine.is_dragging());
    engine.cancel();
    assert_eq!(engine.state(), &DragState::Idle);
    assert_eq!(engine.pointer_up(&surface), None);
}

#[test]
fn target_removed_mid_drag_is_discarded() {
    let (tree, surface) = fixture();
    let mut engine = DragEngine::new(DragConfig::default());
    engine.pointer_down(
        DragSource::Existing(FieldId::new("a")),
        point_in(&surface, "a", 0.5),
    );
    engine.pointer_move(point_in(&surface, "c", 0.9), &surface);

    let pruned = Template {
        fields: vec![tree[0].clone(), tree[1].clone()],
        ..Template::new_default()
    };
    let after = layout(&render_card(&pruned, &Namespace::empty())).unwrap();
    assert_eq!(engine.pointer_up(&after), None);
    assert_eq!(engine.state(), &DragState::Idle);
}

#[test]
fn apply_drop_with_unknown_ids_is_a_no_op() {
    let (tree, _) = fixture();
    let cmd = DropCommand {
        source: DragSource::Existing(FieldId::new("ghost")),
        target: FieldId::new("a"),
        position: DropPosition::After,
    };
    assert_eq!(apply_drop(&tree, &cmd).unwrap(), tree);
    let cmd = DropCommand {
        source: DragSource::Palette(FieldType::Text),
        target: FieldId::new("ghost"),
        position: DropPosition::After,
    };
    assert_eq!(apply_drop(&tree, &cmd).unwrap(), tree);
}

#[test]
fn drop_inside_group_appends_child() {
    let group = Arc::new(Field::new(
        "g",
        "Group",
        FieldKind::Group {
            children: vec![text("x")],
            direction: crate::model::Direction::Column,
        },
    ));
    let tree = vec![text("a"), group];
    let cmd = DropCommand {
        source: DragSource::Existing(FieldId::new("a")),
        target: FieldId::new("g"),
        position: DropPosition::Inside,
    };
    let out = apply_drop(&tree, &cmd).unwrap();
    assert_eq!(ids(&out), vec!["g"]);
    let children: Vec<&str> = out[0].children().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(children, vec!["x", "a"]);
}
