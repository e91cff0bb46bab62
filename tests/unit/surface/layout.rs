use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::foundation::core::Point;
use crate::model::{Field, FieldKind, Template};
use crate::render::render_card;
use crate::vars::Namespace;

fn text(id: &str) -> Field {
    Field::new(
        id,
        id,
        FieldKind::Text {
            default: None,
            multiline: false,
            max_length: None,
        },
    )
}

fn card(fields: Vec<Field>, ns: &Namespace) -> RenderedCard {
    let t = Template {
        fields: fields.into_iter().map(Arc::new).collect(),
        ..Template::new_default()
    };
    render_card(&t, ns)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.01
}

#[test]
fn root_fields_stack_in_a_padded_column() {
    let ns = Namespace::from_value(json!({"a": "hello", "b": "world"}));
    let surface = layout(&card(vec![text("a"), text("b")], &ns)).unwrap();

    let a = surface.node(&FieldId::new("a")).unwrap();
    let b = surface.node(&FieldId::new("b")).unwrap();
    // 16px text: 20.8px line box; canvas padding 24, gap 12, width 360.
    assert!(approx(a.rect.x0, 24.0));
    assert!(approx(a.rect.y0, 24.0));
    assert!(approx(a.rect.width(), 312.0));
    assert!(approx(a.rect.height(), 20.8));
    assert!(approx(b.rect.y0, 24.0 + 20.8 + 12.0));
    assert!(approx(surface.size.height, 24.0 * 2.0 + 20.8 * 2.0 + 12.0));
    assert!(approx(surface.size.width, 360.0));
    assert_eq!(a.lines, vec!["hello".to_owned()]);
}

#[test]
fn layout_is_deterministic() {
    let ns = Namespace::from_value(json!({"a": "x"}));
    let c = card(vec![text("a"), text("b")], &ns);
    assert_eq!(layout(&c).unwrap(), layout(&c).unwrap());
}

#[test]
fn group_children_get_absolute_rects() {
    let group = Field::new(
        "g",
        "Group",
        FieldKind::Group {
            children: vec![Arc::new(text("inner"))],
            direction: Direction::Column,
        },
    );
    let surface = layout(&card(vec![text("top"), group], &Namespace::empty())).unwrap();

    let g = surface.node(&FieldId::new("g")).unwrap();
    let inner = surface.node(&FieldId::new("inner")).unwrap();
    assert_eq!(inner.parent, Some(FieldId::new("g")));
    assert_eq!(inner.depth, 1);
    assert_eq!(inner.index, 0);
    assert!(approx(inner.rect.x0, g.rect.x0));
    assert!(approx(inner.rect.y0, g.rect.y0));
    assert!(g.accepts_children());
    assert!(!inner.accepts_children());
}

#[test]
fn fixed_canvas_height_is_respected() {
    let mut t = Template {
        fields: vec![Arc::new(text("a"))],
        ..Template::new_default()
    };
    t.canvas.height = Some(500.0);
    let surface = layout(&render_card(&t, &Namespace::empty())).unwrap();
    assert!(approx(surface.size.height, 500.0));
}

#[test]
fn image_height_follows_aspect_ratio() {
    let img = Field::new(
        "img",
        "Image",
        FieldKind::Image {
            default: None,
            options: crate::model::ImageOptions {
                aspect_ratio: Some(2.0),
                ..Default::default()
            },
        },
    );
    let surface = layout(&card(vec![img], &Namespace::empty())).unwrap();
    let n = surface.node(&FieldId::new("img")).unwrap();
    assert!(approx(n.rect.width(), 312.0));
    assert!(approx(n.rect.height(), 156.0));
}

#[test]
fn hit_test_prefers_deepest_node() {
    let group = Field::new(
        "g",
        "Group",
        FieldKind::Group {
            children: vec![Arc::new(text("inner"))],
            direction: Direction::Column,
        },
    );
    let surface = layout(&card(vec![group], &Namespace::empty())).unwrap();
    let inner = surface.node(&FieldId::new("inner")).unwrap().rect;
    let hit = surface.hit_test(inner.center()).unwrap();
    assert_eq!(hit.field_id, Some(FieldId::new("inner")));
    assert!(surface.hit_test(Point::new(1.0, 1.0)).is_none());
}
