use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::foundation::core::Point;
use crate::model::{Effect, Field, FieldKind, Template};
use crate::render::render_card;
use crate::surface::{Decoration, layout};
use crate::vars::Namespace;

fn text_template(text: &str) -> (Template, Namespace) {
    let t = Template {
        fields: vec![Arc::new(Field::new(
            "title",
            "Title",
            FieldKind::Text {
                default: None,
                multiline: false,
                max_length: None,
            },
        ))],
        ..Template::new_default()
    };
    (t, Namespace::from_value(json!({ "title": text })))
}

fn surface_for(t: &Template, ns: &Namespace) -> Surface {
    layout(&render_card(t, ns)).unwrap()
}

#[test]
fn guard_unmounts_on_drop() {
    let host = OffscreenHost::new();
    let (t, ns) = text_template("hi");
    let surface = surface_for(&t, &ns);
    {
        let a = host.mount(&surface);
        let _b = host.mount(&surface);
        assert_eq!(host.mounted(), 2);
        assert_eq!(a.surface().nodes.len(), surface.nodes.len());
    }
    assert_eq!(host.mounted(), 0);
}

#[test]
fn mounted_clone_has_no_decorations() {
    let host = OffscreenHost::new();
    let (t, ns) = text_template("hi");
    let mut surface = surface_for(&t, &ns);
    let id = surface.hit_test(Point::new(30.0, 30.0)).unwrap().field_id.clone();
    surface.set_hover(id.as_ref());
    assert!(matches!(surface.decorations[..], [Decoration::Hover { .. }]));

    let guard = host.mount(&surface);
    assert!(guard.surface().decorations.is_empty());
    assert_eq!(
        to_svg(guard.surface(), &ImageSet::default()),
        to_svg(&surface.without_decorations(), &ImageSet::default())
    );
    assert_eq!(surface.decorations.len(), 1);
}

#[test]
fn svg_is_deterministic_and_escaped() {
    let (t, ns) = text_template("Tom & <Jerry>");
    let a = to_svg(&surface_for(&t, &ns), &ImageSet::default());
    let b = to_svg(&surface_for(&t, &ns), &ImageSet::default());
    assert_eq!(a, b);
    assert!(a.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    assert!(a.contains("Tom &amp; &lt;Jerry&gt;"));
    assert!(!a.contains("<Jerry>"));
    assert!(a.ends_with("</g></svg>"));
}

#[test]
fn svg_size_matches_surface() {
    let (t, ns) = text_template("x");
    let surface = surface_for(&t, &ns);
    let svg = to_svg(&surface, &ImageSet::default());
    let expected = format!(
        "width=\"{}\" height=\"{}\"",
        num(surface.size.width),
        num(surface.size.height)
    );
    assert!(svg.contains(&expected), "{svg}");
}

#[test]
fn fade_overlay_is_written_only_when_visible() {
    let (mut t, ns) = text_template("x");
    t.styles.effects = vec![Effect {
        name: "intro".into(),
        kind: EffectKind::Fade,
        color: Some(Rgba8::rgb(255, 0, 0)),
        intensity: 0.5,
    }];
    let start = to_svg(&surface_for(&t, &ns), &ImageSet::default());
    assert!(!start.contains("fill-opacity=\"0.25\""));

    let mid = ns.with_value("animation.progress", json!(0.5));
    let svg = to_svg(&surface_for(&t, &mid), &ImageSet::default());
    assert!(svg.contains("fill=\"#ff0000\" fill-opacity=\"0.25\""), "{svg}");
}

#[test]
fn numbers_are_trimmed() {
    assert_eq!(num(1.0), "1");
    assert_eq!(num(1.25), "1.25");
    assert_eq!(num(1.0 / 3.0), "0.333");
    assert_eq!(num(-0.0001), "0");
    assert_eq!(num(f64::NAN), "0");
}
