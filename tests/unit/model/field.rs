use serde_json::json;

use super::*;

fn text(id: &str) -> Field {
    Field::new(
        id,
        "Text",
        FieldKind::Text {
            default: None,
            multiline: false,
            max_length: None,
        },
    )
}

fn select(default: &[&str], multiple: bool) -> Field {
    Field::new(
        "size",
        "Size",
        FieldKind::Select {
            default: default.iter().map(|s| (*s).to_owned()).collect(),
            choices: vec!["S".into(), "M".into(), "L".into()],
            multiple,
            separator: ", ".into(),
        },
    )
}

fn validation_message(f: &Field) -> String {
    let err = f.validate().unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("validation error:"), "{msg}");
    msg
}

#[test]
fn binding_path_falls_back_to_id() {
    assert_eq!(text("title").binding_path(), "title");
    assert_eq!(text("title").with_path("card.title").binding_path(), "card.title");
    assert_eq!(text("title").with_path("").binding_path(), "title");
}

#[test]
fn json_form_uses_type_tag_and_camel_case() {
    let v = json!({
        "id": "header",
        "label": "Header",
        "type": "group",
        "direction": "row",
        "children": [
            { "id": "t", "label": "Title", "type": "text", "defaultValue": "Hi", "maxLength": 10 },
            { "id": "on", "label": "On", "type": "switch" }
        ]
    });
    let f: Field = serde_json::from_value(v).unwrap();
    assert_eq!(f.field_type(), FieldType::Group);
    assert!(f.accepts_children());
    assert_eq!(f.children().len(), 2);
    assert_eq!(
        f.children()[0].kind,
        FieldKind::Text {
            default: Some("Hi".into()),
            multiline: false,
            max_length: Some(10),
        }
    );
    assert_eq!(f.children()[1].field_type(), FieldType::Switch);
    f.validate().unwrap();

    let back = serde_json::to_value(&f).unwrap();
    assert_eq!(back["type"], "group");
    assert_eq!(back["children"][0]["maxLength"], 10);
    assert_eq!(back["children"][0]["defaultValue"], "Hi");
    let again: Field = serde_json::from_value(back).unwrap();
    assert_eq!(again, f);
}

#[test]
fn defaults_become_namespace_values() {
    assert_eq!(text("t").default_value(), None);

    let color = Field::new(
        "c",
        "Color",
        FieldKind::Color {
            default: Some(Rgba8::rgb(255, 0, 0)),
            preset_colors: Vec::new(),
        },
    );
    assert_eq!(color.default_value(), Some(json!("#ff0000")));

    assert_eq!(select(&["M"], false).default_value(), Some(json!("M")));
    assert_eq!(select(&["S", "L"], true).default_value(), Some(json!(["S", "L"])));
    assert_eq!(select(&[], true).default_value(), None);

    let slider = Field::new(
        "s",
        "Level",
        FieldKind::Slider {
            default: Some(40.0),
            min: 0.0,
            max: 100.0,
            step: 1.0,
            unit: None,
        },
    );
    assert_eq!(slider.default_value(), Some(json!(40.0)));

    let switch = Field::new("on", "On", FieldKind::Switch { default: Some(true) });
    assert_eq!(switch.default_value(), Some(json!(true)));
}

#[test]
fn fallbacks_only_for_value_like_types() {
    assert_eq!(text("t").fallback_value(), None);

    let bare_color = Field::new(
        "c",
        "Color",
        FieldKind::Color {
            default: None,
            preset_colors: Vec::new(),
        },
    );
    assert_eq!(bare_color.fallback_value(), Some(json!("#cccccc")));

    let preset_color = Field::new(
        "c",
        "Color",
        FieldKind::Color {
            default: None,
            preset_colors: vec![Rgba8::rgb(0, 0, 255), Rgba8::rgb(0, 255, 0)],
        },
    );
    assert_eq!(preset_color.fallback_value(), Some(json!("#0000ff")));

    assert_eq!(select(&[], false).fallback_value(), Some(json!("S")));
    assert_eq!(select(&[], true).fallback_value(), Some(json!(["S"])));

    let switch = Field::new("on", "On", FieldKind::Switch { default: None });
    assert_eq!(switch.fallback_value(), Some(json!(false)));
}

#[test]
fn validation_rejects_bad_fields() {
    let mut unlabeled = text("t");
    unlabeled.label = "  ".into();
    assert!(validation_message(&unlabeled).contains("must have a label"));

    let mut unnamed = text("t");
    unnamed.id = FieldId::new("");
    assert!(validation_message(&unnamed).contains("id must be non-empty"));

    let bad_path = text("t").with_path("a..b");
    assert!(validation_message(&bad_path).contains("malformed path 'a..b'"));

    assert!(validation_message(&select(&["XL"], false)).contains("'XL' is not a choice"));
    assert!(validation_message(&select(&["S", "M"], false)).contains("single selection"));
    select(&["S", "M"], true).validate().unwrap();

    let inverted = Field::new(
        "s",
        "Level",
        FieldKind::Slider {
            default: None,
            min: 10.0,
            max: 10.0,
            step: 1.0,
            unit: None,
        },
    );
    assert!(validation_message(&inverted).contains("finite min < max"));

    let out_of_range = Field::new(
        "s",
        "Level",
        FieldKind::Slider {
            default: Some(120.0),
            min: 0.0,
            max: 100.0,
            step: 1.0,
            unit: None,
        },
    );
    assert!(validation_message(&out_of_range).contains("outside [0, 100]"));
}

#[test]
fn duplicate_ids_inside_a_group_are_rejected() {
    let group = Field::new(
        "g",
        "Group",
        FieldKind::Group {
            children: vec![Arc::new(text("a")), Arc::new(text("a"))],
            direction: Direction::Column,
        },
    );
    assert!(validation_message(&group).contains("duplicate field id 'a'"));
}

#[test]
fn patch_updates_only_named_properties() {
    let original = text("t").with_path("card.title");

    let relabel = FieldPatch {
        label: Some("Heading".into()),
        ..FieldPatch::default()
    };
    let out = relabel.apply(&original);
    assert_eq!(out.label, "Heading");
    assert_eq!(out.path.as_deref(), Some("card.title"));
    assert_eq!(out.id, original.id);

    let clear: FieldPatch = serde_json::from_value(json!({ "path": null })).unwrap();
    assert_eq!(clear.path, Some(None));
    assert_eq!(clear.apply(&original).binding_path(), "t");

    let untouched: FieldPatch = serde_json::from_value(json!({ "hidden": true })).unwrap();
    assert_eq!(untouched.path, None);
    let out = untouched.apply(&original);
    assert!(out.hidden);
    assert_eq!(out.path.as_deref(), Some("card.title"));
}

#[test]
fn serialized_patches_keep_the_untouched_path() {
    let relabel = FieldPatch {
        label: Some("Heading".into()),
        ..FieldPatch::default()
    };
    let v = serde_json::to_value(&relabel).unwrap();
    assert!(v.get("path").is_none(), "{v}");
    let back: FieldPatch = serde_json::from_value(v).unwrap();
    assert_eq!(back, relabel);

    let clear = FieldPatch {
        path: Some(None),
        ..FieldPatch::default()
    };
    let v = serde_json::to_value(&clear).unwrap();
    assert_eq!(v["path"], Value::Null);
    let back: FieldPatch = serde_json::from_value(v).unwrap();
    assert_eq!(back.path, Some(None));
}

#[test]
fn group_kind_patch_keeps_children() {
    let group = Field::new(
        "g",
        "Group",
        FieldKind::Group {
            children: vec![Arc::new(text("a"))],
            direction: Direction::Column,
        },
    );
    let patch = FieldPatch {
        kind: Some(FieldKind::Group {
            children: Vec::new(),
            direction: Direction::Row,
        }),
        ..FieldPatch::default()
    };
    let out = patch.apply(&group);
    assert_eq!(out.children().len(), 1);
    assert!(matches!(
        out.kind,
        FieldKind::Group {
            direction: Direction::Row,
            ..
        }
    ));
}
