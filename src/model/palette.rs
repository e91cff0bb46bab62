use crate::model::field::{Field, FieldId, FieldKind, FieldType, ImageOptions};
use crate::model::style::Direction;

/// Component types offered by the palette, in display order.
pub const PALETTE: [FieldType; 7] = [
    FieldType::Text,
    FieldType::Image,
    FieldType::Color,
    FieldType::Select,
    FieldType::Slider,
    FieldType::Switch,
    FieldType::Group,
];

/// Fresh field of type `ty` as dropped from the component palette.
pub fn palette_field(ty: FieldType, id: FieldId) -> Field {
    let (label, kind) = match ty {
        FieldType::Text => (
            "Text",
            FieldKind::Text {
                default: None,
                multiline: false,
                max_length: None,
            },
        ),
        FieldType::Image => (
            "Image",
            FieldKind::Image {
                default: None,
                options: ImageOptions {
                    aspect_ratio: Some(4.0 / 3.0),
                    ..ImageOptions::default()
                },
            },
        ),
        FieldType::Color => (
            "Color",
            FieldKind::Color {
                default: None,
                preset_colors: Vec::new(),
            },
        ),
        FieldType::Select => (
            "Select",
            FieldKind::Select {
                default: Vec::new(),
                choices: vec!["Option 1".to_owned(), "Option 2".to_owned()],
                multiple: false,
                separator: ", ".to_owned(),
            },
        ),
        FieldType::Slider => (
            "Slider",
            FieldKind::Slider {
                default: None,
                min: 0.0,
                max: 100.0,
                step: 1.0,
                unit: None,
            },
        ),
        FieldType::Switch => ("Switch", FieldKind::Switch { default: None }),
        FieldType::Group => (
            "Group",
            FieldKind::Group {
                children: Vec::new(),
                direction: Direction::Row,
            },
        ),
    };
    Field::new(id.0, label, kind)
}
