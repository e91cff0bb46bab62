use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CardError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(CardError::asset("x").to_string().contains("asset error:"));
    assert!(CardError::drag("x").to_string().contains("drag error:"));
    assert!(CardError::export("x").to_string().contains("export error:"));
    assert!(CardError::markup("x").to_string().contains("markup error:"));
    assert!(CardError::store("x").to_string().contains("store error:"));
    assert!(
        CardError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert_eq!(CardError::Cancelled.to_string(), "export cancelled");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CardError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn serde_json_errors_map_to_serde_variant() {
    let err: CardError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, CardError::Serde(_)));
}

#[test]
fn warning_builder_attaches_field_and_path() {
    let w = FieldWarning::new(WarningKind::ImageTimeout, "slow")
        .for_field("avatar")
        .at_path("images.self");
    assert_eq!(w.field_id.as_deref(), Some("avatar"));
    assert_eq!(w.path.as_deref(), Some("images.self"));
    assert_eq!(w.kind, WarningKind::ImageTimeout);
}
