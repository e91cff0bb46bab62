use super::*;

#[test]
fn parses_short_long_and_alpha_hex() {
    assert_eq!(Rgba8::parse_hex("#fff").unwrap(), Rgba8::WHITE);
    assert_eq!(Rgba8::parse_hex("ff0000").unwrap(), Rgba8::rgb(255, 0, 0));
    assert_eq!(
        Rgba8::parse_hex("#0000ff80").unwrap(),
        Rgba8::rgba(0, 0, 255, 128)
    );
    assert!(Rgba8::parse_hex("#12345").is_err());
    assert!(Rgba8::parse_hex("#zzzzzz").is_err());
}

#[test]
fn hex_output_omits_opaque_alpha() {
    assert_eq!(Rgba8::rgb(18, 52, 86).to_hex(), "#123456");
    assert_eq!(Rgba8::rgba(18, 52, 86, 0).to_hex(), "#12345600");
}

#[test]
fn serde_uses_hex_strings() {
    let c: Rgba8 = serde_json::from_value(serde_json::json!("#336699")).unwrap();
    assert_eq!(c, Rgba8::rgb(0x33, 0x66, 0x99));
    assert_eq!(serde_json::to_value(c).unwrap(), serde_json::json!("#336699"));
}

#[test]
fn pixel_size_rounds_up_and_rejects_bad_scale() {
    let s = PixelSize::scaled(100.5, 40.0, 2.0).unwrap();
    assert_eq!(s, PixelSize { width: 201, height: 80 });
    assert!(PixelSize::scaled(10.0, 10.0, 0.0).is_err());
    assert!(PixelSize::scaled(10.0, 10.0, f64::NAN).is_err());
    assert!(PixelSize::scaled(20_000.0, 10.0, 1.0).is_err());
}
