use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> RasterFrame {
    RasterFrame {
        width: w,
        height: h,
        rgba8: px.repeat((w * h) as usize),
    }
}

#[test]
fn png_keeps_size_and_alpha() {
    let bytes = encode_png(&solid(3, 2, [10, 20, 30, 128])).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(back.dimensions(), (3, 2));
    assert_eq!(back.get_pixel(0, 0).0, [10, 20, 30, 128]);
}

#[test]
fn jpeg_decodes_to_same_size() {
    let bytes = encode_still(&solid(8, 4, [200, 50, 50, 255]), ExportFormat::Jpeg, 90).unwrap();
    assert_eq!(&bytes[..2], &[0xff, 0xd8]);
    let back = image::load_from_memory(&bytes).unwrap();
    assert_eq!((back.width(), back.height()), (8, 4));
}

#[test]
fn gif_has_every_frame() {
    use image::AnimationDecoder;
    use image::codecs::gif::GifDecoder;

    let frames = vec![
        solid(4, 4, [255, 0, 0, 255]),
        solid(4, 4, [0, 255, 0, 255]),
        solid(4, 4, [0, 0, 255, 255]),
    ];
    let bytes = encode_gif(&frames, 80).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
    let decoded = GifDecoder::new(Cursor::new(bytes))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(decoded.len(), 3);
    assert_eq!(
        std::time::Duration::from(decoded[1].delay()),
        std::time::Duration::from_millis(80)
    );
}

#[test]
fn empty_gif_and_short_buffers_fail() {
    assert!(encode_gif(&[], 100).is_err());
    let bad = RasterFrame {
        width: 2,
        height: 2,
        rgba8: vec![0; 4],
    };
    let err = encode_png(&bad).unwrap_err();
    assert!(err.to_string().contains("expected 16"), "{err}");
}
