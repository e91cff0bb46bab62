use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::*;
use crate::model::{Field, FieldKind, ImageOptions, Template};
use crate::render::render_card;
use crate::surface::layout;
use crate::vars::Namespace;

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct ScriptedFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl AssetFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> CardResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match url {
            "mem://ok" => Ok(png_bytes(3, 2)),
            "mem://slow" => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(png_bytes(1, 1))
            }
            "mem://garbage" => Ok(b"not an image".to_vec()),
            _ => Err(CardError::asset("404")),
        }
    }
}

fn surface_with_images(srcs: &[&str]) -> Surface {
    let mut values = serde_json::Map::new();
    let fields = srcs
        .iter()
        .enumerate()
        .map(|(i, src)| {
            let id = format!("img{i}");
            values.insert(id.clone(), json!(src));
            Arc::new(Field::new(
                id,
                "Image",
                FieldKind::Image {
                    default: None,
                    options: ImageOptions::default(),
                },
            ))
        })
        .collect();
    let t = Template {
        fields,
        ..Template::new_default()
    };
    let ns = Namespace::from_value(serde_json::Value::Object(values));
    layout(&render_card(&t, &ns)).unwrap()
}

fn cache() -> (Arc<ScriptedFetcher>, ImageCache) {
    let fetcher = Arc::new(ScriptedFetcher {
        calls: AtomicUsize::new(0),
    });
    (fetcher.clone(), ImageCache::new(fetcher))
}

#[test]
fn data_urls_round_trip() {
    let url = to_data_url("image/png", b"abc");
    assert_eq!(url, "data:image/png;base64,YWJj");
    assert_eq!(decode_data_url(&url).unwrap(), b"abc");
    assert_eq!(decode_data_url("data:text/plain,hi").unwrap(), b"hi");
    assert!(decode_data_url("data:image/png;base64").is_err());
    assert!(decode_data_url("data:image/png;base64,@@@").is_err());
}

#[test]
fn builtin_rasters_decode() {
    let p = placeholder_image().unwrap();
    assert_eq!((p.width, p.height), (64, 48));
    assert!(p.data_url.starts_with("data:image/png;base64,"));
    let b = broken_image().unwrap();
    assert_eq!((b.width, b.height), (48, 48));
}

#[tokio::test(start_paused = true)]
async fn successful_loads_are_cached() {
    let (fetcher, cache) = cache();
    let surface = surface_with_images(&["mem://ok", "mem://ok"]);
    let (set, warnings) = cache.prepare(&surface, Duration::from_secs(1)).await.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(set.get("mem://ok").map(|i| (i.width, i.height)), Some((3, 2)));

    cache.prepare(&surface, Duration::from_secs(1)).await.unwrap();
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.cached(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_substitutes_broken_icon_with_warning() {
    let (_, cache) = cache();
    let surface = surface_with_images(&["mem://slow", "mem://ok"]);
    let (set, warnings) = cache.prepare(&surface, Duration::from_secs(2)).await.unwrap();

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::ImageTimeout);
    assert_eq!(warnings[0].field_id.as_deref(), Some("img0"));
    assert_eq!(warnings[0].path.as_deref(), Some("mem://slow"));
    assert_eq!(set.get("mem://slow"), Some(&broken_image().unwrap()));
    assert!(set.get("mem://ok").is_some());
    assert_eq!(cache.cached(), 1);
}

#[tokio::test(start_paused = true)]
async fn load_and_decode_failures_are_warnings() {
    let (_, cache) = cache();
    let surface = surface_with_images(&["mem://missing", "mem://garbage", "mem://missing"]);
    let (set, warnings) = cache.prepare(&surface, Duration::from_secs(1)).await.unwrap();
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|w| w.kind == WarningKind::ImageLoad));
    let fields: Vec<_> = warnings.iter().filter_map(|w| w.field_id.clone()).collect();
    assert_eq!(fields, vec!["img0", "img1", "img2"]);
    assert_eq!(set.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn placeholder_url_needs_no_fetch() {
    let (fetcher, cache) = cache();
    let t = Template {
        fields: vec![Arc::new(Field::new(
            "photo",
            "Photo",
            FieldKind::Image {
                default: None,
                options: ImageOptions::default(),
            },
        ))],
        ..Template::new_default()
    };
    let surface = layout(&render_card(&t, &Namespace::empty())).unwrap();
    let (set, warnings) = cache.prepare(&surface, Duration::from_secs(1)).await.unwrap();
    assert!(warnings.is_empty());
    assert!(set.get(PLACEHOLDER_IMAGE_URL).is_some());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn local_fetcher_reads_relative_paths_and_data_urls() {
    let dir = std::env::temp_dir().join(format!("cardforge-fetch-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join("pic.png"), png_bytes(2, 2)).await.unwrap();

    let fetcher = LocalFetcher::with_root(&dir);
    let bytes = fetcher.fetch("pic.png").await.unwrap();
    assert_eq!(LoadedImage::decode(&bytes).unwrap().width, 2);
    let url = to_data_url("image/png", &bytes);
    assert_eq!(fetcher.fetch(&url).await.unwrap(), bytes);
    assert!(fetcher.fetch("https://example.com/x.png").await.is_err());
    assert!(fetcher.fetch("missing.png").await.is_err());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
