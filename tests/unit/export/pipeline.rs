use std::sync::Mutex;

use serde_json::json;

use super::*;
use crate::model::{Effect, EffectKind};

fn exporter(policy: ConcurrentExport) -> Exporter {
    Exporter::new(
        Arc::new(LocalFetcher::new()),
        Rasterizer::without_fonts(),
        policy,
    )
}

fn small(format: ExportFormat) -> ExportOptions {
    ExportOptions::default()
        .with_format(format)
        .with_scale(0.25)
}

fn card_surface() -> Surface {
    layout(&render_card(&Template::new_default(), &Namespace::empty())).unwrap()
}

fn frames_of(template: Template) -> TemplateFrames {
    TemplateFrames::new(Arc::new(template), Namespace::empty())
}

fn fading_template() -> Template {
    let mut t = Template::new_default();
    t.styles.effects = vec![Effect {
        name: "fade".into(),
        kind: EffectKind::Fade,
        color: Some(crate::foundation::core::Rgba8::BLACK),
        intensity: 0.8,
    }];
    t
}

fn anim(frames: usize) -> AnimationOptions {
    AnimationOptions {
        frame_count: frames,
        frame_duration_ms: 100,
    }
}

#[tokio::test]
async fn static_png_export_is_deterministic() {
    let exp = exporter(ConcurrentExport::Reject);
    let surface = card_surface();
    let mut seen = Vec::new();
    let a = exp
        .export_static(&surface, &small(ExportFormat::Png), &mut |p| seen.push(p.status))
        .await
        .unwrap();
    let b = exp
        .export_static(&surface, &small(ExportFormat::Png), &mut |_| {})
        .await
        .unwrap();

    assert_eq!(a.bytes, b.bytes);
    assert_eq!(&a.bytes[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(a.width, 90);
    assert_eq!(a.height, (surface.size.height * 0.25).ceil() as u32);
    assert_eq!(a.mime, "image/png");
    assert_eq!(a.filename, "card.png");
    assert_eq!(a.frame_count, 1);
    assert!(a.url.starts_with("data:image/png;base64,"));
    assert!(a.warnings.is_empty());

    assert_eq!(seen.first(), Some(&ExportStatus::Capturing));
    assert_eq!(seen.last(), Some(&ExportStatus::Done));
    assert_eq!(exp.slot().job().status, ExportStatus::Done);
    assert_eq!(exp.host().mounted(), 0);
}

#[tokio::test]
async fn jpeg_export_is_opaque_and_decodes() {
    let exp = exporter(ConcurrentExport::Reject);
    let art = exp
        .export_static(&card_surface(), &small(ExportFormat::Jpeg), &mut |_| {})
        .await
        .unwrap();
    assert_eq!(art.mime, "image/jpeg");
    assert_eq!(art.filename, "card.jpg");
    let img = image::load_from_memory(&art.bytes).unwrap();
    assert_eq!((img.width(), img.height()), (art.width, art.height));
    assert!(!img.color().has_alpha());
}

#[tokio::test]
async fn invalid_options_never_start_a_job() {
    let exp = exporter(ConcurrentExport::Reject);
    let err = exp
        .export_static(&card_surface(), &small(ExportFormat::Png).with_scale(0.0), &mut |_| {})
        .await
        .unwrap_err();
    assert!(err.to_string().contains("scale"));
    assert_eq!(exp.slot().job().status, ExportStatus::Idle);
    assert!(!exp.slot().is_busy());
}

#[tokio::test]
async fn missing_images_become_warnings() {
    let dir = std::env::temp_dir().join(format!("cardforge-missing-{}", std::process::id()));
    let exp = Exporter::new(
        Arc::new(LocalFetcher::with_root(dir)),
        Rasterizer::without_fonts(),
        ConcurrentExport::Reject,
    );
    let ns = Namespace::from_value(json!({ "images": { "self": "nope.png" } }));
    let surface = layout(&render_card(&Template::new_default(), &ns)).unwrap();
    let art = exp
        .export_static(&surface, &small(ExportFormat::Png), &mut |_| {})
        .await
        .unwrap();
    assert_eq!(art.warnings.len(), 1);
    assert_eq!(art.warnings[0].kind, crate::foundation::error::WarningKind::ImageLoad);
    assert_eq!(art.warnings[0].field_id.as_deref(), Some("photo"));
}

#[tokio::test(start_paused = true)]
async fn animated_run_feeds_sink_in_order() {
    let exp = exporter(ConcurrentExport::Reject);
    let source = frames_of(Template::new_default());
    let mut sink = crate::export::sink::InMemorySink::new();
    let token = JobToken::new();
    let mut captured = Vec::new();
    let run = exp
        .export_animated_into(
            &source,
            &anim(4),
            &small(ExportFormat::Gif),
            &mut sink,
            &token,
            &mut |p| captured.push(p.frames_captured),
        )
        .await
        .unwrap();

    assert_eq!(run.frames, 4);
    assert!(sink.ended());
    let idx: Vec<usize> = sink.frames().iter().map(|(i, _)| *i).collect();
    assert_eq!(idx, vec![0, 1, 2, 3]);
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (run.size.width, run.size.height));
    assert_eq!(cfg.frame_delay_ms, 100);
    assert!(captured.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(captured.last(), Some(&4));

    // No effects: every frame is the same snapshot.
    let first = &sink.frames()[0].1;
    assert!(sink.frames().iter().all(|(_, f)| f == first));
    assert_eq!(exp.slot().job().status, ExportStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn animated_frames_follow_progress() {
    let exp = exporter(ConcurrentExport::Reject);
    let mut sink = crate::export::sink::InMemorySink::new();
    exp.export_animated_into(
        &frames_of(fading_template()),
        &anim(3),
        &small(ExportFormat::Gif),
        &mut sink,
        &JobToken::new(),
        &mut |_| {},
    )
    .await
    .unwrap();
    let frames = sink.frames();
    assert_ne!(frames[0].1, frames[1].1);
    assert_ne!(frames[1].1, frames[2].1);
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_capture_discards_partial_frames() {
    let exp = exporter(ConcurrentExport::Reject);
    let mut sink = crate::export::sink::InMemorySink::new();
    let token = JobToken::new();
    let canceller = token.clone();
    let err = exp
        .export_animated_into(
            &frames_of(Template::new_default()),
            &anim(10),
            &small(ExportFormat::Gif),
            &mut sink,
            &token,
            &mut move |p| {
                if p.frames_captured == 3 {
                    canceller.cancel();
                }
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(sink.frames().is_empty());
    assert!(!sink.ended());
    assert_eq!(exp.host().mounted(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_gif_export_publishes_nothing() {
    let exp = exporter(ConcurrentExport::Reject);
    let slot = exp.slot().clone();
    let err = exp
        .export_animated(
            &frames_of(Template::new_default()),
            &anim(10),
            &small(ExportFormat::Gif),
            &mut move |p| {
                if p.frames_captured == 3 {
                    slot.cancel_active();
                }
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    let job = exp.slot().job();
    assert_eq!(job.status, ExportStatus::Cancelled);
    assert!(job.result.is_none());
    assert!(exp.slot().last_artifact().is_none());
}

#[tokio::test(start_paused = true)]
async fn gif_export_produces_looping_animation() {
    use image::AnimationDecoder;
    use image::codecs::gif::GifDecoder;

    let exp = exporter(ConcurrentExport::Reject);
    let art = exp
        .export_animated(
            &frames_of(fading_template()),
            &anim(5),
            &small(ExportFormat::Gif),
            &mut |_| {},
        )
        .await
        .unwrap();
    assert_eq!(art.mime, "image/gif");
    assert_eq!(art.filename, "card.gif");
    assert_eq!(art.frame_count, 5);
    let decoded = GifDecoder::new(std::io::Cursor::new(art.bytes.clone()))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(decoded.len(), 5);
    assert_eq!(exp.slot().last_artifact(), Some(art));
}

#[tokio::test(start_paused = true)]
async fn newer_export_supersedes_running_one() {
    let exp = exporter(ConcurrentExport::Supersede);
    let source = frames_of(Template::new_default());
    let opts = small(ExportFormat::Gif);
    let (long, short) = (anim(5), anim(3));
    let statuses = Mutex::new(Vec::new());
    let mut ignore = |_: ExportProgress| {};
    let mut record = |p: ExportProgress| statuses.lock().unwrap().push(p.status);

    let (first, second) = tokio::join!(
        exp.export_animated(&source, &long, &opts, &mut ignore),
        exp.export_animated(&source, &short, &opts, &mut record),
    );

    assert!(first.unwrap_err().is_cancelled());
    let second = second.unwrap();
    assert_eq!(second.frame_count, 3);
    let job = exp.slot().job();
    assert_eq!(job.generation, 2);
    assert_eq!(job.status, ExportStatus::Done);
    assert_eq!(exp.slot().last_artifact().map(|a| a.frame_count), Some(3));
    assert_eq!(statuses.lock().unwrap().last(), Some(&ExportStatus::Done));
    assert_eq!(exp.host().mounted(), 0);
}

#[tokio::test(start_paused = true)]
async fn reject_policy_refuses_overlapping_export() {
    let exp = exporter(ConcurrentExport::Reject);
    let source = frames_of(Template::new_default());
    let opts = small(ExportFormat::Gif);
    let schedule = anim(3);
    let (mut a, mut b) = (|_: ExportProgress| {}, |_: ExportProgress| {});
    let (first, second) = tokio::join!(
        exp.export_animated(&source, &schedule, &opts, &mut a),
        exp.export_animated(&source, &schedule, &opts, &mut b),
    );
    assert!(first.is_ok());
    assert!(second.unwrap_err().to_string().contains("already in flight"));
}
