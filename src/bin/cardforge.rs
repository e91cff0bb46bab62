use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use cardforge::export::{LocalFetcher, Rasterizer};
use cardforge::{
    AnimationOptions, EditorConfig, EditorSession, Edits, ExportArtifact, ExportFormat,
    ExportOptions, Exporter, Template,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cardforge", version)]
struct Cli {
    /// Editor config JSON; `CARDFORGE_*` environment variables apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a template JSON.
    Validate(InputArgs),
    /// Interpolate the template's HTML/CSS/script and print them as JSON.
    Markup(InputArgs),
    /// Export a single PNG or JPEG.
    Render(RenderArgs),
    /// Export an animated GIF driven by `animation.progress`.
    Animate(AnimateArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Variable values as a JSON object; nested objects become dotted paths.
    #[arg(long)]
    vars: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// `png` or `jpeg`; guessed from the output extension when omitted.
    #[arg(long)]
    format: Option<String>,

    /// Device pixel scale.
    #[arg(long)]
    scale: Option<f64>,

    /// JPEG quality (1-100).
    #[arg(long)]
    quality: Option<u8>,
}

#[derive(Args, Debug)]
struct AnimateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Number of frames to capture.
    #[arg(long, default_value_t = 12)]
    frames: usize,

    /// Delay per frame in milliseconds.
    #[arg(long, default_value_t = 100)]
    delay: u64,

    /// Device pixel scale.
    #[arg(long)]
    scale: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EditorConfig::from_json_file(path)?,
        None => EditorConfig::from_env(),
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Markup(args) => cmd_markup(args, config),
        Command::Render(args) => rt.block_on(cmd_render(args, config)),
        Command::Animate(args) => rt.block_on(cmd_animate(args, config)),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,cardforge={level}")));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbosity > 0),
        )
        .try_init();
}

fn load_template(path: &Path) -> anyhow::Result<Template> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read template '{}'", path.display()))?;
    let template = Template::from_json(&text)
        .with_context(|| format!("load template '{}'", path.display()))?;
    Ok(template)
}

fn open_session(args: &InputArgs, config: EditorConfig) -> anyhow::Result<EditorSession> {
    let template = load_template(&args.template)?;
    let assets_root = args
        .template
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let exporter = Exporter::new(
        Arc::new(LocalFetcher::with_root(assets_root)),
        Rasterizer::with_system_fonts(),
        config.export.concurrent,
    );
    let mut session = EditorSession::new(template, config)?.with_exporter(exporter);

    if let Some(vars_path) = &args.vars {
        let text = std::fs::read_to_string(vars_path)
            .with_context(|| format!("read vars '{}'", vars_path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parse vars '{}'", vars_path.display()))?;
        anyhow::ensure!(
            value.is_object(),
            "vars '{}' must be a JSON object",
            vars_path.display()
        );
        let edits = Edits::from_json_object(&value);
        for (path, v) in edits.iter() {
            session
                .set_value(path, v.clone())
                .with_context(|| format!("set '{path}'"))?;
        }
    }
    Ok(session)
}

fn cmd_validate(args: InputArgs) -> anyhow::Result<()> {
    let template = load_template(&args.template)?;
    let count = cardforge::model::tree::iter_depth_first(&template.fields).len();
    println!("ok: {count} fields");
    Ok(())
}

fn cmd_markup(args: InputArgs, config: EditorConfig) -> anyhow::Result<()> {
    let session = open_session(&args, config)?;
    let markup = session.render_markup()?;
    println!("{}", serde_json::to_string_pretty(&markup)?);
    Ok(())
}

async fn cmd_render(args: RenderArgs, config: EditorConfig) -> anyhow::Result<()> {
    let format = match &args.format {
        Some(f) => ExportFormat::parse(f)?,
        None => format_from_extension(&args.out)?,
    };
    anyhow::ensure!(
        format != ExportFormat::Gif,
        "use `cardforge animate` for GIF output"
    );

    let mut opts = ExportOptions::from_config(&config).with_format(format);
    if let Some(scale) = args.scale {
        opts = opts.with_scale(scale);
    }
    if let Some(quality) = args.quality {
        opts.quality = quality;
    }
    let session = open_session(&args.input, config)?;
    let mut progress = |p: cardforge::export::ExportProgress| {
        tracing::debug!(status = ?p.status, progress = p.progress, "export progress");
    };
    let artifact = session.export_static(&opts, &mut progress).await?;
    write_artifact(&args.out, &artifact)
}

async fn cmd_animate(args: AnimateArgs, config: EditorConfig) -> anyhow::Result<()> {
    let mut opts = ExportOptions::from_config(&config).with_format(ExportFormat::Gif);
    if let Some(scale) = args.scale {
        opts = opts.with_scale(scale);
    }
    let anim = AnimationOptions {
        frame_count: args.frames,
        frame_duration_ms: args.delay,
    };
    let session = open_session(&args.input, config)?;
    let mut progress = |p: cardforge::export::ExportProgress| {
        tracing::debug!(
            status = ?p.status,
            frames = p.frames_captured,
            "export progress"
        );
    };
    let artifact = session
        .export_animated(&anim, &opts, &mut progress)
        .await?;
    write_artifact(&args.out, &artifact)
}

fn format_from_extension(path: &Path) -> anyhow::Result<ExportFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("cannot infer format from '{}'", path.display()))?;
    Ok(ExportFormat::parse(ext)?)
}

fn write_artifact(out: &Path, artifact: &ExportArtifact) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out, &artifact.bytes)
        .with_context(|| format!("write '{}'", out.display()))?;

    for w in &artifact.warnings {
        tracing::warn!(field = ?w.field_id, kind = ?w.kind, "{}", w.message);
    }
    eprintln!(
        "wrote {} ({}x{}, {} frame(s))",
        out.display(),
        artifact.width,
        artifact.height,
        artifact.frame_count
    );
    Ok(())
}
