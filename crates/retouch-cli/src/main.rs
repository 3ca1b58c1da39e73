use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::ImageFormat;
use retouch_contracts::events::EventWriter;
use retouch_contracts::models::{ModelRegistry, ModelSelector};
use retouch_contracts::errors::RestoreError;
use retouch_contracts::options::{
    AspectRatio, BaseRestorationType, CameraAngle, CameraQuality, RestorationOptions,
    RestoredImage, SourceImage,
};
use retouch_contracts::prompt::{compose, prompt_diff, prompt_fingerprint};
use retouch_engine::{non_empty_env, ClientConfig, GeminiRestorer};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "retouch", version, about = "Restore photos with Gemini's image model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a photo to the model and write the restored image.
    Restore(RestoreArgs),
    /// Print the instruction text the chosen options produce.
    Prompt(PromptArgs),
    /// List known image models.
    Models,
}

#[derive(Debug, Args)]
struct OptionArgs {
    /// JSON file with restoration options; flags below override it.
    #[arg(long)]
    options: Option<PathBuf>,
    #[arg(long)]
    base: Option<BaseRestorationType>,
    #[arg(long)]
    passport: bool,
    #[arg(long)]
    full_body: bool,
    #[arg(long)]
    change_clothes: bool,
    #[arg(long)]
    clothing: Option<String>,
    #[arg(long)]
    background: Option<String>,
    #[arg(long)]
    pose: Option<String>,
    #[arg(long)]
    custom: Option<String>,
    #[arg(long)]
    quality: Option<CameraQuality>,
    #[arg(long)]
    angle: Option<CameraAngle>,
    #[arg(long)]
    aspect: Option<AspectRatio>,
}

#[derive(Debug, Parser)]
struct RestoreArgs {
    #[arg(long)]
    image: PathBuf,
    /// Output file, or a directory to write `restored-<millis>.<ext>` into.
    #[arg(long)]
    out: PathBuf,
    /// Declared mime type; inferred from the image extension when omitted.
    #[arg(long)]
    mime: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// Falls back to GEMINI_API_KEY, then GOOGLE_API_KEY.
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    restoration: OptionArgs,
}

#[derive(Debug, Parser)]
struct PromptArgs {
    /// Options file to diff the composed prompt against.
    #[arg(long)]
    against: Option<PathBuf>,
    #[command(flatten)]
    restoration: OptionArgs,
}

const RESTORE_FAILED_EXIT: i32 = 2;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("retouch error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Restore(args) => run_restore(args),
        Command::Prompt(args) => run_prompt(args),
        Command::Models => {
            run_models();
            Ok(0)
        }
    }
}

fn run_restore(args: RestoreArgs) -> Result<i32> {
    let options = resolve_options(&args.restoration)?;
    let bytes =
        fs::read(&args.image).with_context(|| format!("failed reading {}", args.image.display()))?;
    let mime_type = match args.mime.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(mime) => mime.to_string(),
        None => mime_for_path(&args.image).with_context(|| {
            format!(
                "cannot infer mime type for {}; pass --mime",
                args.image.display()
            )
        })?,
    };
    let image = SourceImage::new(bytes, mime_type);

    let mut config = ClientConfig::from_env();
    let requested_model = args.model.clone().unwrap_or_else(|| config.model.clone());
    let selection = ModelSelector::default()
        .select(Some(requested_model.as_str()))
        .map_err(anyhow::Error::msg)?;
    if let Some(note) = selection.note.as_deref() {
        eprintln!("{note}");
    }
    config.model = selection.name;
    config.timeout = args.timeout_secs.map(Duration::from_secs);

    let mut restorer = GeminiRestorer::from_config(&config)?;
    if let Some(events_path) = args.events.as_ref() {
        restorer = restorer.with_events(EventWriter::new(events_path, Uuid::new_v4().to_string()));
    }

    let api_key = resolve_api_key(args.api_key.as_deref(), non_empty_env);
    finish_restore(&args.out, restorer.restore(&image, &options, &api_key))
}

fn finish_restore(out: &Path, result: Result<RestoredImage, RestoreError>) -> Result<i32> {
    match result {
        Ok(restored) => {
            let path = write_restored(out, &restored)?;
            println!("Restored image written to {}", path.display());
            Ok(0)
        }
        Err(err) => {
            eprintln!("Restoration failed [{}]: {err}", err.kind());
            Ok(RESTORE_FAILED_EXIT)
        }
    }
}

fn run_prompt(args: PromptArgs) -> Result<i32> {
    let options = resolve_options(&args.restoration)?;
    if let Err(err) = options.validate() {
        eprintln!("warning: {err}");
    }
    let prompt = compose(&options);

    let Some(against) = args.against.as_ref() else {
        println!("{prompt}");
        eprintln!("sha256: {}", prompt_fingerprint(&prompt));
        return Ok(0);
    };

    let other = load_options_file(against)?;
    for line in diff_against(&other, &prompt) {
        println!("{line}");
    }
    Ok(0)
}

fn diff_against(other: &RestorationOptions, prompt: &str) -> Vec<String> {
    prompt_diff(&compose(other), prompt)
        .unwrap_or_else(|| vec!["Prompts are identical.".to_string()])
}

fn run_models() {
    let registry = ModelRegistry::default();
    let default_name = registry
        .default_model()
        .map(|model| model.name.clone())
        .unwrap_or_default();
    for model in registry.list() {
        let marker = if model.name == default_name { "*" } else { " " };
        let replies = if model.supports_text_response {
            "image+text"
        } else {
            "image"
        };
        println!("{marker} {:<32} {:<11} {}", model.name, replies, model.label);
    }
}

fn load_options_file(path: &Path) -> Result<RestorationOptions> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    RestorationOptions::from_json(&raw)
        .with_context(|| format!("invalid restoration options in {}", path.display()))
}

fn resolve_options(args: &OptionArgs) -> Result<RestorationOptions> {
    let mut options = match args.options.as_ref() {
        Some(path) => load_options_file(path)?,
        None => RestorationOptions::default(),
    };

    if let Some(base) = args.base {
        options.base_type = base;
    }
    options.additive.passport |= args.passport;
    options.additive.full_body |= args.full_body;
    options.additive.change_clothes |= args.change_clothes;

    let text_overrides = [
        (&args.clothing, &mut options.clothing_description),
        (&args.background, &mut options.background_description),
        (&args.pose, &mut options.pose_description),
        (&args.custom, &mut options.custom_instruction),
    ];
    for (flag, field) in text_overrides {
        if let Some(value) = flag {
            *field = value.clone();
        }
    }

    if let Some(quality) = args.quality {
        options.camera_quality = quality;
    }
    if let Some(angle) = args.angle {
        options.camera_angle = angle;
    }
    if let Some(aspect) = args.aspect {
        options.aspect_ratio = aspect;
    }
    Ok(options)
}

/// `--api-key`, then `GEMINI_API_KEY`, then `GOOGLE_API_KEY`. An empty
/// result is passed through so the engine reports missing credentials.
fn resolve_api_key(explicit: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> String {
    let non_blank = |value: String| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };
    explicit
        .map(str::to_string)
        .and_then(non_blank)
        .or_else(|| lookup("GEMINI_API_KEY").and_then(non_blank))
        .or_else(|| lookup("GOOGLE_API_KEY").and_then(non_blank))
        .unwrap_or_default()
}

fn mime_for_path(path: &Path) -> Option<String> {
    ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

fn extension_for_mime(mime: Option<&str>) -> &'static str {
    mime.and_then(|mime| ImageFormat::from_mime_type(mime))
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

fn output_path(out: &Path, restored: &RestoredImage) -> PathBuf {
    if !out.is_dir() {
        return out.to_path_buf();
    }
    out.join(format!(
        "restored-{}.{}",
        timestamp_millis(),
        extension_for_mime(restored.mime_type.as_deref())
    ))
}

fn write_restored(out: &Path, restored: &RestoredImage) -> Result<PathBuf> {
    let path = output_path(out, restored);
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    if restored.bytes.is_empty() {
        bail!("refusing to write an empty image to {}", path.display());
    }
    fs::write(&path, &restored.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
