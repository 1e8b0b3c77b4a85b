//! CLI for Prompt Studio - generate or edit an image from a prompt.

use clap::{Args, Parser, Subcommand, ValueEnum};
use prompt_studio::messages::{requires_key_reselection, user_message};
use prompt_studio::output::{extension_mismatch, resolve_output_path, save_image};
use prompt_studio::{
    AspectRatio, GenerationOptions, ImageFormat, ImageService, InputImage, Settings, Studio,
    StudioError, SubmitForm,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prompt-studio")]
#[command(about = "Generate or edit images from a text prompt (Imagen / Gemini)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: <config dir>/prompt-studio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key (overrides config file and environment)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image, or edit one when --image is given
    Generate(GenerateArgs),

    /// Check that the API key and models are usable
    Check,

    /// Print the effective configuration (API key redacted)
    Config,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image or the edit
    prompt: String,

    /// Reference image to edit
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Output file or directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Aspect ratio (generation only)
    #[arg(long, value_enum)]
    aspect_ratio: Option<AspectRatioArg>,

    /// Number of images to request (generation only, 1-4); the first is saved
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    count: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_flags(&mut settings, &cli);

    let result = match cli.command {
        Commands::Generate(args) => generate(args, &settings, cli.json).await,
        Commands::Check => check(&settings, cli.json).await,
        Commands::Config => {
            show_config(&settings, cli.json)?;
            Ok(())
        }
    };

    if let Err(e) = result {
        report_failure(&e, cli.json)?;
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "prompt_studio=debug,info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line flags sit on top of the file and environment.
fn apply_flags(settings: &mut Settings, cli: &Cli) {
    if let Some(key) = &cli.api_key {
        settings.api_key = Some(key.clone());
    }
}

fn build_form(args: &GenerateArgs, settings: &Settings) -> Result<SubmitForm, StudioError> {
    let mut options = GenerationOptions::new().with_count(args.count);

    if let Some(ratio) = args.aspect_ratio.map(AspectRatio::from).or(settings.aspect_ratio) {
        options = options.with_aspect_ratio(ratio);
    }

    // Imagen only encodes PNG and JPEG.
    let ext_format = args
        .output
        .as_ref()
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension);
    if let Some(format @ (ImageFormat::Png | ImageFormat::Jpeg)) = ext_format {
        options = options.with_format(format);
    }

    let mut form = SubmitForm::new(&args.prompt).with_options(options);
    if let Some(path) = &args.image {
        form = form.with_image(InputImage::from_path(path)?);
    }
    Ok(form)
}

async fn generate(
    args: GenerateArgs,
    settings: &Settings,
    json_output: bool,
) -> Result<(), StudioError> {
    if args.image.is_some() && (args.aspect_ratio.is_some() || args.count > 1) {
        tracing::warn!("--aspect-ratio and --count only apply to generation and are ignored when editing");
    }

    let form = build_form(&args, settings)?;
    let studio = Studio::new(settings.provider()?);
    let submission = studio.submit(form).await?;

    let path = resolve_output_path(args.output.as_deref(), &settings.output_dir, &submission.image);
    let saved = save_image(&submission.image, &path)?;
    let image = &submission.image;

    if args.output.is_some() {
        if let Some(named) = extension_mismatch(&saved, image.format) {
            tracing::warn!(
                path = %saved.display(),
                "saved {} data under a .{} file name",
                image.format,
                named
            );
        }
    }

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "mode": submission.mode,
            "output": saved.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format.extension(),
            "model": image.metadata.model,
            "duration_ms": image.metadata.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Saved {} image: {} ({} bytes)",
            submission.mode,
            saved.display(),
            image.size()
        );
        if let Some(model) = &image.metadata.model {
            println!("Model: {}", model);
        }
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

async fn check(settings: &Settings, json_output: bool) -> Result<(), StudioError> {
    let provider = settings.provider()?;
    provider.health_check().await?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "service": provider.name(),
            "generate_model": provider.generate_model(),
            "edit_model": provider.edit_model(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{} is reachable", provider.name());
        println!("  generate: {}", provider.generate_model());
        println!("  edit:     {}", provider.edit_model());
    }
    Ok(())
}

fn show_config(settings: &Settings, json_output: bool) -> anyhow::Result<()> {
    let redacted = settings.redacted();
    if json_output {
        println!("{}", serde_json::to_string_pretty(&redacted)?);
    } else {
        if let Some(path) = prompt_studio::config::default_config_path() {
            println!("# default config file: {}", path.display());
        }
        print!("{}", toml::to_string_pretty(&redacted)?);
    }
    Ok(())
}

fn report_failure(err: &StudioError, json_output: bool) -> anyhow::Result<()> {
    tracing::debug!(error = %err, "submission failed");
    let message = user_message(err);

    if json_output {
        let result = serde_json::json!({
            "success": false,
            "error": message,
            "detail": err.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        eprintln!("{}", message);
        if requires_key_reselection(err) {
            eprintln!("Hint: pass another key with --api-key or set PROMPT_STUDIO_API_KEY.");
        }
    }
    Ok(())
}
