//! CLI binary for photo-restore.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RestoreConfig` and reports results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use photo_restore::prompts::{FOOTER, RESTORING_MESSAGE, TAGLINE, TITLE, UPLOAD_GUIDANCE};
use photo_restore::{restore_to_file, RestoreConfig, UploadLimits};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Restore a scan, writing restored-photo.jpg
  photo-restore restore grandma.jpg

  # Choose the output file
  photo-restore restore grandma.jpg -o grandma-restored.jpg

  # Open the before/after window; press R to restore, S to save
  photo-restore restore grandma.jpg --view

  # Compare two existing files
  photo-restore compare grandma.jpg grandma-restored.jpg

ENVIRONMENT VARIABLES:
  API_KEY / GEMINI_API_KEY   Google Gemini API key (checked in that order)
  PHOTO_RESTORE_MODEL        Override model ID (default gemini-2.5-flash-image)
  PHOTO_RESTORE_BASE_URL     Override the API base URL
  RUST_LOG                   tracing filter, e.g. photo_restore=debug
"#;

/// Restore old photos with Gemini and compare before/after.
#[derive(Parser, Debug)]
#[command(
    name = "photo-restore",
    version,
    about = "Restore old, damaged photos with a generative image model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PHOTO_RESTORE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PHOTO_RESTORE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a photo to the restoration model.
    Restore(RestoreArgs),
    /// Open two images side by side with a draggable divider.
    #[cfg(feature = "viewer")]
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
struct RestoreArgs {
    #[arg(value_name = "PHOTO", help = UPLOAD_GUIDANCE)]
    input: PathBuf,

    /// Where to write the restored photo.
    #[arg(short, long, env = "PHOTO_RESTORE_OUTPUT")]
    output: Option<PathBuf>,

    /// Open the comparison window instead of writing straight to disk.
    #[cfg(feature = "viewer")]
    #[arg(long)]
    view: bool,

    /// Gemini model ID.
    #[arg(long, env = "PHOTO_RESTORE_MODEL")]
    model: Option<String>,

    /// API key; falls back to API_KEY then GEMINI_API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL.
    #[arg(long, env = "PHOTO_RESTORE_BASE_URL")]
    base_url: Option<String>,

    /// Path to a text file replacing the built-in restoration prompt.
    #[arg(long, env = "PHOTO_RESTORE_PROMPT")]
    prompt_file: Option<PathBuf>,

    /// Request timeout in seconds (none by default).
    #[arg(long, env = "PHOTO_RESTORE_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Reject files over 10 MB or not PNG/JPEG/GIF.
    #[arg(long, env = "PHOTO_RESTORE_ENFORCE_LIMITS")]
    enforce_limits: bool,
}

#[cfg(feature = "viewer")]
#[derive(Args, Debug)]
struct CompareArgs {
    /// The untouched photo.
    original: PathBuf,
    /// The restored photo.
    restored: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters unless -v is set.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if !cli.quiet {
        eprintln!("{}  {}", bold(TITLE), dim(TAGLINE));
    }

    match cli.command {
        Command::Restore(ref args) => run_restore(args, &cli).await?,
        #[cfg(feature = "viewer")]
        Command::Compare(ref args) => run_compare(args)?,
    }

    if !cli.quiet {
        eprintln!("{}", dim(FOOTER));
    }
    Ok(())
}

async fn run_restore(args: &RestoreArgs, cli: &Cli) -> Result<()> {
    let config = build_config(args).await?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_file_name));

    #[cfg(feature = "viewer")]
    if args.view {
        return run_viewer(args, config, output).await;
    }

    let spinner = (!cli.quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(RESTORING_MESSAGE);
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = restore_to_file(&args.input, &output, &config).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let photo = match result {
        Ok(photo) => photo,
        Err(e) if e.is_upload() => anyhow::bail!("{}", upload_rejected(&e)),
        Err(e) => return Err(anyhow::Error::new(e).context("Restoration failed")),
    };

    if !cli.quiet {
        eprintln!(
            "{}  {}ms  →  {}",
            green("✔"),
            photo.duration_ms,
            bold(&output.display().to_string()),
        );
    }
    Ok(())
}

#[cfg(feature = "viewer")]
async fn run_viewer(args: &RestoreArgs, config: RestoreConfig, output: PathBuf) -> Result<()> {
    use photo_restore::viewer::{self, ViewerOptions};
    use photo_restore::RestoreSession;

    let mut session = RestoreSession::with_gemini(config).context("Failed to start session")?;
    session.upload(&args.input);
    session.settle().await;
    if let Some(ref err) = session.state().error {
        anyhow::bail!("{}", upload_rejected(err));
    }

    let options = ViewerOptions {
        save_path: output,
        ..ViewerOptions::default()
    };
    tokio::task::block_in_place(|| viewer::run_session(&mut session, &options))
        .context("Viewer failed")
}

#[cfg(feature = "viewer")]
fn run_compare(args: &CompareArgs) -> Result<()> {
    use photo_restore::viewer::{self, ViewerOptions};

    let open = |path: &PathBuf| -> Result<image::RgbaImage> {
        Ok(image::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .to_rgba8())
    };
    let original = open(&args.original)?;
    let restored = open(&args.restored)?;

    let options = ViewerOptions::default();
    tokio::task::block_in_place(|| viewer::run_compare(original, restored, &options))
        .context("Viewer failed")
}

/// Error text for a file that could not be used, followed by what is accepted.
fn upload_rejected(err: impl std::fmt::Display) -> String {
    format!("{err}\n{UPLOAD_GUIDANCE}")
}

/// Map CLI args to `RestoreConfig`.
async fn build_config(args: &RestoreArgs) -> Result<RestoreConfig> {
    let mut builder = RestoreConfig::builder();
    if let Some(ref m) = args.model {
        builder = builder.model(m);
    }
    if let Some(ref k) = args.api_key {
        builder = builder.api_key(k);
    }
    if let Some(ref u) = args.base_url {
        builder = builder.base_url(u);
    }
    if let Some(ref path) = args.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if args.enforce_limits {
        builder = builder.upload_limits(UploadLimits::Enforced);
    }
    builder.build().context("Invalid configuration")
}
