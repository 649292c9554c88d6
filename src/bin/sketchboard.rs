//! Server binary for sketchboard.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `StoryboardConfig` and serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use sketchboard::server::{router, AppState};
use sketchboard::{PipelineCore, StoryboardConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default port
  sketchboard

  # Custom port and output directory
  sketchboard --port 8080 --output-dir /var/lib/sketchboard

  # Generate a storyboard
  curl -X POST localhost:5000/storyboard/generate \
    -H 'Content-Type: application/json' \
    -d '{"user_description": "A dog runs to a ball. The dog picks it up."}'

  # Watch progress live over SSE
  curl -N -X POST localhost:5000/storyboard/generate-stream \
    -H 'Content-Type: application/json' \
    -d '{"user_description": "A dog runs to a ball. The dog picks it up."}'

  # Redraw one frame of an existing session
  curl -X POST localhost:5000/storyboard/edit-frame \
    -H 'Content-Type: application/json' \
    -d '{"session_id": "<id>", "frame_number": 2, "edit_instructions": "make the dog bigger"}'

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY            Google Gemini API key (required)
  SKETCHBOARD_HOST          Bind address
  SKETCHBOARD_PORT          Bind port
  SKETCHBOARD_OUTPUT_DIR    Session storage root
  SKETCHBOARD_TEXT_MODEL    Segmentation model ID
  SKETCHBOARD_IMAGE_MODEL   Image generation model ID

SETUP:
  1. Set API key:   export GEMINI_API_KEY=...
  2. Serve:         sketchboard --port 5000
"#;

/// Generate pencil-sketch storyboard PDFs from video descriptions.
#[derive(Parser, Debug)]
#[command(
    name = "sketchboard",
    version,
    about = "Storyboard generation service: description in, sketch PDF out",
    long_about = "Serve an HTTP API that turns a natural-language video description into a \
pencil-sketch storyboard: a text model segments the description into frames, an image model \
draws each frame conditioned on the previous one, and the result is persisted per session \
and assembled into a PDF.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Bind address.
    #[arg(long, env = "SKETCHBOARD_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bind port.
    #[arg(short, long, env = "SKETCHBOARD_PORT", default_value_t = 5000)]
    port: u16,

    /// Root directory for persisted sessions.
    #[arg(long, env = "SKETCHBOARD_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Model for the text-segmentation call.
    #[arg(long, env = "SKETCHBOARD_TEXT_MODEL", default_value = "gemini-2.0-flash")]
    text_model: String,

    /// Model for image generation and frame edits.
    #[arg(long, env = "SKETCHBOARD_IMAGE_MODEL", default_value = "gemini-2.0-flash")]
    image_model: String,

    /// Hard cap on frames per storyboard (1-10).
    #[arg(long, env = "SKETCHBOARD_MAX_FRAMES", default_value_t = 10)]
    max_frames: u32,

    /// Sampling temperature for the segmentation call (0.0-2.0).
    #[arg(long, env = "SKETCHBOARD_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SKETCHBOARD_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; a missing file is not an error.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = StoryboardConfig::builder()
        .text_model(&cli.text_model)
        .image_model(&cli.image_model)
        .output_dir(&cli.output_dir)
        .max_frames(cli.max_frames)
        .temperature(cli.temperature)
        .build()
        .context("Invalid configuration")?;

    let core = PipelineCore::gemini(config).context(
        "Failed to initialise the Gemini client (is GEMINI_API_KEY set?)",
    )?;
    let app = router(AppState::new(Arc::new(core)));

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", cli.host, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("sketchboard listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
