//! # sketchboard
//!
//! Turn a natural-language video description into a pencil-sketch storyboard:
//! a text model segments the description into an ordered frame plan, an image
//! model draws each frame conditioned on the previous one, and the frames are
//! persisted per session and assembled into a one-frame-per-page PDF.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐   ┌───────────┐   ┌────────────┐   ┌──────────┐   ┌────────┐
//! │ description │──▶│  segment  │──▶│  generate  │──▶│ session  │──▶│ render │
//! │ (free text) │   │ plan JSON │   │ chained    │   │ frames + │   │  PDF   │
//! └─────────────┘   └───────────┘   │ frame PNGs │   │ metadata │   └────────┘
//!                                   └────────────┘   └──────────┘
//! ```
//!
//! Frame generation is strictly sequential: frame k's call carries the image
//! actually produced for frame k-1, which is what keeps characters and style
//! consistent across the storyboard. A failure at any frame fails the whole
//! run and removes its transient state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sketchboard::{PipelineCore, StoryboardConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoryboardConfig::builder()
//!         .output_dir("output")
//!         .build()?;
//!     let core = PipelineCore::gemini(config)?;
//!
//!     let outcome = sketchboard::generate_storyboard(
//!         &core,
//!         "A dog runs to a ball. The dog picks it up.",
//!     )
//!     .await;
//!     println!("{}", outcome.message);
//!     Ok(())
//! }
//! ```
//!
//! For live progress, [`generate_storyboard_stream`] runs the same pipeline
//! and yields [`ProgressEvent`]s ending in exactly one terminal event. The
//! `server` feature adds an axum HTTP surface over both entry points plus a
//! single-frame edit operation.

pub mod config;
pub mod error;
pub mod events;
pub mod frames;
pub mod gemini;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod run;
pub mod session;
pub mod stream;

#[cfg(feature = "server")]
pub mod server;

pub use config::{StoryboardConfig, StoryboardConfigBuilder};
pub use error::StoryboardError;
pub use events::{ProgressEvent, Stage};
pub use frames::{
    FrameDescription, FrameEditOutcome, GeneratedFrame, GenerationOutcome, StoryboardPlan,
};
pub use gemini::GeminiClient;
pub use model::{ImageModel, TextModel};
pub use pipeline::PipelineCore;
pub use run::{edit_frame, generate_storyboard};
pub use session::SessionStore;
pub use stream::generate_storyboard_stream;
