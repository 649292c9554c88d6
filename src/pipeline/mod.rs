//! Pipeline stages for storyboard generation.
//!
//! Each submodule implements exactly one transformation step, which keeps
//! every stage independently testable against fake models.
//!
//! ## Data Flow
//!
//! ```text
//! description ──▶ segment ──▶ generate ──▶ session ──▶ render
//!  (free text)   (plan JSON)  (frame PNGs) (persist)  (PDF)
//! ```
//!
//! 1. [`segment`]  — one text-model call producing an ordered frame plan
//! 2. [`generate`] — N chained image-model calls, each conditioned on the
//!    previous frame's output; the only stage with a conditioning invariant
//! 3. [`render`]   — assemble the persisted frames into a one-frame-per-page
//!    PDF; runs in `spawn_blocking` because PDF assembly is synchronous
//!
//! [`PipelineCore`] composes the stages with the session store. The batch
//! and streaming entry points ([`crate::run`], [`crate::stream`]) are thin
//! strategies over this shared core rather than subclasses of each other, so
//! neither can diverge from the other's plumbing.

pub mod generate;
pub mod render;
pub mod segment;

use crate::config::StoryboardConfig;
use crate::gemini::GeminiClient;
use crate::model::{ImageModel, TextModel};
use crate::session::SessionStore;
use generate::FrameGenerator;
use segment::Segmenter;
use std::sync::Arc;

/// The shared pipeline plumbing: segmentation, frame generation, and session
/// storage, constructed once and injected into both execution strategies.
pub struct PipelineCore {
    segmenter: Segmenter,
    generator: FrameGenerator,
    store: SessionStore,
    config: StoryboardConfig,
}

impl PipelineCore {
    /// Compose a pipeline from explicit model implementations.
    pub fn new(
        text_model: Arc<dyn TextModel>,
        image_model: Arc<dyn ImageModel>,
        config: StoryboardConfig,
    ) -> Self {
        let store = SessionStore::new(config.output_dir.clone());
        Self {
            segmenter: Segmenter::new(text_model, config.max_frames),
            generator: FrameGenerator::new(image_model, store.temp_dir()),
            store,
            config,
        }
    }

    /// Compose a pipeline backed by one [`GeminiClient`] serving both the
    /// text and image roles.
    pub fn gemini(config: StoryboardConfig) -> Result<Self, crate::error::StoryboardError> {
        let client = Arc::new(GeminiClient::new(&config)?);
        Ok(Self::new(client.clone(), client, config))
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn generator(&self) -> &FrameGenerator {
        &self.generator
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &StoryboardConfig {
        &self.config
    }
}
