//! Sequential frame generation with a transient conditioning chain.
//!
//! Frames are generated strictly in ascending order. The first frame is a
//! text-only call; every subsequent frame carries the immediately preceding
//! frame's image inline, which is what keeps characters and style consistent
//! across the storyboard. Each generated image is written to a transient
//! reference file BEFORE the next call, so the reference for frame k is
//! always the bytes actually produced for frame k-1 in this run.
//!
//! Every run gets its own subdirectory under the temp root, so concurrent
//! runs (the server does not serialise generation requests) cannot clobber
//! each other's reference chains.
//!
//! The sequence is all-or-nothing: a failure at any frame removes the run's
//! transient directory and fails the whole run. Cleanup also runs after
//! success — transient files never outlive a single run.

use crate::error::StoryboardError;
use crate::frames::{FrameDescription, GeneratedFrame};
use crate::model::ImageModel;
use crate::prompts;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Progress notifications emitted by the streaming sequence variant.
#[derive(Debug, Clone)]
pub enum FrameEvent {
    /// Emitted just before the model call for a frame starts.
    Started { frame_number: u32 },
    /// Emitted after a frame's image was produced and its transient
    /// reference written.
    Completed { frame: GeneratedFrame },
}

/// Drives the per-frame image-model calls and owns the transient reference
/// chains under the configured temp root (one subdirectory per run).
pub struct FrameGenerator {
    model: Arc<dyn ImageModel>,
    temp_dir: PathBuf,
}

impl FrameGenerator {
    pub fn new(model: Arc<dyn ImageModel>, temp_dir: PathBuf) -> Self {
        Self { model, temp_dir }
    }

    /// Generate the first frame from its description alone.
    pub async fn generate_first(&self, description: &str) -> Result<Vec<u8>, StoryboardError> {
        self.model
            .generate_image(&prompts::first_frame_prompt(description), None)
            .await
    }

    /// Generate a follow-up frame conditioned on the previous frame's
    /// transient reference file.
    pub async fn generate_next(
        &self,
        description: &str,
        previous_image: &Path,
    ) -> Result<Vec<u8>, StoryboardError> {
        let reference = tokio::fs::read(previous_image).await.map_err(|_| {
            StoryboardError::FrameNotFound {
                path: previous_image.to_path_buf(),
            }
        })?;
        self.model
            .generate_image(&prompts::next_frame_prompt(description), Some(&reference))
            .await
    }

    /// Produce a targeted modification of an existing frame image.
    pub async fn edit(
        &self,
        current_image: &[u8],
        edit_instructions: &str,
        storyboard_context: &str,
    ) -> Result<Vec<u8>, StoryboardError> {
        self.model
            .generate_image(
                &prompts::edit_frame_prompt(edit_instructions, storyboard_context),
                Some(current_image),
            )
            .await
    }

    /// Generate all frames of a plan sequentially. All-or-nothing.
    pub async fn generate_sequence(
        &self,
        frames: &[FrameDescription],
    ) -> Result<Vec<GeneratedFrame>, StoryboardError> {
        self.run_sequence(frames, None).await
    }

    /// Streaming variant: same ordering, conditioning, and cleanup rules,
    /// with a [`FrameEvent`] sent before each call and after each success.
    /// A failure propagates as an error, not an event.
    pub async fn generate_sequence_streaming(
        &self,
        frames: &[FrameDescription],
        events: mpsc::Sender<FrameEvent>,
    ) -> Result<Vec<GeneratedFrame>, StoryboardError> {
        self.run_sequence(frames, Some(events)).await
    }

    async fn run_sequence(
        &self,
        frames: &[FrameDescription],
        events: Option<mpsc::Sender<FrameEvent>>,
    ) -> Result<Vec<GeneratedFrame>, StoryboardError> {
        // Per-run directory: concurrent runs must never share reference
        // filenames or each other's cleanup.
        let run_dir = self.temp_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&run_dir).await.map_err(|e| {
            StoryboardError::SessionWriteFailed {
                path: run_dir.clone(),
                source: e,
            }
        })?;

        let mut generated: Vec<GeneratedFrame> = Vec::with_capacity(frames.len());
        let mut previous: Option<PathBuf> = None;

        for frame in frames {
            if let Some(tx) = &events {
                // A dropped receiver just means nobody is listening anymore;
                // the run itself continues.
                let _ = tx
                    .send(FrameEvent::Started {
                        frame_number: frame.frame_number,
                    })
                    .await;
            }

            let result = match &previous {
                None => self.generate_first(&frame.description).await,
                Some(path) => self.generate_next(&frame.description, path).await,
            };

            let image = match result {
                Ok(image) => image,
                Err(e) => {
                    warn!(frame = frame.frame_number, "frame generation failed: {e}");
                    cleanup_run_dir(&run_dir).await;
                    return Err(e);
                }
            };

            // Written before the next call: this file is the next frame's
            // conditioning reference.
            let reference = run_dir.join(format!("temp_frame_{}.png", frame.frame_number));
            if let Err(e) = tokio::fs::write(&reference, &image).await {
                cleanup_run_dir(&run_dir).await;
                return Err(StoryboardError::SessionWriteFailed {
                    path: reference,
                    source: e,
                });
            }
            previous = Some(reference);

            debug!(frame = frame.frame_number, bytes = image.len(), "frame generated");

            let frame = GeneratedFrame {
                frame_number: frame.frame_number,
                image,
            };
            if let Some(tx) = &events {
                let _ = tx
                    .send(FrameEvent::Completed {
                        frame: frame.clone(),
                    })
                    .await;
            }
            generated.push(frame);
        }

        cleanup_run_dir(&run_dir).await;
        info!(frames = generated.len(), "sequence complete");
        Ok(generated)
    }
}

/// Remove one run's transient directory, best-effort.
async fn cleanup_run_dir(run_dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(run_dir).await {
        debug!("could not remove temp run dir {}: {e}", run_dir.display());
    }
}
