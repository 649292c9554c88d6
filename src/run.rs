//! Batch execution strategy: run the whole pipeline, answer once at the end.
//!
//! [`generate_storyboard`] is deliberately infallible at the type level — any
//! pipeline failure is folded into a [`GenerationOutcome`] with `success:
//! false` and an actionable message, and no partial session directory is left
//! claiming success. [`edit_frame`] is the post-hoc correction flow for a
//! single frame of an existing session.

use crate::error::StoryboardError;
use crate::frames::{FrameEditOutcome, GenerationOutcome};
use crate::pipeline::render::render_pdf;
use crate::pipeline::PipelineCore;
use tracing::{error, info};

/// Run segmentation, frame generation, persistence, and PDF rendering as one
/// batch. All failures are reported through the returned outcome.
pub async fn generate_storyboard(core: &PipelineCore, description: &str) -> GenerationOutcome {
    match run_pipeline(core, description).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("storyboard generation failed: {e}");
            GenerationOutcome::failure(format!("Storyboard generation failed: {e}"))
        }
    }
}

async fn run_pipeline(
    core: &PipelineCore,
    description: &str,
) -> Result<GenerationOutcome, StoryboardError> {
    let plan = core.segmenter().segment(description).await?;

    let frames = core.generator().generate_sequence(&plan.frames).await?;

    // The session id exists only once there is something to persist; a run
    // that dies during generation leaves no session directory behind.
    let session_id = core.store().mint_session_id();
    let paths = core.store().save_frames(&frames, &session_id).await?;
    core.store().save_metadata(&plan.frames, &session_id).await?;

    let pdf_path = render_pdf(paths, None, core.store().pdf_path(&session_id)).await?;

    info!(session = %session_id, frames = plan.total_frames, "storyboard generated");
    Ok(GenerationOutcome::ok(
        pdf_path.display().to_string(),
        plan.total_frames,
    ))
}

/// Regenerate one frame of an existing session from edit instructions, then
/// rebuild the session's PDF.
///
/// The stale PDF is deleted before the model call so a failure mid-edit can
/// never leave an artifact that contradicts the frames on disk. Frame images
/// other than the target are untouched.
pub async fn edit_frame(
    core: &PipelineCore,
    session_id: &str,
    frame_number: u32,
    edit_instructions: &str,
    storyboard_context: &str,
) -> Result<FrameEditOutcome, StoryboardError> {
    if edit_instructions.trim().is_empty() {
        return Err(StoryboardError::EmptyDescription);
    }

    let frame_path = core.store().frame_path(session_id, frame_number);
    let current = tokio::fs::read(&frame_path)
        .await
        .map_err(|_| StoryboardError::FrameNotFound {
            path: frame_path.clone(),
        })?;

    core.store().delete_pdf(session_id).await;

    let edited = core
        .generator()
        .edit(&current, edit_instructions, storyboard_context)
        .await?;
    let image_path = core
        .store()
        .overwrite_frame(session_id, frame_number, &edited)
        .await?;

    let paths = core.store().list_frame_paths(session_id).await;
    let captions = captions_for(core, session_id, paths.len()).await;
    let pdf_path = core.store().pdf_path(session_id);
    render_pdf(paths, captions, pdf_path).await?;

    info!(session = %session_id, frame = frame_number, "frame edited and PDF rebuilt");
    Ok(FrameEditOutcome {
        success: true,
        message: format!("Frame {frame_number} updated successfully"),
        frame_number: Some(frame_number),
        image_path: Some(image_path.display().to_string()),
        pdf_regenerated: Some(true),
    })
}

/// Frame descriptions as PDF captions, but only when the sidecar lines up
/// with the images on disk.
async fn captions_for(
    core: &PipelineCore,
    session_id: &str,
    frame_count: usize,
) -> Option<Vec<String>> {
    let metadata = core.store().load_metadata(session_id).await;
    if metadata.len() == frame_count && !metadata.is_empty() {
        Some(metadata.into_iter().map(|f| f.description).collect())
    } else {
        None
    }
}
