//! Streaming execution strategy: the same pipeline as [`crate::run`],
//! narrated as a live event sequence.
//!
//! The returned stream yields [`ProgressEvent`]s in pipeline order and ends
//! with exactly one terminal event: `complete` on success, `error` on the
//! first failure. The pipeline itself runs in a spawned task so the caller
//! can consume events while generation is still in flight.

use crate::error::StoryboardError;
use crate::events::{ProgressEvent, Stage};
use crate::pipeline::generate::FrameEvent;
use crate::pipeline::render::render_pdf;
use crate::pipeline::PipelineCore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

/// Event channel depth. Producers outpace SSE consumers during generation;
/// a shallow buffer applies gentle backpressure instead of hoarding frames.
const CHANNEL_DEPTH: usize = 32;

/// Run the full pipeline, reporting progress as a stream of events.
///
/// Never fails at the type level: validation and pipeline errors arrive as a
/// terminal [`ProgressEvent::Error`] on the stream.
pub fn generate_storyboard_stream(
    core: Arc<PipelineCore>,
    description: String,
) -> ReceiverStream<ProgressEvent> {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    tokio::spawn(async move {
        if let Err(e) = drive(core, &description, &tx).await {
            error!("streaming generation failed: {e}");
            send(&tx, ProgressEvent::error(format!("Storyboard generation failed: {e}"))).await;
        }
    });
    ReceiverStream::new(rx)
}

async fn drive(
    core: Arc<PipelineCore>,
    description: &str,
    tx: &mpsc::Sender<ProgressEvent>,
) -> Result<(), StoryboardError> {
    send(
        tx,
        ProgressEvent::step_start(Stage::Analyzing, "Analyzing your description...", None),
    )
    .await;
    let plan = core.segmenter().segment(description).await?;
    let total = plan.total_frames;
    send(
        tx,
        ProgressEvent::step_complete(
            Stage::Analyzing,
            format!("Identified {total} key frames"),
            Some(total),
        ),
    )
    .await;

    // Unlike the batch path, the session id exists before any frame does —
    // the terminal event needs it and streaming clients may want to poll the
    // session directory as frames land.
    let session_id = core.store().mint_session_id();

    send(
        tx,
        ProgressEvent::step_start(Stage::Generating, "Generating frame images...", Some(total)),
    )
    .await;

    // The generator runs in its own task and narrates through FrameEvents;
    // this task translates them to wire events as they arrive, then collects
    // the generated frames from the join handle.
    let (frame_tx, mut frame_rx) = mpsc::channel(CHANNEL_DEPTH);
    let generator_core = core.clone();
    let plan_frames = plan.frames.clone();
    let worker = tokio::spawn(async move {
        generator_core
            .generator()
            .generate_sequence_streaming(&plan_frames, frame_tx)
            .await
    });

    while let Some(event) = frame_rx.recv().await {
        let progress = match event {
            FrameEvent::Started { frame_number } => {
                ProgressEvent::frame_started(frame_number, total)
            }
            FrameEvent::Completed { frame } => {
                ProgressEvent::frame_completed(frame.frame_number, total)
            }
        };
        send(tx, progress).await;
    }

    let frames = worker
        .await
        .map_err(|e| StoryboardError::Internal(format!("generation task panicked: {e}")))??;
    send(
        tx,
        ProgressEvent::step_complete(
            Stage::Generating,
            format!("Generated all {total} frames"),
            Some(total),
        ),
    )
    .await;

    let paths = core.store().save_frames(&frames, &session_id).await?;
    core.store().save_metadata(&plan.frames, &session_id).await?;

    send(
        tx,
        ProgressEvent::step_start(Stage::CreatingPdf, "Creating PDF storyboard...", None),
    )
    .await;
    let captions: Vec<String> = plan.frames.iter().map(|f| f.description.clone()).collect();
    let pdf_path = render_pdf(paths, Some(captions), core.store().pdf_path(&session_id)).await?;
    send(
        tx,
        ProgressEvent::step_complete(Stage::CreatingPdf, "PDF created", None),
    )
    .await;

    info!(session = %session_id, frames = total, "storyboard generated (streaming)");
    send(
        tx,
        ProgressEvent::complete(session_id, pdf_path.display().to_string(), total),
    )
    .await;
    Ok(())
}

/// Deliver an event, tolerating a consumer that has gone away. The pipeline
/// finishes its run either way so the session lands on disk.
async fn send(tx: &mpsc::Sender<ProgressEvent>, event: ProgressEvent) {
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoryboardConfig;
    use crate::model::{ImageModel, TextModel};
    use async_trait::async_trait;
    use tokio_stream::StreamExt;

    struct PlanModel {
        reply: String,
    }

    #[async_trait]
    impl TextModel for PlanModel {
        async fn begin_conversation(&self) -> Result<String, StoryboardError> {
            Ok("conv".into())
        }
        async fn generate(
            &self,
            _conversation_id: &str,
            _system_instruction: &str,
            _prompt: &str,
        ) -> Result<String, StoryboardError> {
            Ok(self.reply.clone())
        }
        async fn end_conversation(&self, _conversation_id: &str) -> Result<(), StoryboardError> {
            Ok(())
        }
    }

    struct PngModel {
        fail_on_frame: Option<u32>,
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl ImageModel for PngModel {
        async fn generate_image(
            &self,
            _prompt: &str,
            _reference_png: Option<&[u8]>,
        ) -> Result<Vec<u8>, StoryboardError> {
            let call = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                + 1;
            if self.fail_on_frame == Some(call) {
                return Err(StoryboardError::NoImageInResponse);
            }
            let mut out = std::io::Cursor::new(Vec::new());
            let img = image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]));
            image::DynamicImage::ImageRgb8(img)
                .write_to(&mut out, image::ImageFormat::Png)
                .unwrap();
            Ok(out.into_inner())
        }
    }

    const TWO_FRAME_PLAN: &str = r#"{"total_frames":2,"frames":[
        {"frame_number":1,"description":"A dog runs to a ball."},
        {"frame_number":2,"description":"The dog picks it up."}]}"#;

    fn core(dir: &tempfile::TempDir, fail_on_frame: Option<u32>) -> Arc<PipelineCore> {
        let config = StoryboardConfig::builder()
            .output_dir(dir.path())
            .api_key("test-key")
            .build()
            .unwrap();
        Arc::new(PipelineCore::new(
            Arc::new(PlanModel {
                reply: TWO_FRAME_PLAN.to_string(),
            }),
            Arc::new(PngModel {
                fail_on_frame,
                calls: std::sync::atomic::AtomicU32::new(0),
            }),
            config,
        ))
    }

    async fn collect(stream: ReceiverStream<ProgressEvent>) -> Vec<ProgressEvent> {
        stream.collect().await
    }

    #[tokio::test]
    async fn happy_path_event_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let events = collect(generate_storyboard_stream(core(&dir, None), "A dog story".into())).await;

        let kinds: Vec<&'static str> = events
            .iter()
            .map(|e| match e {
                ProgressEvent::StepStart { .. } => "start",
                ProgressEvent::StepProgress { .. } => "progress",
                ProgressEvent::StepComplete { .. } => "complete",
                ProgressEvent::Complete { .. } => "done",
                ProgressEvent::Error { .. } => "error",
            })
            .collect();
        // analyzing start/complete, generating start, 2x(started+completed),
        // generating complete, pdf start/complete, terminal.
        assert_eq!(
            kinds,
            [
                "start", "complete", "start", "progress", "progress", "progress", "progress",
                "complete", "start", "complete", "done"
            ]
        );
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn failure_ends_with_single_error_event() {
        let dir = tempfile::TempDir::new().unwrap();
        let events = collect(generate_storyboard_stream(core(&dir, Some(2)), "A dog story".into())).await;

        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert!(matches!(events.last().unwrap(), ProgressEvent::Error { .. }));
        // frame 2's start was narrated before the failure surfaced.
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::StepProgress { current_frame: 2, .. })));
    }

    #[tokio::test]
    async fn empty_description_yields_only_stage_start_and_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let events = collect(generate_storyboard_stream(core(&dir, None), "   ".into())).await;
        assert!(matches!(events.last().unwrap(), ProgressEvent::Error { .. }));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn complete_event_points_at_real_pdf() {
        let dir = tempfile::TempDir::new().unwrap();
        let events = collect(generate_storyboard_stream(core(&dir, None), "A dog story".into())).await;

        let Some(ProgressEvent::Complete {
            success,
            session_id,
            storyboard_path,
            total_frames,
            ..
        }) = events.last()
        else {
            panic!("missing terminal complete event");
        };
        assert!(*success);
        assert_eq!(*total_frames, 2);
        assert!(std::path::Path::new(storyboard_path).is_file());
        assert!(storyboard_path.contains(session_id.as_str()));
    }
}
