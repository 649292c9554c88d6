//! Text segmentation: one model call turning a description into a frame plan.
//!
//! The call runs inside an ephemeral conversation whose teardown ALWAYS
//! executes on the same code path, success or failure, with teardown errors
//! swallowed — losing a conversation slot must never fail a caller that
//! already has (or failed to get) its answer.

use crate::error::StoryboardError;
use crate::frames::StoryboardPlan;
use crate::model::TextModel;
use crate::prompts::SEGMENTATION_INSTRUCTION;
use std::sync::Arc;
use tracing::{debug, info};

/// Calls the text model with the fixed segmentation instruction and parses
/// the structured plan out of the reply.
pub struct Segmenter {
    model: Arc<dyn TextModel>,
    max_frames: u32,
}

impl Segmenter {
    pub fn new(model: Arc<dyn TextModel>, max_frames: u32) -> Self {
        Self { model, max_frames }
    }

    /// Segment a description into an ordered, validated frame plan.
    ///
    /// Parse or validation failure of the model's output surfaces as
    /// [`StoryboardError::InvalidPlan`] — not retried automatically.
    pub async fn segment(&self, description: &str) -> Result<StoryboardPlan, StoryboardError> {
        if description.trim().is_empty() {
            return Err(StoryboardError::EmptyDescription);
        }

        let conversation = self.model.begin_conversation().await?;
        let outcome = self
            .model
            .generate(&conversation, SEGMENTATION_INSTRUCTION, description)
            .await;

        // Teardown runs regardless of the generation outcome; failures here
        // are logged and dropped.
        if let Err(e) = self.model.end_conversation(&conversation).await {
            debug!(conversation = %conversation, "conversation teardown failed: {e}");
        }

        let raw = outcome?;
        let plan = StoryboardPlan::from_model_output(&raw)?;
        plan.validate(self.max_frames)?;

        info!(total_frames = plan.total_frames, "segmented description");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake text model recording its conversation lifecycle.
    struct ScriptedTextModel {
        reply: Result<String, String>,
        begun: AtomicUsize,
        ended: AtomicUsize,
        teardown_fails: bool,
    }

    impl ScriptedTextModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                begun: AtomicUsize::new(0),
                ended: AtomicUsize::new(0),
                teardown_fails: false,
            }
        }

        fn failing(detail: &str) -> Self {
            Self {
                reply: Err(detail.to_string()),
                begun: AtomicUsize::new(0),
                ended: AtomicUsize::new(0),
                teardown_fails: false,
            }
        }
    }

    #[async_trait]
    impl TextModel for ScriptedTextModel {
        async fn begin_conversation(&self) -> Result<String, StoryboardError> {
            self.begun.fetch_add(1, Ordering::SeqCst);
            Ok("conv-1".to_string())
        }

        async fn generate(
            &self,
            _conversation_id: &str,
            _system_instruction: &str,
            _prompt: &str,
        ) -> Result<String, StoryboardError> {
            self.reply
                .clone()
                .map_err(|detail| StoryboardError::ApiError { detail })
        }

        async fn end_conversation(&self, _conversation_id: &str) -> Result<(), StoryboardError> {
            self.ended.fetch_add(1, Ordering::SeqCst);
            if self.teardown_fails {
                Err(StoryboardError::ApiError {
                    detail: "teardown exploded".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    const TWO_FRAME_PLAN: &str = r#"{"total_frames":2,"frames":[
        {"frame_number":1,"description":"A dog runs to a ball."},
        {"frame_number":2,"description":"The dog picks it up."}]}"#;

    #[tokio::test]
    async fn produces_validated_plan() {
        let model = Arc::new(ScriptedTextModel::replying(TWO_FRAME_PLAN));
        let plan = Segmenter::new(model.clone(), 10)
            .segment("A dog runs to a ball. The dog picks it up.")
            .await
            .unwrap();
        assert_eq!(plan.total_frames, 2);
        assert_eq!(model.begun.load(Ordering::SeqCst), 1);
        assert_eq!(model.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_description_rejected_before_any_call() {
        let model = Arc::new(ScriptedTextModel::replying(TWO_FRAME_PLAN));
        let err = Segmenter::new(model.clone(), 10).segment("   ").await.unwrap_err();
        assert!(matches!(err, StoryboardError::EmptyDescription));
        assert_eq!(model.begun.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn teardown_runs_when_generation_fails() {
        let model = Arc::new(ScriptedTextModel::failing("503"));
        let err = Segmenter::new(model.clone(), 10).segment("desc").await.unwrap_err();
        assert!(matches!(err, StoryboardError::ApiError { .. }));
        assert_eq!(model.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn teardown_failure_is_swallowed() {
        let mut fake = ScriptedTextModel::replying(TWO_FRAME_PLAN);
        fake.teardown_fails = true;
        let plan = Segmenter::new(Arc::new(fake), 10).segment("desc").await.unwrap();
        assert_eq!(plan.total_frames, 2);
    }

    #[tokio::test]
    async fn invalid_plan_surfaces_as_generation_failure() {
        let model = Arc::new(ScriptedTextModel::replying(
            r#"{"total_frames":2,"frames":[{"frame_number":1,"description":"only one"}]}"#,
        ));
        let err = Segmenter::new(model, 10).segment("desc").await.unwrap_err();
        assert!(matches!(err, StoryboardError::InvalidPlan { .. }));
    }
}
