//! Provider seams: the two model traits the pipeline is generic over.
//!
//! The pipeline never talks to a concrete API directly — it holds
//! `Arc<dyn TextModel>` and `Arc<dyn ImageModel>`, so tests can inject fakes
//! that record their inputs and production wires in [`crate::GeminiClient`].

use crate::error::StoryboardError;
use async_trait::async_trait;

/// A text-generation model with an ephemeral conversation lifecycle.
///
/// The segmentation caller allocates a conversation, runs exactly one
/// generation inside it, and tears it down on the same code path whether the
/// generation succeeded or failed. Teardown failures are swallowed by the
/// caller — implementations may fail `end_conversation` freely.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Allocate an ephemeral conversation and return its opaque id.
    async fn begin_conversation(&self) -> Result<String, StoryboardError>;

    /// Run one generation inside the conversation, returning the raw text.
    async fn generate(
        &self,
        conversation_id: &str,
        system_instruction: &str,
        prompt: &str,
    ) -> Result<String, StoryboardError>;

    /// Release the conversation. Best-effort from the caller's perspective.
    async fn end_conversation(&self, conversation_id: &str) -> Result<(), StoryboardError>;
}

/// An image-generation model.
///
/// A single method covers all three pipeline operations: the first frame
/// passes no reference, subsequent frames pass the previous frame's PNG, and
/// edits pass the current frame's PNG. The distinction lives entirely in the
/// prompt (see [`crate::prompts`]).
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate one image, optionally conditioned on an inline reference PNG.
    ///
    /// Returns the raw image bytes, or [`StoryboardError::NoImageInResponse`]
    /// when the model answered without an extractable image.
    async fn generate_image(
        &self,
        prompt: &str,
        reference_png: Option<&[u8]>,
    ) -> Result<Vec<u8>, StoryboardError>;
}
