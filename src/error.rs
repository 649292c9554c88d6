//! Error types for the sketchboard library.
//!
//! A single [`StoryboardError`] enum covers the whole taxonomy:
//!
//! * **Validation** — bad caller input (empty description, bad config).
//!   The HTTP layer reports these as 400 before any model call is made.
//! * **Not-found** — a referenced frame file is absent. Reported as 404;
//!   nothing is retried and no other session state is touched.
//! * **Generation** — the model call succeeded at the transport level but
//!   produced no usable output (no image, malformed plan), or the call
//!   itself failed. Reported as a failure result / 500. All transient
//!   reference files accumulated by the in-flight sequence are removed
//!   before the error propagates.
//! * **I/O** — disk read/write failures, reported the same way as
//!   generation errors.
//!
//! No error kind is silently retried. The only silent recovery anywhere in
//! the crate is best-effort cleanup (temp files, conversation teardown) and
//! best-effort metadata loading, which degrades to an empty list.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the sketchboard library.
#[derive(Debug, Error)]
pub enum StoryboardError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The caller supplied an empty or whitespace-only description.
    #[error("Description must not be empty")]
    EmptyDescription,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Not-found errors ──────────────────────────────────────────────────
    /// A referenced frame image does not exist on disk.
    #[error("Frame image not found: '{path}'")]
    FrameNotFound { path: PathBuf },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The model API returned a transport- or conversation-level error.
    #[error("Model API error: {detail}")]
    ApiError { detail: String },

    /// The segmentation model's output could not be parsed or validated
    /// against the storyboard plan schema.
    #[error("Invalid storyboard plan from model: {detail}")]
    InvalidPlan { detail: String },

    /// The image model responded, but no image payload could be extracted
    /// from any response part.
    #[error("No image found in model response")]
    NoImageInResponse,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read or write a session file.
    #[error("Failed to write session file '{path}': {source}")]
    SessionWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF assembly failed (unreadable frame image, encoding error, write
    /// failure).
    #[error("PDF rendering failed: {detail}")]
    PdfRenderFailed { detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoryboardError {
    /// Whether this error should be reported as 404 (missing frame) rather
    /// than a generic failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoryboardError::FrameNotFound { .. })
    }

    /// Whether this error is a caller-input problem (HTTP 400).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoryboardError::EmptyDescription | StoryboardError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_not_found_is_not_found() {
        let e = StoryboardError::FrameNotFound {
            path: PathBuf::from("output/abc/frame_004.png"),
        };
        assert!(e.is_not_found());
        assert!(e.to_string().contains("frame_004.png"));
    }

    #[test]
    fn generation_errors_are_not_not_found() {
        assert!(!StoryboardError::NoImageInResponse.is_not_found());
        assert!(!StoryboardError::ApiError {
            detail: "HTTP 503".into()
        }
        .is_not_found());
    }

    #[test]
    fn empty_description_is_validation() {
        assert!(StoryboardError::EmptyDescription.is_validation());
        assert!(!StoryboardError::NoImageInResponse.is_validation());
    }

    #[test]
    fn invalid_plan_display() {
        let e = StoryboardError::InvalidPlan {
            detail: "frame numbers must be 1..K".into(),
        };
        assert!(e.to_string().contains("frame numbers"));
    }
}
