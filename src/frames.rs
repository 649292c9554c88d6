//! Core data model: frame descriptions, storyboard plans, generated frames,
//! and the outcome types returned to callers.
//!
//! A [`StoryboardPlan`] is produced exactly once by the segmentation caller
//! and is immutable afterwards — frame edits modify rendered images, never
//! the description records.

use crate::error::StoryboardError;
use serde::{Deserialize, Serialize};

/// One storyboard panel description, produced by the segmentation model.
///
/// `frame_number` is 1-indexed and strictly increasing within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDescription {
    pub frame_number: u32,
    pub description: String,
}

/// The segmentation model's structured output: an ordered list of frame
/// descriptions plus the declared total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardPlan {
    pub total_frames: u32,
    pub frames: Vec<FrameDescription>,
}

impl StoryboardPlan {
    /// Parse the raw model output as a plan.
    ///
    /// Models occasionally wrap JSON in a markdown code fence even when told
    /// not to; the fence is stripped before parsing. Anything else that fails
    /// to parse surfaces as [`StoryboardError::InvalidPlan`] — never retried.
    pub fn from_model_output(raw: &str) -> Result<Self, StoryboardError> {
        let trimmed = strip_code_fence(raw.trim());
        serde_json::from_str(trimmed).map_err(|e| StoryboardError::InvalidPlan {
            detail: format!("not valid plan JSON: {e}"),
        })
    }

    /// Enforce the plan invariants: 1 ≤ total ≤ `max_frames`, frame numbers
    /// exactly `1..=total` with no gaps, and non-empty descriptions.
    pub fn validate(&self, max_frames: u32) -> Result<(), StoryboardError> {
        if self.total_frames == 0 || self.total_frames > max_frames {
            return Err(StoryboardError::InvalidPlan {
                detail: format!(
                    "total_frames must be 1..={max_frames}, got {}",
                    self.total_frames
                ),
            });
        }
        if self.frames.len() as u32 != self.total_frames {
            return Err(StoryboardError::InvalidPlan {
                detail: format!(
                    "total_frames is {} but {} frames were listed",
                    self.total_frames,
                    self.frames.len()
                ),
            });
        }
        for (idx, frame) in self.frames.iter().enumerate() {
            let expected = idx as u32 + 1;
            if frame.frame_number != expected {
                return Err(StoryboardError::InvalidPlan {
                    detail: format!(
                        "frame numbers must be exactly 1..{} in order, position {} has {}",
                        self.total_frames, expected, frame.frame_number
                    ),
                });
            }
            if frame.description.trim().is_empty() {
                return Err(StoryboardError::InvalidPlan {
                    detail: format!("frame {} has an empty description", frame.frame_number),
                });
            }
        }
        Ok(())
    }
}

/// Strip a surrounding markdown code fence (``` or ```json) if present.
fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string ("json") up to the first newline.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// One generated storyboard image, paired with its frame number.
///
/// Consumed immediately for persistence and as the conditioning reference
/// for the next frame's generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFrame {
    pub frame_number: u32,
    pub image: Vec<u8>,
}

/// The metadata sidecar stored alongside a session's frame images.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub frames: Vec<FrameDescription>,
}

/// Terminal result of the batch generation entry point.
///
/// Failures are reported inside this type, not as `Err` — the batch
/// orchestrator never partially applies and never panics the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storyboard_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u32>,
}

impl GenerationOutcome {
    pub fn ok(storyboard_path: String, total_frames: u32) -> Self {
        Self {
            success: true,
            message: "Storyboard generated successfully".to_string(),
            storyboard_path: Some(storyboard_path),
            total_frames: Some(total_frames),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            storyboard_path: None,
            total_frames: None,
        }
    }
}

/// Terminal result of the single-frame edit flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEditOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_regenerated: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(numbers: &[u32]) -> StoryboardPlan {
        StoryboardPlan {
            total_frames: numbers.len() as u32,
            frames: numbers
                .iter()
                .map(|&n| FrameDescription {
                    frame_number: n,
                    description: format!("scene {n}"),
                })
                .collect(),
        }
    }

    #[test]
    fn valid_plan_passes() {
        assert!(plan(&[1, 2, 3]).validate(10).is_ok());
        assert!(plan(&[1]).validate(10).is_ok());
    }

    #[test]
    fn gap_in_frame_numbers_fails() {
        assert!(plan(&[1, 3, 4]).validate(10).is_err());
    }

    #[test]
    fn frame_numbers_must_start_at_one() {
        assert!(plan(&[2, 3]).validate(10).is_err());
    }

    #[test]
    fn too_many_frames_fails() {
        let p = plan(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        assert!(p.validate(10).is_err());
    }

    #[test]
    fn total_must_match_listed_count() {
        let mut p = plan(&[1, 2]);
        p.total_frames = 3;
        assert!(p.validate(10).is_err());
    }

    #[test]
    fn empty_description_fails() {
        let mut p = plan(&[1, 2]);
        p.frames[1].description = "   ".to_string();
        assert!(p.validate(10).is_err());
    }

    #[test]
    fn parses_bare_json() {
        let raw = r#"{"total_frames":2,"frames":[
            {"frame_number":1,"description":"A dog runs to a ball."},
            {"frame_number":2,"description":"The dog picks it up."}]}"#;
        let p = StoryboardPlan::from_model_output(raw).expect("parse");
        assert_eq!(p.total_frames, 2);
        assert_eq!(p.frames[1].description, "The dog picks it up.");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"total_frames\":1,\"frames\":[{\"frame_number\":1,\"description\":\"x\"}]}\n```";
        let p = StoryboardPlan::from_model_output(raw).expect("parse");
        assert_eq!(p.total_frames, 1);
    }

    #[test]
    fn prose_is_rejected() {
        let err = StoryboardPlan::from_model_output("Sure! Here is your storyboard.").unwrap_err();
        assert!(matches!(err, StoryboardError::InvalidPlan { .. }));
    }

    #[test]
    fn outcome_serialisation_omits_absent_fields() {
        let json = serde_json::to_string(&GenerationOutcome::failure("boom")).unwrap();
        assert!(!json.contains("storyboard_path"));
        assert!(json.contains("\"success\":false"));
    }
}
