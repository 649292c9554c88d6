//! Typed progress events for the streaming pipeline.
//!
//! The streaming entry point emits a linear sequence of these events: a
//! `step_start`/`step_complete` pair per stage, `step_progress` events during
//! image generation, and exactly one terminal event — `complete` on success
//! or `error` on any failure. Nothing is emitted after the terminal event.
//!
//! Events serialise to the exact JSON shapes the SSE clients consume, with
//! absent fields omitted rather than null.

use serde::Serialize;

/// The three reported pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyzing,
    Generating,
    CreatingPdf,
}

impl Stage {
    /// 1-indexed step number as reported on the wire.
    pub fn step(self) -> u8 {
        match self {
            Stage::Analyzing => 1,
            Stage::Generating => 2,
            Stage::CreatingPdf => 3,
        }
    }
}

/// A discrete, ordered progress message delivered to streaming clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    StepStart {
        step: u8,
        step_name: Stage,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_frames: Option<u32>,
    },
    StepProgress {
        step: u8,
        step_name: Stage,
        current_frame: u32,
        total_frames: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        generating: Option<bool>,
        message: String,
    },
    StepComplete {
        step: u8,
        step_name: Stage,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_frames: Option<u32>,
    },
    Complete {
        success: bool,
        message: String,
        session_id: String,
        storyboard_path: String,
        total_frames: u32,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    pub fn step_start(stage: Stage, message: impl Into<String>, total_frames: Option<u32>) -> Self {
        ProgressEvent::StepStart {
            step: stage.step(),
            step_name: stage,
            message: message.into(),
            total_frames,
        }
    }

    pub fn step_complete(
        stage: Stage,
        message: impl Into<String>,
        total_frames: Option<u32>,
    ) -> Self {
        ProgressEvent::StepComplete {
            step: stage.step(),
            step_name: stage,
            message: message.into(),
            total_frames,
        }
    }

    /// Progress event emitted just before an image-generation call starts.
    pub fn frame_started(current_frame: u32, total_frames: u32) -> Self {
        ProgressEvent::StepProgress {
            step: Stage::Generating.step(),
            step_name: Stage::Generating,
            current_frame,
            total_frames,
            generating: Some(true),
            message: format!("Generating frame {current_frame}/{total_frames}..."),
        }
    }

    /// Progress event emitted after an image-generation call succeeds.
    pub fn frame_completed(current_frame: u32, total_frames: u32) -> Self {
        ProgressEvent::StepProgress {
            step: Stage::Generating.step(),
            step_name: Stage::Generating,
            current_frame,
            total_frames,
            generating: None,
            message: format!("Generated frame {current_frame}/{total_frames}"),
        }
    }

    pub fn complete(session_id: String, storyboard_path: String, total_frames: u32) -> Self {
        ProgressEvent::Complete {
            success: true,
            message: "Storyboard generated successfully".to_string(),
            session_id,
            storyboard_path,
            total_frames,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }

    /// Whether this is one of the two terminal events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_step_numbers() {
        assert_eq!(Stage::Analyzing.step(), 1);
        assert_eq!(Stage::Generating.step(), 2);
        assert_eq!(Stage::CreatingPdf.step(), 3);
    }

    #[test]
    fn step_start_serialises_with_snake_case_tag() {
        let ev = ProgressEvent::step_start(Stage::Analyzing, "Analyzing your description...", None);
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "step_start");
        assert_eq!(json["step"], 1);
        assert_eq!(json["step_name"], "analyzing");
        assert!(json.get("total_frames").is_none());
    }

    #[test]
    fn frame_progress_carries_generating_flag_only_at_start() {
        let start = serde_json::to_value(ProgressEvent::frame_started(1, 2)).unwrap();
        assert_eq!(start["generating"], true);
        assert_eq!(start["message"], "Generating frame 1/2...");

        let done = serde_json::to_value(ProgressEvent::frame_completed(1, 2)).unwrap();
        assert!(done.get("generating").is_none());
        assert_eq!(done["message"], "Generated frame 1/2");
    }

    #[test]
    fn complete_and_error_are_terminal() {
        assert!(ProgressEvent::complete("sid".into(), "output/sid/storyboard.pdf".into(), 2)
            .is_terminal());
        assert!(ProgressEvent::error("boom").is_terminal());
        assert!(!ProgressEvent::step_start(Stage::Generating, "x", None).is_terminal());
    }

    #[test]
    fn creating_pdf_stage_name_on_wire() {
        let ev = ProgressEvent::step_start(Stage::CreatingPdf, "Creating PDF storyboard...", None);
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["step_name"], "creating_pdf");
    }
}
