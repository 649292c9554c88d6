//! HTTP surface: a small axum router over the pipeline.
//!
//! Three operations plus a health check:
//!
//! * `POST /storyboard/generate`        — batch, one JSON answer at the end
//! * `POST /storyboard/generate-stream` — the same pipeline narrated over SSE
//! * `POST /storyboard/edit-frame`      — regenerate one frame of a session
//! * `GET  /health`                     — liveness
//!
//! Edits to the same session are serialised through a per-session async
//! mutex; edits to different sessions proceed concurrently. Generation
//! requests are not serialised at all — every run gets its own session id.

use crate::frames::{FrameEditOutcome, GenerationOutcome};
use crate::pipeline::PipelineCore;
use crate::run;
use crate::stream::generate_storyboard_stream;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Service identifier reported by the health endpoint.
pub const SERVICE_NAME: &str = "sketchboard";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    core: Arc<PipelineCore>,
    edit_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AppState {
    pub fn new(core: Arc<PipelineCore>) -> Self {
        Self {
            core,
            edit_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The edit mutex for one session, created on first use.
    ///
    /// The outer std mutex only guards the map lookup and is never held
    /// across an await; the returned async mutex is what serialises edits.
    fn edit_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.edit_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/storyboard/generate", post(generate))
        .route("/storyboard/generate-stream", post(generate_stream))
        .route("/storyboard/edit-frame", post(edit_frame))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    user_description: String,
}

#[derive(Debug, Deserialize)]
struct EditFrameRequest {
    session_id: String,
    frame_number: u32,
    edit_instructions: String,
    /// Original description, passed back so the edit prompt keeps the
    /// storyboard's context. Optional.
    #[serde(default)]
    storyboard_context: String,
}

async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> (StatusCode, Json<GenerationOutcome>) {
    if req.user_description.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(GenerationOutcome::failure("Description must not be empty")),
        );
    }

    info!("generate request received");
    let outcome = run::generate_storyboard(&state.core, &req.user_description).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome))
}

async fn generate_stream(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Sse<BoxStream<'static, Result<Event, axum::Error>>> {
    let events = if req.user_description.trim().is_empty() {
        // Protocol-level rejection still travels over the stream: one
        // terminal error event, nothing else.
        futures::stream::once(async {
            crate::events::ProgressEvent::error("Description must not be empty")
        })
        .boxed()
    } else {
        info!("streaming generate request received");
        generate_storyboard_stream(state.core.clone(), req.user_description).boxed()
    };

    let sse_events = events.map(|event| Event::default().json_data(&event));
    Sse::new(sse_events.boxed()).keep_alive(KeepAlive::default())
}

async fn edit_frame(
    State(state): State<AppState>,
    Json(req): Json<EditFrameRequest>,
) -> (StatusCode, Json<FrameEditOutcome>) {
    if req.session_id.trim().is_empty() || req.edit_instructions.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(edit_failure(
                "session_id and edit_instructions must not be empty",
            )),
        );
    }
    if req.frame_number == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(edit_failure("frame_number is 1-indexed")),
        );
    }

    // One edit at a time per session. Edits keyed to other sessions are not
    // blocked by this guard.
    let lock = state.edit_lock(&req.session_id);
    let _guard = lock.lock().await;

    match run::edit_frame(
        &state.core,
        &req.session_id,
        req.frame_number,
        &req.edit_instructions,
        &req.storyboard_context,
    )
    .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)),
        Err(e) if e.is_not_found() => (StatusCode::NOT_FOUND, Json(edit_failure(e.to_string()))),
        Err(e) if e.is_validation() => (StatusCode::BAD_REQUEST, Json(edit_failure(e.to_string()))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(edit_failure(format!("Frame edit failed: {e}"))),
        ),
    }
}

fn edit_failure(message: impl Into<String>) -> FrameEditOutcome {
    FrameEditOutcome {
        success: false,
        message: message.into(),
        frame_number: None,
        image_path: None,
        pdf_regenerated: None,
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}
