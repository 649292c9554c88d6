//! Gemini REST client implementing both model seams.
//!
//! One [`GeminiClient`] serves both roles: [`TextModel`] for segmentation
//! (client-side conversation history, JSON-constrained output) and
//! [`ImageModel`] for frame generation (multimodal requests carrying an
//! inline reference PNG).
//!
//! ## Image extraction
//!
//! Image models bury the generated image in one of several response shapes.
//! [`extract_image_bytes`] tries a small ordered list of strategies in fixed
//! priority order — inline payload, bare base64 text, data-URL text — each
//! returning a definite match-or-pass result, which keeps the policy
//! testable in isolation from the network call.

use crate::config::StoryboardConfig;
use crate::error::StoryboardError;
use crate::model::{ImageModel, TextModel};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

// ── Wire types ───────────────────────────────────────────────────────────

/// One part of a content turn: text, an inline binary payload, or both
/// fields absent (e.g. a thought part we ignore).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        rename = "inlineData",
        alias = "inline_data",
        skip_serializing_if = "Option::is_none"
    )]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_png(base64_data: String) -> Self {
        Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: base64_data,
            }),
        }
    }
}

/// An inline binary payload, base64-encoded on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Content {
            role: Some("user".to_string()),
            parts,
        }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

// ── Image extraction strategies ──────────────────────────────────────────

/// Strategy 1: the first part carrying an inline data payload, decoded from
/// base64 (payloads are textual on the wire).
fn inline_payload(parts: &[Part]) -> Option<Vec<u8>> {
    parts
        .iter()
        .filter_map(|p| p.inline_data.as_ref())
        .find_map(|d| STANDARD.decode(d.data.trim()).ok())
}

/// Strategy 2: a text part whose entire content is valid base64.
fn bare_base64_text(parts: &[Part]) -> Option<Vec<u8>> {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.starts_with("data:image"))
        .find_map(|t| STANDARD.decode(t).ok())
}

/// Strategy 3: a text part carrying a `data:image/...;base64,` URL.
fn data_url_text(parts: &[Part]) -> Option<Vec<u8>> {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .map(str::trim)
        .filter(|t| t.starts_with("data:image"))
        .filter_map(|t| t.split_once(',').map(|(_, payload)| payload))
        .find_map(|payload| STANDARD.decode(payload.trim()).ok())
}

/// Extract raw image bytes from a generation response.
///
/// Scans the first candidate's parts with each strategy in priority order
/// and returns the first hit; [`StoryboardError::NoImageInResponse`] when
/// every strategy passes.
pub fn extract_image_bytes(response: &GenerateContentResponse) -> Result<Vec<u8>, StoryboardError> {
    let parts = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();

    const STRATEGIES: &[fn(&[Part]) -> Option<Vec<u8>>] =
        &[inline_payload, bare_base64_text, data_url_text];

    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(parts))
        .ok_or(StoryboardError::NoImageInResponse)
}

// ── Client ───────────────────────────────────────────────────────────────

/// REST client for the Gemini `generateContent` endpoint.
///
/// Conversations are client-side: [`TextModel::begin_conversation`] allocates
/// a history slot keyed by an opaque id, `generate` appends the user turn and
/// the model's reply to it, and `end_conversation` drops the slot. The REST
/// API itself is stateless, so the slot is the ephemeral resource whose
/// lifecycle the segmentation caller scopes.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    text_model: String,
    image_model: String,
    temperature: f32,
    conversations: Mutex<HashMap<String, Vec<Content>>>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client from config, falling back to the `GEMINI_API_KEY`
    /// environment variable when `config.api_key` is unset.
    pub fn new(config: &StoryboardConfig) -> Result<Self, StoryboardError> {
        let api_key = match &config.api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => std::env::var("GEMINI_API_KEY").map_err(|_| {
                StoryboardError::InvalidConfig(
                    "No API key: set GEMINI_API_KEY or StoryboardConfig::api_key".into(),
                )
            })?,
        };

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            temperature: config.temperature,
            conversations: Mutex::new(HashMap::new()),
        })
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, StoryboardError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| StoryboardError::ApiError {
                detail: format!("request to {model} failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoryboardError::ApiError {
                detail: format!("{model} returned HTTP {status}: {body}"),
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| StoryboardError::ApiError {
                detail: format!("{model} returned an unparseable body: {e}"),
            })
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn begin_conversation(&self) -> Result<String, StoryboardError> {
        let id = Uuid::new_v4().to_string();
        self.conversations
            .lock()
            .map_err(|_| StoryboardError::Internal("conversation registry poisoned".into()))?
            .insert(id.clone(), Vec::new());
        debug!(conversation = %id, "opened conversation");
        Ok(id)
    }

    async fn generate(
        &self,
        conversation_id: &str,
        system_instruction: &str,
        prompt: &str,
    ) -> Result<String, StoryboardError> {
        let mut history = {
            let registry = self
                .conversations
                .lock()
                .map_err(|_| StoryboardError::Internal("conversation registry poisoned".into()))?;
            registry
                .get(conversation_id)
                .cloned()
                .ok_or_else(|| StoryboardError::ApiError {
                    detail: format!("unknown conversation '{conversation_id}'"),
                })?
        };

        history.push(Content::user(vec![Part::text(prompt)]));

        let request = GenerateContentRequest {
            contents: history.clone(),
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::text(system_instruction)],
            }),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                temperature: Some(self.temperature),
            }),
        };

        let response = self.generate_content(&self.text_model, &request).await?;

        let reply = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref());
        let text = reply
            .and_then(|c| c.parts.iter().find_map(|p| p.text.clone()))
            .ok_or_else(|| StoryboardError::ApiError {
                detail: format!("{} returned no text candidate", self.text_model),
            })?;

        if let Some(content) = reply {
            history.push(content.clone());
        }
        if let Ok(mut registry) = self.conversations.lock() {
            registry.insert(conversation_id.to_string(), history);
        }

        Ok(text)
    }

    async fn end_conversation(&self, conversation_id: &str) -> Result<(), StoryboardError> {
        if let Ok(mut registry) = self.conversations.lock() {
            registry.remove(conversation_id);
        }
        debug!(conversation = %conversation_id, "closed conversation");
        Ok(())
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn generate_image(
        &self,
        prompt: &str,
        reference_png: Option<&[u8]>,
    ) -> Result<Vec<u8>, StoryboardError> {
        // Reference image first, prompt text second — the prompt refers to
        // "the image provided", so the attachment must precede it.
        let mut parts = Vec::with_capacity(2);
        if let Some(png) = reference_png {
            parts.push(Part::inline_png(STANDARD.encode(png)));
        }
        parts.push(Part::text(prompt));

        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: None,
            generation_config: None,
        };

        let response = self.generate_content(&self.image_model, &request).await?;
        extract_image_bytes(&response)
    }
}
