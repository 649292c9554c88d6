//! Configuration for storyboard generation.
//!
//! Everything is carried in one [`StoryboardConfig`], built via its
//! [`StoryboardConfigBuilder`] and injected into component constructors once
//! at process start. Core logic never reads the environment or any ambient
//! global — the binary resolves env vars into this struct and passes it down.

use crate::error::StoryboardError;
use std::path::PathBuf;

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for the storyboard pipeline.
///
/// Built via [`StoryboardConfig::builder()`] or [`StoryboardConfig::default()`].
///
/// # Example
/// ```rust
/// use sketchboard::StoryboardConfig;
///
/// let config = StoryboardConfig::builder()
///     .output_dir("output")
///     .image_model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct StoryboardConfig {
    /// Model used for the text-segmentation call. Default: "gemini-2.0-flash".
    pub text_model: String,

    /// Model used for image generation and frame edits. Default: "gemini-2.0-flash".
    pub image_model: String,

    /// API key. When `None`, [`crate::GeminiClient::new`] falls back to the
    /// `GEMINI_API_KEY` environment variable.
    pub api_key: Option<String>,

    /// Base URL of the generation API. Overridable so tests can point the
    /// client at a local fake.
    pub api_base: String,

    /// Root directory for persisted sessions. Default: "output".
    ///
    /// Sessions live at `<output_dir>/<session_id>/`; transient reference
    /// images for an in-flight run live at `<output_dir>/.temp/` and never
    /// survive past a single generation run.
    pub output_dir: PathBuf,

    /// Hard cap on frames per storyboard. Range 1–10, default 10.
    ///
    /// The segmentation instruction already asks for at most 10 frames; this
    /// field enforces the cap on whatever the model actually returns.
    pub max_frames: u32,

    /// Sampling temperature for the segmentation call. Default: 0.2.
    ///
    /// Low temperature keeps segmentation faithful to the input text instead
    /// of inventing beats that are not in the description.
    pub temperature: f32,
}

impl Default for StoryboardConfig {
    fn default() -> Self {
        Self {
            text_model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-2.0-flash".to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            output_dir: PathBuf::from("output"),
            max_frames: 10,
            temperature: 0.2,
        }
    }
}

impl StoryboardConfig {
    /// Create a new builder for `StoryboardConfig`.
    pub fn builder() -> StoryboardConfigBuilder {
        StoryboardConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StoryboardConfig`].
#[derive(Debug)]
pub struct StoryboardConfigBuilder {
    config: StoryboardConfig,
}

impl StoryboardConfigBuilder {
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn max_frames(mut self, n: u32) -> Self {
        self.config.max_frames = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StoryboardConfig, StoryboardError> {
        let c = &self.config;
        if c.max_frames == 0 || c.max_frames > 10 {
            return Err(StoryboardError::InvalidConfig(format!(
                "max_frames must be 1–10, got {}",
                c.max_frames
            )));
        }
        if c.text_model.is_empty() || c.image_model.is_empty() {
            return Err(StoryboardError::InvalidConfig(
                "model names must not be empty".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(StoryboardError::InvalidConfig(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let c = StoryboardConfig::builder().build().unwrap();
        assert_eq!(c.max_frames, 10);
        assert_eq!(c.output_dir, PathBuf::from("output"));
        assert_eq!(c.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn max_frames_out_of_range_rejected() {
        assert!(StoryboardConfig::builder().max_frames(0).build().is_err());
        assert!(StoryboardConfig::builder().max_frames(11).build().is_err());
        assert!(StoryboardConfig::builder().max_frames(10).build().is_ok());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = StoryboardConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn empty_model_name_rejected() {
        assert!(StoryboardConfig::builder().text_model("").build().is_err());
    }
}
