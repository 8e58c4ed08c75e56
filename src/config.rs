//! Process configuration, loaded once at startup and passed to constructors.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{client::DEFAULT_BASE_URL, error::FlowError};

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "gemini-flows.yaml";

/// Model identifier and sampling temperature for one kind of call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model identifier, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
}

impl ModelSettings {
    /// Builds settings for `model` at `temperature`.
    pub fn new(model: impl Into<String>, temperature: impl Into<Option<f32>>) -> Self {
        Self {
            model: model.into(),
            temperature: temperature.into(),
        }
    }
}

/// Settings of the translation refinement loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationSettings {
    /// Model that produces candidate translations.
    pub generator: ModelSettings,
    /// Model that judges candidates.
    pub evaluator: ModelSettings,
    /// Maximum Generate/Evaluate rounds before giving up.
    pub max_iterations: usize,
}

/// All configuration of the flows binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API key for the Gemini API (`GOOGLE_API_KEY`).
    pub google_api_key: Option<String>,
    /// API key for the YouTube Data API (`YOUTUBE_API_KEY`).
    pub youtube_api_key: Option<String>,
    /// Base URL of the Gemini API.
    pub base_url: String,
    /// Timeout applied to every HTTP request.
    pub request_timeout_secs: u64,
    /// Maximum number of tool round-trips within one generation.
    pub max_tool_turns: usize,
    /// Correction prompts issued when an answer does not match its schema.
    pub max_correction_attempts: usize,
    /// Model used by the video search and blog flows.
    pub default_model: ModelSettings,
    /// Model used to transcribe videos.
    pub transcription_model: ModelSettings,
    /// Image model used to illustrate blog posts.
    pub image_model: String,
    /// Where generated blog images are written.
    pub image_output_path: PathBuf,
    /// Number of results requested from YouTube search.
    pub youtube_max_results: u32,
    /// Translation loop settings.
    pub translation: TranslationSettings,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_api_key: None,
            youtube_api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            max_tool_turns: 20,
            max_correction_attempts: 2,
            default_model: ModelSettings::new("gemini-2.5-flash", 0.8),
            transcription_model: ModelSettings::new("gemini-2.5-flash", 0.0),
            image_model: "imagen-3.0-generate-002".to_string(),
            image_output_path: PathBuf::from("blog-image.png"),
            youtube_max_results: 25,
            translation: TranslationSettings {
                generator: ModelSettings::new("gemini-2.0-flash-lite", None),
                evaluator: ModelSettings::new("gemini-2.5-flash", 0.0),
                max_iterations: 5,
            },
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Layers defaults, `gemini-flows.yaml`, `FLOWS_*` variables and the raw API key
    /// variables. A `.env` file is loaded into the environment first.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Config`] if the sources cannot be merged or a required
    /// API key is missing.
    pub fn load() -> Result<Self, FlowError> {
        dotenv::dotenv().ok();
        let config: Config = Self::figment(CONFIG_FILE)
            .extract()
            .map_err(|e| FlowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack used by [`Config::load`].
    pub fn figment(file: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed("FLOWS_").split("__"))
            .merge(Env::raw().only(&["GOOGLE_API_KEY", "YOUTUBE_API_KEY"]))
    }

    /// Checks that the keys needed at startup are present.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Config`] naming the first missing key.
    pub fn validate(&self) -> Result<(), FlowError> {
        let missing = |key: &Option<String>| key.as_deref().map_or(true, |k| k.trim().is_empty());
        if missing(&self.google_api_key) {
            return Err(FlowError::Config(
                "GOOGLE_API_KEY environment variable not set".to_string(),
            ));
        }
        if missing(&self.youtube_api_key) {
            return Err(FlowError::Config(
                "YOUTUBE_API_KEY environment variable not set".to_string(),
            ));
        }
        if self.translation.max_iterations == 0 {
            return Err(FlowError::Config(
                "translation.max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
