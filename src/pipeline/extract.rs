//! Extraction: posting image → vision model → [`JobPosting`].
//!
//! The model sits behind the narrow [`VisionModel`] trait (prompt + image in,
//! text out), so the extraction logic never knows which API it is talking
//! to. Two backends ship with the crate:
//!
//! * [`crate::pipeline::gemini::GeminiVisionModel`]: a direct Gemini REST
//!   client using an explicit API key (the default).
//! * [`ProviderVisionModel`]: any `edgequake-llm` provider (OpenAI,
//!   Anthropic, Ollama, …), selected via `provider_name`.
//!
//! There is exactly one request per extraction and no retry: a bad answer is
//! surfaced to the user, who can simply run the command again.

use crate::config::ExtractorConfig;
use crate::error::LetterError;
use crate::pipeline::encode::encode_image;
use crate::pipeline::gemini::GeminiVisionModel;
use crate::pipeline::input::load_image;
use crate::posting::{parse_response, JobPosting};
use crate::prompts::EXTRACTION_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A multimodal model that answers a text instruction about one image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Short label for logs, e.g. `"gemini/gemini-2.5-flash"`.
    fn label(&self) -> String;

    /// Send `prompt` with `image` and return the model's raw text answer.
    async fn complete(&self, prompt: &str, image: ImageData) -> Result<String, LetterError>;
}

/// [`VisionModel`] backed by an `edgequake-llm` provider.
pub struct ProviderVisionModel {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl ProviderVisionModel {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        provider_name: impl Into<String>,
        model: impl Into<String>,
        config: &ExtractorConfig,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            model: model.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    fn options(&self) -> CompletionOptions {
        build_options(self.temperature, self.max_tokens)
    }
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl VisionModel for ProviderVisionModel {
    fn label(&self) -> String {
        format!("{}/{}", self.provider_name, self.model)
    }

    async fn complete(&self, prompt: &str, image: ImageData) -> Result<String, LetterError> {
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];
        let options = self.options();
        let response =
            request_with_timeout(self.timeout, self.provider.chat(&messages, Some(&options)))
                .await?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label(),
            response.prompt_tokens,
            response.completion_tokens
        );

        non_empty(response.content)
    }
}

/// Await a provider call, mapping its error and a timeout to
/// [`LetterError::ModelRequestFailed`].
async fn request_with_timeout<T, E: Display>(
    timeout: Duration,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, LetterError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(LetterError::ModelRequestFailed {
            message: e.to_string(),
        }),
        Err(_) => Err(LetterError::ModelRequestFailed {
            message: format!("request timed out after {}s", timeout.as_secs_f32()),
        }),
    }
}

fn non_empty(content: String) -> Result<String, LetterError> {
    if content.trim().is_empty() {
        return Err(LetterError::EmptyModelResponse {
            reason: "provider returned no content".to_string(),
        });
    }
    Ok(content)
}

/// Default model for providers reached through `edgequake-llm`.
pub fn default_model_for(provider: &str) -> &'static str {
    match provider.to_ascii_lowercase().as_str() {
        "anthropic" => "claude-sonnet-4-20250514",
        "mistral" => "pixtral-12b-2409",
        "ollama" => "llama3.2-vision",
        _ => "gpt-4.1-nano",
    }
}

/// Build the vision backend described by `config`.
///
/// Gemini (the default) requires `config.api_key`; other providers read
/// their own credentials through `ProviderFactory`.
pub fn resolve_vision_model(config: &ExtractorConfig) -> Result<Arc<dyn VisionModel>, LetterError> {
    if config.uses_gemini() {
        return Ok(Arc::new(GeminiVisionModel::new(config)?));
    }

    // uses_gemini() is false only when a provider name is set
    let name = config.provider_name.as_deref().unwrap_or_default();
    let model = config.model_or(default_model_for(name));
    let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        LetterError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })?;

    Ok(Arc::new(ProviderVisionModel::new(provider, name, model, config)))
}

/// Turns a posting image into a [`JobPosting`] using a [`VisionModel`].
pub struct Extractor {
    model: Arc<dyn VisionModel>,
    config: ExtractorConfig,
}

impl Extractor {
    /// Use an explicit backend (a test double, or a pre-built provider).
    pub fn new(model: Arc<dyn VisionModel>, config: ExtractorConfig) -> Self {
        Self { model, config }
    }

    /// Resolve the backend from `config`.
    pub fn from_config(config: ExtractorConfig) -> Result<Self, LetterError> {
        let model = resolve_vision_model(&config)?;
        Ok(Self::new(model, config))
    }

    /// Extract the posting fields from the image at `image_path`.
    ///
    /// # Errors
    /// * [`LetterError::FileNotFound`] / [`LetterError::InvalidImage`] for a
    ///   bad image, before any request is made.
    /// * Model errors from the backend.
    /// * [`LetterError::ParseError`] (with the raw text) when the answer is
    ///   not a JSON object.
    pub async fn extract(&self, image_path: &Path) -> Result<JobPosting, LetterError> {
        info!("Opening image at: {}", image_path.display());

        let path = image_path.to_path_buf();
        let max_pixels = self.config.max_image_pixels;
        let image_data = tokio::task::spawn_blocking(move || {
            let img = load_image(&path)?;
            encode_image(&img, max_pixels)
                .map_err(|e| LetterError::ImageEncodingFailed(e.to_string()))
        })
        .await
        .map_err(|e| LetterError::Internal(format!("image task panicked: {e}")))??;

        let prompt = self.config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT);

        info!(
            "Sending request to {}... This may take a moment.",
            self.model.label()
        );
        let text = self.model.complete(prompt, image_data).await?;
        debug!("Model response: {text}");

        info!("Parsing API response.");
        parse_response(&text)
    }
}

/// Extract a posting with the backend resolved from `config`.
pub async fn extract_posting(
    image_path: impl AsRef<Path>,
    config: &ExtractorConfig,
) -> Result<JobPosting, LetterError> {
    Extractor::from_config(config.clone())?
        .extract(image_path.as_ref())
        .await
}
