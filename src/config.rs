//! Configuration types for cover-letter generation.
//!
//! Every knob lives in one of three structs:
//!
//! * [`ExtractorConfig`] — which model to call and how (credential, model id,
//!   sampling options, image size cap).
//! * [`CompilerConfig`]  — which document compiler to run and how many passes.
//! * [`GenerationConfig`] — the full pipeline: the two above plus template
//!   placeholders, output directory and optional injected backends.
//!
//! The credential is an explicit field rather than process-wide state. The
//! only place the environment is consulted is [`ExtractorConfig::from_env`],
//! so tests can build a config with a fake key and a mock endpoint.

use crate::error::LetterError;
use crate::pipeline::compile::DocumentCompiler;
use crate::pipeline::extract::VisionModel;
use crate::pipeline::template::Placeholders;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the extraction step.
///
/// # Example
/// ```rust
/// use jd2letter::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .api_key("test-key")
///     .model("gemini-2.5-pro")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.model_or(jd2letter::config::DEFAULT_MODEL), "gemini-2.5-pro");
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// API key for the built-in Gemini backend. Required unless
    /// `provider_name` selects another provider.
    pub api_key: Option<String>,

    /// Model identifier. If None, uses the backend's default
    /// ([`DEFAULT_MODEL`] for Gemini).
    pub model: Option<String>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_BASE_URL`].
    ///
    /// Overridden in tests to point at a local mock server.
    pub base_url: String,

    /// Provider name for the generic `edgequake-llm` backend
    /// (e.g. "openai", "anthropic", "ollama"). `None` or `"gemini"` selects
    /// the built-in Gemini REST client.
    pub provider_name: Option<String>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction is transcription, not writing; keep it near zero.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Gemini thinking-token budget (`generationConfig.thinkingConfig`).
    /// If None, `flash` models get 0 (thinking off) and other models use the
    /// API default. Thinking tokens count against `max_tokens`.
    pub thinking_budget: Option<u32>,

    /// Per-request timeout in seconds. Default: 120.
    ///
    /// Set on the Gemini HTTP client; `edgequake-llm` provider calls are
    /// wrapped in a `tokio::time::timeout` of the same length.
    pub api_timeout_secs: u64,

    /// Custom extraction instruction. If None, uses the built-in prompt.
    pub prompt: Option<String>,

    /// Largest side, in pixels, of the image sent to the model. Default: 2000.
    ///
    /// Phone photos are often 4000+ px; anything above this is downscaled
    /// (aspect ratio kept) before upload.
    pub max_image_pixels: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            provider_name: None,
            temperature: 0.1,
            max_tokens: 4096,
            thinking_budget: None,
            api_timeout_secs: 120,
            prompt: None,
            max_image_pixels: 2000,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("provider_name", &self.provider_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("thinking_budget", &self.thinking_budget)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("max_image_pixels", &self.max_image_pixels)
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default config with the API key taken from [`API_KEY_ENV`].
    ///
    /// Fails fast with [`LetterError::MissingApiKey`] when the variable is
    /// unset or empty, before any file or network access happens.
    pub fn from_env() -> Result<Self, LetterError> {
        let key = read_api_key(API_KEY_ENV)?;
        Ok(Self {
            api_key: Some(key),
            ..Self::default()
        })
    }

    /// The configured model, or `default` when none was set.
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }

    /// True when the built-in Gemini REST client should be used.
    pub fn uses_gemini(&self) -> bool {
        match self.provider_name.as_deref() {
            None => true,
            Some(name) => name.eq_ignore_ascii_case("gemini"),
        }
    }

    /// The API key, or [`LetterError::MissingApiKey`] if none was configured.
    pub fn require_api_key(&self) -> Result<&str, LetterError> {
        match self.api_key.as_deref() {
            Some(k) if !k.trim().is_empty() => Ok(k),
            _ => Err(LetterError::MissingApiKey {
                var: API_KEY_ENV.to_string(),
            }),
        }
    }
}

/// Read a non-empty API key from the named environment variable.
pub fn read_api_key(var: &str) -> Result<String, LetterError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LetterError::MissingApiKey {
            var: var.to_string(),
        }),
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn thinking_budget(mut self, tokens: u32) -> Self {
        self.config.thinking_budget = Some(tokens);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px.max(64);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, LetterError> {
        let c = &self.config;
        if c.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(LetterError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(LetterError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(LetterError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for the external document compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Compiler executable. Default: `pdflatex`.
    pub program: String,

    /// Number of sequential passes. Default: 2.
    ///
    /// LaTeX needs a second run to resolve page numbers and cross-references
    /// written to the `.aux` file on the first.
    pub passes: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "pdflatex".to_string(),
            passes: 2,
        }
    }
}

/// Configuration for a full image → letter → PDF run.
///
/// # Example
/// ```rust
/// use jd2letter::{ExtractorConfig, GenerationConfig};
///
/// let extractor = ExtractorConfig::builder().api_key("k").build().unwrap();
/// let config = GenerationConfig::builder(extractor)
///     .output_dir("out")
///     .compile(false)
///     .build()
///     .unwrap();
/// assert!(!config.compile);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// How to call the model.
    pub extractor: ExtractorConfig,

    /// Literals replaced in the template. Default: [`Placeholders::default`].
    pub placeholders: Placeholders,

    /// How to run the compiler.
    pub compiler: CompilerConfig,

    /// Directory the generated `.tex` (and PDF) is written to. Default: `.`.
    pub output_dir: PathBuf,

    /// Run the compiler after templating. Default: true.
    pub compile: bool,

    /// Pre-constructed vision backend. Takes precedence over `extractor`'s
    /// provider selection.
    pub vision_model: Option<Arc<dyn VisionModel>>,

    /// Pre-constructed compiler. Takes precedence over `compiler`.
    pub document_compiler: Option<Arc<dyn DocumentCompiler>>,

    /// Optional progress callback for per-stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("extractor", &self.extractor)
            .field("placeholders", &self.placeholders)
            .field("compiler", &self.compiler)
            .field("output_dir", &self.output_dir)
            .field("compile", &self.compile)
            .field(
                "vision_model",
                &self.vision_model.as_ref().map(|_| "<dyn VisionModel>"),
            )
            .field(
                "document_compiler",
                &self.document_compiler.as_ref().map(|_| "<dyn DocumentCompiler>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a builder around an extractor config.
    pub fn builder(extractor: ExtractorConfig) -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self {
                extractor,
                placeholders: Placeholders::default(),
                compiler: CompilerConfig::default(),
                output_dir: PathBuf::from("."),
                compile: true,
                vision_model: None,
                document_compiler: None,
                progress_callback: None,
            },
        }
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn placeholders(mut self, placeholders: Placeholders) -> Self {
        self.config.placeholders = placeholders;
        self
    }

    pub fn compiler_program(mut self, program: impl Into<String>) -> Self {
        self.config.compiler.program = program.into();
        self
    }

    pub fn compiler_passes(mut self, passes: u32) -> Self {
        self.config.compiler.passes = passes;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn compile(mut self, v: bool) -> Self {
        self.config.compile = v;
        self
    }

    pub fn vision_model(mut self, model: Arc<dyn VisionModel>) -> Self {
        self.config.vision_model = Some(model);
        self
    }

    pub fn document_compiler(mut self, compiler: Arc<dyn DocumentCompiler>) -> Self {
        self.config.document_compiler = Some(compiler);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, LetterError> {
        let c = &self.config;
        if c.compiler.passes == 0 {
            return Err(LetterError::InvalidConfig(
                "compiler passes must be ≥ 1".into(),
            ));
        }
        if c.compiler.program.trim().is_empty() {
            return Err(LetterError::InvalidConfig(
                "compiler program must not be empty".into(),
            ));
        }
        c.placeholders.validate()?;
        Ok(self.config)
    }
}
