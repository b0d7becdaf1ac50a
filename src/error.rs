//! Error types for the jd2letter library.
//!
//! A single fatal error type, [`LetterError`], covers every stage of the
//! pipeline. The run is strictly linear (extract → template → compile), so a
//! failure anywhere aborts the remaining stages.
//!
//! Variants are grouped by the stage that raises them. The helper predicates
//! ([`LetterError::is_configuration_error`], [`LetterError::is_not_found`],
//! [`LetterError::is_parse_error`], [`LetterError::is_compilation_error`])
//! collapse them into the four categories callers usually branch on.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// All errors returned by the jd2letter library.
#[derive(Debug, Error)]
pub enum LetterError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// The API key environment variable is absent or empty.
    #[error("{var} environment variable not set. Please set it to your API key.")]
    MissingApiKey { var: String },

    /// A named provider could not be initialised (missing key, unknown name).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Image or template file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be decoded as an image.
    #[error("File is not a readable image: '{path}': {detail}")]
    InvalidImage { path: PathBuf, detail: String },

    /// Re-encoding the decoded image as PNG failed.
    #[error("Image encoding failed: {0}")]
    ImageEncodingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("Model request failed: {message}")]
    ModelRequestFailed { message: String },

    /// The model API answered with a non-success status.
    #[error("Model API error (status {status}): {message}")]
    ModelApiError { status: u16, message: String },

    /// The model answered but returned no text at all.
    ///
    /// `reason` is the backend's finish reason when it gave one
    /// (e.g. `MAX_TOKENS`, `SAFETY`).
    #[error("Model returned an empty response (finish reason: {reason})")]
    EmptyModelResponse { reason: String },

    /// The model's text could not be parsed as a JSON object.
    ///
    /// `raw` is the response exactly as received, before fence stripping.
    #[error("Failed to decode JSON from model response ({detail}). Response was:\n{raw}")]
    ParseError { raw: String, detail: String },

    // ── Template errors ───────────────────────────────────────────────────
    /// The template exists but reading it failed (e.g. not UTF-8).
    #[error("Failed to read template '{path}': {source}")]
    TemplateReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the generated document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The derived output path points at the template itself.
    #[error("Refusing to overwrite the template '{path}' with generated output")]
    OutputWouldOverwriteTemplate { path: PathBuf },

    // ── Compiler errors ───────────────────────────────────────────────────
    /// The compiler binary could not be started at all.
    #[error("Failed to run '{program}': {source}\nEnsure LaTeX is installed and in your system's PATH.")]
    CompilerSpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A compiler pass exited with a non-zero status.
    #[error(
        "{program} compilation failed on pass {pass} ({status}).\n\
--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}"
    )]
    CompilationFailed {
        program: String,
        pass: u32,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LetterError {
    /// Missing credential or an unusable provider/config.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey { .. } | Self::ProviderNotConfigured { .. } | Self::InvalidConfig(_)
        )
    }

    /// Image or template that is missing, unreadable, or (for the image)
    /// not decodable.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::PermissionDenied { .. } | Self::InvalidImage { .. }
        )
    }

    /// Model output was not a JSON object.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError { .. })
    }

    /// The external compiler could not run or failed.
    pub fn is_compilation_error(&self) -> bool {
        matches!(
            self,
            Self::CompilerSpawnFailed { .. } | Self::CompilationFailed { .. }
        )
    }
}
