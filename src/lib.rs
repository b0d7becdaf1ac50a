//! # jd2letter
//!
//! Turn a screenshot of a job posting into a tailored LaTeX cover letter and
//! PDF.
//!
//! A vision model reads the posting image and returns the company name,
//! address, role title and hiring manager as JSON. Those values are swapped
//! into an existing letter wherever its own company/address/role/greeting
//! text appears, and `pdflatex` builds the result.
//!
//! ## Pipeline Overview
//!
//! ```text
//! posting.png            cover_letter.tex
//!  │                            │
//!  ├─ 1. Extract  image → VLM → JobPosting
//!  ├─ 2. Template literal substitution → cover_letter_AcmeInc.tex
//!  └─ 3. Compile  pdflatex × 2 → cover_letter_AcmeInc.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jd2letter::{generate, ExtractorConfig, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY; fails fast if it is not set.
//!     let extractor = ExtractorConfig::from_env()?;
//!     let config = GenerationConfig::builder(extractor).build()?;
//!     let output = generate("posting.png", "cover_letter.tex", &config).await?;
//!     println!("{:?}", output.pdf_path);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `jd2letter` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod posting;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CompilerConfig, ExtractorConfig, ExtractorConfigBuilder, GenerationConfig, GenerationConfigBuilder};
pub use error::LetterError;
pub use generate::{generate, generate_sync, GenerationOutput, GenerationStats};
pub use pipeline::compile::{DocumentCompiler, LatexCompiler};
pub use pipeline::extract::{extract_posting, Extractor, ProviderVisionModel, VisionModel};
pub use pipeline::gemini::GeminiVisionModel;
pub use pipeline::template::{output_tex_path, Placeholders, Templater};
pub use posting::{parse_response, sanitize_company_name, JobPosting};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
