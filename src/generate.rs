//! End-to-end entry points: image + template → `.tex` → PDF.
//!
//! The three stages run strictly in sequence, each awaited to completion
//! before the next starts. A failure in any stage aborts the run. Files
//! already written (the `.tex`, LaTeX's auxiliary files) are left as they are.

use crate::config::GenerationConfig;
use crate::error::LetterError;
use crate::pipeline::compile::{DocumentCompiler, LatexCompiler};
use crate::pipeline::extract::{resolve_vision_model, Extractor};
use crate::pipeline::input::check_readable;
use crate::pipeline::template::{output_tex_path, Templater};
use crate::posting::JobPosting;
use crate::progress::{ProgressCallback, Stage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    /// Fields extracted from the image.
    pub posting: JobPosting,
    /// The generated LaTeX document.
    pub tex_path: PathBuf,
    /// The compiled PDF, or `None` when compilation was disabled.
    pub pdf_path: Option<PathBuf>,
    /// Timings.
    pub stats: GenerationStats,
}

/// Wall-clock timings for each stage, in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStats {
    pub extract_duration_ms: u64,
    pub template_duration_ms: u64,
    pub compile_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Generate a cover letter from a posting image and a LaTeX template.
///
/// # Arguments
/// * `image`    — path to the job-posting screenshot/photo
/// * `template` — path to the LaTeX letter containing the placeholder literals
/// * `config`   — generation configuration
///
/// # Errors
/// Configuration problems are reported before any file or network access.
/// A missing template is reported before the model is called.
pub async fn generate(
    image: impl AsRef<Path>,
    template: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, LetterError> {
    let total_start = Instant::now();
    let image = image.as_ref();
    let template = template.as_ref();
    let cb = config.progress_callback.as_ref();

    // ── Step 0: Resolve backends (fails fast on missing credentials) ─────
    let model = match config.vision_model {
        Some(ref m) => Arc::clone(m),
        None => resolve_vision_model(&config.extractor)?,
    };
    check_readable(template)?;

    // ── Step 1: Extract ──────────────────────────────────────────────────
    let start = Instant::now();
    let extractor = Extractor::new(model, config.extractor.clone());
    let posting = run_stage(cb, Stage::Extract, extractor.extract(image)).await?;
    if let Some(cb) = cb {
        cb.on_posting_extracted(&posting);
    }
    notify_complete(cb, Stage::Extract, posting.company_name());
    let extract_duration_ms = start.elapsed().as_millis() as u64;

    // ── Step 2: Template ─────────────────────────────────────────────────
    let start = Instant::now();
    let tex_path = output_tex_path(template, &posting, &config.output_dir);
    let templater = Templater::new(config.placeholders.clone());
    run_stage(
        cb,
        Stage::Template,
        templater.render_to_file(template, &tex_path, &posting),
    )
    .await?;
    notify_complete(cb, Stage::Template, &tex_path.display().to_string());
    let template_duration_ms = start.elapsed().as_millis() as u64;

    // ── Step 3: Compile ──────────────────────────────────────────────────
    let start = Instant::now();
    let pdf_path = if config.compile {
        let compiler: Arc<dyn DocumentCompiler> = match config.document_compiler {
            Some(ref c) => Arc::clone(c),
            None => Arc::new(LatexCompiler::new(&config.compiler).with_progress(cb.cloned())),
        };
        let pdf = run_stage(cb, Stage::Compile, compiler.compile(&tex_path)).await?;
        notify_complete(cb, Stage::Compile, &pdf.display().to_string());
        Some(pdf)
    } else {
        info!("Compilation disabled; stopping after {}", tex_path.display());
        None
    };
    let compile_duration_ms = start.elapsed().as_millis() as u64;

    let stats = GenerationStats {
        extract_duration_ms,
        template_duration_ms,
        compile_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!("Generation complete in {}ms", stats.total_duration_ms);

    Ok(GenerationOutput {
        posting,
        tex_path,
        pdf_path,
        stats,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    image: impl AsRef<Path>,
    template: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, LetterError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LetterError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(image, template, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_stage<T>(
    cb: Option<&ProgressCallback>,
    stage: Stage,
    fut: impl std::future::Future<Output = Result<T, LetterError>>,
) -> Result<T, LetterError> {
    if let Some(cb) = cb {
        cb.on_stage_start(stage);
    }
    let result = fut.await;
    if let (Some(cb), Err(e)) = (cb, &result) {
        cb.on_stage_error(stage, &e.to_string());
    }
    result
}

fn notify_complete(cb: Option<&ProgressCallback>, stage: Stage, detail: &str) {
    if let Some(cb) = cb {
        cb.on_stage_complete(stage, detail);
    }
}
