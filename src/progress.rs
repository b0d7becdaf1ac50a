//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to be told
//! when each stage starts, finishes or fails. The CLI uses this to drive its
//! spinner; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use jd2letter::{GenerationProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct Log(Mutex<Vec<String>>);
//!
//! impl GenerationProgressCallback for Log {
//!     fn on_stage_complete(&self, stage: Stage, detail: &str) {
//!         self.0.lock().unwrap().push(format!("{stage}: {detail}"));
//!     }
//! }
//!
//! let log = Arc::new(Log(Mutex::new(Vec::new())));
//! log.on_stage_complete(Stage::Template, "letter_Acme.tex");
//! assert_eq!(log.0.lock().unwrap()[0], "template: letter_Acme.tex");
//! ```

use crate::posting::JobPosting;
use std::fmt;
use std::sync::Arc;

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Image → model → [`crate::posting::JobPosting`].
    Extract,
    /// Placeholder substitution into the template.
    Template,
    /// External compiler passes.
    Compile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Template => "template",
            Stage::Compile => "compile",
        })
    }
}

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages run one after another, never concurrently.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once extraction has produced a record, before templating.
    fn on_posting_extracted(&self, posting: &JobPosting) {
        let _ = posting;
    }

    /// Called before each compiler pass.
    ///
    /// # Arguments
    /// * `pass`  — 1-indexed pass number
    /// * `total` — total passes configured
    fn on_compile_pass(&self, pass: u32, total: u32) {
        let _ = (pass, total);
    }

    /// Called when a stage succeeds.
    ///
    /// `detail` is a short human-readable summary (company name, output path).
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called when a stage fails. No further stages run after this.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
