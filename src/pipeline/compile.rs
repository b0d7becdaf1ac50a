//! Compilation: run the external LaTeX compiler over the generated letter.
//!
//! `pdflatex` is run a fixed number of times (two by default) so references
//! written to the `.aux` file on the first pass resolve on the second. Each
//! pass is awaited before the next starts. The first non-zero exit stops the
//! run, and its captured output is returned inside
//! [`LetterError::CompilationFailed`]. Auxiliary files are left in place.

use crate::config::CompilerConfig;
use crate::error::LetterError;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Something that turns a text document into a PDF.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    /// Compile `document` and return the path of the produced PDF.
    async fn compile(&self, document: &Path) -> Result<PathBuf, LetterError>;
}

/// [`DocumentCompiler`] that shells out to `pdflatex` (or a compatible tool).
pub struct LatexCompiler {
    program: String,
    passes: u32,
    progress: Option<ProgressCallback>,
}

impl LatexCompiler {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            program: config.program.clone(),
            passes: config.passes,
            progress: None,
        }
    }

    /// Report each pass to `cb`.
    pub fn with_progress(mut self, cb: Option<ProgressCallback>) -> Self {
        self.progress = cb;
        self
    }

    /// Arguments for one pass over `document`.
    fn args(document: &Path, out_dir: &Path) -> Vec<String> {
        vec![
            "-interaction=nonstopmode".to_string(),
            format!("-output-directory={}", out_dir.display()),
            document.display().to_string(),
        ]
    }
}

impl Default for LatexCompiler {
    fn default() -> Self {
        Self::new(&CompilerConfig::default())
    }
}

#[async_trait]
impl DocumentCompiler for LatexCompiler {
    async fn compile(&self, document: &Path) -> Result<PathBuf, LetterError> {
        let out_dir = match document.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let args = Self::args(document, &out_dir);

        info!(
            "Attempting to compile {} to PDF...",
            document.file_name().unwrap_or_default().to_string_lossy()
        );

        for pass in 1..=self.passes {
            if let Some(ref cb) = self.progress {
                cb.on_compile_pass(pass, self.passes);
            }
            debug!("{} pass {}/{}: {:?}", self.program, pass, self.passes, args);

            let output = Command::new(&self.program)
                .args(&args)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| LetterError::CompilerSpawnFailed {
                    program: self.program.clone(),
                    source: e,
                })?;

            if !output.status.success() {
                warn!(
                    "{} pass {}/{} failed with {}",
                    self.program, pass, self.passes, output.status
                );
                return Err(LetterError::CompilationFailed {
                    program: self.program.clone(),
                    pass,
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
        }

        let pdf = document.with_extension("pdf");
        info!("Successfully compiled PDF: {}", pdf.display());
        Ok(pdf)
    }
}
