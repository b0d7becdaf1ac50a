//! Templating: literal text substitution into a LaTeX cover letter.
//!
//! The template is an ordinary, compilable letter written for one specific
//! posting. Its company name, address, role title and greeting are the
//! "placeholders": every occurrence of each literal string is replaced with
//! the extracted value. Substitution is plain substring replacement, not a
//! token scheme, so the same text appearing elsewhere in the letter is
//! replaced too. Pick literals that occur only where they should change.

use crate::error::LetterError;
use crate::pipeline::input::check_readable;
use crate::posting::{JobPosting, DEFAULT_HIRING_MANAGER};
use std::path::{Path, PathBuf};
use tracing::info;

/// Literal strings in the template that get replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    /// Replaced by the company name.
    pub company_name: String,
    /// Replaced by the company address.
    pub company_address: String,
    /// Replaced by the role title.
    pub role_title: String,
    /// Hiring-manager name inside the greeting line.
    pub hiring_manager_name: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            company_name: "Ledcor Corporation".to_string(),
            company_address: "Vancouver, BC, Canada".to_string(),
            role_title: "Quality Analyst 169781".to_string(),
            hiring_manager_name: DEFAULT_HIRING_MANAGER.to_string(),
        }
    }
}

impl Placeholders {
    /// The full greeting literal, e.g. `Dear Hiring Manager,`.
    pub fn greeting(&self) -> String {
        greeting(&self.hiring_manager_name)
    }

    /// Reject empty literals: replacing `""` would splice text between
    /// every character of the template.
    pub fn validate(&self) -> Result<(), LetterError> {
        for (name, value) in [
            ("company_name", &self.company_name),
            ("company_address", &self.company_address),
            ("role_title", &self.role_title),
            ("hiring_manager_name", &self.hiring_manager_name),
        ] {
            if value.is_empty() {
                return Err(LetterError::InvalidConfig(format!(
                    "placeholder '{name}' must not be empty"
                )));
            }
        }
        Ok(())
    }
}

fn greeting(name: &str) -> String {
    format!("Dear {name},")
}

/// Applies a [`JobPosting`] to template text.
#[derive(Debug, Clone, Default)]
pub struct Templater {
    placeholders: Placeholders,
}

impl Templater {
    pub fn new(placeholders: Placeholders) -> Self {
        Self { placeholders }
    }

    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    /// Substitute `posting` into `content`.
    ///
    /// Four independent replacements run in a fixed order: company name,
    /// address, role title, greeting. A field that is absent from the
    /// posting leaves its literal unchanged; a field present but empty
    /// replaces it with the empty string. A blank manager name falls back
    /// to "Hiring Manager".
    pub fn render(&self, content: &str, posting: &JobPosting) -> String {
        let p = &self.placeholders;
        let content = replace_or_keep(content, &p.company_name, posting.company_name.as_deref());
        let content = replace_or_keep(
            &content,
            &p.company_address,
            posting.company_address.as_deref(),
        );
        let content = replace_or_keep(&content, &p.role_title, posting.role_title.as_deref());
        match posting.hiring_manager_name {
            Some(_) => content.replace(&p.greeting(), &greeting(posting.hiring_manager_name())),
            None => content,
        }
    }

    /// Read `template_path`, substitute, and write the result to `output_path`.
    ///
    /// Any existing file at `output_path` is overwritten.
    ///
    /// # Errors
    /// * [`LetterError::FileNotFound`] if the template is missing; nothing is
    ///   written in that case.
    /// * [`LetterError::OutputWouldOverwriteTemplate`] if both paths name the
    ///   same file.
    pub async fn render_to_file(
        &self,
        template_path: &Path,
        output_path: &Path,
        posting: &JobPosting,
    ) -> Result<(), LetterError> {
        info!("Reading LaTeX template from: {}", template_path.display());
        check_readable(template_path)?;

        if same_file(template_path, output_path) {
            return Err(LetterError::OutputWouldOverwriteTemplate {
                path: output_path.to_path_buf(),
            });
        }

        let content = tokio::fs::read_to_string(template_path)
            .await
            .map_err(|e| LetterError::TemplateReadFailed {
                path: template_path.to_path_buf(),
                source: e,
            })?;

        let rendered = self.render(&content, posting);

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LetterError::OutputWriteFailed {
                    path: output_path.to_path_buf(),
                    source: e,
                })?;
        }

        tokio::fs::write(output_path, rendered)
            .await
            .map_err(|e| LetterError::OutputWriteFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

        info!(
            "Successfully created updated LaTeX file at: {}",
            output_path.display()
        );
        Ok(())
    }
}

fn replace_or_keep(content: &str, literal: &str, value: Option<&str>) -> String {
    match value {
        Some(v) => content.replace(literal, v),
        None => content.to_string(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Output path for the generated document:
/// `<out_dir>/<template-stem>_<sanitized-company>.tex`.
///
/// When the company name sanitizes to nothing, `Company` is used so the
/// result can never collide with the template's own name.
pub fn output_tex_path(template_path: &Path, posting: &JobPosting, out_dir: &Path) -> PathBuf {
    let stem = template_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "letter".to_string());

    let company = match posting.sanitized_company_name() {
        s if s.is_empty() => "Company".to_string(),
        s => s,
    };

    out_dir.join(format!("{stem}_{company}.tex"))
}
