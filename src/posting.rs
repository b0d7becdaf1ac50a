//! The structured record extracted from a job-posting image.
//!
//! The model is asked for a JSON object, but nothing guarantees it sends one.
//! [`parse_response`] is therefore best-effort: it removes the Markdown fence
//! markers models habitually wrap JSON in, and on failure surfaces the raw
//! text inside [`LetterError::ParseError`] so the user can see what came back.

use crate::error::LetterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Manager name used when the posting does not name one.
pub const DEFAULT_HIRING_MANAGER: &str = "Hiring Manager";

/// Fields extracted from a job posting.
///
/// Each field is `None` when the key was absent from the model's JSON, which
/// is distinct from an explicit empty string. The templater relies on that
/// difference: an absent field leaves the template literal untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hiring_manager_name: Option<String>,
}

impl JobPosting {
    /// Company name, or `""` when absent.
    pub fn company_name(&self) -> &str {
        self.company_name.as_deref().unwrap_or("")
    }

    /// Company address, or `""` when absent.
    pub fn company_address(&self) -> &str {
        self.company_address.as_deref().unwrap_or("")
    }

    /// Role title, or `""` when absent.
    pub fn role_title(&self) -> &str {
        self.role_title.as_deref().unwrap_or("")
    }

    /// Hiring manager, or [`DEFAULT_HIRING_MANAGER`] when absent or blank.
    pub fn hiring_manager_name(&self) -> &str {
        match self.hiring_manager_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_HIRING_MANAGER,
        }
    }

    /// Company name reduced to its alphanumeric characters, for file names.
    pub fn sanitized_company_name(&self) -> String {
        sanitize_company_name(self.company_name())
    }

    /// Build a posting from an already-parsed JSON object.
    ///
    /// Strings are taken as-is, `null` counts as absent, and other scalars
    /// (a bare requisition number, say) are kept as their JSON text.
    pub fn from_json_object(obj: &Map<String, Value>) -> Result<Self, String> {
        Ok(Self {
            company_name: field(obj, "company_name")?,
            company_address: field(obj, "company_address")?,
            role_title: field(obj, "role_title")?,
            hiring_manager_name: field(obj, "hiring_manager_name")?,
        })
    }
}

fn field(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(format!("field '{key}' is not a string")),
    }
}

/// Keep only alphanumeric characters: `"Acme, Inc."` → `"AcmeInc"`.
pub fn sanitize_company_name(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Remove Markdown code-fence markers from a model response.
///
/// Every "```json" and then every "```" is deleted wherever it occurs; the
/// surrounding text is left alone.
pub fn strip_code_fences(text: &str) -> String {
    text.trim().replace("```json", "").replace("```", "")
}

/// Parse a raw model response into a [`JobPosting`].
///
/// # Errors
/// [`LetterError::ParseError`] when the cleaned text is not a JSON object.
/// The error's `raw` field holds `raw` unmodified.
pub fn parse_response(raw: &str) -> Result<JobPosting, LetterError> {
    let cleaned = strip_code_fences(raw);
    let parse_err = |detail: String| LetterError::ParseError {
        raw: raw.to_string(),
        detail,
    };

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| parse_err(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| parse_err("expected a JSON object".to_string()))?;

    JobPosting::from_json_object(obj).map_err(parse_err)
}
