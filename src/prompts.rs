//! Instructions sent to the vision model.
//!
//! Kept in one place so the wording can change without touching the request
//! or parsing code. Callers can override the default via
//! [`crate::config::ExtractorConfig::prompt`].

/// Default instruction for extracting posting fields from an image.
///
/// The four key names must match the fields of [`crate::posting::JobPosting`].
pub const EXTRACTION_PROMPT: &str = r#"From the provided image of a job posting, analyze the content and extract the following details precisely.
Return the output as a clean JSON object only.

1. "company_name": The name of the company.
2. "company_address": The physical address of the company (e.g., "City, State, Country"). If not present, set to an empty string.
3. "role_title": The full title of the job role, including any ID numbers if available.
4. "hiring_manager_name": The name of the hiring manager if specified. If not, default to "Hiring Manager".

Example JSON output:
{
    "company_name": "Example Corp",
    "company_address": "San Francisco, CA, USA",
    "role_title": "Software Engineer 12345",
    "hiring_manager_name": "Jane Doe"
}"#;
