//! Integration tests for the full image → `.tex` → PDF pipeline.
//!
//! The vision model is replaced either by an in-process fake or by an
//! `httpmock` server speaking the Gemini wire format; the compiler is
//! replaced by a fake or a small shell script. No network access or LaTeX
//! installation is needed.

use async_trait::async_trait;
use edgequake_llm::ImageData;
use httpmock::prelude::*;
use image::{Rgb, RgbImage};
use jd2letter::{
    generate, DocumentCompiler, ExtractorConfig, GeminiVisionModel, GenerationConfig,
    GenerationProgressCallback, JobPosting, LetterError, Stage, VisionModel,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const TEMPLATE: &str = r"\documentclass{letter}
\begin{document}
\address{Ledcor Corporation\\Vancouver, BC, Canada}
\opening{Dear Hiring Manager,}
I am applying for the Quality Analyst 169781 position at Ledcor Corporation.
\end{document}
";

const LITERALS: [&str; 4] = [
    "Ledcor Corporation",
    "Vancouver, BC, Canada",
    "Quality Analyst 169781",
    "Dear Hiring Manager,",
];

const FULL_REPLY: &str = r#"```json
{
  "company_name": "Acme Inc",
  "company_address": "Toronto, ON, Canada",
  "role_title": "Data Engineer 4242",
  "hiring_manager_name": "Jane Doe"
}
```"#;

struct Fixture {
    dir: tempfile::TempDir,
    image: PathBuf,
    template: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("posting.png");
        RgbImage::from_pixel(8, 8, Rgb([240, 240, 240]))
            .save(&image)
            .unwrap();
        let template = dir.path().join("cover_letter.tex");
        std::fs::write(&template, TEMPLATE).unwrap();
        Self {
            dir,
            image,
            template,
        }
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }
}

/// Returns a fixed reply and counts calls.
struct FakeModel {
    reply: String,
    calls: Mutex<usize>,
}

impl FakeModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl VisionModel for FakeModel {
    fn label(&self) -> String {
        "fake".into()
    }

    async fn complete(&self, _prompt: &str, image: ImageData) -> Result<String, LetterError> {
        assert!(!image.data.is_empty());
        *self.calls.lock().unwrap() += 1;
        Ok(self.reply.clone())
    }
}

/// Records the documents it was asked to compile.
#[derive(Default)]
struct FakeCompiler {
    documents: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl DocumentCompiler for FakeCompiler {
    async fn compile(&self, document: &Path) -> Result<PathBuf, LetterError> {
        self.documents.lock().unwrap().push(document.to_path_buf());
        Ok(document.with_extension("pdf"))
    }
}

#[derive(Default)]
struct StageLog(Mutex<Vec<String>>);

impl GenerationProgressCallback for StageLog {
    fn on_stage_start(&self, stage: Stage) {
        self.0.lock().unwrap().push(format!("start {stage}"));
    }
    fn on_posting_extracted(&self, posting: &JobPosting) {
        self.0
            .lock()
            .unwrap()
            .push(format!("posting {}", posting.company_name()));
    }
    fn on_stage_complete(&self, stage: Stage, _detail: &str) {
        self.0.lock().unwrap().push(format!("done {stage}"));
    }
    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.0.lock().unwrap().push(format!("fail {stage}"));
    }
}

fn config_with(
    fx: &Fixture,
    model: Arc<dyn VisionModel>,
    compiler: Arc<dyn DocumentCompiler>,
) -> GenerationConfig {
    GenerationConfig::builder(ExtractorConfig::default())
        .output_dir(fx.out_dir())
        .vision_model(model)
        .document_compiler(compiler)
        .build()
        .unwrap()
}

// ── Pipeline with fakes ──────────────────────────────────────────────────────

#[tokio::test]
async fn full_reply_replaces_every_literal() {
    let fx = Fixture::new();
    let model = FakeModel::new(FULL_REPLY);
    let compiler = Arc::new(FakeCompiler::default());
    let config = config_with(&fx, model.clone(), compiler.clone());

    let output = generate(&fx.image, &fx.template, &config).await.unwrap();

    assert_eq!(output.tex_path, fx.out_dir().join("cover_letter_AcmeInc.tex"));
    assert_eq!(
        output.pdf_path.as_deref(),
        Some(fx.out_dir().join("cover_letter_AcmeInc.pdf").as_path())
    );
    assert_eq!(*model.calls.lock().unwrap(), 1);
    assert_eq!(*compiler.documents.lock().unwrap(), vec![output.tex_path.clone()]);

    let tex = std::fs::read_to_string(&output.tex_path).unwrap();
    for literal in LITERALS {
        assert!(!tex.contains(literal), "{literal} survived:\n{tex}");
    }
    assert!(tex.contains(r"\address{Acme Inc\\Toronto, ON, Canada}"));
    assert!(tex.contains(r"\opening{Dear Jane Doe,}"));
    assert!(tex.contains("the Data Engineer 4242 position at Acme Inc."));

    // template untouched
    assert_eq!(std::fs::read_to_string(&fx.template).unwrap(), TEMPLATE);
}

#[tokio::test]
async fn missing_fields_leave_literals_in_place() {
    let fx = Fixture::new();
    let model = FakeModel::new(r#"{"company_name": "Acme Inc"}"#);
    let config = config_with(&fx, model, Arc::new(FakeCompiler::default()));

    let output = generate(&fx.image, &fx.template, &config).await.unwrap();
    let tex = std::fs::read_to_string(&output.tex_path).unwrap();

    assert!(tex.contains("Vancouver, BC, Canada"));
    assert!(tex.contains("Quality Analyst 169781"));
    assert!(tex.contains("Dear Hiring Manager,"));
    assert!(!tex.contains("Ledcor Corporation"));
    assert_eq!(output.posting.hiring_manager_name(), "Hiring Manager");
}

#[tokio::test]
async fn prose_reply_is_parse_error_with_raw_text() {
    let fx = Fixture::new();
    let reply = "Sure! Here is the data: {\"company_name\": \"Acme Inc\"} Hope that helps.";
    let compiler = Arc::new(FakeCompiler::default());
    let config = config_with(&fx, FakeModel::new(reply), compiler.clone());

    let err = generate(&fx.image, &fx.template, &config).await.unwrap_err();
    match err {
        LetterError::ParseError { ref raw, .. } => assert_eq!(raw, reply),
        ref other => panic!("expected ParseError, got {other:?}"),
    }
    assert!(err.is_parse_error());
    assert!(!fx.out_dir().exists(), "nothing should be written");
    assert!(compiler.documents.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_template_fails_before_model_call() {
    let fx = Fixture::new();
    let model = FakeModel::new(FULL_REPLY);
    let config = config_with(&fx, model.clone(), Arc::new(FakeCompiler::default()));

    let err = generate(&fx.image, fx.dir.path().join("nope.tex"), &config)
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "got: {err:?}");
    assert_eq!(*model.calls.lock().unwrap(), 0);
    assert!(!fx.out_dir().exists());
}

#[tokio::test]
async fn missing_image_is_not_found() {
    let fx = Fixture::new();
    let model = FakeModel::new(FULL_REPLY);
    let config = config_with(&fx, model.clone(), Arc::new(FakeCompiler::default()));

    let err = generate(fx.dir.path().join("nope.png"), &fx.template, &config)
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "got: {err:?}");
    assert_eq!(*model.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn undecodable_image_is_not_found() {
    let fx = Fixture::new();
    let bogus = fx.dir.path().join("posting.png");
    std::fs::write(&bogus, b"<html>not an image</html>").unwrap();
    let model = FakeModel::new(FULL_REPLY);
    let config = config_with(&fx, model.clone(), Arc::new(FakeCompiler::default()));

    let err = generate(&bogus, &fx.template, &config).await.unwrap_err();

    assert!(matches!(err, LetterError::InvalidImage { .. }), "got: {err:?}");
    assert!(err.is_not_found());
    assert_eq!(*model.calls.lock().unwrap(), 0);
    assert!(!fx.out_dir().exists());
}

#[tokio::test]
async fn no_compile_stops_after_tex() {
    let fx = Fixture::new();
    let compiler = Arc::new(FakeCompiler::default());
    let config = GenerationConfig::builder(ExtractorConfig::default())
        .output_dir(fx.out_dir())
        .vision_model(FakeModel::new(FULL_REPLY))
        .document_compiler(compiler.clone())
        .compile(false)
        .build()
        .unwrap();

    let output = generate(&fx.image, &fx.template, &config).await.unwrap();

    assert!(output.pdf_path.is_none());
    assert!(output.tex_path.exists());
    assert!(compiler.documents.lock().unwrap().is_empty());
}

#[tokio::test]
async fn progress_events_follow_stage_order() {
    let fx = Fixture::new();
    let log = Arc::new(StageLog::default());
    let config = GenerationConfig::builder(ExtractorConfig::default())
        .output_dir(fx.out_dir())
        .vision_model(FakeModel::new(FULL_REPLY))
        .document_compiler(Arc::new(FakeCompiler::default()))
        .progress_callback(log.clone())
        .build()
        .unwrap();

    generate(&fx.image, &fx.template, &config).await.unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        vec![
            "start extract",
            "posting Acme Inc",
            "done extract",
            "start template",
            "done template",
            "start compile",
            "done compile",
        ]
    );
}

#[tokio::test]
async fn missing_api_key_fails_fast() {
    let fx = Fixture::new();
    let config = GenerationConfig::builder(ExtractorConfig::default())
        .output_dir(fx.out_dir())
        .build()
        .unwrap();

    let err = generate(&fx.image, &fx.template, &config).await.unwrap_err();
    assert!(err.is_configuration_error(), "got: {err:?}");
    assert!(!fx.out_dir().exists());
}

// ── Gemini REST backend against a mock server ───────────────────────────────

fn gemini_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 1290, "candidatesTokenCount": 61 }
    })
}

fn gemini_config(server: &MockServer) -> ExtractorConfig {
    ExtractorConfig::builder()
        .api_key("test-key")
        .base_url(server.base_url())
        .build()
        .unwrap()
}

#[tokio::test]
async fn gemini_backend_end_to_end() {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .header("x-goog-api-key", "test-key")
                .body_contains("\"inline_data\"")
                .body_contains("\"mime_type\":\"image/png\"");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(gemini_reply(FULL_REPLY));
        })
        .await;

    let fx = Fixture::new();
    let compiler = Arc::new(FakeCompiler::default());
    let config = GenerationConfig::builder(gemini_config(&server))
        .output_dir(fx.out_dir())
        .document_compiler(compiler)
        .build()
        .unwrap();

    let output = generate(&fx.image, &fx.template, &config).await.unwrap();

    api_mock.assert_async().await;
    assert_eq!(output.posting.company_name(), "Acme Inc");
    assert_eq!(output.posting.hiring_manager_name(), "Jane Doe");
    assert!(output.tex_path.ends_with("cover_letter_AcmeInc.tex"));
}

#[tokio::test]
async fn gemini_error_status_is_surfaced() {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent");
            then.status(403).json_body(serde_json::json!({
                "error": { "code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED" }
            }));
        })
        .await;

    let model = GeminiVisionModel::new(&gemini_config(&server)).unwrap();
    let image = ImageData::new("aGVsbG8=".to_string(), "image/png");
    let err = model.complete("prompt", image).await.unwrap_err();

    api_mock.assert_async().await;
    match err {
        LetterError::ModelApiError { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid.");
        }
        other => panic!("expected ModelApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn gemini_without_candidates_is_empty_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({ "candidates": [] }));
        })
        .await;

    let model = GeminiVisionModel::new(&gemini_config(&server)).unwrap();
    let err = model
        .complete("prompt", ImageData::new("aGVsbG8=".to_string(), "image/png"))
        .await
        .unwrap_err();
    match err {
        LetterError::EmptyModelResponse { reason } => assert_eq!(reason, "no candidates"),
        other => panic!("expected EmptyModelResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn gemini_truncated_reply_reports_max_tokens() {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .body_contains("\"maxOutputTokens\":4096")
                .body_contains("\"thinkingConfig\":{\"thinkingBudget\":0}");
            then.status(200).json_body(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model" },
                    "finishReason": "MAX_TOKENS"
                }],
                "usageMetadata": { "promptTokenCount": 1290, "thoughtsTokenCount": 4096 }
            }));
        })
        .await;

    let model = GeminiVisionModel::new(&gemini_config(&server)).unwrap();
    let err = model
        .complete("prompt", ImageData::new("aGVsbG8=".to_string(), "image/png"))
        .await
        .unwrap_err();

    api_mock.assert_async().await;
    match err {
        LetterError::EmptyModelResponse { ref reason } => assert_eq!(reason, "MAX_TOKENS"),
        ref other => panic!("expected EmptyModelResponse, got {other:?}"),
    }
    assert!(err.to_string().contains("MAX_TOKENS"));
}

#[tokio::test]
async fn gemini_custom_model_changes_path() {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-pro:generateContent");
            then.status(200).json_body(gemini_reply("{}"));
        })
        .await;

    let config = ExtractorConfig::builder()
        .api_key("test-key")
        .base_url(format!("{}/", server.base_url()))
        .model("gemini-2.5-pro")
        .build()
        .unwrap();
    let model = GeminiVisionModel::new(&config).unwrap();
    let text = model
        .complete("prompt", ImageData::new("aGVsbG8=".to_string(), "image/png"))
        .await
        .unwrap();

    api_mock.assert_async().await;
    assert_eq!(text, "{}");
}

// ── Real process compiler with a stand-in script ─────────────────────────────

#[cfg(unix)]
mod script_compiler {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable script that appends its arguments to `calls.log`
    /// and then runs `body`.
    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let script = dir.join("fake-pdflatex.sh");
        let log = dir.join("calls.log");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" >> '{}'\n{}\n", log.display(), body),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn config(fx: &Fixture, script: &Path) -> GenerationConfig {
        GenerationConfig::builder(ExtractorConfig::default())
            .output_dir(fx.out_dir())
            .vision_model(FakeModel::new(FULL_REPLY))
            .compiler_program(script.display().to_string())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn compiler_runs_twice_with_expected_flags() {
        let fx = Fixture::new();
        let script = write_script(fx.dir.path(), "exit 0");

        let output = generate(&fx.image, &fx.template, &config(&fx, &script))
            .await
            .unwrap();

        let calls = calls(fx.dir.path());
        assert_eq!(calls.len(), 2, "calls: {calls:?}");
        let expected = format!(
            "-interaction=nonstopmode -output-directory={} {}",
            fx.out_dir().display(),
            output.tex_path.display()
        );
        assert_eq!(calls[0], expected);
        assert_eq!(calls[1], expected);
        assert_eq!(output.pdf_path, Some(output.tex_path.with_extension("pdf")));
    }

    #[tokio::test]
    async fn first_pass_failure_skips_second_pass() {
        let fx = Fixture::new();
        let script = write_script(
            fx.dir.path(),
            "echo '! LaTeX Error: File moderncv.cls not found.'\nexit 1",
        );

        let err = generate(&fx.image, &fx.template, &config(&fx, &script))
            .await
            .unwrap_err();

        assert_eq!(calls(fx.dir.path()).len(), 1);
        assert!(err.is_compilation_error());
        match err {
            LetterError::CompilationFailed { pass, stdout, .. } => {
                assert_eq!(pass, 1);
                assert!(stdout.contains("LaTeX Error"), "stdout: {stdout}");
            }
            other => panic!("expected CompilationFailed, got {other:?}"),
        }
        // the .tex stays behind
        assert!(fx.out_dir().join("cover_letter_AcmeInc.tex").exists());
    }
}
