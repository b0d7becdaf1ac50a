//! CLI binary for jd2letter.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig`, runs the pipeline and prints the outcome. Pipeline
//! errors are reported on stderr and the process still exits normally.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use jd2letter::config::{read_api_key, API_KEY_ENV};
use jd2letter::{
    generate, ExtractorConfig, GenerationConfig, GenerationOutput, GenerationProgressCallback,
    JobPosting, LetterError, ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints the extracted record as soon as it is known and, when enabled,
/// drives a spinner showing the current stage.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
    /// Print "Extracted Information:" once the record is known. Off in JSON
    /// mode (the record is printed at the end) and in quiet mode.
    print_record: bool,
}

impl CliProgressCallback {
    fn new(show_spinner: bool, print_record: bool) -> Arc<Self> {
        let bar = show_spinner.then(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self { bar, print_record })
    }

    fn println(&self, line: String) {
        match self.bar {
            Some(ref bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        if let Some(ref bar) = self.bar {
            let (prefix, msg) = match stage {
                Stage::Extract => ("Extracting", "reading the posting with the vision model…"),
                Stage::Template => ("Templating", "filling in the letter…"),
                Stage::Compile => ("Compiling", "running LaTeX…"),
            };
            bar.set_prefix(prefix);
            bar.set_message(msg);
        }
    }

    fn on_posting_extracted(&self, posting: &JobPosting) {
        if !self.print_record {
            return;
        }
        match serde_json::to_string_pretty(posting) {
            Ok(json) => {
                let text = format!("\nExtracted Information:\n{json}\n");
                match self.bar {
                    Some(ref bar) => bar.suspend(|| println!("{text}")),
                    None => println!("{text}"),
                }
            }
            Err(e) => self.println(red(&format!("could not display record: {e}"))),
        }
    }

    fn on_compile_pass(&self, pass: u32, total: u32) {
        if let Some(ref bar) = self.bar {
            bar.set_message(format!("pass {pass}/{total}"));
        }
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        if self.bar.is_some() {
            self.println(format!("  {} {:<9} {}", green("✓"), stage, dim(detail)));
        }
    }

    fn on_stage_error(&self, stage: Stage, _error: &str) {
        if self.bar.is_some() {
            self.println(format!("  {} {}", red("✗"), stage));
        }
        self.finish();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate cover_letter_AcmeInc.tex and .pdf in the current directory
  jd2letter posting.png cover_letter.tex

  # Write into a separate directory
  jd2letter posting.png cover_letter.tex --out-dir letters/

  # Only produce the .tex (no LaTeX installation needed)
  jd2letter --no-compile posting.png cover_letter.tex

  # Print just the extracted record
  jd2letter --json --no-compile posting.png cover_letter.tex

  # Use another vision provider via edgequake-llm
  jd2letter --provider openai --model gpt-4.1-mini posting.png cover_letter.tex

TEMPLATE:
  The template is an ordinary letter. These literal strings are replaced
  wherever they occur:

    Ledcor Corporation       → company name
    Vancouver, BC, Canada    → company address
    Quality Analyst 169781   → role title
    Dear Hiring Manager,     → Dear <hiring manager>,

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (required for the default backend)
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  JD2LETTER_PROVIDER      Override provider
  JD2LETTER_MODEL         Override model ID
  JD2LETTER_OUT_DIR       Output directory
  JD2LETTER_COMPILER      LaTeX compiler executable
"#;

/// Generate a tailored LaTeX cover letter from a job-posting image.
#[derive(Parser, Debug)]
#[command(
    name = "jd2letter",
    version,
    about = "Generate a tailored LaTeX cover letter from a job-posting image",
    long_about = "Read a screenshot or photo of a job posting with a vision language model, \
substitute the company, address, role and hiring manager into an existing LaTeX cover letter, \
and compile it to PDF with pdflatex.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Job-posting image (PNG, JPEG, WebP, GIF, BMP).
    image: PathBuf,

    /// LaTeX cover-letter template.
    template: PathBuf,

    /// Vision model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    #[arg(long, env = "JD2LETTER_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini (default), openai, anthropic, mistral, ollama.
    #[arg(
        long,
        env = "JD2LETTER_PROVIDER",
        long_help = "Vision provider. `gemini` (the default) uses the built-in REST client and \
          GEMINI_API_KEY.\nAny other name is resolved through edgequake-llm and reads that \
          provider's own API key variable."
    )]
    provider: Option<String>,

    /// Directory for the generated .tex and PDF.
    #[arg(long, env = "JD2LETTER_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// LaTeX compiler executable.
    #[arg(long, env = "JD2LETTER_COMPILER", default_value = "pdflatex")]
    compiler: String,

    /// Stop after writing the .tex file.
    #[arg(long)]
    no_compile: bool,

    /// Print the extracted record as JSON only.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "JD2LETTER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "JD2LETTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "JD2LETTER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || cli.json {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = CliProgressCallback::new(show_progress, !cli.json && !cli.quiet);

    match run(&cli, Arc::clone(&progress) as ProgressCallback).await {
        Ok(output) => {
            progress.finish();
            report(&cli, &output)?;
        }
        Err(e) => {
            progress.finish();
            eprintln!("❌ An error occurred: {e}");
        }
    }

    Ok(())
}

/// Build the config from flags and run the pipeline.
async fn run(cli: &Cli, progress: ProgressCallback) -> Result<GenerationOutput, LetterError> {
    let config = build_config(cli, progress)?;
    generate(&cli.image, &cli.template, &config).await
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: ProgressCallback) -> Result<GenerationConfig, LetterError> {
    let mut builder = ExtractorConfig::builder();
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    let mut extractor = builder.build()?;

    if extractor.uses_gemini() {
        extractor.api_key = Some(read_api_key(API_KEY_ENV)?);
    }

    GenerationConfig::builder(extractor)
        .output_dir(cli.out_dir.clone())
        .compiler_program(cli.compiler.clone())
        .compile(!cli.no_compile)
        .progress_callback(progress)
        .build()
}

/// Print the outcome of a successful run.
fn report(cli: &Cli, output: &GenerationOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(&output.posting)
            .context("Failed to serialise extracted record")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    match output.pdf_path {
        Some(ref pdf) => println!("✅ Successfully compiled PDF: {}", pdf.display()),
        None => println!(
            "✅ Successfully created LaTeX file: {}",
            output.tex_path.display()
        ),
    }
    eprintln!(
        "   {}",
        dim(&format!(
            "extract {}ms  /  template {}ms  /  compile {}ms  —  {}",
            output.stats.extract_duration_ms,
            output.stats.template_duration_ms,
            output.stats.compile_duration_ms,
            bold(&format!("{}ms total", output.stats.total_duration_ms)),
        ))
    );
    Ok(())
}
