//! CLI binary for edgequake-troubleshoot.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, prints the model's JSON on success and an
//! `ErrorReport` on failure.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_troubleshoot::{
    extract, write_result, ErrorReport, ExtractError, ExtractionConfig,
    ExtractionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress: spinner while rendering and waiting on the model,
/// a page bar while annotating.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Rendering");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl ExtractionProgressCallback for CliProgress {
    fn on_render_complete(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Annotating");
    }

    fn on_page_annotated(&self, page: u32, blocks: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page}: {blocks} blocks"));
        self.bar.inc(1);
    }

    fn on_extraction_start(&self, payload_entries: usize) {
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Extracting");
        self.bar
            .set_message(format!("{payload_entries} images sent, waiting for the model…"));
    }

    fn on_extraction_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

/// Extract a troubleshooting table from a PDF manual using OCR-annotated
/// page images and a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2fix",
    version,
    about = "Extract problem/cause/solution tables from PDF manuals with a Vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Pages to extract, e.g. "12", "12-14" or "3,7-9". The min–max span is rendered.
    #[arg(short, long, env = "PDF2FIX_PAGES")]
    pages: Option<String>,

    /// Write the result JSON to this file instead of stdout.
    #[arg(short, long, env = "PDF2FIX_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI (72–600). Bounding boxes are reported at this resolution.
    #[arg(long, env = "PDF2FIX_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// JPEG quality for payload images (1–100).
    #[arg(long, env = "PDF2FIX_JPEG_QUALITY", default_value_t = 75,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Pages annotated in parallel.
    #[arg(short, long, env = "PDF2FIX_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Path to the tesseract binary (default: per-platform location).
    #[arg(long, env = "TESSERACT_PATH")]
    tesseract: Option<PathBuf>,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "PDF2FIX_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// TrueType font for coordinate labels (default: bundled DejaVu Sans Mono).
    #[arg(long, env = "PDF2FIX_FONT")]
    font: Option<PathBuf>,

    /// Coordinate label size in pixels.
    #[arg(long, env = "PDF2FIX_FONT_SIZE", default_value_t = 24.0)]
    font_size: f32,

    /// Path to libpdfium (default: system library).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2FIX_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2FIX_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "PDF2FIX_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2FIX_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Timeout for the extraction call in seconds (default: none).
    #[arg(long, env = "PDF2FIX_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2FIX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2FIX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2FIX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2FIX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress).await?;

    // The page range is checked before OCR or the provider are resolved.
    let output = match extract(&cli.input, cli.pages.as_deref(), &config).await {
        Ok(output) => output,
        Err(e) => report_and_exit(&e),
    };

    if let Some(ref path) = cli.output {
        write_result(&output, path)
            .await
            .context("Failed to write result")?;
        if !cli.quiet {
            eprintln!(
                "✔ {} pages → {}  ({} tokens in / {} out, {}ms)",
                output.stats.rendered_pages,
                path.display(),
                output.stats.input_tokens,
                output.stats.output_tokens,
                output.stats.total_duration_ms
            );
        }
    } else {
        let json =
            serde_json::to_string_pretty(&output.result).context("Failed to serialise result")?;
        println!("{json}");
    }

    Ok(())
}

/// Print the failure object and exit: 2 for caller mistakes, 1 otherwise.
fn report_and_exit(e: &ExtractError) -> ! {
    let report = ErrorReport::from(e);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(_) => eprintln!("{e}"),
    }
    std::process::exit(if e.is_client_error() { 2 } else { 1 })
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .jpeg_quality(cli.jpeg_quality)
        .concurrency(cli.concurrency)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .ocr_language(cli.ocr_lang.clone())
        .label_font_size(cli.font_size)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = cli.tesseract {
        builder = builder.tesseract_path(path.clone());
    }
    if let Some(ref path) = cli.font {
        builder = builder.label_font(path.clone());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
