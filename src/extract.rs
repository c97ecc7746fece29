//! Top-level extraction entry points.
//!
//! [`Extractor`] owns the configured collaborators (OCR engine, vision
//! gateway) and runs one request end-to-end:
//!
//! ```text
//! range ─▶ PageSet ─▶ render span ─▶ per page: OCR + overlay + 2× JPEG
//!       ─▶ [raw₁, ann₁, raw₂, ann₂, …] ─▶ model ─▶ JSON
//! ```
//!
//! The page range is parsed before the document is touched, so a missing or
//! malformed range never costs a render. Every error aborts the request;
//! there is no partial output.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::page_range::{parse_page_range, PageSet};
use crate::pipeline::annotate::{LabelStyle, LayoutAnnotator};
use crate::pipeline::assemble::assemble_payload;
use crate::pipeline::gateway::{parse_response, ExtractionGateway, VisionGateway};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::ocr::{LayoutDetector, TesseractDetector};
use crate::pipeline::render::{self, RasterPage};
use crate::prompts::EXTRACTION_SYSTEM_PROMPT;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A configured extraction pipeline.
///
/// Cheap to share behind an `Arc`; each call owns its own document and
/// image buffers.
pub struct Extractor {
    config: ExtractionConfig,
    annotator: Arc<LayoutAnnotator>,
    gateway: Arc<dyn ExtractionGateway>,
}

impl Extractor {
    /// Build an extractor with tesseract OCR and the configured LLM provider.
    ///
    /// # Errors
    /// `OcrUnavailable` when no tesseract binary can be resolved for this
    /// platform, `ProviderNotConfigured` when no LLM provider is available,
    /// `InvalidConfig` when a configured label font cannot be loaded.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let detector = TesseractDetector::from_config(&config.ocr)?;
        info!("Using tesseract at {}", detector.binary().display());
        let gateway = VisionGateway::from_config(&config)?;
        Self::with_collaborators(config, Arc::new(detector), Arc::new(gateway))
    }

    /// Build an extractor around caller-supplied collaborators.
    pub fn with_collaborators(
        config: ExtractionConfig,
        detector: Arc<dyn LayoutDetector>,
        gateway: Arc<dyn ExtractionGateway>,
    ) -> Result<Self, ExtractError> {
        let style = match config.label_font.as_deref() {
            Some(path) => LabelStyle::load(path, config.label_font_size)?,
            None => LabelStyle::embedded(config.label_font_size)?,
        };

        Ok(Self {
            annotator: Arc::new(LayoutAnnotator::new(detector, Some(style))),
            gateway,
            config,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract from a local path or HTTP/HTTPS URL.
    ///
    /// `pages` is a range expression such as `"1,3,5-7"`; it is required.
    pub async fn extract(
        &self,
        input_str: &str,
        pages: Option<&str>,
    ) -> Result<ExtractionOutput, ExtractError> {
        let start = Instant::now();
        let page_set = parse_page_range(pages)?;
        info!("Starting extraction: {} (pages {})", input_str, page_set);

        let resolved = input::resolve_input(input_str, self.config.download_timeout_secs).await?;
        self.run_document(&resolved, &page_set, start).await
    }

    /// Extract from an uploaded document held in memory.
    pub async fn extract_from_bytes(
        &self,
        bytes: &[u8],
        pages: Option<&str>,
    ) -> Result<ExtractionOutput, ExtractError> {
        let start = Instant::now();
        let page_set = parse_page_range(pages)?;
        info!(
            "Starting extraction: {} uploaded bytes (pages {})",
            bytes.len(),
            page_set
        );

        // The temp file lives until `resolved` drops at the end of this call.
        let resolved = input::resolve_bytes(bytes)?;
        self.run_document(&resolved, &page_set, start).await
    }

    /// Run the post-render half of the pipeline on already rasterised pages.
    pub async fn extract_pages(
        &self,
        pages: Vec<RasterPage>,
    ) -> Result<ExtractionOutput, ExtractError> {
        let stats = ExtractionStats::default();
        self.finish(pages, stats, Instant::now()).await
    }

    async fn run_document(
        &self,
        resolved: &ResolvedInput,
        page_set: &PageSet,
        start: Instant,
    ) -> Result<ExtractionOutput, ExtractError> {
        let render_start = Instant::now();
        let rendered = render::render_pages(resolved.path(), &self.config, Some(page_set)).await?;
        let stats = ExtractionStats {
            render_duration_ms: render_start.elapsed().as_millis() as u64,
            ..Default::default()
        };
        info!(
            "Rendered {} pages in {}ms",
            rendered.len(),
            stats.render_duration_ms
        );

        self.finish(rendered, stats, start).await
    }

    async fn finish(
        &self,
        rendered: Vec<RasterPage>,
        mut stats: ExtractionStats,
        start: Instant,
    ) -> Result<ExtractionOutput, ExtractError> {
        if rendered.is_empty() {
            return Err(ExtractError::NoPagesRendered);
        }
        let progress = self.config.progress_callback.clone();
        if let Some(ref cb) = progress {
            cb.on_render_complete(rendered.len());
        }
        stats.rendered_pages = rendered.len();

        // ── Annotate + encode ────────────────────────────────────────────
        let annotate_start = Instant::now();
        let payload = assemble_payload(
            rendered,
            Arc::clone(&self.annotator),
            self.config.jpeg_quality,
            self.config.concurrency,
            progress.clone(),
        )
        .await?;
        stats.annotate_duration_ms = annotate_start.elapsed().as_millis() as u64;
        stats.payload_entries = payload.len();
        stats.annotated_blocks = payload.blocks;
        debug!(
            "Assembled {} payload entries ({} blocks) in {}ms",
            payload.len(),
            payload.blocks,
            stats.annotate_duration_ms
        );

        // ── Remote extraction ────────────────────────────────────────────
        let system_prompt = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(EXTRACTION_SYSTEM_PROMPT);

        if let Some(ref cb) = progress {
            cb.on_extraction_start(payload.len());
        }
        let llm_start = Instant::now();
        let outcome = self
            .gateway
            .extract(system_prompt, &payload)
            .await
            .and_then(|response| {
                parse_response(&response.text).map(|value| (value, response))
            });
        stats.llm_duration_ms = llm_start.elapsed().as_millis() as u64;
        if let Some(ref cb) = progress {
            cb.on_extraction_complete(outcome.is_ok());
        }
        let (result, response) = outcome?;

        stats.input_tokens = response.input_tokens;
        stats.output_tokens = response.output_tokens;
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Extraction complete: {} pages, {} tokens in / {} out, {}ms total",
            stats.rendered_pages, stats.input_tokens, stats.output_tokens, stats.total_duration_ms
        );

        Ok(ExtractionOutput {
            result,
            pages: payload.pages,
            stats,
        })
    }
}

/// Extract a troubleshooting table from a PDF file or URL.
///
/// Builds an [`Extractor`] from `config` for this one call.
///
/// # Example
/// ```rust,no_run
/// use edgequake_troubleshoot::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::builder().label_font("fonts/Arial.ttf").build()?;
/// let output = extract("manual.pdf", Some("12-14"), &config).await?;
/// println!("{}", serde_json::to_string_pretty(&output.result)?);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    input_str: impl AsRef<str>,
    pages: Option<&str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    // Scope errors surface before any collaborator is resolved.
    parse_page_range(pages)?;
    Extractor::new(config.clone())?
        .extract(input_str.as_ref(), pages)
        .await
}

/// Extract from PDF bytes in memory (e.g. an HTTP upload).
pub async fn extract_from_bytes(
    bytes: &[u8],
    pages: Option<&str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    parse_page_range(pages)?;
    Extractor::new(config.clone())?
        .extract_from_bytes(bytes, pages)
        .await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    pages: Option<&str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, pages, config))
}

/// Extract and write the result JSON to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    pages: Option<&str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ExtractError> {
    let output = extract(input_str, pages, config).await?;
    write_result(&output, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// Write `output.result` as pretty JSON to `path`, atomically.
pub async fn write_result(output: &ExtractionOutput, path: &Path) -> Result<(), ExtractError> {
    let write_failed = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(&output.result)
        .map_err(|e| ExtractError::Internal(format!("serialise result: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    Ok(())
}
