//! # edgequake-troubleshoot
//!
//! Extract troubleshooting tables (problem / causes / solutions) from PDF
//! manuals with a Vision Language Model, keeping page and bounding-box
//! provenance for every problem.
//!
//! ## Why annotate?
//!
//! A VLM reads a troubleshooting table well but is poor at reporting *where*
//! it read something. Each page is therefore sent twice: once as rendered,
//! and once with tesseract's text blocks outlined and labelled with their
//! pixel coordinates. The model copies coordinates from the labels instead of
//! guessing them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + "1,3,5-7"
//!  │
//!  ├─ 1. Scope    parse the range into a sorted page set
//!  ├─ 2. Render   rasterise the min–max span at 300 DPI (pdfium)
//!  ├─ 3. Annotate tesseract blocks → coloured boxes + "x, y, w, h" labels
//!  ├─ 4. Encode   raw and annotated views → base64 JPEG
//!  ├─ 5. Assemble [raw₁, ann₁, raw₂, ann₂, …]
//!  └─ 6. Extract  one VLM call, JSON-only answer → {"TroubleShooting": […]}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_troubleshoot::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::builder().build()?;
//!     let output = extract("manual.pdf", Some("41-43"), &config).await?;
//!     for entry in output.table()?.entries {
//!         println!("p{} {}", entry.problem_page, entry.problem);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2fix` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod page_range;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, OcrConfig, DEFAULT_MODEL};
pub use error::{ErrorKind, ErrorReport, ExtractError};
pub use extract::{extract, extract_from_bytes, extract_sync, extract_to_file, write_result, Extractor};
pub use output::{ExtractionOutput, ExtractionStats, TroubleshootingEntry, TroubleshootingTable};
pub use page_range::{parse_page_range, PageSet};
pub use pipeline::assemble::ExtractionPayload;
pub use pipeline::encode::ImagePayloadEntry;
pub use pipeline::gateway::{ExtractionGateway, GatewayResponse};
pub use pipeline::ocr::{LayoutDetector, LayoutLevel, TextBlock};
pub use pipeline::render::RasterPage;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
