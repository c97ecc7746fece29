//! Pipeline stages for troubleshooting-table extraction.
//!
//! Each submodule implements one transformation step and is testable on its
//! own; the external capabilities (OCR, vision model) sit behind traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr + annotate ──▶ encode ──▶ assemble ──▶ gateway
//! (path)    (pdfium)   (tesseract,        (JPEG,     (raw, ann,   (VLM, JSON)
//!                       overlay copy)      base64)    per page)
//! ```
//!
//! 1. [`input`]    — canonicalise a path, URL or upload to a local PDF
//! 2. [`render`]   — rasterise the min–max span of the requested pages
//! 3. [`ocr`]      — detect text regions ([`ocr::LayoutDetector`])
//! 4. [`annotate`] — draw block boxes and coordinate labels on a copy
//! 5. [`encode`]   — JPEG + base64 each view
//! 6. [`assemble`] — interleave raw/annotated views in page order
//! 7. [`gateway`]  — the single network call, and JSON parsing of its answer

pub mod annotate;
pub mod assemble;
pub mod encode;
pub mod gateway;
pub mod input;
pub mod ocr;
pub mod render;
