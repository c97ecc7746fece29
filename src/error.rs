//! Error types for the edgequake-troubleshoot library.
//!
//! Every failure is fatal for the request: there is no partial-document
//! output, so a single [`ExtractError`] enum covers the whole pipeline.
//! Variants are grouped by the stage that raises them, and
//! [`ExtractError::kind`] collapses them into the coarse [`ErrorKind`] that
//! callers (HTTP shells, the CLI) use to shape their failure response.
//!
//! The split between [`ErrorKind::RemoteServiceFailure`] and
//! [`ErrorKind::MalformedRemoteResponse`] lets callers tell "the model did not
//! run" apart from "the model ran but answered badly".

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-troubleshoot library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Client input errors ───────────────────────────────────────────────
    /// No page-range expression was supplied (absent, empty or blank).
    #[error("No pages specified\nProvide a page range such as \"1,3,5-7\".")]
    MissingScope,

    /// The page-range expression could not be parsed.
    #[error("Malformed page range '{input}': token '{token}' {reason}")]
    MalformedRange {
        input: String,
        token: String,
        reason: String,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The requested span starts past the end of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    /// The post-render stage was handed no pages.
    #[error("No rendered pages to annotate\nThe page list passed to extraction was empty.")]
    NoPagesRendered,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set --pdfium-lib (or PDFIUM_LIB_PATH) to an existing libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── OCR errors ────────────────────────────────────────────────────────
    /// No tesseract binary could be resolved for this host.
    #[error("OCR engine unavailable on platform '{platform}': {detail}")]
    OcrUnavailable { platform: String, detail: String },

    /// Layout detection failed on a page.
    #[error("OCR failed for page {page}: {detail}")]
    OcrFailed { page: u32, detail: String },

    /// A page image could not be JPEG-encoded.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodeFailed { page: u32, detail: String },

    // ── Remote extraction errors ──────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The extraction service failed (network, auth, quota).
    #[error("Extraction service error: {message}")]
    ServiceError { message: String },

    /// The extraction service did not answer within the configured timeout.
    #[error("Extraction service timed out after {secs}s")]
    ServiceTimeout { secs: u64 },

    /// The extraction service answered, but not with valid JSON.
    ///
    /// `raw` holds the full response text for diagnostics.
    #[error("Extraction service returned malformed JSON: {detail}")]
    MalformedResponse { detail: String, raw: String },

    // ── Config / output errors ────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingScope,
    MalformedRange,
    UnreadableDocument,
    OcrFailure,
    RemoteServiceFailure,
    MalformedRemoteResponse,
    Configuration,
    Internal,
}

impl ExtractError {
    /// Category of this error for the failure response.
    pub fn kind(&self) -> ErrorKind {
        use ExtractError::*;
        match self {
            MissingScope => ErrorKind::MissingScope,
            MalformedRange { .. } => ErrorKind::MalformedRange,
            FileNotFound { .. }
            | PermissionDenied { .. }
            | InvalidInput { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | NotAPdf { .. }
            | CorruptPdf { .. }
            | PasswordRequired { .. }
            | WrongPassword { .. }
            | PageOutOfRange { .. }
            | NoPagesRendered
            | RasterisationFailed { .. } => ErrorKind::UnreadableDocument,
            OcrUnavailable { .. } | OcrFailed { .. } => ErrorKind::OcrFailure,
            ProviderNotConfigured { .. } | ServiceError { .. } | ServiceTimeout { .. } => {
                ErrorKind::RemoteServiceFailure
            }
            MalformedResponse { .. } => ErrorKind::MalformedRemoteResponse,
            PdfiumBindingFailed(_) | InvalidConfig(_) => ErrorKind::Configuration,
            EncodeFailed { .. } | OutputWriteFailed { .. } | Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the caller supplied bad input; such errors are never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingScope | ErrorKind::MalformedRange
        )
    }

    /// Raw model output attached to a malformed-response error.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ExtractError::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Serialisable failure object returned in place of a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl From<&ExtractError> for ErrorReport {
    fn from(e: &ExtractError) -> Self {
        Self {
            error: e.kind(),
            message: e.to_string(),
            raw_response: e.raw_response().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_scope_is_client_error() {
        let e = ExtractError::MissingScope;
        assert_eq!(e.kind(), ErrorKind::MissingScope);
        assert!(e.is_client_error());
        assert!(e.to_string().contains("No pages specified"));
    }

    #[test]
    fn service_and_parse_failures_are_distinct() {
        let svc = ExtractError::ServiceError {
            message: "401 unauthorized".into(),
        };
        let bad = ExtractError::MalformedResponse {
            detail: "expected value at line 1 column 1".into(),
            raw: "Sorry, I can't".into(),
        };
        assert_eq!(svc.kind(), ErrorKind::RemoteServiceFailure);
        assert_eq!(bad.kind(), ErrorKind::MalformedRemoteResponse);
        assert!(!svc.is_client_error());
    }

    #[test]
    fn report_keeps_raw_response() {
        let e = ExtractError::MalformedResponse {
            detail: "eof".into(),
            raw: "{\"TroubleShooting\": [".into(),
        };
        let report = ErrorReport::from(&e);
        assert_eq!(report.raw_response.as_deref(), Some("{\"TroubleShooting\": ["));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error"], "malformed_remote_response");
    }

    #[test]
    fn report_omits_raw_for_other_errors() {
        let e = ExtractError::OcrFailed {
            page: 2,
            detail: "tesseract exited with status 1".into(),
        };
        let json = serde_json::to_value(ErrorReport::from(&e)).unwrap();
        assert_eq!(json["error"], "ocr_failure");
        assert!(json.get("raw_response").is_none());
        assert!(json["message"].as_str().unwrap().contains("page 2"));
    }

    #[test]
    fn document_errors_are_unreadable_document() {
        let e = ExtractError::CorruptPdf {
            path: "x.pdf".into(),
            detail: "bad xref".into(),
        };
        assert_eq!(e.kind(), ErrorKind::UnreadableDocument);
    }
}
