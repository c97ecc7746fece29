//! Configuration types for troubleshooting-table extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The config is an explicit value handed
//! to [`crate::extract::Extractor`] at construction time: nothing in the
//! library reads process-wide state except provider auto-detection, and that
//! only when no provider was configured.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default vision model for extraction.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-2024-04-09";

/// Configuration for a troubleshooting-table extraction.
///
/// # Example
/// ```rust
/// use edgequake_troubleshoot::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .jpeg_quality(85)
///     .model("gpt-4o")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI. Range: 72–600. Default: 300.
    ///
    /// Bounding boxes returned by the model are in pixel space at this DPI,
    /// so changing it changes the coordinate system of the result.
    pub dpi: u32,

    /// JPEG quality used for every payload image. Range: 1–100. Default: 75.
    pub jpeg_quality: u8,

    /// Pages annotated and encoded in parallel. Default: 1.
    ///
    /// Output order is independent of this value.
    pub concurrency: usize,

    /// LLM model identifier. Default: [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2000.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::EXTRACTION_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// OCR engine settings.
    pub ocr: OcrConfig,

    /// TrueType font used for the coordinate labels.
    ///
    /// When unset, the bundled DejaVu Sans Mono face is used.
    pub label_font: Option<PathBuf>,

    /// Label font size in pixels. Default: 24.
    pub label_font_size: f32,

    /// Explicit pdfium shared library. When unset the system library is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Timeout for the extraction call in seconds. Default: none.
    pub api_timeout_secs: Option<u64>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            jpeg_quality: 75,
            concurrency: 1,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 2000,
            system_prompt: None,
            password: None,
            ocr: OcrConfig::default(),
            label_font: None,
            label_font_size: 24.0,
            pdfium_lib_path: None,
            download_timeout_secs: 120,
            api_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("ocr", &self.ocr)
            .field("label_font", &self.label_font)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model to request, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ocr.tesseract_path = Some(path.into());
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = lang.into();
        self
    }

    pub fn label_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.label_font = Some(path.into());
        self
    }

    pub fn label_font_size(mut self, px: f32) -> Self {
        self.config.label_font_size = px;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        // dpi, jpeg_quality and concurrency are clamped by their setters.
        let c = &self.config;
        if c.ocr.language.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if !(c.label_font_size.is_finite() && c.label_font_size > 0.0) {
            return Err(ExtractError::InvalidConfig(format!(
                "Label font size must be positive, got {}",
                c.label_font_size
            )));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Settings for the tesseract OCR engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Explicit tesseract binary. When unset a per-platform default is used.
    pub tesseract_path: Option<PathBuf>,
    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            language: "eng".to_string(),
        }
    }
}

impl OcrConfig {
    /// Resolve the tesseract binary for the current host.
    pub fn resolve_binary(&self) -> Result<PathBuf, ExtractError> {
        resolve_tesseract(self.tesseract_path.as_ref(), std::env::consts::OS)
    }
}

/// Resolve the tesseract binary: explicit path first, then the platform default.
fn resolve_tesseract(explicit: Option<&PathBuf>, os: &str) -> Result<PathBuf, ExtractError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ExtractError::OcrUnavailable {
                platform: os.to_string(),
                detail: format!("tesseract binary not found at '{}'", path.display()),
            });
        }
        return Ok(path.clone());
    }

    match os {
        "linux" => Ok(PathBuf::from("/usr/bin/tesseract")),
        "macos" => Ok(PathBuf::from("/opt/homebrew/bin/tesseract")),
        other => Err(ExtractError::OcrUnavailable {
            platform: other.to_string(),
            detail: "no default tesseract location; set an explicit tesseract path".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.jpeg_quality, 75);
        assert_eq!(c.max_tokens, 2000);
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
        assert_eq!(c.ocr.language, "eng");
    }

    #[test]
    fn builder_clamps() {
        let c = ExtractionConfig::builder()
            .dpi(10_000)
            .jpeg_quality(0)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 600);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.concurrency, 1);

        let low = ExtractionConfig::builder().dpi(1).build().unwrap();
        assert_eq!(low.dpi, 72);
    }

    #[test]
    fn builder_rejects_empty_language() {
        let err = ExtractionConfig::builder().ocr_language(" ").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(ExtractionConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn tesseract_platform_defaults() {
        assert_eq!(
            resolve_tesseract(None, "linux").unwrap(),
            PathBuf::from("/usr/bin/tesseract")
        );
        assert_eq!(
            resolve_tesseract(None, "macos").unwrap(),
            PathBuf::from("/opt/homebrew/bin/tesseract")
        );
    }

    #[test]
    fn tesseract_unsupported_platform_is_an_error() {
        let err = resolve_tesseract(None, "windows").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OcrFailure);
        assert!(err.to_string().contains("windows"));
    }

    #[test]
    fn tesseract_explicit_path_must_exist() {
        let missing = PathBuf::from("/definitely/not/tesseract");
        assert!(resolve_tesseract(Some(&missing), "linux").is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(resolve_tesseract(Some(&path), "windows").unwrap(), path);
    }
}
