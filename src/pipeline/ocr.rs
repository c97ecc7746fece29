//! Layout detection: image → text regions with pixel bounding boxes.
//!
//! The pipeline only needs one capability from an OCR engine, captured by
//! [`LayoutDetector`]. The production implementation shells out to the
//! `tesseract` CLI in TSV mode; tests substitute an in-memory fake.

use crate::config::OcrConfig;
use crate::error::ExtractError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Granularity of a detected region, following tesseract's hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutLevel {
    Page,
    Block,
    Paragraph,
    Line,
    Word,
}

impl LayoutLevel {
    /// Map tesseract's numeric `level` column (1–5).
    pub fn from_tesseract(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Page),
            2 => Some(Self::Block),
            3 => Some(Self::Paragraph),
            4 => Some(Self::Line),
            5 => Some(Self::Word),
            _ => None,
        }
    }
}

/// One OCR region in raster pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub level: LayoutLevel,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    /// Recognised text; empty for structural levels.
    pub text: String,
    /// Recognition confidence, `-1` for structural levels.
    pub confidence: f32,
}

impl TextBlock {
    pub fn is_block(&self) -> bool {
        self.level == LayoutLevel::Block
    }
}

/// Black-box layout detection.
///
/// Returns a flat list of regions at mixed levels, in engine order. The
/// position of a region in this list is significant: annotation colours are
/// assigned by it.
pub trait LayoutDetector: Send + Sync {
    fn detect_blocks(&self, image: &DynamicImage) -> Result<Vec<TextBlock>, ExtractError>;
}

/// [`LayoutDetector`] backed by the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    binary: PathBuf,
    language: String,
}

impl TesseractDetector {
    /// Resolve the binary from `config` once, up front.
    pub fn from_config(config: &OcrConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            binary: config.resolve_binary()?,
            language: config.language.clone(),
        })
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }
}

impl LayoutDetector for TesseractDetector {
    fn detect_blocks(&self, image: &DynamicImage) -> Result<Vec<TextBlock>, ExtractError> {
        let failed = |detail: String| ExtractError::OcrFailed { page: 0, detail };

        let scratch = tempfile::Builder::new()
            .prefix("ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| failed(format!("tempfile: {e}")))?;
        image
            .save_with_format(scratch.path(), image::ImageFormat::Png)
            .map_err(|e| failed(format!("write scratch image: {e}")))?;

        let output = Command::new(&self.binary)
            .arg(scratch.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .output()
            .map_err(|e| failed(format!("cannot run '{}': {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let blocks = parse_tsv(&tsv).map_err(failed)?;
        debug!("tesseract returned {} regions", blocks.len());
        Ok(blocks)
    }
}

/// Parse tesseract's TSV output.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. The header row is skipped; the trailing `text`
/// column may be missing or empty.
pub fn parse_tsv(tsv: &str) -> Result<Vec<TextBlock>, String> {
    let mut blocks = Vec::new();

    for (line_no, line) in tsv.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with("level") {
            continue;
        }

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 11 {
            return Err(format!(
                "line {}: expected at least 11 columns, got {}",
                line_no + 1,
                cols.len()
            ));
        }

        let num = |idx: usize| -> Result<u32, String> {
            cols[idx]
                .trim()
                .parse()
                .map_err(|_| format!("line {}: bad number '{}'", line_no + 1, cols[idx]))
        };

        let raw_level = num(0)?;
        let level = u8::try_from(raw_level)
            .ok()
            .and_then(LayoutLevel::from_tesseract)
            .ok_or_else(|| format!("line {}: unknown level {}", line_no + 1, raw_level))?;

        blocks.push(TextBlock {
            level,
            left: num(6)?,
            top: num(7)?,
            width: num(8)?,
            height: num(9)?,
            confidence: cols[10].trim().parse().unwrap_or(-1.0),
            text: cols.get(11).map(|t| t.trim().to_string()).unwrap_or_default(),
        });
    }

    Ok(blocks)
}
