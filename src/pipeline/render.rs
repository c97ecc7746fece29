//! PDF rasterisation: render the requested page span to RGB images via pdfium.
//!
//! ## Span, not selection
//!
//! A [`PageSet`] bounds rendering by its lowest and highest page: `"2,5"`
//! renders pages 2, 3, 4 and 5. Pages inside the span that were not asked
//! for are still sent to the model. This keeps the rendered sequence
//! contiguous, so page numbers in the model's answer line up with the
//! document.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and CPU-heavy rendering.
//! `tokio::task::spawn_blocking` keeps it off the async worker threads.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::page_range::PageSet;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// One rendered page.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 1-indexed page number in the source document.
    pub page: u32,
    /// RGB raster at the configured DPI.
    pub image: DynamicImage,
}

/// Pages to render for `pages` in a document of `total` pages.
///
/// * `None` → every page.
/// * `Some(set)` → `set.first()..=set.last()`, clamped to the document end.
///
/// # Errors
/// [`ExtractError::PageOutOfRange`] when the span starts past the last page.
pub fn page_span(pages: Option<&PageSet>, total: u32) -> Result<Vec<u32>, ExtractError> {
    let Some(set) = pages else {
        return Ok((1..=total).collect());
    };

    let first = set.first();
    if first > total {
        return Err(ExtractError::PageOutOfRange { page: first, total });
    }

    let mut last = set.last();
    if last > total {
        warn!(
            "Requested pages up to {} but document has {}; rendering {}-{}",
            last, total, first, total
        );
        last = total;
    }

    Ok((first..=last).collect())
}

/// Rasterise the requested span of a PDF.
///
/// Either every page renders or the call fails; no partial result is
/// returned.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
    pages: Option<&PageSet>,
) -> Result<Vec<RasterPage>, ExtractError> {
    let job = RenderJob {
        path: pdf_path.to_path_buf(),
        dpi: config.dpi,
        password: config.password.clone(),
        pdfium_lib: config.pdfium_lib_path.clone(),
        pages: pages.cloned(),
    };

    tokio::task::spawn_blocking(move || job.run())
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))?
}

/// Owned inputs for a blocking render.
struct RenderJob {
    path: PathBuf,
    dpi: u32,
    password: Option<String>,
    pdfium_lib: Option<PathBuf>,
    pages: Option<PageSet>,
}

impl RenderJob {
    fn run(self) -> Result<Vec<RasterPage>, ExtractError> {
        let pdfium = bind_pdfium(self.pdfium_lib.as_deref())?;
        let password = self.password.as_deref();

        let document = pdfium
            .load_pdf_from_file(&self.path, password)
            .map_err(|e| load_error(&self.path, password, e))?;

        let pages = document.pages();
        let total = pages.len() as u32;
        info!("PDF loaded: {} pages", total);

        let span = page_span(self.pages.as_ref(), total)?;
        if span.is_empty() {
            return Err(ExtractError::CorruptPdf {
                path: self.path.clone(),
                detail: "document has no pages".into(),
            });
        }

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(self.dpi as f32 / POINTS_PER_INCH);

        let mut results = Vec::with_capacity(span.len());
        for page_num in span {
            let raster_failed = |e: PdfiumError| ExtractError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            };

            let page = pages.get((page_num - 1) as u16).map_err(raster_failed)?;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(raster_failed)?;

            // JPEG has no alpha channel; drop it once here.
            let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );

            results.push(RasterPage {
                page: page_num,
                image,
            });
        }

        Ok(results)
    }
}

/// Bind pdfium from an explicit library path, or the system library.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, ExtractError> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> ExtractError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            ExtractError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_range::parse_page_range;

    fn set(s: &str) -> PageSet {
        parse_page_range(Some(s)).unwrap()
    }

    #[test]
    fn absent_set_renders_every_page() {
        assert_eq!(page_span(None, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn span_fills_gaps_between_requested_pages() {
        assert_eq!(page_span(Some(&set("2,5")), 10).unwrap(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn span_of_contiguous_range() {
        assert_eq!(page_span(Some(&set("1-2")), 3).unwrap(), vec![1, 2]);
    }

    #[test]
    fn span_is_clamped_to_document_end() {
        assert_eq!(page_span(Some(&set("2-9")), 4).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn span_past_document_end_is_an_error() {
        let err = page_span(Some(&set("5-6")), 4).unwrap_err();
        assert!(matches!(err, ExtractError::PageOutOfRange { page: 5, total: 4 }));
    }
}
