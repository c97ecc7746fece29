//! Payload assembly: rendered pages → ordered `[raw, annotated, raw, annotated, …]`.
//!
//! The extraction prompt tells the model to expect, for each page, the raw
//! view immediately followed by the coordinate-annotated view. That order is
//! fixed here: pages ascend, and within a page raw precedes annotated.
//!
//! Per-page work (OCR, overlay, two JPEG encodes) is CPU-bound and
//! independent across pages, so up to `concurrency` pages run at once on the
//! blocking pool. `buffered` yields results in input order regardless of
//! completion order.

use crate::error::ExtractError;
use crate::pipeline::annotate::LayoutAnnotator;
use crate::pipeline::encode::{encode_image, ImagePayloadEntry};
use crate::pipeline::render::RasterPage;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Both encoded views of one page.
#[derive(Debug, Clone)]
pub struct PageViews {
    pub page: u32,
    pub raw: ImagePayloadEntry,
    pub annotated: ImagePayloadEntry,
    /// Block-level rectangles on the annotated view.
    pub blocks: usize,
}

/// Ordered image list for one extraction request.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionPayload {
    /// Pages in the order their views appear.
    pub pages: Vec<u32>,
    /// `2 × pages.len()` entries: entry `2i` is the raw view of `pages[i]`,
    /// entry `2i + 1` the annotated view of the same page.
    pub entries: Vec<ImagePayloadEntry>,
    #[serde(skip)]
    pub blocks: usize,
}

impl ExtractionPayload {
    /// Interleave per-page views in ascending page order.
    pub fn from_views(mut views: Vec<PageViews>) -> Self {
        views.sort_by_key(|v| v.page);

        let mut pages = Vec::with_capacity(views.len());
        let mut entries = Vec::with_capacity(views.len() * 2);
        let mut blocks = 0;
        for v in views {
            pages.push(v.page);
            entries.push(v.raw);
            entries.push(v.annotated);
            blocks += v.blocks;
        }

        Self {
            pages,
            entries,
            blocks,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw view of the `i`-th page.
    pub fn raw(&self, i: usize) -> Option<&ImagePayloadEntry> {
        self.entries.get(2 * i)
    }

    /// Annotated view of the `i`-th page.
    pub fn annotated(&self, i: usize) -> Option<&ImagePayloadEntry> {
        self.entries.get(2 * i + 1)
    }
}

/// Annotate and encode one page.
pub fn build_views(
    page: &RasterPage,
    annotator: &LayoutAnnotator,
    quality: u8,
) -> Result<PageViews, ExtractError> {
    let encode_failed = |e: image::ImageError| ExtractError::EncodeFailed {
        page: page.page,
        detail: e.to_string(),
    };

    let raw = encode_image(&page.image, quality).map_err(encode_failed)?;
    let overlay = annotator.annotate(page)?;
    let annotated = encode_image(&overlay.image, quality).map_err(encode_failed)?;

    debug!(
        "Page {}: raw {} B64 bytes, annotated {} B64 bytes",
        page.page,
        raw.data.len(),
        annotated.data.len()
    );

    Ok(PageViews {
        page: page.page,
        raw,
        annotated,
        blocks: overlay.blocks,
    })
}

/// Build the payload for all rendered pages.
///
/// The first failing page aborts the whole assembly.
pub async fn assemble_payload(
    pages: Vec<RasterPage>,
    annotator: Arc<LayoutAnnotator>,
    quality: u8,
    concurrency: usize,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionPayload, ExtractError> {
    let total = pages.len();

    let views: Vec<PageViews> = stream::iter(pages.into_iter().map(|page| {
        let annotator = Arc::clone(&annotator);
        let progress = progress.clone();
        async move {
            let views = tokio::task::spawn_blocking(move || build_views(&page, &annotator, quality))
                .await
                .map_err(|e| ExtractError::Internal(format!("Annotate task panicked: {}", e)))??;
            if let Some(cb) = progress {
                cb.on_page_annotated(views.page, views.blocks, total);
            }
            Ok::<_, ExtractError>(views)
        }
    }))
    .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    Ok(ExtractionPayload::from_views(views))
}
