//! Coordinate overlays: draw OCR block boxes and their pixel coordinates.
//!
//! The annotated view gives the model something to anchor bounding boxes to:
//! every block-level region gets a 2 px rectangle and a label reading
//! `"x, y, width, height"`. Colours cycle through [`PALETTE`] by the region's
//! position in the OCR result list, so re-annotating the same page always
//! produces the same picture.
//!
//! Drawing happens on a copy; the caller's image is untouched because its
//! raw encoding is sent too.

use crate::error::ExtractError;
use crate::pipeline::ocr::{LayoutDetector, TextBlock};
use crate::pipeline::render::RasterPage;
use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outline colours: red, green, blue, yellow, purple, orange, white.
pub const PALETTE: [Rgb<u8>; 7] = [
    Rgb([255, 0, 0]),
    Rgb([0, 128, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 255, 0]),
    Rgb([128, 0, 128]),
    Rgb([255, 165, 0]),
    Rgb([255, 255, 255]),
];

/// Rectangle outline thickness in pixels.
const OUTLINE_WIDTH: u32 = 2;

/// Gap between a box edge and its label.
const LABEL_OFFSET: i64 = 5;

/// Colour for the region at `index` in the OCR result list.
pub fn color_for(index: usize) -> Rgb<u8> {
    PALETTE[index % PALETTE.len()]
}

/// Label text for a region.
pub fn coords_label(block: &TextBlock) -> String {
    format!(
        "{}, {}, {}, {}",
        block.left, block.top, block.width, block.height
    )
}

/// Where to draw the label for `block` on an image of `width × height`.
///
/// Inside the top-left corner of the box by default; shifted to the other
/// side of the box edge when the box reaches the image border.
pub fn label_origin(block: &TextBlock, width: u32, height: u32) -> (i32, i32) {
    let (x, y) = (block.left as i64, block.top as i64);
    let (w, h) = (block.width as i64, block.height as i64);

    let text_x = if x + w + LABEL_OFFSET < width as i64 {
        x + LABEL_OFFSET
    } else {
        x - LABEL_OFFSET
    };
    let text_y = if y + h + LABEL_OFFSET < height as i64 {
        y + LABEL_OFFSET
    } else {
        y - LABEL_OFFSET
    };

    (clamp_i32(text_x), clamp_i32(text_y))
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Monospace face used when no label font is configured.
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// Label font and size.
pub struct LabelStyle {
    font: FontVec,
    scale: PxScale,
}

impl LabelStyle {
    pub fn new(font: FontVec, size: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(size),
        }
    }

    /// The bundled DejaVu Sans Mono face at `size` pixels.
    pub fn embedded(size: f32) -> Result<Self, ExtractError> {
        let font = FontVec::try_from_vec(EMBEDDED_FONT.to_vec())
            .map_err(|e| ExtractError::Internal(format!("embedded label font: {e}")))?;
        Ok(Self::new(font, size))
    }

    /// Load a TrueType/OpenType font from disk.
    pub fn load(path: &Path, size: f32) -> Result<Self, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ExtractError::InvalidConfig(format!("cannot read font '{}': {e}", path.display()))
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| {
            ExtractError::InvalidConfig(format!("invalid font '{}': {e}", path.display()))
        })?;
        Ok(Self::new(font, size))
    }
}

/// Draw every block-level region of `regions` onto a copy of `image`.
///
/// Non-block regions are skipped but still advance the colour index.
/// Labels are drawn only when a [`LabelStyle`] is supplied.
pub fn draw_overlay(
    image: &DynamicImage,
    regions: &[TextBlock],
    style: Option<&LabelStyle>,
) -> DynamicImage {
    let mut canvas: RgbImage = image.to_rgb8();
    let (width, height) = canvas.dimensions();

    for (index, block) in regions.iter().enumerate() {
        if !block.is_block() {
            continue;
        }
        let color = color_for(index);

        for t in 0..OUTLINE_WIDTH {
            // Outline spans x..=x+w like an inclusive box, growing inward.
            let w = (block.width + 1).saturating_sub(2 * t);
            let h = (block.height + 1).saturating_sub(2 * t);
            if w == 0 || h == 0 {
                break;
            }
            let rect = Rect::at((block.left + t) as i32, (block.top + t) as i32).of_size(w, h);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }

        if let Some(style) = style {
            let (tx, ty) = label_origin(block, width, height);
            draw_text_mut(
                &mut canvas,
                color,
                tx,
                ty,
                style.scale,
                &style.font,
                &coords_label(block),
            );
        }
    }

    DynamicImage::ImageRgb8(canvas)
}

/// An annotated copy of a page.
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub page: u32,
    pub image: DynamicImage,
    /// Number of block-level rectangles drawn.
    pub blocks: usize,
}

/// Runs layout detection on a page and renders the overlay.
pub struct LayoutAnnotator {
    detector: Arc<dyn LayoutDetector>,
    style: Option<LabelStyle>,
}

impl LayoutAnnotator {
    pub fn new(detector: Arc<dyn LayoutDetector>, style: Option<LabelStyle>) -> Self {
        if style.is_none() {
            warn!("Annotator built without a label style; coordinate labels will be omitted");
        }
        Self { detector, style }
    }

    /// Annotate one page. OCR failure is fatal for the page.
    pub fn annotate(&self, page: &RasterPage) -> Result<AnnotatedImage, ExtractError> {
        let regions = self
            .detector
            .detect_blocks(&page.image)
            .map_err(|e| match e {
                ExtractError::OcrFailed { detail, .. } => ExtractError::OcrFailed {
                    page: page.page,
                    detail,
                },
                other => other,
            })?;

        let blocks = regions.iter().filter(|b| b.is_block()).count();
        debug!(
            "Page {}: {} regions, {} block-level",
            page.page,
            regions.len(),
            blocks
        );

        Ok(AnnotatedImage {
            page: page.page,
            image: draw_overlay(&page.image, &regions, self.style.as_ref()),
            blocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::LayoutLevel;

    fn region(level: LayoutLevel, left: u32, top: u32, width: u32, height: u32) -> TextBlock {
        TextBlock {
            level,
            left,
            top,
            width,
            height,
            text: String::new(),
            confidence: -1.0,
        }
    }

    fn black(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
    }

    #[test]
    fn palette_cycles_by_index() {
        assert_eq!(color_for(0), Rgb([255, 0, 0]));
        assert_eq!(color_for(6), Rgb([255, 255, 255]));
        assert_eq!(color_for(7), color_for(0));
        assert_eq!(color_for(15), color_for(1));
    }

    #[test]
    fn block_regions_get_outlines() {
        let regions = vec![
            region(LayoutLevel::Page, 0, 0, 100, 100),
            region(LayoutLevel::Block, 10, 10, 30, 20),
        ];
        let out = draw_overlay(&black(100, 100), &regions, None).to_rgb8();

        // Index 1 in the OCR list → green.
        assert_eq!(*out.get_pixel(10, 10), color_for(1));
        assert_eq!(*out.get_pixel(40, 30), color_for(1));
        // Second pass of the 2 px outline.
        assert_eq!(*out.get_pixel(11, 15), color_for(1));
        // Interior untouched.
        assert_eq!(*out.get_pixel(25, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn non_block_regions_are_not_drawn() {
        let regions = vec![
            region(LayoutLevel::Word, 10, 10, 30, 20),
            region(LayoutLevel::Line, 50, 50, 30, 20),
            region(LayoutLevel::Paragraph, 5, 60, 10, 10),
        ];
        let input = black(100, 100);
        let out = draw_overlay(&input, &regions, None);
        assert_eq!(out.to_rgb8(), input.to_rgb8());
    }

    #[test]
    fn original_is_left_untouched() {
        let input = black(50, 50);
        let regions = vec![region(LayoutLevel::Block, 5, 5, 10, 10)];
        let out = draw_overlay(&input, &regions, None);
        assert_ne!(out.to_rgb8(), input.to_rgb8());
        assert!(input.to_rgb8().pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn redrawing_is_deterministic() {
        let regions: Vec<TextBlock> = (0..9)
            .map(|i| region(LayoutLevel::Block, i * 10, i * 10, 8, 8))
            .collect();
        let a = draw_overlay(&black(120, 120), &regions, None).to_rgb8();
        let b = draw_overlay(&black(120, 120), &regions, None).to_rgb8();
        assert_eq!(a, b);
        for i in 0..9u32 {
            assert_eq!(*a.get_pixel(i * 10, i * 10), color_for(i as usize));
        }
    }

    #[test]
    fn box_at_image_edge_is_clipped_not_panicking() {
        let regions = vec![region(LayoutLevel::Block, 90, 90, 50, 50)];
        let out = draw_overlay(&black(100, 100), &regions, None).to_rgb8();
        assert_eq!(*out.get_pixel(90, 90), color_for(0));
    }

    #[test]
    fn zero_sized_block_draws_a_point() {
        let regions = vec![region(LayoutLevel::Block, 3, 3, 0, 0)];
        let out = draw_overlay(&black(10, 10), &regions, None).to_rgb8();
        assert_eq!(*out.get_pixel(3, 3), color_for(0));
    }

    #[test]
    fn label_sits_inside_the_box_by_default() {
        let b = region(LayoutLevel::Block, 100, 200, 50, 40);
        assert_eq!(label_origin(&b, 1000, 1000), (105, 205));
    }

    #[test]
    fn label_flips_at_the_border() {
        let b = region(LayoutLevel::Block, 960, 970, 40, 30);
        assert_eq!(label_origin(&b, 1000, 1000), (955, 965));
    }

    #[test]
    fn label_text_lists_coordinates() {
        let b = region(LayoutLevel::Block, 1, 2, 3, 4);
        assert_eq!(coords_label(&b), "1, 2, 3, 4");
    }

    /// Non-black pixels strictly inside the 2 px outline of `b`.
    fn ink_inside(img: &RgbImage, b: &TextBlock) -> usize {
        let (x0, y0) = (b.left + OUTLINE_WIDTH, b.top + OUTLINE_WIDTH);
        let (x1, y1) = (b.left + b.width - OUTLINE_WIDTH, b.top + b.height - OUTLINE_WIDTH);
        (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| (x, y)))
            .filter(|&(x, y)| *img.get_pixel(x, y) != Rgb([0, 0, 0]))
            .count()
    }

    #[test]
    fn embedded_font_draws_label_inside_box() {
        let b = region(LayoutLevel::Block, 10, 10, 180, 80);
        let style = LabelStyle::embedded(24.0).unwrap();

        let plain = draw_overlay(&black(200, 100), &[b.clone()], None).to_rgb8();
        let labelled = draw_overlay(&black(200, 100), &[b.clone()], Some(&style)).to_rgb8();

        assert_eq!(ink_inside(&plain, &b), 0);
        assert!(ink_inside(&labelled, &b) > 0);
    }

    #[test]
    fn missing_font_is_a_config_error() {
        let err = LabelStyle::load(Path::new("/no/such/font.ttf"), 24.0)
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    struct FixedDetector(Vec<TextBlock>);

    impl LayoutDetector for FixedDetector {
        fn detect_blocks(&self, _image: &DynamicImage) -> Result<Vec<TextBlock>, ExtractError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDetector;

    impl LayoutDetector for BrokenDetector {
        fn detect_blocks(&self, _image: &DynamicImage) -> Result<Vec<TextBlock>, ExtractError> {
            Err(ExtractError::OcrFailed {
                page: 0,
                detail: "engine crashed".into(),
            })
        }
    }

    #[test]
    fn annotator_counts_block_regions() {
        let detector = FixedDetector(vec![
            region(LayoutLevel::Page, 0, 0, 20, 20),
            region(LayoutLevel::Block, 2, 2, 5, 5),
            region(LayoutLevel::Word, 2, 2, 2, 2),
            region(LayoutLevel::Block, 10, 10, 5, 5),
        ]);
        let annotator = LayoutAnnotator::new(Arc::new(detector), None);
        let page = RasterPage {
            page: 4,
            image: black(20, 20),
        };
        let out = annotator.annotate(&page).unwrap();
        assert_eq!(out.page, 4);
        assert_eq!(out.blocks, 2);
    }

    #[test]
    fn annotator_tags_ocr_failure_with_page() {
        let annotator = LayoutAnnotator::new(Arc::new(BrokenDetector), None);
        let page = RasterPage {
            page: 7,
            image: black(4, 4),
        };
        let err = annotator.annotate(&page).unwrap_err();
        assert!(matches!(err, ExtractError::OcrFailed { page: 7, .. }));
    }
}
