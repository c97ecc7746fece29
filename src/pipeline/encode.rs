//! Image encoding: `DynamicImage` → base64 JPEG.
//!
//! Each request carries two images per page, so payload size matters more
//! here than in single-image conversion; JPEG keeps 300 DPI pages well below
//! provider upload limits. Encoding is deterministic for a given image and
//! quality. No resizing is applied.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";

/// Entry type tag; the payload only ever carries images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Image,
}

/// One inline image of an extraction payload: `{"type": "image", "data": "<base64>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayloadEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Base64 (standard alphabet, padded) JPEG bytes.
    pub data: String,
}

impl ImagePayloadEntry {
    /// Convert to the provider-facing image attachment.
    ///
    /// `detail: "high"` keeps small print and coordinate labels legible to
    /// tiling vision models.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.data.clone(), JPEG_MIME).with_detail("high")
    }
}

/// Encode an image as base64 JPEG at `quality` (1–100).
///
/// Alpha, if present, is dropped since JPEG cannot carry it.
pub fn encode_image(img: &DynamicImage, quality: u8) -> Result<ImagePayloadEntry, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded {}x{} image → {} bytes base64", rgb.width(), rgb.height(), data.len());

    Ok(ImagePayloadEntry {
        kind: EntryKind::Image,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(32, 16, |x, y| {
            Rgb([(x * 8) as u8, (y * 16) as u8, 128])
        }))
    }

    #[test]
    fn encodes_valid_jpeg() {
        let entry = encode_image(&sample(), 75).expect("encode should succeed");
        assert_eq!(entry.kind, EntryKind::Image);
        let bytes = STANDARD.decode(&entry.data).expect("valid base64");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode_image(&sample(), 80).unwrap();
        let b = encode_image(&sample(), 80).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rgba_input_is_accepted() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128])));
        assert!(encode_image(&img, 90).is_ok());
    }

    #[test]
    fn serialises_with_type_tag() {
        let entry = ImagePayloadEntry {
            kind: EntryKind::Image,
            data: "AAAA".into(),
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v, serde_json::json!({"type": "image", "data": "AAAA"}));
    }

    #[test]
    fn converts_to_provider_image() {
        let entry = encode_image(&sample(), 75).unwrap();
        let data = entry.to_image_data();
        assert_eq!(data.mime_type, JPEG_MIME);
        assert_eq!(data.data, entry.data);
    }
}
