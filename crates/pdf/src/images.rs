use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::PdfError;

pub const TARGET_DPI: f32 = 300.0;
const POINTS_PER_INCH: f32 = 72.0;
const JPEG_QUALITY: u8 = 85;

/// Raster ready for embedding as a `DCTDecode` XObject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl PreparedImage {
    /// Largest `(width, height)` in points that fits the slot and keeps the aspect ratio.
    pub fn fit(&self, slot_width: f32, slot_height: f32) -> (f32, f32) {
        let ratio = self.width_px as f32 / self.height_px.max(1) as f32;
        if slot_width / slot_height > ratio {
            (slot_height * ratio, slot_height)
        } else {
            (slot_width, slot_width / ratio)
        }
    }
}

/// Pixel budget of a slot measured in points.
pub fn pixel_budget(slot_width: f32, slot_height: f32) -> (u32, u32) {
    let scale = TARGET_DPI / POINTS_PER_INCH;
    ((slot_width * scale).round() as u32, (slot_height * scale).round() as u32)
}

/// Decodes `bytes`, downscales it when it exceeds the slot's 300-DPI pixel
/// budget and re-encodes it as baseline RGB JPEG.
pub fn prepare_for_slot(bytes: &[u8], slot_width: f32, slot_height: f32) -> Result<PreparedImage, PdfError> {
    let decoded = image::load_from_memory(bytes)?;
    let (max_width, max_height) = pixel_budget(slot_width, slot_height);
    let (width, height) = decoded.dimensions();

    let fitted = if width > max_width || height > max_height {
        decoded.resize(max_width, max_height, FilterType::Lanczos3)
    } else {
        decoded
    };
    encode_jpeg(&fitted)
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<PreparedImage, PdfError> {
    let rgb = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).encode_image(&rgb)?;

    Ok(PreparedImage {
        jpeg: buffer.into_inner(),
        width_px: rgb.width(),
        height_px: rgb.height(),
    })
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 120])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("png");
    buffer.into_inner()
}
