//! Downscaling of oversized reference images
//!
//! Small images are passed through byte-for-byte so their content hash is
//! stable. Oversized ones are resized so the longest side equals
//! `max_side` and re-encoded in the declared format family.

use std::borrow::Cow;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, ImageResult};
use tracing::{debug, warn};

use crate::types::ImageKind;

const JPEG_QUALITY: u8 = 85;

/// Outcome of inspecting an uploaded buffer
#[derive(Debug)]
pub enum Normalized {
    /// Not recognizable as an image
    Undecodable,
    /// Already within bounds, or re-encoding failed
    Unchanged,
    Reencoded(Vec<u8>),
}

/// Inspect `buffer` and downscale it when its longest side exceeds `max_side`.
pub fn inspect(buffer: &[u8], declared_content_type: &str, max_side: u32) -> Normalized {
    let (width, height) = match probe_dimensions(buffer) {
        Ok(dims) => dims,
        Err(e) => {
            debug!(error = %e, size = buffer.len(), "Buffer is not a decodable image");
            return Normalized::Undecodable;
        }
    };

    if width.max(height) <= max_side {
        return Normalized::Unchanged;
    }

    let kind = ImageKind::from_content_type(declared_content_type);
    match downscale(buffer, kind, max_side) {
        Ok(data) => {
            debug!(
                width,
                height,
                max_side,
                format = kind.extension(),
                before = buffer.len(),
                after = data.len(),
                "Downscaled reference image"
            );
            Normalized::Reencoded(data)
        }
        Err(e) => {
            warn!(error = %e, width, height, "Failed to downscale image, keeping original");
            Normalized::Unchanged
        }
    }
}

/// Fail-open normalization: anything that cannot be downscaled comes back as-is.
pub fn normalize<'a>(buffer: &'a [u8], declared_content_type: &str, max_side: u32) -> Cow<'a, [u8]> {
    match inspect(buffer, declared_content_type, max_side) {
        Normalized::Reencoded(data) => Cow::Owned(data),
        Normalized::Undecodable | Normalized::Unchanged => Cow::Borrowed(buffer),
    }
}

/// Read only the image header
fn probe_dimensions(buffer: &[u8]) -> ImageResult<(u32, u32)> {
    ImageReader::new(Cursor::new(buffer))
        .with_guessed_format()?
        .into_dimensions()
}

fn downscale(buffer: &[u8], kind: ImageKind, max_side: u32) -> ImageResult<Vec<u8>> {
    let img = image::load_from_memory(buffer)?;
    let resized = img.resize(max_side, max_side, FilterType::Lanczos3);
    encode(&resized, kind)
}

fn encode(img: &DynamicImage, kind: ImageKind) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();

    match kind {
        ImageKind::Jpeg => {
            // JPEG has no alpha channel or palette
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
        }
        ImageKind::Webp => {
            flatten_color(img).write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
        }
        ImageKind::Png | ImageKind::Gif => {
            let encoder =
                PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive);
            flatten_color(img).write_with_encoder(encoder)?;
        }
    }

    Ok(out)
}

/// 8-bit RGB or RGBA, whichever keeps the alpha channel
fn flatten_color(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}
