//! Photo validation, naming, and resizing.
//!
//! These are the CPU-side steps of photo ingestion. Storage and the async
//! orchestration live with the persistence layer.

use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageFormat;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Reject uploads whose declared type is not `image/*`.
///
/// This runs before anything looks at the payload.
pub fn ensure_image_mime(mime_type: &str) -> Result<()> {
    let mime = mime_type.trim().to_ascii_lowercase();
    match mime.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(()),
        _ => Err(Error::UnsupportedMediaType(mime_type.to_string())),
    }
}

/// Reject payloads whose magic bytes identify a non-image format even though
/// the declared type claimed an image. Unknown signatures pass through to
/// the decoder.
pub fn ensure_image_content(data: &[u8], declared: &str) -> Result<()> {
    match infer::get(data) {
        Some(kind) if kind.matcher_type() != infer::MatcherType::Image => {
            Err(Error::UnsupportedMediaType(format!(
                "{} (content is {})",
                declared,
                kind.mime_type()
            )))
        }
        _ => Ok(()),
    }
}

/// File extension derived from the MIME subtype (`image/jpeg` → `jpeg`).
///
/// Parameters are dropped and only ASCII alphanumerics are kept, so the
/// result is always safe to use in a filename.
pub fn extension_for_mime(mime_type: &str) -> String {
    let subtype = mime_type
        .split(';')
        .next()
        .and_then(|essence| essence.split('/').nth(1))
        .unwrap_or("");
    let ext: String = subtype
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if ext.is_empty() {
        "img".to_string()
    } else {
        ext
    }
}

/// Random, collision-free filename for a stored photo.
pub fn generate_photo_filename(mime_type: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), extension_for_mime(mime_type))
}

/// Target dimensions for a width bound, preserving aspect ratio.
///
/// Images already within `max_width` keep their size; wider images scale
/// down with a proportional, rounded height of at least one pixel.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round() as u32;
    (max_width, scaled.max(1))
}

/// A re-encoded photo ready to be written.
#[derive(Debug, Clone)]
pub struct ResizedPhoto {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Decode an image, bound its width, and re-encode it in its own format.
///
/// The format is sniffed from the bytes rather than trusted from the
/// declared MIME type. This is blocking CPU work.
pub fn resize_to_width(data: &[u8], max_width: u32) -> Result<ResizedPhoto> {
    let format = image::guess_format(data)?;
    let img = image::load_from_memory_with_format(data, format)?;

    let (width, height) = scaled_dimensions(img.width(), img.height(), max_width);
    let img = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)?;

    Ok(ResizedPhoto {
        bytes,
        width,
        height,
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_image_mime_accepted() {
        assert!(ensure_image_mime("image/png").is_ok());
        assert!(ensure_image_mime("IMAGE/JPEG").is_ok());
    }

    #[test]
    fn test_non_image_mime_rejected() {
        for mime in ["text/plain", "application/pdf", "image/", "", "imagepng"] {
            assert!(
                matches!(ensure_image_mime(mime), Err(Error::UnsupportedMediaType(_))),
                "{} should be rejected",
                mime
            );
        }
    }

    #[test]
    fn test_content_sniffing_rejects_pdf() {
        let pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";
        assert!(ensure_image_content(pdf, "image/png").is_err());
        assert!(ensure_image_content(&png(2, 2), "image/png").is_ok());
        assert!(ensure_image_content(b"unknown bytes", "image/png").is_ok());
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpeg");
        assert_eq!(extension_for_mime("image/PNG"), "png");
        assert_eq!(extension_for_mime("image/svg+xml"), "svgxml");
        assert_eq!(extension_for_mime("image/webp; q=1"), "webp");
        assert_eq!(extension_for_mime("image/../.."), "img");
    }

    #[test]
    fn test_generated_filenames_are_unique() {
        let a = generate_photo_filename("image/png");
        let b = generate_photo_filename("image/png");
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
        assert!(!a.contains('/'));
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(1600, 900, 800), (800, 450));
        assert_eq!(scaled_dimensions(1000, 333, 800), (800, 266));
        assert_eq!(scaled_dimensions(400, 300, 800), (400, 300));
        assert_eq!(scaled_dimensions(800, 600, 800), (800, 600));
        assert_eq!(scaled_dimensions(8000, 1, 800), (800, 1));
    }

    #[test]
    fn test_resize_wide_image() {
        let resized = resize_to_width(&png(1600, 1200), 800).unwrap();
        assert_eq!((resized.width, resized.height), (800, 600));
        assert_eq!(resized.format, ImageFormat::Png);

        let decoded = image::load_from_memory(&resized.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }

    #[test]
    fn test_narrow_image_not_upscaled() {
        let resized = resize_to_width(&png(320, 200), 800).unwrap();
        assert_eq!((resized.width, resized.height), (320, 200));
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(matches!(
            resize_to_width(b"not an image at all", 800),
            Err(Error::Image(_))
        ));
    }
}
