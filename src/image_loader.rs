//! # Image Loading and Decoding
//!
//! Prepares logo and shape images for PDF embedding. JPEG images within the
//! size bound pass through without re-encoding (DCTDecode). Everything else
//! (PNG, WebP, GIF, oversized JPEG) is decoded, scaled down to at most
//! [`MAX_IMAGE_DIMENSION`] pixels on the long side, and split into RGB
//! pixels plus an optional alpha channel for SMask transparency.

use std::io::Cursor;

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use crate::error::{DocformError, Result};
use crate::storage::ImageStore;

/// Longest side, in pixels, of any image embedded in a document.
pub const MAX_IMAGE_DIMENSION: u32 = 1200;

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

impl LoadedImage {
    /// `height / width`, the ratio logo and image frames are sized with.
    pub fn aspect_ratio(&self) -> f64 {
        if self.width_px == 0 {
            1.0
        } else {
            self.height_px as f64 / self.width_px as f64
        }
    }
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Load the image a settings value or shape points at.
///
/// `src` is either an inline `data:image/...;base64,...` URI or a name
/// relative to `store`. Names go through [`ImageStore::read`], so absolute
/// paths and `..` are rejected rather than read from the host.
pub fn load_image_source(src: &str, store: &ImageStore) -> Result<LoadedImage> {
    let raw_bytes = match src.strip_prefix("data:image/") {
        Some(rest) => {
            let comma_pos = rest
                .find(',')
                .ok_or_else(|| DocformError::Image("Invalid data URI: missing comma".to_string()))?;
            base64_decode(&rest[comma_pos + 1..])?
        }
        None => store.read(src)?,
    };
    decode_image_bytes(&raw_bytes, MAX_IMAGE_DIMENSION)
}

fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| DocformError::Image(format!("Base64 decode error: {}", e)))
}

/// Detect the format from magic bytes and decode, bounding the long side
/// to `max_dimension` pixels.
pub fn decode_image_bytes(data: &[u8], max_dimension: u32) -> Result<LoadedImage> {
    if data.len() < 4 {
        return Err(DocformError::Image("Image data too short".to_string()));
    }

    if is_jpeg(data) {
        let (width, height) = image_dimensions(data)?;
        if width.max(height) <= max_dimension {
            return Ok(LoadedImage {
                pixel_data: ImagePixelData::Jpeg {
                    data: data.to_vec(),
                    color_space: detect_jpeg_color_space(data),
                },
                width_px: width,
                height_px: height,
            });
        }
        decode_raster(data, max_dimension)
    } else if is_png(data) || is_webp(data) || is_gif(data) {
        decode_raster(data, max_dimension)
    } else {
        Err(DocformError::Image(
            "Unsupported image format (expected JPEG, PNG, WebP or GIF)".to_string(),
        ))
    }
}

/// Pixel dimensions without decoding the pixels.
pub fn image_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| DocformError::Image(format!("Format detection error: {}", e)))?
        .into_dimensions()
        .map_err(|e| DocformError::Image(format!("Failed to read image dimensions: {}", e)))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

fn is_gif(data: &[u8]) -> bool {
    data.starts_with(b"GIF8")
}

/// Scan JPEG markers to find the SOF (Start of Frame) segment and read
/// the number of components to determine color space.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // skip SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            // length(2) + precision(1) + height(2) + width(2) + components(1)
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

fn decode_raster(data: &[u8], max_dimension: u32) -> Result<LoadedImage> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| DocformError::Image(format!("Format detection error: {}", e)))?
        .decode()
        .map_err(|e| DocformError::Image(format!("Failed to decode image: {}", e)))?;

    let img = bound_dimensions(img, max_dimension);
    Ok(split_alpha(&img))
}

/// Scale down, keeping the aspect ratio, until the long side fits.
fn bound_dimensions(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let max_dimension = max_dimension.max(1);
    if img.width().max(img.height()) <= max_dimension {
        return img;
    }
    debug!(
        "Resizing {}x{} image to fit {}px",
        img.width(),
        img.height(),
        max_dimension
    );
    img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

fn split_alpha(img: &DynamicImage) -> LoadedImage {
    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgb8)
            .unwrap();
        buf
    }

    #[test]
    fn test_magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_webp(b"RIFF\0\0\0\0WEBPVP8 "));
        assert!(is_gif(b"GIF89a"));
    }

    #[test]
    fn test_rejects_short_and_unknown() {
        assert!(decode_image_bytes(&[0x00, 0x01], MAX_IMAGE_DIMENSION).is_err());
        assert!(decode_image_bytes(&[0x00, 0x01, 0x02, 0x03, 0x04], MAX_IMAGE_DIMENSION).is_err());
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).unwrap();
        assert!(load_image_source("data:image/png;base64", &store).is_err());
    }

    #[test]
    fn test_png_alpha_split() {
        let loaded = decode_image_bytes(&png_bytes(1, 1, [255, 0, 0, 255]), MAX_IMAGE_DIMENSION).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none());
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }

        let loaded = decode_image_bytes(&png_bytes(1, 1, [255, 0, 0, 128]), MAX_IMAGE_DIMENSION).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => assert_eq!(alpha.as_deref(), Some(&[128u8][..])),
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_jpeg_passthrough_within_bounds() {
        let loaded = decode_image_bytes(&jpeg_bytes(2, 2), MAX_IMAGE_DIMENSION).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn test_oversized_images_are_bounded() {
        let loaded = decode_image_bytes(&png_bytes(40, 20, [0, 0, 0, 255]), 10).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (10, 5));
        assert_eq!(loaded.aspect_ratio(), 0.5);

        let loaded = decode_image_bytes(&jpeg_bytes(16, 8), 8).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (8, 4));
        assert!(matches!(loaded.pixel_data, ImagePixelData::Decoded { .. }));
    }

    #[test]
    fn test_base64_data_uri() {
        use base64::Engine;
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).unwrap();
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes(1, 1, [0, 255, 0, 255]));
        let loaded = load_image_source(&format!("data:image/png;base64,{}", b64), &store).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        assert!(load_image_source(&b64, &store).is_err());
    }

    #[test]
    fn test_sources_resolve_inside_the_store() {
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.png");
        std::fs::write(&secret, png_bytes(3, 2, [0, 0, 255, 255])).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path().join("images")).unwrap();
        let absolute = secret.to_string_lossy().to_string();
        assert!(matches!(
            load_image_source(&absolute, &store),
            Err(DocformError::Storage(_))
        ));
        assert!(load_image_source("../secret.png", &store).is_err());

        store.save_image("stamp.png", &png_bytes(3, 2, [0, 0, 255, 255])).unwrap();
        let loaded = load_image_source("stamp.png", &store).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (3, 2));
    }
}
