//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format sniffing | `image::ImageReader::with_guessed_format` |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Decode (HEIC/HEIF, `heif` feature) | `libheif_rs::LibHeif::decode` to interleaved RGB |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |
//!
//! HEIC/HEIF has no pure Rust decoder. With the `heif` feature the backend
//! links libheif and decodes ISO-BMFF containers with a HEIF brand. Without
//! it a HEIC container fails to decode, which the normalizer treats as "pass
//! the original through".

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ResizeParams, TranscodeParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(source: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("Failed to sniff format: {e}")))
}

/// Decode an image from memory, sniffing the format from its content.
fn load_image(source: &[u8]) -> Result<DynamicImage, BackendError> {
    let reader = reader(source)?;
    if reader.format().is_none() {
        #[cfg(feature = "heif")]
        {
            if heif::is_container(source) {
                return heif::decode(source);
            }
        }
        return Err(BackendError::Decode("Unrecognized image format".into()));
    }
    reader
        .decode()
        .map_err(|e| BackendError::Decode(format!("Failed to decode: {e}")))
}

/// Encode as baseline JPEG. Alpha is dropped (JPEG has none).
fn encode_jpeg(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100) as u8)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let reader = reader(source)?;
        if reader.format().is_none() {
            #[cfg(feature = "heif")]
            {
                if heif::is_container(source) {
                    let (width, height) = heif::dimensions(source)?;
                    return Ok(Dimensions { width, height });
                }
            }
            return Err(BackendError::Decode("Unrecognized image format".into()));
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(params.source)?;
        let resized = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode_jpeg(&resized, params.quality.value())
    }

    fn transcode(&self, params: &TranscodeParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(params.source)?;
        encode_jpeg(&img, params.quality.value())
    }
}

/// HEIC/HEIF through libheif.
#[cfg(feature = "heif")]
mod heif {
    use super::BackendError;
    use image::{DynamicImage, RgbImage};
    use libheif_rs::{ColorSpace, HeifContext, HeifError, LibHeif, RgbChroma};

    const BRANDS: &[&[u8]] = &[
        b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1",
    ];

    fn decode_error(e: HeifError) -> BackendError {
        BackendError::Decode(format!("HEIF: {e}"))
    }

    /// ISO-BMFF `ftyp` box whose major brand is a HEIF one.
    pub(super) fn is_container(source: &[u8]) -> bool {
        source.len() >= 12
            && &source[4..8] == b"ftyp"
            && BRANDS.iter().any(|brand| *brand == &source[8..12])
    }

    pub(super) fn dimensions(source: &[u8]) -> Result<(u32, u32), BackendError> {
        let context = HeifContext::read_from_bytes(source).map_err(decode_error)?;
        let handle = context.primary_image_handle().map_err(decode_error)?;
        Ok((handle.width(), handle.height()))
    }

    /// Decode the primary image to 8-bit RGB.
    pub(super) fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
        let context = HeifContext::read_from_bytes(source).map_err(decode_error)?;
        let handle = context.primary_image_handle().map_err(decode_error)?;
        let image = LibHeif::new()
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(decode_error)?;

        let planes = image.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| BackendError::Decode("HEIF: no interleaved RGB plane".into()))?;
        let (width, height) = (plane.width, plane.height);
        let row = width as usize * 3;

        // Rows are padded to `stride`; RgbImage wants them packed.
        let mut pixels = Vec::with_capacity(row * height as usize);
        for line in plane.data.chunks(plane.stride).take(height as usize) {
            let line = line
                .get(..row)
                .ok_or_else(|| BackendError::Decode("HEIF: short pixel row".into()))?;
            pixels.extend_from_slice(line);
        }
        RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| BackendError::Decode("HEIF: truncated pixel data".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::test_helpers::{png_bytes, synthetic_jpeg};

    #[test]
    fn identify_synthetic_jpeg() {
        let backend = RustBackend::new();
        let dims = backend.identify(&synthetic_jpeg(200, 150)).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_png() {
        let backend = RustBackend::new();
        let dims = backend.identify(&png_bytes(64, 32)).unwrap();
        assert_eq!((dims.width, dims.height), (64, 32));
    }

    #[test]
    fn identify_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_synthetic_to_jpeg() {
        let backend = RustBackend::new();
        let source = synthetic_jpeg(400, 300);
        let out = backend
            .resize(&ResizeParams {
                source: &source,
                width: 200,
                height: 150,
                quality: Quality::new(60),
            })
            .unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&out).unwrap().width(), 200);
    }

    #[test]
    fn resize_png_with_alpha_outputs_jpeg() {
        let backend = RustBackend::new();
        let source = png_bytes(50, 40);
        let out = backend
            .resize(&ResizeParams {
                source: &source,
                width: 50,
                height: 40,
                quality: Quality::new(60),
            })
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 40));
        assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn resize_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.resize(&ResizeParams {
            source: b"\x00\x01\x02",
            width: 10,
            height: 10,
            quality: Quality::default(),
        });
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn transcode_png_to_jpeg_same_size() {
        let backend = RustBackend::new();
        let out = backend
            .transcode(&TranscodeParams {
                source: &png_bytes(30, 20),
                quality: Quality::new(80),
            })
            .unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Jpeg);
        let dims = backend.identify(&out).unwrap();
        assert_eq!((dims.width, dims.height), (30, 20));
    }

    #[test]
    fn transcode_heic_container_fails() {
        // ISO-BMFF `ftypheic` header with no decodable payload.
        let mut heic = vec![0x00, 0x00, 0x00, 0x18];
        heic.extend_from_slice(b"ftypheic\x00\x00\x00\x00mif1heic");
        let backend = RustBackend::new();
        let result = backend.transcode(&TranscodeParams {
            source: &heic,
            quality: Quality::new(80),
        });
        assert!(result.is_err());
    }

    #[cfg(feature = "heif")]
    #[test]
    fn transcode_real_heic_to_jpeg() {
        // Needs an HEVC encoder plugin in libheif to build the fixture.
        let Some(heic) = crate::test_helpers::heic_bytes(64, 48) else {
            return;
        };
        assert!(heif::is_container(&heic));
        let backend = RustBackend::new();
        assert_eq!(backend.identify(&heic).unwrap(), Dimensions { width: 64, height: 48 });

        let out = backend
            .transcode(&TranscodeParams {
                source: &heic,
                quality: Quality::new(80),
            })
            .unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Jpeg);
        let dims = backend.identify(&out).unwrap();
        assert_eq!((dims.width, dims.height), (64, 48));
    }

    #[cfg(feature = "heif")]
    #[test]
    fn heif_brand_sniffing() {
        let mut heic = vec![0x00, 0x00, 0x00, 0x18];
        heic.extend_from_slice(b"ftypheic\x00\x00\x00\x00mif1heic");
        assert!(heif::is_container(&heic));
        assert!(!heif::is_container(&synthetic_jpeg(8, 8)));
        assert!(!heif::is_container(b"\x00\x00\x00\x18ftypavif"));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let backend = RustBackend::new();
        let source = synthetic_jpeg(320, 240);
        let encode = |q| {
            backend
                .resize(&ResizeParams {
                    source: &source,
                    width: 320,
                    height: 240,
                    quality: Quality::new(q),
                })
                .unwrap()
        };
        assert!(encode(20).len() < encode(95).len());
    }
}
