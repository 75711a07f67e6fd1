//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) and
//! [`normalize`](super::normalize) modules and the [`backend`](super::backend)
//! that does the pixel work, so a mock backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 60). Clamped on construction.
//! - [`Bounds`]: Bounding box an output image must fit inside.
//! - [`CompressSettings`]: Bounds + quality for the resize/compress stage.
//! - [`ResizeParams`]: Source bytes, exact target dimensions, quality.
//! - [`TranscodeParams`]: Source bytes and quality for a same-size re-encode.

use crate::config::ImagesConfig;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(60)
    }
}

/// Maximum output width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl Bounds {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::square(800)
    }
}

/// Everything the compressor needs besides the image itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressSettings {
    pub bounds: Bounds,
    pub quality: Quality,
}

impl CompressSettings {
    pub fn from_config(images: &ImagesConfig) -> Self {
        Self {
            bounds: Bounds::new(images.max_width, images.max_height),
            quality: Quality::new(images.quality),
        }
    }
}

/// Parameters for a resize + re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams<'a> {
    pub source: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Parameters for a format conversion that keeps the pixel dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeParams<'a> {
    pub source: &'a [u8],
    pub quality: Quality,
}
