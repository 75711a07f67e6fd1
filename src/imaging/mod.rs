//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **HEIC/HEIF → JPEG** | decode + `JpegEncoder` at quality 80 |
//! | **Resize → JPEG** | Lanczos3 + `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Normalize**: HEIC/HEIF detection and conversion
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod normalize;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_bounded_dimensions, scale_factor};
pub use normalize::{Normalizer, is_heif, normalize};
pub use operations::{
    CompressError, compress, compress_all, compress_blocking, get_dimensions, prepare_group,
};
pub use params::{Bounds, CompressSettings, Quality, ResizeParams, TranscodeParams};
pub use rust_backend::RustBackend;
