//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the intake pipeline
//! needs: identify, resize and transcode. All of them work on in-memory bytes;
//! nothing touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{ResizeParams, TranscodeParams};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` because compression fans out over rayon's thread pool with a shared
/// backend reference.
pub trait ImageBackend: Sync {
    /// Get image dimensions. The format is sniffed from the bytes.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, resize to exactly `width`x`height`, encode as JPEG.
    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError>;

    /// Decode and re-encode as JPEG at the same dimensions.
    fn transcode(&self, params: &TranscodeParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::sync::Mutex;

    /// Mock backend that records operations without touching pixels.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Mock "images" are the bytes produced by [`MockBackend::image`]:
    /// `MOCK <w>x<h>`. Anything else fails to decode. Resize and transcode
    /// output `JPEG <w>x<h> q<quality>`, which the mock can identify again.
    #[derive(Default)]
    pub struct MockBackend {
        pub operations: Mutex<Vec<RecordedOp>>,
        /// When set, every encode fails.
        pub fail_encode: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify,
        Resize {
            width: u32,
            height: u32,
            quality: u32,
        },
        Transcode {
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_encode() -> Self {
            Self {
                fail_encode: true,
                ..Self::default()
            }
        }

        /// Bytes the mock decodes as a `width`x`height` image.
        pub fn image(width: u32, height: u32) -> Vec<u8> {
            format!("MOCK {width}x{height}").into_bytes()
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn parse(source: &[u8]) -> Result<Dimensions, BackendError> {
            let text = std::str::from_utf8(source)
                .map_err(|_| BackendError::Decode("not a mock image".into()))?;
            let dims = text
                .strip_prefix("MOCK ")
                .or_else(|| text.strip_prefix("JPEG "))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|wh| wh.split_once('x'))
                .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)));
            match dims {
                Some((width, height)) => Ok(Dimensions { width, height }),
                None => Err(BackendError::Decode("not a mock image".into())),
            }
        }

        fn encode(&self, width: u32, height: u32, quality: Quality) -> Result<Vec<u8>, BackendError> {
            if self.fail_encode {
                return Err(BackendError::Encode("mock encoder disabled".into()));
            }
            Ok(format!("JPEG {width}x{height} q{}", quality.value()).into_bytes())
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Identify);
            Self::parse(source)
        }

        fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            Self::parse(params.source)?;
            self.encode(params.width, params.height, params.quality)
        }

        fn transcode(&self, params: &TranscodeParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Transcode {
                quality: params.quality.value(),
            });
            let dims = Self::parse(params.source)?;
            self.encode(dims.width, dims.height, params.quality)
        }
    }

    #[test]
    fn mock_identifies_its_own_images() {
        let backend = MockBackend::new();
        let dims = backend.identify(&MockBackend::image(800, 600)).unwrap();
        assert_eq!(dims, Dimensions { width: 800, height: 600 });
        assert_eq!(backend.get_operations(), vec![RecordedOp::Identify]);
    }

    #[test]
    fn mock_rejects_garbage() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.identify(b"\xff\x00garbage"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_resize() {
        let backend = MockBackend::new();
        let source = MockBackend::image(1600, 1200);
        let out = backend
            .resize(&ResizeParams {
                source: &source,
                width: 800,
                height: 600,
                quality: Quality::new(60),
            })
            .unwrap();
        assert_eq!(out, b"JPEG 800x600 q60");
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Resize {
                width: 800,
                height: 600,
                quality: 60
            }]
        );
    }

    #[test]
    fn mock_transcode_keeps_dimensions() {
        let backend = MockBackend::new();
        let source = MockBackend::image(4032, 3024);
        let out = backend
            .transcode(&TranscodeParams {
                source: &source,
                quality: Quality::new(80),
            })
            .unwrap();
        assert_eq!(
            backend.identify(&out).unwrap(),
            Dimensions { width: 4032, height: 3024 }
        );
    }

    #[test]
    fn mock_failing_encode() {
        let backend = MockBackend::failing_encode();
        let source = MockBackend::image(10, 10);
        let result = backend.resize(&ResizeParams {
            source: &source,
            width: 10,
            height: 10,
            quality: Quality::default(),
        });
        assert!(matches!(result, Err(BackendError::Encode(_))));
    }
}
