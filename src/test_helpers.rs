//! Shared test utilities for the wardrobe-intake test suite.
//!
//! Provides synthetic images, a scriptable [`MockBatchApi`] and a
//! [`RecordingSink`] so submission logic can be exercised without a network
//! or real photos.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let api = MockBatchApi::accepting().failing_transport(WarmthTag::Thick);
//! let sink = RecordingSink::new();
//! let submitter = Submitter::new(Arc::new(MockBackend::new()), api.clone(), "u")
//!     .with_sink(sink.clone());
//! // ...
//! assert_eq!(api.calls()[0].warmth, WarmthTag::Thin);
//! ```

use async_trait::async_trait;
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::{ApiError, BatchApi, BatchRequest, BatchResponse, ServerItem};
use crate::imaging::backend::tests::MockBackend;
use crate::notify::{NotificationSink, SubmitEvent};
use crate::types::{SourceFile, WarmthTag};

// =========================================================================
// Synthetic images
// =========================================================================

/// A gradient JPEG of the given size.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// A half-transparent PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 128])
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// A gradient HEIC built with libheif, or `None` when no HEVC encoder is
/// available to libheif.
#[cfg(feature = "heif")]
pub fn heic_bytes(width: u32, height: u32) -> Option<Vec<u8>> {
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };

    let lib = LibHeif::new();
    let mut encoder = lib.encoder_for_format(CompressionFormat::Hevc).ok()?;
    encoder.set_quality(EncoderQuality::Lossy(90)).ok()?;

    let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).ok()?;
    image
        .create_plane(Channel::Interleaved, width, height, 8)
        .ok()?;
    {
        let planes = image.planes_mut();
        let plane = planes.interleaved?;
        let stride = plane.stride;
        for y in 0..height as usize {
            for x in 0..width as usize {
                let i = y * stride + x * 3;
                plane.data[i] = (x % 256) as u8;
                plane.data[i + 1] = (y % 256) as u8;
                plane.data[i + 2] = 128;
            }
        }
    }

    let mut context = HeifContext::new().ok()?;
    context.encode_image(&image, &mut encoder, None).ok()?;
    context.write_to_bytes().ok()
}

/// A source file the [`MockBackend`] decodes as `width`x`height`.
pub fn mock_source(name: &str, width: u32, height: u32) -> SourceFile {
    SourceFile::new(
        name,
        Some("image/jpeg".to_string()),
        MockBackend::image(width, height),
    )
}

// =========================================================================
// Batch API mock
// =========================================================================

/// What the mock saw in one `upload_batch` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub warmth: WarmthTag,
    pub user_id: String,
    pub names: Vec<String>,
    pub dimensions: Vec<(u32, u32)>,
}

#[derive(Debug, Clone)]
enum Script {
    Transport,
    Reject(String),
    /// Accept the batch but fail the named files.
    Partial(Vec<String>),
}

/// [`BatchApi`] that accepts everything unless told otherwise per tag.
#[derive(Debug, Clone, Default)]
pub struct MockBatchApi {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    scripts: HashMap<WarmthTag, Script>,
}

impl MockBatchApi {
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Calls for `tag` fail as if the backend answered 503.
    pub fn failing_transport(mut self, tag: WarmthTag) -> Self {
        self.scripts.insert(tag, Script::Transport);
        self
    }

    /// Calls for `tag` get `success: false` with `message`.
    pub fn rejecting(mut self, tag: WarmthTag, message: &str) -> Self {
        self.scripts.insert(tag, Script::Reject(message.to_string()));
        self
    }

    /// Calls for `tag` succeed overall, but the files in `names` come back
    /// in `fail_details` as `"{name}: db error"`.
    pub fn partially_failing(mut self, tag: WarmthTag, names: &[&str]) -> Self {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.scripts.insert(tag, Script::Partial(names));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchApi for MockBatchApi {
    async fn upload_batch(&self, request: BatchRequest) -> Result<BatchResponse, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            warmth: request.warmth,
            user_id: request.user_id.clone(),
            names: request.images.iter().map(|i| i.name.clone()).collect(),
            dimensions: request.images.iter().map(|i| (i.width, i.height)).collect(),
        });

        match self.scripts.get(&request.warmth) {
            Some(Script::Transport) => Err(ApiError::Status {
                status: 503,
                body: "service unavailable".into(),
            }),
            Some(Script::Reject(message)) => Ok(BatchResponse {
                success: false,
                message: Some(message.clone()),
                ..BatchResponse::default()
            }),
            Some(Script::Partial(failing)) => {
                let (failed, stored): (Vec<_>, Vec<_>) = request
                    .images
                    .iter()
                    .partition(|i| failing.contains(&i.name));
                Ok(BatchResponse {
                    success: true,
                    success_count: stored.len() as u32,
                    fail_count: failed.len() as u32,
                    items: stored
                        .iter()
                        .map(|i| ServerItem {
                            name: i.name.clone(),
                            ..ServerItem::default()
                        })
                        .collect(),
                    fail_details: Some(
                        failed
                            .iter()
                            .map(|i| format!("{}: db error", i.name))
                            .collect(),
                    ),
                    ..BatchResponse::default()
                })
            }
            None => Ok(BatchResponse {
                success: true,
                success_count: request.images.len() as u32,
                fail_count: 0,
                items: request
                    .images
                    .iter()
                    .map(|i| ServerItem {
                        name: i.name.clone(),
                        category: "上衣".into(),
                        ..ServerItem::default()
                    })
                    .collect(),
                ..BatchResponse::default()
            }),
        }
    }
}

// =========================================================================
// Notification sink
// =========================================================================

/// Sink that keeps every event for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SubmitEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SubmitEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: SubmitEvent) {
        self.events.lock().unwrap().push(event);
    }
}
