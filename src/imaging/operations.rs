//! High-level image operations.
//!
//! These functions combine calculations with backend execution: identify the
//! source, compute bounded dimensions, then resize and re-encode.
//!
//! [`compress_blocking`] is the synchronous core. [`compress`] runs it on
//! tokio's blocking pool and [`prepare_group`] awaits a whole group of those
//! at once. [`compress_all`] fans a batch out over rayon for callers without
//! a runtime.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_bounded_dimensions;
use super::normalize::{Normalizer, normalize};
use super::params::{CompressSettings, ResizeParams};
use crate::types::{NormalizedImage, OutputEncoding, SourceFile, with_extension};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompressError {
    #[error("{name}: cannot decode image: {reason}")]
    Decode { name: String, reason: String },
    #[error("{name}: cannot encode image: {reason}")]
    Encode { name: String, reason: String },
}

impl CompressError {
    fn from_backend(name: &str, err: BackendError) -> Self {
        match err {
            BackendError::Decode(reason) => CompressError::Decode {
                name: name.to_string(),
                reason,
            },
            BackendError::Encode(reason) => CompressError::Encode {
                name: name.to_string(),
                reason,
            },
        }
    }

    /// Short reason without the filename, for per-item reporting.
    pub fn reason(&self) -> &str {
        match self {
            CompressError::Decode { reason, .. } | CompressError::Encode { reason, .. } => reason,
        }
    }
}

/// Get image dimensions using the backend.
pub fn get_dimensions(
    backend: &impl ImageBackend,
    source: &[u8],
) -> Result<(u32, u32), BackendError> {
    let dims = backend.identify(source)?;
    Ok((dims.width, dims.height))
}

/// Plan a resize without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_resize<'a>(
    source: &'a [u8],
    original_dims: (u32, u32),
    settings: &CompressSettings,
) -> ResizeParams<'a> {
    let (width, height) = calculate_bounded_dimensions(original_dims, settings.bounds);
    ResizeParams {
        source,
        width,
        height,
        quality: settings.quality,
    }
}

/// Bound and re-encode one file as JPEG.
pub fn compress_blocking(
    backend: &impl ImageBackend,
    file: &SourceFile,
    settings: &CompressSettings,
) -> Result<NormalizedImage, CompressError> {
    let dims = get_dimensions(backend, &file.bytes)
        .map_err(|e| CompressError::from_backend(&file.name, e))?;
    let params = plan_resize(&file.bytes, dims, settings);
    let bytes = backend
        .resize(&params)
        .map_err(|e| CompressError::from_backend(&file.name, e))?;
    if bytes.is_empty() {
        return Err(CompressError::Encode {
            name: file.name.clone(),
            reason: "encoder produced no data".into(),
        });
    }

    let encoding = OutputEncoding::Jpeg;
    tracing::debug!(
        name = %file.name,
        from = ?dims,
        to = ?(params.width, params.height),
        original_size = file.len(),
        size = bytes.len(),
        "compressed"
    );
    Ok(NormalizedImage {
        name: with_extension(&file.name, encoding.extension()),
        bytes,
        width: params.width,
        height: params.height,
        encoding,
        original_size: file.len(),
    })
}

/// [`compress_blocking`] on tokio's blocking thread pool.
pub async fn compress<B>(
    backend: Arc<B>,
    file: SourceFile,
    settings: CompressSettings,
) -> Result<NormalizedImage, CompressError>
where
    B: ImageBackend + Send + 'static,
{
    let name = file.name.clone();
    tokio::task::spawn_blocking(move || compress_blocking(backend.as_ref(), &file, &settings))
        .await
        .unwrap_or_else(|e| Err(worker_failed(name, e)))
}

/// Compress a batch in parallel. Results are in input order.
pub fn compress_all(
    backend: &impl ImageBackend,
    files: &[SourceFile],
    settings: &CompressSettings,
) -> Vec<Result<NormalizedImage, CompressError>> {
    files
        .par_iter()
        .map(|file| compress_blocking(backend, file, settings))
        .collect()
}

fn worker_failed(name: String, reason: impl std::fmt::Display) -> CompressError {
    CompressError::Encode {
        name,
        reason: format!("worker failed: {reason}"),
    }
}

/// Normalize then [`compress`] one file. `original_size` is the size before
/// normalization.
async fn prepare<B>(
    backend: Arc<B>,
    normalizer: Normalizer,
    file: SourceFile,
    settings: CompressSettings,
) -> Result<NormalizedImage, CompressError>
where
    B: ImageBackend + Send + 'static,
{
    let original_size = file.len();
    let name = file.name.clone();
    let normalizing = Arc::clone(&backend);
    let normalized = tokio::task::spawn_blocking(move || {
        normalize(normalizing.as_ref(), &normalizer, file)
    })
    .await
    .map_err(|e| worker_failed(name, e))?;
    let mut image = compress(backend, normalized, settings).await?;
    image.original_size = original_size;
    Ok(image)
}

/// Normalize and compress every file of a group concurrently and wait for
/// all of them. Results are in input order, one per file.
pub async fn prepare_group<B>(
    backend: Arc<B>,
    normalizer: Normalizer,
    files: Vec<SourceFile>,
    settings: CompressSettings,
) -> Vec<Result<NormalizedImage, CompressError>>
where
    B: ImageBackend + Send + 'static,
{
    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let mut tasks = JoinSet::new();
    for (index, file) in files.into_iter().enumerate() {
        let backend = Arc::clone(&backend);
        tasks.spawn(async move { (index, prepare(backend, normalizer, file, settings).await) });
    }

    let mut slots: Vec<Option<Result<NormalizedImage, CompressError>>> =
        names.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => tracing::warn!(error = %e, "compression task failed"),
        }
    }
    slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| slot.unwrap_or_else(|| Err(worker_failed(name, "task aborted"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{Bounds, Quality};

    fn mock_file(name: &str, w: u32, h: u32) -> SourceFile {
        SourceFile::new(name, Some("image/jpeg".into()), MockBackend::image(w, h))
    }

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::new();
        let dims = get_dimensions(&backend, &MockBackend::image(1920, 1080)).unwrap();
        assert_eq!(dims, (1920, 1080));
    }

    #[test]
    fn plan_resize_bounds_dimensions() {
        let source = MockBackend::image(4000, 2000);
        let params = plan_resize(&source, (4000, 2000), &CompressSettings::default());
        assert_eq!((params.width, params.height), (800, 400));
        assert_eq!(params.quality.value(), 60);
    }

    #[test]
    fn compress_downscales_large_image() {
        let backend = MockBackend::new();
        let img = compress_blocking(
            &backend,
            &mock_file("coat.png", 4000, 2000),
            &CompressSettings::default(),
        )
        .unwrap();

        assert_eq!((img.width, img.height), (800, 400));
        assert_eq!(img.name, "coat.jpg");
        assert_eq!(img.encoding, OutputEncoding::Jpeg);
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Identify,
                RecordedOp::Resize {
                    width: 800,
                    height: 400,
                    quality: 60
                }
            ]
        );
    }

    #[test]
    fn compress_keeps_small_image_size() {
        let backend = MockBackend::new();
        let img = compress_blocking(
            &backend,
            &mock_file("tee.jpg", 640, 480),
            &CompressSettings::default(),
        )
        .unwrap();
        assert_eq!((img.width, img.height), (640, 480));
    }

    #[test]
    fn compress_uses_configured_quality_and_bounds() {
        let backend = MockBackend::new();
        let settings = CompressSettings {
            bounds: Bounds::new(400, 1000),
            quality: Quality::new(90),
        };
        let img = compress_blocking(&backend, &mock_file("a.jpg", 800, 800), &settings).unwrap();
        assert_eq!((img.width, img.height), (400, 400));
        assert_eq!(&img.bytes, b"JPEG 400x400 q90");
    }

    #[test]
    fn compress_decode_error() {
        let backend = MockBackend::new();
        let file = SourceFile::new("broken.jpg", None, b"garbage".to_vec());
        let err = compress_blocking(&backend, &file, &CompressSettings::default()).unwrap_err();
        assert!(matches!(err, CompressError::Decode { ref name, .. } if name == "broken.jpg"));
    }

    #[test]
    fn compress_encode_error() {
        let backend = MockBackend::failing_encode();
        let err = compress_blocking(
            &backend,
            &mock_file("a.jpg", 10, 10),
            &CompressSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompressError::Encode { .. }));
        assert_eq!(err.reason(), "mock encoder disabled");
    }

    #[test]
    fn compress_all_keeps_input_order() {
        let backend = MockBackend::new();
        let files = vec![
            mock_file("a.jpg", 1600, 800),
            SourceFile::new("b.jpg", None, b"nope".to_vec()),
            mock_file("c.jpg", 100, 100),
        ];
        let results = compress_all(&backend, &files, &CompressSettings::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "a.jpg");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().width, 100);
    }

    #[tokio::test]
    async fn prepare_group_converts_heic_then_compresses() {
        let backend = Arc::new(MockBackend::new());
        let file = SourceFile::new("IMG_7.HEIC", None, MockBackend::image(4032, 3024));
        let original = file.len();
        let results = prepare_group(
            backend.clone(),
            Normalizer::default(),
            vec![file],
            CompressSettings::default(),
        )
        .await;
        let img = results[0].as_ref().unwrap();
        assert_eq!(img.name, "IMG_7.jpg");
        assert_eq!((img.width, img.height), (800, 600));
        assert_eq!(img.original_size, original);
        assert_eq!(
            backend.get_operations()[0],
            RecordedOp::Transcode { quality: 80 }
        );
    }

    #[tokio::test]
    async fn prepare_group_keeps_input_order() {
        let files = vec![
            mock_file("a.jpg", 1600, 800),
            SourceFile::new("b.jpg", None, b"nope".to_vec()),
            mock_file("c.png", 100, 100),
        ];
        let results = prepare_group(
            Arc::new(MockBackend::new()),
            Normalizer::default(),
            files,
            CompressSettings::default(),
        )
        .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "a.jpg");
        assert!(matches!(
            results[1],
            Err(CompressError::Decode { ref name, .. }) if name == "b.jpg"
        ));
        assert_eq!(results[2].as_ref().unwrap().name, "c.jpg");
    }

    #[tokio::test]
    async fn compress_async_runs_on_blocking_pool() {
        let backend = Arc::new(MockBackend::new());
        let img = compress(
            backend.clone(),
            mock_file("a.webp", 2000, 1000),
            CompressSettings::default(),
        )
        .await
        .unwrap();
        assert_eq!((img.width, img.height), (800, 400));
        assert_eq!(backend.get_operations().len(), 2);
    }
}
