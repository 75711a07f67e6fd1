//! HEIC/HEIF normalization.
//!
//! Phones hand over HEIC containers that most downstream tooling cannot read.
//! Before compression, files detected as HEIC/HEIF are transcoded to JPEG at a
//! fixed quality. Detection uses the filename suffix or the declared type,
//! since either one may be missing.
//!
//! Decoding HEIC needs the `heif` feature on [`RustBackend`](super::RustBackend).
//! Conversion failure is not an error: the original is returned untouched and a
//! warning is logged. If the compressor cannot decode it either, that item
//! fails on its own.

use super::backend::ImageBackend;
use super::params::{Quality, TranscodeParams};
use crate::config::NormalizeConfig;
use crate::types::{OutputEncoding, SourceFile, with_extension};

const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];
const HEIF_MEDIA_TYPES: &[&str] = &["image/heic", "image/heif"];

/// Normalizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    pub convert_heif: bool,
    pub quality: Quality,
}

impl Normalizer {
    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self {
            convert_heif: config.convert_heif,
            quality: Quality::new(config.quality),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&NormalizeConfig::default())
    }
}

/// True when `file` looks like a HEIC/HEIF container.
pub fn is_heif(file: &SourceFile) -> bool {
    let by_ext = file
        .extension()
        .is_some_and(|ext| HEIF_EXTENSIONS.contains(&ext.as_str()));
    let by_type = file.media_type.as_deref().is_some_and(|t| {
        let t = t.trim().to_ascii_lowercase();
        HEIF_MEDIA_TYPES.contains(&t.as_str())
    });
    by_ext || by_type
}

/// Convert HEIC/HEIF to JPEG; every other file passes through unchanged.
pub fn normalize(
    backend: &impl ImageBackend,
    normalizer: &Normalizer,
    file: SourceFile,
) -> SourceFile {
    if !is_heif(&file) {
        return file;
    }
    if !normalizer.convert_heif {
        tracing::warn!(name = %file.name, "HEIC/HEIF conversion disabled, uploading original");
        return file;
    }

    let result = backend.transcode(&TranscodeParams {
        source: &file.bytes,
        quality: normalizer.quality,
    });
    match result {
        Ok(bytes) if !bytes.is_empty() => {
            let encoding = OutputEncoding::Jpeg;
            let name = with_extension(&file.name, encoding.extension());
            tracing::debug!(
                from = %file.name,
                to = %name,
                size = bytes.len(),
                "converted HEIC/HEIF"
            );
            SourceFile::new(name, Some(encoding.mime_type().to_string()), bytes)
        }
        Ok(_) => {
            tracing::warn!(name = %file.name, "HEIC/HEIF conversion produced no data, using original");
            file
        }
        Err(e) => {
            tracing::warn!(name = %file.name, error = %e, "HEIC/HEIF conversion failed, using original");
            file
        }
    }
}
