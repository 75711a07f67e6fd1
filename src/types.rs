//! Shared domain types used by every stage of the intake pipeline.
//!
//! [`WarmthTag`] is the per-item annotation a user assigns while an item sits
//! in the staging queue, [`SourceFile`] is a validated original, and
//! [`NormalizedImage`] is the canonical encoded form sent to the backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How warm a garment is. Closed set; drives grouping at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmthTag {
    Thin,
    Moderate,
    Thick,
}

impl WarmthTag {
    /// Fixed processing order for batch groups.
    pub const ALL: [WarmthTag; 3] = [WarmthTag::Thin, WarmthTag::Moderate, WarmthTag::Thick];

    /// Lowercase label used in config, CLI flags and terminal output.
    pub fn label(self) -> &'static str {
        match self {
            WarmthTag::Thin => "thin",
            WarmthTag::Moderate => "moderate",
            WarmthTag::Thick => "thick",
        }
    }

    /// Value the backend expects in the `warmth` form field.
    pub fn wire_value(self) -> &'static str {
        match self {
            WarmthTag::Thin => "薄",
            WarmthTag::Moderate => "適中",
            WarmthTag::Thick => "厚",
        }
    }
}

impl fmt::Display for WarmthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated original file, held in memory.
///
/// Bytes are shared (`Arc<[u8]>`) so that handing the content to a
/// compression worker does not copy it; the owning queue item stays the only
/// long-lived holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercased extension of the filename, if any.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }
}

/// Lowercased extension of `name` (text after the last `.`), if any.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Replace the extension of `name` with `ext`, or append it if there is none.
pub fn with_extension(name: &str, ext: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.{ext}"),
        _ => format!("{name}.{ext}"),
    }
}

/// Encoding of every [`NormalizedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    Jpeg,
}

impl OutputEncoding {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputEncoding::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputEncoding::Jpeg => "jpg",
        }
    }
}

/// An image in canonical form: bounded dimensions, canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Original filename with the extension swapped for the output encoding.
    pub name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub encoding: OutputEncoding,
    /// Size of the original upload, for reduction reporting.
    pub original_size: usize,
}

impl NormalizedImage {
    /// Percentage saved relative to the original, `0.0` when it grew.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_size == 0 || self.bytes.len() >= self.original_size {
            return 0.0;
        }
        (self.original_size - self.bytes.len()) as f64 / self.original_size as f64 * 100.0
    }
}
