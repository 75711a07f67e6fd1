//! Intake validation for user-picked files.
//!
//! A [`RawSelection`] is what a file pick or drop produces: name, size,
//! declared media type and a way to get at the bytes. The [`Validator`] looks at
//! the first three only, so an oversized or unsupported file is rejected before
//! anything is read.
//!
//! ## Rules
//!
//! 1. Size above the ceiling (default 15 MiB) → [`ValidationError::TooLarge`],
//!    whatever the type.
//! 2. Declared type starting with `image/` → accepted.
//! 3. Otherwise the filename extension must be one of `jpg`, `jpeg`, `png`,
//!    `webp`, `heic`, `heif` (case-insensitive), else
//!    [`ValidationError::UnsupportedType`].
//!
//! Declared types are untrustworthy (browsers and phones often send nothing for
//! HEIC), which is why the extension fallback exists.

use crate::config::LimitsConfig;
use crate::types::{SourceFile, file_extension};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions accepted when the declared type does not say `image/*`.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{name}: unsupported file type ({})", .declared_type.as_deref().unwrap_or("none"))]
    UnsupportedType {
        name: String,
        declared_type: Option<String>,
    },
    #[error("{name}: file too large ({size} bytes, max {max} bytes)")]
    TooLarge { name: String, size: u64, max: u64 },
}

/// Where the content of a selection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionContent {
    /// On disk, not read yet.
    Path(PathBuf),
    /// Already in memory (drag and drop, tests).
    Bytes(Vec<u8>),
}

/// Immutable handle to a user-chosen file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSelection {
    pub name: String,
    pub size: u64,
    pub declared_type: Option<String>,
    pub content: SelectionContent,
}

impl RawSelection {
    /// Build a selection from a file on disk using only its metadata.
    ///
    /// The declared type is guessed from the extension the way a browser file
    /// picker would; unknown extensions get no declared type.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let declared_type = file_extension(&name)
            .and_then(|ext| media_type_for_extension(&ext))
            .map(str::to_string);
        Ok(Self {
            name,
            size,
            declared_type,
            content: SelectionContent::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(
        name: impl Into<String>,
        declared_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            declared_type,
            content: SelectionContent::Bytes(bytes),
        }
    }

    /// Read the content into a [`SourceFile`].
    pub fn load(self) -> std::io::Result<SourceFile> {
        let bytes = match self.content {
            SelectionContent::Path(path) => std::fs::read(path)?,
            SelectionContent::Bytes(bytes) => bytes,
        };
        Ok(SourceFile::new(self.name, self.declared_type, bytes))
    }
}

/// Media type a browser would report for a known image extension.
fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

/// Accepts or rejects raw selections against a size ceiling and type rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    max_file_size: u64,
}

impl Validator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self::new(limits.max_file_size)
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn validate(&self, selection: &RawSelection) -> Result<(), ValidationError> {
        if selection.size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                name: selection.name.clone(),
                size: selection.size,
                max: self.max_file_size,
            });
        }

        let declared_image = selection
            .declared_type
            .as_deref()
            .is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("image/"));
        if declared_image {
            return Ok(());
        }

        let allowed_ext = file_extension(&selection.name)
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
        if allowed_ext {
            return Ok(());
        }

        Err(ValidationError::UnsupportedType {
            name: selection.name.clone(),
            declared_type: selection.declared_type.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Split a multi-file pick into accepted selections and rejections, keeping
    /// the original order within each side.
    pub fn partition(
        &self,
        selections: Vec<RawSelection>,
    ) -> (Vec<RawSelection>, Vec<(RawSelection, ValidationError)>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for selection in selections {
            match self.validate(&selection) {
                Ok(()) => accepted.push(selection),
                Err(e) => {
                    tracing::warn!(name = %selection.name, error = %e, "rejected file");
                    rejected.push((selection, e));
                }
            }
        }
        (accepted, rejected)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::default())
    }
}
