//! Intake configuration.
//!
//! Handles loading, validating and merging the `intake.toml` file. Every key is
//! optional: stock defaults are the base layer and the user file only lists what
//! it wants to change. Two environment variables override the backend section
//! afterwards so credentials can stay out of the file.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_file_size = 15728640  # Per-file ceiling in bytes (15 MiB)
//! queue_capacity = 20       # Max items staged at once
//!
//! [images]
//! max_width = 800           # Bounding box for uploaded images
//! max_height = 800
//! quality = 60              # JPEG quality (1-100)
//!
//! [normalize]
//! convert_heif = true       # Transcode HEIC/HEIF before resizing
//! quality = 80              # JPEG quality for the transcode
//!
//! [backend]
//! base_url = "http://localhost:8000"
//! upload_path = "/api/upload"
//! timeout_secs = 120
//! # user_id = "..."
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! | Variable | Overrides |
//! |---|---|
//! | `INTAKE_API_URL` | `backend.base_url` |
//! | `INTAKE_USER_ID` | `backend.user_id` |
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const ENV_API_URL: &str = "INTAKE_API_URL";
pub const ENV_USER_ID: &str = "INTAKE_USER_ID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Intake configuration loaded from `intake.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    /// Input ceilings (file size, queue capacity).
    pub limits: LimitsConfig,
    /// Output bounds and encoding quality.
    pub images: ImagesConfig,
    /// HEIC/HEIF conversion settings.
    pub normalize: NormalizeConfig,
    /// Where batches are uploaded.
    pub backend: BackendConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl IntakeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "limits.max_file_size must be non-zero".into(),
            ));
        }
        if self.limits.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "limits.queue_capacity must be non-zero".into(),
            ));
        }
        if self.images.max_width == 0 || self.images.max_height == 0 {
            return Err(ConfigError::Validation(
                "images.max_width and images.max_height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&self.normalize.quality) {
            return Err(ConfigError::Validation(
                "normalize.quality must be 1-100".into(),
            ));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "backend.base_url must not be empty".into(),
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "backend.timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Apply `INTAKE_API_URL` / `INTAKE_USER_ID` on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_USER_ID).ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, user_id: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(id) = user_id.filter(|u| !u.trim().is_empty()) {
            self.backend.user_id = Some(id);
        }
    }
}

/// Input ceilings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted file, in bytes.
    pub max_file_size: u64,
    /// Maximum number of items the staging queue holds.
    pub queue_capacity: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 15 * 1024 * 1024,
            queue_capacity: 20,
        }
    }
}

/// Output bounds and quality for the resize/compress stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
            quality: 60,
        }
    }
}

/// HEIC/HEIF conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    /// When false, HEIC/HEIF files go straight to the compressor.
    pub convert_heif: bool,
    /// JPEG quality of the intermediate file.
    pub quality: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            convert_heif: true,
            quality: 80,
        }
    }
}

/// Batch upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub base_url: String,
    pub upload_path: String,
    pub timeout_secs: u64,
    /// Session identifier sent with every batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            upload_path: "/api/upload".to_string(),
            timeout_secs: 120,
            user_id: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel compression workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(IntakeConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<IntakeConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: IntakeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is missing.
///
/// Environment overrides are not applied here; see
/// [`IntakeConfig::apply_env_overrides`].
pub fn load_config(path: &Path) -> Result<IntakeConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `intake.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Wardrobe Intake Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Input limits
# ---------------------------------------------------------------------------
[limits]
# Largest accepted photo, in bytes (15 MiB).
max_file_size = 15728640

# How many photos can wait in the staging queue at once.
queue_capacity = 20

# ---------------------------------------------------------------------------
# Uploaded image size
# ---------------------------------------------------------------------------
[images]
# Photos are scaled down (never up) to fit inside this box.
max_width = 800
max_height = 800

# JPEG quality of the uploaded file (1 = worst, 100 = best).
quality = 60

# ---------------------------------------------------------------------------
# HEIC / HEIF handling
# ---------------------------------------------------------------------------
[normalize]
# Transcode phone HEIC/HEIF photos to JPEG before resizing.
# If the transcode fails the original goes through unchanged.
convert_heif = true

# JPEG quality of the intermediate file.
quality = 80

# ---------------------------------------------------------------------------
# Backend
# ---------------------------------------------------------------------------
[backend]
# Overridden by INTAKE_API_URL.
base_url = "http://localhost:8000"
upload_path = "/api/upload"
timeout_secs = 120

# Session identifier sent with every batch. Overridden by INTAKE_USER_ID.
# user_id = ""

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel compression workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
