//! Application configuration.
//!
//! Loaded from `config.toml` in the application root. Stock defaults are the
//! base layer and the user file is merged on top, so the file only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! media_root = "media"              # Media directory, relative to the app root
//! store = "var/slider-store.json"   # Breakpoint/crop store, relative to the app root
//!
//! [images]
//! responsive_path = "banner_slider/responsive"  # Generated images, relative to media_root
//! primary_quality = 90      # JPEG quality of the cropped primary image (1-100)
//! webp_quality = 85         # WebP quality when a crop does not set one (1-100)
//! avif_quality = 80         # AVIF quality when a crop does not set one (1-100)
//!
//! [upload]
//! max_file_size = 10485760  # Bytes; larger client-compressed uploads are rejected
//! ```
//!
//! The directory holding the optional `cwebp`/`cavif` binaries is not
//! configurable: it is always `<app root>/vendor/bin`.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SliderConfig {
    /// Media directory, relative to the application root.
    pub media_root: String,
    /// JSON store for breakpoints and crops, relative to the application root.
    pub store: String,
    pub images: ImagesConfig,
    pub upload: UploadConfig,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            media_root: "media".to_string(),
            store: "var/slider-store.json".to_string(),
            images: ImagesConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl SliderConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("images.primary_quality", self.images.primary_quality),
            ("images.webp_quality", self.images.webp_quality),
            ("images.avif_quality", self.images.avif_quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.images.responsive_path.trim_matches('/').trim().is_empty() {
            return Err(ConfigError::Validation(
                "images.responsive_path must not be empty".into(),
            ));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "upload.max_file_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn media_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.media_root)
    }

    pub fn store_path(&self, root: &Path) -> PathBuf {
        root.join(&self.store)
    }
}

/// Generated image settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub responsive_path: String,
    pub primary_quality: u32,
    pub webp_quality: u32,
    pub avif_quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            responsive_path: crate::naming::DEFAULT_RESPONSIVE_PATH.to_string(),
            primary_quality: 90,
            webp_quality: 85,
            avif_quality: 80,
        }
    }
}

/// Limits for client-compressed uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: crate::upload::MAX_FILE_SIZE,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SliderConfig::default())?)
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

/// Load `config.toml` from `root` as a raw TOML value, `None` when absent.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Load config from `config.toml` in the application root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SliderConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: SliderConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Slider Media Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Media directory holding source images and generated derivatives,
# relative to the application root.
media_root = "media"

# JSON file storing breakpoints and responsive crops, relative to the
# application root.
store = "var/slider-store.json"

# ---------------------------------------------------------------------------
# Generated images
# ---------------------------------------------------------------------------
[images]
# Where derivatives are written, relative to media_root. Files are named
# {responsive_path}/{banner_id}/{breakpoint}_{hash}.{ext}
responsive_path = "banner_slider/responsive"

# JPEG quality of the cropped primary image (1-100).
primary_quality = 90

# Quality used when a crop does not set its own (1-100).
webp_quality = 85
avif_quality = 80

# ---------------------------------------------------------------------------
# Client-compressed uploads
# ---------------------------------------------------------------------------
[upload]
# Maximum accepted file size in bytes (10 MiB).
max_file_size = 10485760

# The optional cwebp/cavif binaries are looked up in <app root>/vendor/bin.
# That location is fixed and cannot be changed here.
"##
}
