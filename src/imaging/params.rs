//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the orchestrating components (crop processor, format
//! converter) and the adapters/backends that do the pixel work, so either
//! side can be swapped for a mock in tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1 to 100). Clamped on construction.
//! - [`TargetFormat`]: The derivative formats the converter produces.
//! - [`CropRect`]: Crop rectangle in source-image pixels.
//! - [`CropParams`]: Everything a crop needs: source, output, rectangle, target size.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

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
        Self(90)
    }
}

/// Derivative format produced by the format converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    WebP,
    Avif,
}

impl TargetFormat {
    /// File extension, also the format's wire name.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::WebP => "webp",
            TargetFormat::Avif => "avif",
        }
    }

    /// Quality used when the caller does not specify one.
    pub fn default_quality(self) -> Quality {
        match self {
            TargetFormat::WebP => Quality::new(85),
            TargetFormat::Avif => Quality::new(80),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Crop rectangle in source pixels: offset from the left/top edges plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Parameters for a crop-then-resize operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub rect: CropRect,
    /// Final output dimensions.
    pub target_width: u32,
    pub target_height: u32,
    /// Encoding quality for lossy primary formats (JPEG).
    pub quality: Quality,
}
