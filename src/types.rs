//! Persisted records shared by the generator, the upload path, and the store.
//!
//! These types are serialized as-is into the JSON store; optional fields are
//! `null` until set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("Breakpoint '{0}' is active but has a zero target dimension")]
    ZeroTarget(String),
    #[error("Breakpoint identifier must not be empty")]
    EmptyIdentifier,
}

/// A named viewport range with the image size generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Assigned by the store on first save.
    #[serde(default)]
    pub id: Option<u32>,
    pub slider_id: u32,
    pub name: String,
    /// Slug used in artifact file names (`desktop`, `tablet`, ...).
    pub identifier: String,
    pub media_query: String,
    pub min_width: u32,
    pub target_width: u32,
    pub target_height: u32,
    pub sort_order: i32,
    pub is_active: bool,
}

impl Breakpoint {
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.identifier.trim().is_empty() {
            return Err(RecordError::EmptyIdentifier);
        }
        if self.is_active && (self.target_width == 0 || self.target_height == 0) {
            return Err(RecordError::ZeroTarget(self.identifier.clone()));
        }
        Ok(())
    }
}

/// How one banner image is cropped and converted for one breakpoint.
///
/// At most one crop exists per `(banner_id, breakpoint_id)`. Artifact paths
/// are relative to the media directory and are either all `None` or have
/// `cropped_image` set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsiveCrop {
    pub crop_id: Option<u32>,
    pub banner_id: u32,
    pub breakpoint_id: u32,
    /// Source image, relative to the media directory.
    pub source_image: Option<String>,
    pub crop_x: Option<u32>,
    pub crop_y: Option<u32>,
    pub crop_width: Option<u32>,
    pub crop_height: Option<u32>,
    pub generate_webp: bool,
    pub generate_avif: bool,
    pub webp_quality: Option<u32>,
    pub avif_quality: Option<u32>,
    pub cropped_image: Option<String>,
    pub webp_image: Option<String>,
    pub avif_image: Option<String>,
    pub sort_order: i32,
}

impl ResponsiveCrop {
    pub fn new(banner_id: u32, breakpoint_id: u32) -> Self {
        Self {
            banner_id,
            breakpoint_id,
            generate_webp: true,
            generate_avif: true,
            ..Self::default()
        }
    }

    /// Source image reference, treating an empty string as absent.
    pub fn source(&self) -> Option<&str> {
        self.source_image.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn has_artifacts(&self) -> bool {
        self.cropped_image.is_some() || self.webp_image.is_some() || self.avif_image.is_some()
    }

    /// Paths of every generated artifact currently recorded.
    pub fn artifact_paths(&self) -> Vec<&str> {
        [&self.cropped_image, &self.webp_image, &self.avif_image]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect()
    }

    pub fn clear_artifacts(&mut self) {
        self.cropped_image = None;
        self.webp_image = None;
        self.avif_image = None;
    }
}
