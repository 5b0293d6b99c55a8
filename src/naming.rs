//! Deterministic artifact names.
//!
//! Every generated file is named `{identifier}_{hash}.{ext}` inside
//! `{responsive_path}/{banner_id}/`. The hash covers everything that changes
//! the pixels, so a new parameter set always produces a new URL:
//!
//! ```text
//! banner_slider/responsive/12/desktop_3f9a0c1e.jpg
//! banner_slider/responsive/12/desktop_3f9a0c1e.webp
//! banner_slider/responsive/12/desktop_3f9a0c1e.avif
//! ```

use crate::types::ResponsiveCrop;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Length of the hash embedded in file names.
pub const HASH_LEN: usize = 8;

/// Extension used for the primary artifact when the source has none.
pub const FALLBACK_EXTENSION: &str = "jpg";

/// Default location of generated images inside the media directory.
pub const DEFAULT_RESPONSIVE_PATH: &str = "banner_slider/responsive";

fn short_hash(parts: &[String]) -> String {
    let digest = Sha256::digest(parts.join("_").as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASH_LEN);
    hex
}

fn opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn crop_parts(crop: &ResponsiveCrop) -> Vec<String> {
    vec![
        crop.source_image.clone().unwrap_or_default(),
        opt(crop.crop_x),
        opt(crop.crop_y),
        opt(crop.crop_width),
        opt(crop.crop_height),
        opt(crop.webp_quality),
        opt(crop.avif_quality),
    ]
}

/// Cache-busting hash over the source and every crop/quality parameter.
///
/// ```
/// use slider_media::naming::crop_hash;
/// use slider_media::types::ResponsiveCrop;
///
/// let mut crop = ResponsiveCrop::new(1, 1);
/// crop.source_image = Some("a.jpg".into());
/// let first = crop_hash(&crop);
/// assert_eq!(first.len(), 8);
/// assert_eq!(first, crop_hash(&crop));
///
/// crop.crop_x = Some(5);
/// assert_ne!(first, crop_hash(&crop));
/// ```
pub fn crop_hash(crop: &ResponsiveCrop) -> String {
    short_hash(&crop_parts(crop))
}

/// Hash for client-compressed uploads. Includes the upload time, so
/// re-uploading identical parameters still yields fresh names.
pub fn upload_hash(crop: &ResponsiveCrop, uploaded_at: u64) -> String {
    let mut parts = crop_parts(crop);
    parts.push(uploaded_at.to_string());
    short_hash(&parts)
}

/// Extension of a source reference, or [`FALLBACK_EXTENSION`].
pub fn source_extension(source: &str) -> String {
    Path::new(source)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(FALLBACK_EXTENSION)
        .to_string()
}

/// Relative path scheme for generated artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    responsive_path: String,
}

impl ArtifactLayout {
    pub fn new(responsive_path: impl Into<String>) -> Self {
        let path: String = responsive_path.into();
        Self {
            responsive_path: path.trim_matches('/').to_string(),
        }
    }

    pub fn responsive_path(&self) -> &str {
        &self.responsive_path
    }

    /// `{responsive_path}/{banner_id}`
    pub fn banner_dir(&self, banner_id: u32) -> String {
        format!("{}/{}", self.responsive_path, banner_id)
    }

    /// `{responsive_path}/{banner_id}/{identifier}_{hash}.{extension}`
    pub fn file(&self, banner_id: u32, identifier: &str, hash: &str, extension: &str) -> String {
        format!(
            "{}/{}_{}.{}",
            self.banner_dir(banner_id),
            identifier,
            hash,
            extension
        )
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSIVE_PATH)
    }
}
