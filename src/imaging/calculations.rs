//! Pure calculation functions for crop geometry and output sizing.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::CropRect;
use std::path::{Path, PathBuf};

/// Edge insets to remove from an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insets {
    pub top: u32,
    pub left: u32,
    pub right: u32,
    pub bottom: u32,
}

/// A region of the source image, as absolute origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Convert a crop rectangle into the insets an adapter removes from each edge.
///
/// `x`/`y` are the distances from the left/top edges; the right/bottom insets
/// are whatever remains of the native bounds past the rectangle. Saturates at
/// zero when the rectangle overhangs the image.
///
/// ```
/// # use slider_media::imaging::{CropRect, Insets, crop_insets};
/// let insets = crop_insets((1000, 800), CropRect { x: 100, y: 50, width: 600, height: 400 });
/// assert_eq!(insets, Insets { top: 50, left: 100, right: 300, bottom: 350 });
/// ```
pub fn crop_insets(image: (u32, u32), rect: CropRect) -> Insets {
    let (img_w, img_h) = image;
    Insets {
        top: rect.y,
        left: rect.x,
        right: img_w.saturating_sub(rect.x).saturating_sub(rect.width),
        bottom: img_h.saturating_sub(rect.y).saturating_sub(rect.height),
    }
}

/// Region left over after removing `insets` from an image of size `image`.
///
/// Returns `None` when the insets consume the whole width or height.
pub fn inset_region(image: (u32, u32), insets: Insets) -> Option<Region> {
    let (img_w, img_h) = image;
    let width = img_w
        .checked_sub(insets.left)?
        .checked_sub(insets.right)
        .filter(|&w| w > 0)?;
    let height = img_h
        .checked_sub(insets.top)?
        .checked_sub(insets.bottom)
        .filter(|&h| h > 0)?;
    Some(Region {
        x: insets.left,
        y: insets.top,
        width,
        height,
    })
}

/// Effective crop size: explicit crop dimensions win, otherwise the
/// breakpoint's target dimensions stand in.
pub fn effective_crop_size(
    crop_width: Option<u32>,
    crop_height: Option<u32>,
    target: (u32, u32),
) -> (u32, u32) {
    (crop_width.unwrap_or(target.0), crop_height.unwrap_or(target.1))
}

/// Output height that keeps the crop's aspect ratio at `target_width`.
///
/// Width is authoritative: height is always recomputed from the crop aspect
/// when both crop dimensions are positive, overriding `nominal_height`.
/// It is never the other way round.
///
/// ```
/// # use slider_media::imaging::corrected_target_height;
/// assert_eq!(corrected_target_height(800, (200, 100), 600), 400);
/// assert_eq!(corrected_target_height(800, (0, 100), 600), 600);
/// ```
pub fn corrected_target_height(target_width: u32, crop: (u32, u32), nominal_height: u32) -> u32 {
    let (crop_w, crop_h) = crop;
    if crop_w > 0 && crop_h > 0 {
        (target_width as f64 * crop_h as f64 / crop_w as f64).round() as u32
    } else {
        nominal_height
    }
}

/// Replace the extension of `source` with `extension`, keeping the directory.
pub fn with_extension(source: &Path, extension: &str) -> PathBuf {
    source.with_extension(extension)
}
