//! Storing images that were already cropped and compressed by the client.
//!
//! This path bypasses cropping and conversion entirely. Uploaded files are
//! validated up front, every one of them, before anything on disk changes;
//! only then are the crop's old artifacts removed and the new files copied
//! into place under the usual naming scheme.
//!
//! A new primary image replaces the whole artifact set. Derivatives uploaded
//! on their own replace only their own slots, and need a primary image the
//! crop already has.

use crate::generator::ResponsiveImageGenerator;
use crate::naming::upload_hash;
use crate::store::{BreakpointRepository, CropRepository, StoreError};
use crate::types::ResponsiveCrop;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Accepted MIME types and the extension stored for each.
pub const ALLOWED_MIME_TYPES: [(&str, &str); 5] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
];

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Uploaded file does not exist: {0}")]
    Missing(PathBuf),
    #[error("Uploaded file is not readable: {0}")]
    Unreadable(PathBuf),
    #[error("File size {size} exceeds maximum allowed size of {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("Invalid file type '{0}'. Allowed types: image/jpeg, image/png, image/gif, image/webp, image/avif")]
    InvalidMimeType(String),
    #[error("Crop {0} not found")]
    CropNotFound(u32),
    #[error("Breakpoint {0} not found")]
    BreakpointNotFound(u32),
    #[error("Crop {0} has no cropped image; upload one along with its WebP/AVIF versions")]
    MissingPrimary(u32),
    #[error("Failed to save uploaded image: {0}")]
    Save(#[from] std::io::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Extension stored for an allowed MIME type.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    ALLOWED_MIME_TYPES
        .iter()
        .find(|(mime, _)| *mime == mime_type)
        .map(|(_, ext)| *ext)
}

/// Which artifact an uploaded file becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSlot {
    /// The cropped primary image; extension follows its MIME type.
    Original,
    WebP,
    Avif,
}

impl UploadSlot {
    /// Forced MIME type for derivative slots.
    fn forced_mime(self) -> Option<&'static str> {
        match self {
            UploadSlot::Original => None,
            UploadSlot::WebP => Some("image/webp"),
            UploadSlot::Avif => Some("image/avif"),
        }
    }

    /// The record field this slot fills.
    fn field(self, crop: &mut ResponsiveCrop) -> &mut Option<String> {
        match self {
            UploadSlot::Original => &mut crop.cropped_image,
            UploadSlot::WebP => &mut crop.webp_image,
            UploadSlot::Avif => &mut crop.avif_image,
        }
    }

    fn extension(self, mime_type: &str) -> &'static str {
        match self {
            UploadSlot::WebP => "webp",
            UploadSlot::Avif => "avif",
            UploadSlot::Original => extension_for_mime(mime_type).unwrap_or("jpg"),
        }
    }
}

/// A temp file handed over by the upload transport.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub path: PathBuf,
    /// Declared MIME type; ignored for WebP/AVIF slots.
    pub mime_type: Option<String>,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>, mime_type: Option<&str>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadFiles {
    pub cropped: Option<UploadedFile>,
    pub webp: Option<UploadedFile>,
    pub avif: Option<UploadedFile>,
}

impl UploadFiles {
    fn slots(&self) -> impl Iterator<Item = (UploadSlot, &UploadedFile)> {
        [
            (UploadSlot::Original, self.cropped.as_ref()),
            (UploadSlot::WebP, self.webp.as_ref()),
            (UploadSlot::Avif, self.avif.as_ref()),
        ]
        .into_iter()
        .filter_map(|(slot, file)| file.map(|f| (slot, f)))
    }
}

/// Crop parameters submitted with the upload. Set values overwrite the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadParams {
    pub crop_x: Option<u32>,
    pub crop_y: Option<u32>,
    pub crop_width: Option<u32>,
    pub crop_height: Option<u32>,
    pub webp_quality: Option<u32>,
    pub avif_quality: Option<u32>,
}

impl UploadParams {
    pub fn apply_to(&self, crop: &mut ResponsiveCrop) {
        let fields = [
            (self.crop_x, &mut crop.crop_x),
            (self.crop_y, &mut crop.crop_y),
            (self.crop_width, &mut crop.crop_width),
            (self.crop_height, &mut crop.crop_height),
            (self.webp_quality, &mut crop.webp_quality),
            (self.avif_quality, &mut crop.avif_quality),
        ];
        for (value, field) in fields {
            if value.is_some() {
                *field = value;
            }
        }
    }
}

pub struct UploadCompressedImages<'a> {
    generator: &'a ResponsiveImageGenerator,
    max_file_size: u64,
}

impl<'a> UploadCompressedImages<'a> {
    /// Uploads are stored with the generator's media directory and layout.
    pub fn new(generator: &'a ResponsiveImageGenerator) -> Self {
        Self {
            generator,
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Check that `path` is a readable file within the size limit with an
    /// allowed MIME type.
    pub fn validate_uploaded_file(&self, path: &Path, mime_type: &str) -> Result<(), UploadError> {
        if !path.exists() {
            return Err(UploadError::Missing(path.to_path_buf()));
        }
        let metadata = std::fs::File::open(path)
            .and_then(|f| f.metadata())
            .map_err(|_| UploadError::Unreadable(path.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(UploadError::Unreadable(path.to_path_buf()));
        }
        if metadata.len() > self.max_file_size {
            return Err(UploadError::TooLarge {
                size: metadata.len(),
                max: self.max_file_size,
            });
        }
        if extension_for_mime(mime_type).is_none() {
            return Err(UploadError::InvalidMimeType(mime_type.to_string()));
        }
        Ok(())
    }

    /// Validate and copy one file to `{responsive}/{banner_id}/{name}.{ext}`,
    /// returning the media-relative path.
    pub fn store_compressed_image(
        &self,
        banner_id: u32,
        name: &str,
        slot: UploadSlot,
        path: &Path,
        mime_type: &str,
    ) -> Result<String, UploadError> {
        self.validate_uploaded_file(path, mime_type)?;

        let relative = format!(
            "{}/{}.{}",
            self.generator.layout().banner_dir(banner_id),
            name,
            slot.extension(mime_type)
        );
        self.generator.media().copy_in(path, &relative)?;
        Ok(relative)
    }

    /// Replace a crop's artifacts with client-compressed files.
    ///
    /// With a cropped image every previous artifact is removed first. Without
    /// one, only the uploaded derivative slots are replaced and the crop must
    /// already have a primary image. Submitted parameters are applied to the
    /// record, the breakpoint's sort order is copied over, and the crop is
    /// saved.
    pub fn upload(
        &self,
        crops: &impl CropRepository,
        breakpoints: &impl BreakpointRepository,
        crop_id: u32,
        files: &UploadFiles,
        params: &UploadParams,
    ) -> Result<ResponsiveCrop, UploadError> {
        let mut crop = crops
            .get_crop(crop_id)?
            .ok_or(UploadError::CropNotFound(crop_id))?;
        let breakpoint = breakpoints
            .get_breakpoint(crop.breakpoint_id)?
            .ok_or(UploadError::BreakpointNotFound(crop.breakpoint_id))?;

        let uploads: Vec<(UploadSlot, &UploadedFile, &str)> = files
            .slots()
            .map(|(slot, file)| {
                let mime = slot
                    .forced_mime()
                    .or(file.mime_type.as_deref())
                    .unwrap_or(DEFAULT_MIME_TYPE);
                (slot, file, mime)
            })
            .collect();
        for (_, file, mime) in &uploads {
            self.validate_uploaded_file(&file.path, mime)?;
        }
        let replaces_primary = files.cropped.is_some();
        if !replaces_primary && !uploads.is_empty() && crop.cropped_image.is_none() {
            return Err(UploadError::MissingPrimary(crop_id));
        }

        params.apply_to(&mut crop);
        let uploaded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let name = format!("{}_{}", breakpoint.identifier, upload_hash(&crop, uploaded_at));

        if replaces_primary {
            self.generator.delete_generated_images(&mut crop);
        } else {
            for (slot, _, _) in &uploads {
                self.clear_slot(&mut crop, *slot);
            }
        }

        for (slot, file, mime) in uploads {
            let stored =
                self.store_compressed_image(crop.banner_id, &name, slot, &file.path, mime)?;
            *slot.field(&mut crop) = Some(stored);
        }

        crop.sort_order = breakpoint.sort_order;
        crops.save_crop(&mut crop)?;
        info!(crop_id, banner_id = crop.banner_id, "Stored client-compressed images");
        Ok(crop)
    }

    /// Delete the file recorded in `slot` and clear the path.
    fn clear_slot(&self, crop: &mut ResponsiveCrop, slot: UploadSlot) {
        if let Some(old) = slot.field(crop).take()
            && let Err(e) = self.generator.media().delete(&old)
        {
            warn!(path = %old, error = %e, "Failed to delete replaced image");
        }
    }
}
