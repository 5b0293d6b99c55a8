//! Crop-then-resize using the best available adapter.
//!
//! Unlike format conversion, cropping fails loudly: without a primary image
//! no derivative is meaningful, so every problem is returned as a
//! [`CropError`] for the caller to surface.

use super::backend::{BackendError, ImageAdapter};
use super::converters::is_readable_file;
use super::params::{CropParams, CropRect, Quality};
use super::rust_backend::RustAdapter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("No image processing adapter is available")]
    NoAdapter,
    #[error("Source image does not exist or is not readable: {0}")]
    SourceUnreadable(PathBuf),
    #[error("Failed to create destination directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to crop image: {0}")]
    Failed(#[from] BackendError),
}

pub struct CropProcessor {
    adapters: Vec<Box<dyn ImageAdapter>>,
    quality: Quality,
}

impl CropProcessor {
    /// Processor over `adapters`, most preferred first. `quality` applies to
    /// lossy primary formats.
    pub fn new(adapters: Vec<Box<dyn ImageAdapter>>, quality: Quality) -> Self {
        Self { adapters, quality }
    }

    pub fn with_default_adapters(quality: Quality) -> Self {
        Self::new(vec![Box::new(RustAdapter::new())], quality)
    }

    fn select_adapter(&self) -> Option<&dyn ImageAdapter> {
        self.adapters
            .iter()
            .map(|a| a.as_ref())
            .find(|a| a.is_available())
    }

    pub fn is_adapter_available(&self) -> bool {
        self.select_adapter().is_some()
    }

    pub fn available_adapter_name(&self) -> Option<&'static str> {
        self.select_adapter().map(|a| a.name())
    }

    /// Crop `rect` out of `source`, resize to `target`, and write `destination`.
    pub fn crop(
        &self,
        source: &Path,
        rect: CropRect,
        target: (u32, u32),
        destination: &Path,
    ) -> Result<PathBuf, CropError> {
        let adapter = self.select_adapter().ok_or(CropError::NoAdapter)?;

        if !is_readable_file(source) {
            return Err(CropError::SourceUnreadable(source.to_path_buf()));
        }

        if let Some(dir) = destination.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|e| CropError::CreateDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let params = CropParams {
            source: source.to_path_buf(),
            output: destination.to_path_buf(),
            rect,
            target_width: target.0,
            target_height: target.1,
            quality: self.quality,
        };
        debug!(adapter = adapter.name(), ?rect, ?target, "Cropping image");
        adapter.crop_resize(&params)?;

        Ok(destination.to_path_buf())
    }
}
