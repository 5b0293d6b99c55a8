//! Crop adapter trait and shared types.
//!
//! The [`ImageAdapter`] trait defines the operations every pixel backend must
//! support: crop-then-resize. The [`CropProcessor`] holds an
//! ordered list of adapters and uses the first one that reports itself
//! available.
//!
//! The production implementation is
//! [`RustAdapter`](super::rust_backend::RustAdapter): pure Rust, statically
//! linked into the binary.
//!
//! [`CropProcessor`]: super::crop_processor::CropProcessor

use super::params::CropParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for crop/resize adapters.
///
/// Adapters are listed by the processor in order of preference; the more
/// precise adapter goes first.
pub trait ImageAdapter: Send + Sync {
    /// Short adapter name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this adapter can run in the current process.
    fn is_available(&self) -> bool;

    /// Crop `params.rect` out of the source, resize to the target size, save.
    fn crop_resize(&self, params: &CropParams) -> Result<(), BackendError>;
}
