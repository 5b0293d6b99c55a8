//! Image processing: crop, resize, and derivative format conversion.
//!
//! | Operation | Crate / tool |
//! |---|---|
//! | **Crop + resize** | `image` crop + Lanczos3, via [`CropProcessor`] |
//! | **WebP** | `webp` (libwebp) → `image` encoder → `cwebp` binary |
//! | **AVIF** | `image` encoder (rav1e) → `cavif` binary |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop insets and target sizing (unit testable)
//! - **Parameters**: Quality, target formats, crop rectangles
//! - **Adapters**: [`ImageAdapter`] trait + [`RustAdapter`], driven by [`CropProcessor`]
//! - **Conversion**: [`ConversionBackend`] variants, ordered by [`FormatConverter`]
//! - **Binaries**: [`BinaryProbe`], memoized detection of optional executables

pub mod backend;
pub mod binaries;
pub mod calculations;
pub mod converters;
pub mod crop_processor;
pub mod format_converter;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageAdapter};
pub use binaries::{BIN_DIR, BinaryProbe, BinaryTool};
pub use calculations::{
    Insets, Region, corrected_target_height, crop_insets, effective_crop_size, inset_region,
};
pub use converters::{BinaryBackend, ConversionBackend, ImageCrateBackend, LibWebpBackend};
pub use crop_processor::{CropError, CropProcessor};
pub use format_converter::{FormatConverter, SupportedFormats};
pub use params::{CropParams, CropRect, Quality, TargetFormat};
pub use rust_backend::RustAdapter;
