//! WebP/AVIF conversion with ordered fallback across backends.
//!
//! The converter owns one priority-ordered list of
//! [`ConversionBackend`]s. For a requested format it walks the backends of
//! that format in order, skips unavailable ones, and returns the destination
//! of the first successful conversion. Running out of backends is a soft
//! failure: `None` plus a warning, never an error.

use super::binaries::{BinaryProbe, BinaryTool};
use super::calculations::with_extension;
use super::converters::{
    BinaryBackend, ConversionBackend, ImageCrateBackend, LibWebpBackend, is_readable_file,
};
use super::params::{Quality, TargetFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Support flags for both derivative formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SupportedFormats {
    pub webp: bool,
    pub avif: bool,
}

pub struct FormatConverter {
    backends: Vec<Box<dyn ConversionBackend>>,
    probe: Option<Arc<BinaryProbe>>,
}

impl FormatConverter {
    /// Converter over `backends`, tried in the given order.
    pub fn new(backends: Vec<Box<dyn ConversionBackend>>) -> Self {
        Self {
            backends,
            probe: None,
        }
    }

    /// The production chain: libwebp, then the `image` encoders, then the
    /// external binaries found through `probe`.
    pub fn with_default_backends(probe: Arc<BinaryProbe>) -> Self {
        let mut converter = Self::new(vec![
            Box::new(LibWebpBackend::new()),
            Box::new(ImageCrateBackend::new(TargetFormat::WebP)),
            Box::new(BinaryBackend::new(BinaryTool::Cwebp, probe.clone())),
            Box::new(ImageCrateBackend::new(TargetFormat::Avif)),
            Box::new(BinaryBackend::new(BinaryTool::Cavif, probe.clone())),
        ]);
        converter.probe = Some(probe);
        converter
    }

    /// Directory searched for `cwebp`/`cavif`, when binary backends are wired.
    pub fn bin_dir(&self) -> Option<&Path> {
        self.probe.as_deref().map(BinaryProbe::bin_dir)
    }

    fn backends_for(&self, format: TargetFormat) -> impl Iterator<Item = &dyn ConversionBackend> {
        self.backends
            .iter()
            .map(|b| b.as_ref())
            .filter(move |b| b.format() == format)
    }

    /// Convert to WebP. `destination` defaults to `source` with a `.webp` extension.
    pub fn convert_to_webp(
        &self,
        source: &Path,
        quality: u32,
        destination: Option<&Path>,
    ) -> Option<PathBuf> {
        self.convert(TargetFormat::WebP, source, quality, destination)
    }

    /// Convert to AVIF. `destination` defaults to `source` with a `.avif` extension.
    pub fn convert_to_avif(
        &self,
        source: &Path,
        quality: u32,
        destination: Option<&Path>,
    ) -> Option<PathBuf> {
        self.convert(TargetFormat::Avif, source, quality, destination)
    }

    /// Convert `source` to `format`, returning the written path.
    ///
    /// Quality is clamped into 1..=100. Returns `None` without touching any
    /// backend when the source cannot be read or the destination is the
    /// source itself.
    pub fn convert(
        &self,
        format: TargetFormat,
        source: &Path,
        quality: u32,
        destination: Option<&Path>,
    ) -> Option<PathBuf> {
        if !is_readable_file(source) {
            error!(source = %source.display(), "Source image does not exist or is not readable");
            return None;
        }

        let quality = Quality::new(quality);
        let destination = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| with_extension(source, format.extension()));
        if destination == source {
            warn!(%format, source = %source.display(), "Source is already in the target format");
            return None;
        }

        for (attempt, backend) in self
            .backends_for(format)
            .filter(|b| b.is_available())
            .enumerate()
        {
            if attempt > 0 {
                info!(backend = backend.name(), %format, "Falling back to next conversion backend");
            }
            if backend.convert(source, &destination, quality) {
                return Some(destination);
            }
        }

        warn!(%format, source = %source.display(), "No conversion backend could produce this format");
        None
    }

    pub fn is_webp_supported(&self) -> bool {
        self.is_supported(TargetFormat::WebP)
    }

    pub fn is_avif_supported(&self) -> bool {
        self.is_supported(TargetFormat::Avif)
    }

    /// True when at least one backend for `format` reports availability.
    pub fn is_supported(&self, format: TargetFormat) -> bool {
        self.backends_for(format).any(|b| b.is_available())
    }

    pub fn supported_formats(&self) -> SupportedFormats {
        SupportedFormats {
            webp: self.is_webp_supported(),
            avif: self.is_avif_supported(),
        }
    }
}
