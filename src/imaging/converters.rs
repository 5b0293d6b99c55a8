//! Conversion backends for the WebP/AVIF derivatives.
//!
//! Each backend turns one source image into one target format. The
//! [`FormatConverter`](super::format_converter::FormatConverter) tries them in
//! a fixed order per format:
//!
//! | Priority | Backend | WebP | AVIF |
//! |---|---|---|---|
//! | 1 | [`LibWebpBackend`] | libwebp (lossy, quality-aware) | n/a |
//! | 2 | [`ImageCrateBackend`] | `image` WebP encoder (lossless) | `image` AVIF encoder (rav1e) |
//! | 3 | [`BinaryBackend`] | `cwebp` subprocess | `cavif` subprocess |
//!
//! Every failure mode (unreadable source, decode error, spawn error, timeout,
//! non-zero exit, missing output) collapses to `false` from
//! [`ConversionBackend::convert`] plus one `error!` record. Partial output is
//! removed on failure.

use super::backend::BackendError;
use super::binaries::{BinaryProbe, BinaryTool};
use super::params::{Quality, TargetFormat};
use super::rust_backend::load_image;
use image::codecs::avif::AvifEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Why a single conversion attempt failed. Never leaves this module.
#[derive(Error, Debug)]
enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Decode(#[from] BackendError),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("{0} binary is not available")]
    Unavailable(&'static str),
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("completed but output file not found: {0}")]
    MissingOutput(PathBuf),
    #[error("cannot wait on {0} from inside an async runtime")]
    InsideRuntime(&'static str),
}

/// One strategy for producing a derivative format.
pub trait ConversionBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// The format this backend writes.
    fn format(&self) -> TargetFormat;

    /// Whether this backend can run here.
    fn is_available(&self) -> bool;

    /// Convert `source` into `destination`. Returns `true` only when the
    /// destination file was written.
    fn convert(&self, source: &Path, destination: &Path, quality: Quality) -> bool;
}

/// Whether `path` is a regular file this process can open.
pub(crate) fn is_readable_file(path: &Path) -> bool {
    File::open(path)
        .and_then(|f| f.metadata())
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn ensure_parent(destination: &Path) -> std::io::Result<()> {
    match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Shared envelope around a conversion attempt: source check, destination
/// directory, error normalization, partial-file cleanup.
fn guarded(
    backend: &'static str,
    format: TargetFormat,
    source: &Path,
    destination: &Path,
    attempt: impl FnOnce() -> Result<(), ConvertError>,
) -> bool {
    if !is_readable_file(source) {
        error!(
            backend,
            source = %source.display(),
            "Source image does not exist or is not readable"
        );
        return false;
    }

    let result = ensure_parent(destination)
        .map_err(ConvertError::from)
        .and_then(|()| attempt());

    match result {
        Ok(()) => {
            debug!(backend, %format, destination = %destination.display(), "Converted image");
            true
        }
        Err(e) => {
            error!(
                backend,
                %format,
                source = %source.display(),
                destination = %destination.display(),
                error = %e,
                "Image conversion failed"
            );
            if destination.exists()
                && destination != source
                && let Err(cleanup) = fs::remove_file(destination)
            {
                debug!(destination = %destination.display(), error = %cleanup, "Could not remove partial output");
            }
            false
        }
    }
}

// =============================================================================
// libwebp
// =============================================================================

/// Lossy WebP through libwebp.
pub struct LibWebpBackend;

impl LibWebpBackend {
    pub fn new() -> Self {
        Self
    }

    fn encode(source: &Path, destination: &Path, quality: Quality) -> Result<(), ConvertError> {
        let rgba = load_image(source)?.to_rgba8();
        let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(false, quality.value() as f32)
            .map_err(|e| ConvertError::Encode(format!("{:?}", e)))?;
        fs::write(destination, &*encoded)?;
        Ok(())
    }
}

impl Default for LibWebpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionBackend for LibWebpBackend {
    fn name(&self) -> &'static str {
        "libwebp"
    }

    fn format(&self) -> TargetFormat {
        TargetFormat::WebP
    }

    fn is_available(&self) -> bool {
        true
    }

    fn convert(&self, source: &Path, destination: &Path, quality: Quality) -> bool {
        guarded(self.name(), self.format(), source, destination, || {
            Self::encode(source, destination, quality)
        })
    }
}

// =============================================================================
// image crate encoders
// =============================================================================

/// Encoders compiled into the `image` crate.
///
/// The WebP encoder is lossless only, so `quality` is ignored there. AVIF goes
/// through rav1e at speed 6.
pub struct ImageCrateBackend {
    format: TargetFormat,
}

impl ImageCrateBackend {
    pub fn new(format: TargetFormat) -> Self {
        Self { format }
    }

    fn encode(&self, source: &Path, destination: &Path, quality: Quality) -> Result<(), ConvertError> {
        let img = DynamicImage::ImageRgba8(load_image(source)?.to_rgba8());
        let writer = BufWriter::new(File::create(destination)?);
        let encoded = match self.format {
            TargetFormat::WebP => img.write_with_encoder(WebPEncoder::new_lossless(writer)),
            TargetFormat::Avif => img.write_with_encoder(AvifEncoder::new_with_speed_quality(
                writer,
                6,
                quality.value() as u8,
            )),
        };
        encoded.map_err(|e| ConvertError::Encode(e.to_string()))
    }
}

impl ConversionBackend for ImageCrateBackend {
    fn name(&self) -> &'static str {
        "image-rs"
    }

    fn format(&self) -> TargetFormat {
        self.format
    }

    fn is_available(&self) -> bool {
        match self.format {
            TargetFormat::WebP => ImageFormat::WebP.writing_enabled(),
            TargetFormat::Avif => ImageFormat::Avif.writing_enabled(),
        }
    }

    fn convert(&self, source: &Path, destination: &Path, quality: Quality) -> bool {
        guarded(self.name(), self.format, source, destination, || {
            self.encode(source, destination, quality)
        })
    }
}

// =============================================================================
// External binaries
// =============================================================================

/// Arguments for `cwebp`. Paths are passed through as raw OS strings.
pub fn cwebp_args(source: &Path, destination: &Path, quality: Quality) -> Vec<OsString> {
    let mut args = vec![
        source.as_os_str().to_os_string(),
        "-q".into(),
        quality.value().to_string().into(),
    ];
    args.extend(
        [
            "-alpha_q", "100", "-z", "9", "-m", "6", "-segments", "4", "-sns", "80", "-f", "25",
            "-sharpness", "0", "-strong", "-pass", "10", "-mt", "-alpha_method", "1",
            "-alpha_filter", "fast", "-o",
        ]
        .map(OsString::from),
    );
    args.push(destination.as_os_str().to_os_string());
    args
}

/// Arguments for `cavif`.
pub fn cavif_args(source: &Path, destination: &Path, quality: Quality) -> Vec<OsString> {
    vec![
        source.as_os_str().to_os_string(),
        "-Q".into(),
        quality.value().to_string().into(),
        "-o".into(),
        destination.as_os_str().to_os_string(),
    ]
}

/// Conversion through an external executable from the binary directory.
pub struct BinaryBackend {
    tool: BinaryTool,
    probe: Arc<BinaryProbe>,
    timeout: Duration,
}

impl BinaryBackend {
    pub fn new(tool: BinaryTool, probe: Arc<BinaryProbe>) -> Self {
        let timeout = match tool {
            BinaryTool::Cwebp => Duration::from_secs(120),
            BinaryTool::Cavif => Duration::from_secs(180),
        };
        Self {
            tool,
            probe,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn run(&self, source: &Path, destination: &Path, quality: Quality) -> Result<(), ConvertError> {
        let name = self.tool.file_name();
        let program = self
            .probe
            .path_for(name)
            .ok_or(ConvertError::Unavailable(name))?;
        let args = match self.tool {
            BinaryTool::Cwebp => cwebp_args(source, destination, quality),
            BinaryTool::Cavif => cavif_args(source, destination, quality),
        };

        run_with_timeout(name, &program, &args, self.timeout)?;

        if !destination.exists() {
            return Err(ConvertError::MissingOutput(destination.to_path_buf()));
        }
        Ok(())
    }
}

/// Run `program` to completion, killing it once `timeout` elapses.
///
/// Blocks the calling thread on a private current-thread runtime. Called from
/// inside a tokio runtime it fails with [`ConvertError::InsideRuntime`]
/// instead of nesting one.
fn run_with_timeout(
    tool: &'static str,
    program: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<(), ConvertError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ConvertError::InsideRuntime(tool));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConvertError::Spawn { tool, source })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ConvertError::Timeout(timeout))??;

        if output.status.success() {
            Ok(())
        } else {
            Err(ConvertError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    })
}

impl ConversionBackend for BinaryBackend {
    fn name(&self) -> &'static str {
        self.tool.file_name()
    }

    fn format(&self) -> TargetFormat {
        match self.tool {
            BinaryTool::Cwebp => TargetFormat::WebP,
            BinaryTool::Cavif => TargetFormat::Avif,
        }
    }

    fn is_available(&self) -> bool {
        self.probe.is_available(self.tool.file_name())
    }

    fn convert(&self, source: &Path, destination: &Path, quality: Quality) -> bool {
        guarded(self.name(), self.format(), source, destination, || {
            self.run(source, destination, quality)
        })
    }
}
