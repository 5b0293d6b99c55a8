//! Pure Rust crop adapter built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image` crate (pure Rust decoders) |
//! | Crop | `DynamicImage::crop_imm` on the inset region |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode PNG / GIF / WebP (lossless) | `image` crate encoders |

use super::backend::{BackendError, ImageAdapter};
use super::calculations::{crop_insets, inset_region};
use super::params::CropParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Primary-artifact formats this adapter can both read and write.
const PRIMARY_FORMATS: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("webp", ImageFormat::WebP),
];

/// Pure Rust adapter using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustAdapter;

impl RustAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn format_for(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    PRIMARY_FORMATS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, fmt)| *fmt)
}

/// Load and decode an image from disk.
pub(crate) fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    match format_for(path) {
        Some(ImageFormat::Jpeg) => {
            let writer = BufWriter::new(File::create(path)?);
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality as u8))
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
        }
        Some(format) => img.save_with_format(path, format).map_err(|e| {
            BackendError::ProcessingFailed(format!("{:?} encode failed: {}", format, e))
        }),
        None => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {}",
            path.display()
        ))),
    }
}

impl ImageAdapter for RustAdapter {
    fn name(&self) -> &'static str {
        "image-rs"
    }

    fn is_available(&self) -> bool {
        ImageFormat::Jpeg.reading_enabled() && ImageFormat::Png.writing_enabled()
    }

    fn crop_resize(&self, params: &CropParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let bounds = (img.width(), img.height());

        let insets = crop_insets(bounds, params.rect);
        let region = inset_region(bounds, insets).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "Crop {:?} leaves no pixels of a {}x{} image",
                params.rect, bounds.0, bounds.1
            ))
        })?;

        let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
        let resized = cropped.resize_exact(
            params.target_width.max(1),
            params.target_height.max(1),
            FilterType::Lanczos3,
        );
        save_image(&resized, &params.output, params.quality.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{CropRect, Quality};
    use image::{ImageEncoder, RgbImage, Rgba, RgbaImage};

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    fn params(source: &Path, output: &Path, rect: CropRect, w: u32, h: u32) -> CropParams {
        CropParams {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            rect,
            target_width: w,
            target_height: h,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn nonexistent_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let rect = CropRect {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        let result = RustAdapter::new().crop_resize(&params(
            Path::new("/nonexistent/image.jpg"),
            &tmp.path().join("out.jpg"),
            rect,
            10,
            10,
        ));
        assert!(result.is_err());
        assert!(!tmp.path().join("out.jpg").exists());
    }

    #[test]
    fn adapter_reports_available() {
        assert!(RustAdapter::new().is_available());
    }

    #[test]
    fn crop_resize_writes_target_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);
        let output = tmp.path().join("out.jpg");

        let rect = CropRect {
            x: 50,
            y: 50,
            width: 200,
            height: 100,
        };
        RustAdapter::new()
            .crop_resize(&params(&source, &output, rect, 160, 80))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (160, 80));
    }

    #[test]
    fn crop_takes_pixels_from_rect_origin() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        // Left half red, right half blue
        let img = RgbaImage::from_fn(100, 50, |x, _| {
            if x < 50 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        img.save(&source).unwrap();
        let output = tmp.path().join("out.png");

        let rect = CropRect {
            x: 60,
            y: 0,
            width: 40,
            height: 50,
        };
        RustAdapter::new()
            .crop_resize(&params(&source, &output, rect, 40, 50))
            .unwrap();

        let out = image::open(&output).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(20, 25), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn crop_outside_bounds_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 100, 100);
        let output = tmp.path().join("out.jpg");

        let rect = CropRect {
            x: 200,
            y: 0,
            width: 50,
            height: 50,
        };
        let result = RustAdapter::new().crop_resize(&params(&source, &output, rect, 50, 50));
        assert!(result.is_err());
    }

    #[test]
    fn undecodable_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();
        let output = tmp.path().join("out.jpg");

        let rect = CropRect {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        let result = RustAdapter::new().crop_resize(&params(&source, &output, rect, 10, 10));
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn unsupported_output_extension_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 100, 100);
        let output = tmp.path().join("out.bmp");

        let rect = CropRect {
            x: 0,
            y: 0,
            width: 50,
            height: 50,
        };
        let result = RustAdapter::new().crop_resize(&params(&source, &output, rect, 50, 50));
        assert!(result.is_err());
    }
}
