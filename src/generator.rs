//! Responsive image generation for banner crops.
//!
//! For one crop and its breakpoint the generator:
//!
//! 1. resolves the source image (a missing source is an error),
//! 2. deletes whatever the crop generated before,
//! 3. names the new artifacts from the crop hash (see [`crate::naming`]),
//! 4. crops and resizes the primary image at the breakpoint width, with the
//!    height following the crop's aspect ratio,
//! 5. converts the primary to WebP and AVIF when enabled and supported.
//!
//! Cropping failures are errors. Conversion failures only leave the
//! derivative path empty; the slider still has its primary image.

use crate::config::SliderConfig;
use crate::imaging::{
    BinaryProbe, CropError, CropProcessor, CropRect, FormatConverter, Quality, TargetFormat,
    corrected_target_height, effective_crop_size,
};
use crate::media::MediaDirectory;
use crate::naming::{ArtifactLayout, crop_hash, source_extension};
use crate::store::{BreakpointRepository, CropRepository, StoreError};
use crate::types::{Breakpoint, ResponsiveCrop};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("No source image specified for crop")]
    NoSource,
    #[error("Source image does not exist: {0}")]
    SourceMissing(String),
    #[error("Breakpoint {0} not found")]
    BreakpointMissing(u32),
    #[error(transparent)]
    Crop(#[from] CropError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct ResponsiveImageGenerator {
    crop_processor: CropProcessor,
    converter: FormatConverter,
    media: MediaDirectory,
    layout: ArtifactLayout,
    webp_quality: u32,
    avif_quality: u32,
}

impl ResponsiveImageGenerator {
    pub fn new(
        crop_processor: CropProcessor,
        converter: FormatConverter,
        media: MediaDirectory,
        layout: ArtifactLayout,
    ) -> Self {
        Self {
            crop_processor,
            converter,
            media,
            layout,
            webp_quality: 85,
            avif_quality: 80,
        }
    }

    /// Qualities used for crops that do not carry their own.
    pub fn with_default_qualities(mut self, webp: u32, avif: u32) -> Self {
        self.webp_quality = webp;
        self.avif_quality = avif;
        self
    }

    /// Production wiring for an application rooted at `root`.
    pub fn from_config(root: &Path, config: &SliderConfig) -> Self {
        let probe = Arc::new(BinaryProbe::for_app_root(root));
        Self::new(
            CropProcessor::with_default_adapters(Quality::new(config.images.primary_quality)),
            FormatConverter::with_default_backends(probe),
            MediaDirectory::new(config.media_dir(root)),
            ArtifactLayout::new(config.images.responsive_path.clone()),
        )
        .with_default_qualities(config.images.webp_quality, config.images.avif_quality)
    }

    pub fn crop_processor(&self) -> &CropProcessor {
        &self.crop_processor
    }

    pub fn converter(&self) -> &FormatConverter {
        &self.converter
    }

    pub fn media(&self) -> &MediaDirectory {
        &self.media
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Absolute directory under which all derivatives are written.
    pub fn responsive_base_path(&self) -> PathBuf {
        self.media.absolute(self.layout.responsive_path())
    }

    /// Regenerate every artifact of `crop` for `breakpoint`.
    ///
    /// On success the crop carries the new artifact paths and the
    /// breakpoint's sort order. On error its previous artifacts may already
    /// be gone.
    pub fn generate(
        &self,
        crop: &mut ResponsiveCrop,
        breakpoint: &Breakpoint,
    ) -> Result<(), GenerateError> {
        let source = crop.source().ok_or(GenerateError::NoSource)?.to_string();
        let source_path = self.media.absolute(&source);
        if !source_path.is_file() {
            return Err(GenerateError::SourceMissing(source));
        }

        let hash = crop_hash(crop);
        self.delete_generated_images(crop);

        let relative = self.layout.file(
            crop.banner_id,
            &breakpoint.identifier,
            &hash,
            &source_extension(&source),
        );
        let cropped_path = self.media.absolute(&relative);

        let target_width = breakpoint.target_width;
        let (crop_width, crop_height) = effective_crop_size(
            crop.crop_width,
            crop.crop_height,
            (target_width, breakpoint.target_height),
        );
        let target_height = corrected_target_height(
            target_width,
            (crop_width, crop_height),
            breakpoint.target_height,
        );

        let rect = CropRect {
            x: crop.crop_x.unwrap_or(0),
            y: crop.crop_y.unwrap_or(0),
            width: crop_width,
            height: crop_height,
        };
        self.crop_processor
            .crop(&source_path, rect, (target_width, target_height), &cropped_path)?;
        crop.cropped_image = Some(relative);

        let primary_is_webp = cropped_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(TargetFormat::WebP.extension()));
        if crop.generate_webp && primary_is_webp {
            debug!(path = %cropped_path.display(), "Primary image is already WebP");
        } else if crop.generate_webp && self.converter.is_webp_supported() {
            let quality = crop.webp_quality.unwrap_or(self.webp_quality);
            crop.webp_image = self
                .converter
                .convert_to_webp(&cropped_path, quality, None)
                .and_then(|p| self.media.relative(&p));
        }

        if crop.generate_avif && self.converter.is_avif_supported() {
            let quality = crop.avif_quality.unwrap_or(self.avif_quality);
            crop.avif_image = self
                .converter
                .convert_to_avif(&cropped_path, quality, None)
                .and_then(|p| self.media.relative(&p));
        }

        crop.sort_order = breakpoint.sort_order;
        debug!(
            crop_id = ?crop.crop_id,
            breakpoint = %breakpoint.identifier,
            width = target_width,
            height = target_height,
            "Generated responsive image"
        );
        Ok(())
    }

    /// Regenerate every crop of a banner, saving each one as it completes.
    ///
    /// Crops without a source image are skipped. A crop that fails is
    /// logged once and left out of the result; its siblings still run.
    pub fn generate_for_banner(
        &self,
        crops: &impl CropRepository,
        breakpoints: &impl BreakpointRepository,
        banner_id: u32,
    ) -> Result<Vec<ResponsiveCrop>, GenerateError> {
        let mut generated = Vec::new();

        for mut crop in crops.crops_for_banner(banner_id)? {
            if crop.source().is_none() {
                continue;
            }

            match self.generate_and_save(crops, breakpoints, &mut crop) {
                Ok(()) => generated.push(crop),
                Err(e) => error!(
                    banner_id,
                    crop_id = ?crop.crop_id,
                    error = %e,
                    "Failed to generate responsive image"
                ),
            }
        }

        info!(banner_id, count = generated.len(), "Generated responsive images for banner");
        Ok(generated)
    }

    fn generate_and_save(
        &self,
        crops: &impl CropRepository,
        breakpoints: &impl BreakpointRepository,
        crop: &mut ResponsiveCrop,
    ) -> Result<(), GenerateError> {
        let breakpoint = breakpoints
            .get_breakpoint(crop.breakpoint_id)?
            .ok_or(GenerateError::BreakpointMissing(crop.breakpoint_id))?;
        self.generate(crop, &breakpoint)?;
        crops.save_crop(crop)?;
        Ok(())
    }

    /// Delete the crop's generated files and clear its artifact paths.
    ///
    /// Missing files are fine. Returns `false` if any existing file could
    /// not be removed; the paths are cleared either way.
    pub fn delete_generated_images(&self, crop: &mut ResponsiveCrop) -> bool {
        let mut deleted = true;
        let paths: Vec<String> = crop.artifact_paths().into_iter().map(String::from).collect();

        for path in paths.iter().filter(|p| !p.is_empty()) {
            if !self.media.exists(path) {
                continue;
            }
            if let Err(e) = self.media.delete(path) {
                warn!(path = %path, error = %e, "Failed to delete generated image");
                deleted = false;
            }
        }

        crop.clear_artifacts();
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockAdapter;
    use crate::imaging::converters::tests::SpyBackend;
    use crate::imaging::{ConversionBackend, TargetFormat};
    use crate::store::JsonStore;
    use crate::test_helpers::*;

    fn mock_generator(media: MediaDirectory, webp: bool, avif: bool) -> ResponsiveImageGenerator {
        let adapter = MockAdapter {
            fail_on: Some("broken".into()),
            ..MockAdapter::writing("mock")
        };
        let backends: Vec<Box<dyn ConversionBackend>> = vec![
            Box::new(SpyBackend::new("webp", TargetFormat::WebP, webp, true)),
            Box::new(SpyBackend::new("avif", TargetFormat::Avif, avif, true)),
        ];
        ResponsiveImageGenerator::new(
            CropProcessor::new(vec![Box::new(adapter)], Quality::default()),
            FormatConverter::new(backends),
            media,
            ArtifactLayout::default(),
        )
    }

    fn real_generator(media: MediaDirectory) -> ResponsiveImageGenerator {
        ResponsiveImageGenerator::new(
            CropProcessor::with_default_adapters(Quality::default()),
            FormatConverter::with_default_backends(Arc::new(BinaryProbe::new(
                media.root().join("no-bin"),
            ))),
            media,
            ArtifactLayout::default(),
        )
    }

    #[test]
    fn generates_all_three_artifacts() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "banner/hero.png", 400, 200);
        let generator = mock_generator(media.clone(), true, true);
        let mut crop = crop_for(12, 1, "banner/hero.png");
        let bp = breakpoint(1, "desktop", (800, 600), 10);

        generator.generate(&mut crop, &bp).unwrap();

        let hash = crop_hash(&crop);
        let base = format!("banner_slider/responsive/12/desktop_{hash}");
        assert_eq!(crop.cropped_image, Some(format!("{base}.png")));
        assert_eq!(crop.webp_image, Some(format!("{base}.webp")));
        assert_eq!(crop.avif_image, Some(format!("{base}.avif")));
        assert_eq!(crop.sort_order, 10);
        for path in crop.artifact_paths() {
            assert!(media.exists(path), "{path}");
        }
    }

    #[test]
    fn webp_primary_is_not_converted_onto_itself() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "banner/hero.webp", 200, 100);
        let generator = mock_generator(media.clone(), true, true);
        let mut crop = crop_for(12, 1, "banner/hero.webp");

        generator
            .generate(&mut crop, &breakpoint(1, "desktop", (100, 50), 10))
            .unwrap();

        let cropped = crop.cropped_image.as_deref().unwrap();
        assert!(cropped.ends_with(".webp"));
        assert_eq!(crop.webp_image, None);
        assert!(crop.avif_image.is_some());
        assert!(media.exists(cropped));
    }

    #[test]
    fn unsupported_formats_leave_paths_empty() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "hero.png", 100, 100);
        let generator = mock_generator(media, false, false);
        let mut crop = crop_for(1, 1, "hero.png");

        generator
            .generate(&mut crop, &breakpoint(1, "mobile", (100, 100), 40))
            .unwrap();

        assert!(crop.cropped_image.is_some());
        assert_eq!(crop.webp_image, None);
        assert_eq!(crop.avif_image, None);
    }

    #[test]
    fn disabled_formats_are_not_converted() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "hero.png", 100, 100);
        let generator = mock_generator(media, true, true);
        let mut crop = crop_for(1, 1, "hero.png");
        crop.generate_avif = false;

        generator
            .generate(&mut crop, &breakpoint(1, "mobile", (100, 100), 40))
            .unwrap();

        assert!(crop.webp_image.is_some());
        assert_eq!(crop.avif_image, None);
    }

    #[test]
    fn missing_source_reference_is_error() {
        let (_tmp, media) = scratch_media();
        let generator = mock_generator(media, true, true);
        let mut crop = ResponsiveCrop::new(1, 1);

        let result = generator.generate(&mut crop, &breakpoint(1, "desktop", (100, 100), 10));
        assert!(matches!(result, Err(GenerateError::NoSource)));
    }

    #[test]
    fn missing_source_file_is_error() {
        let (_tmp, media) = scratch_media();
        let generator = mock_generator(media, true, true);
        let mut crop = crop_for(1, 1, "gone.jpg");

        let result = generator.generate(&mut crop, &breakpoint(1, "desktop", (100, 100), 10));
        assert!(matches!(result, Err(GenerateError::SourceMissing(s)) if s == "gone.jpg"));
    }

    #[test]
    fn regeneration_replaces_previous_artifacts() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "hero.png", 400, 200);
        let generator = mock_generator(media.clone(), true, true);
        let bp = breakpoint(1, "desktop", (800, 600), 10);
        let mut crop = crop_for(5, 1, "hero.png");

        generator.generate(&mut crop, &bp).unwrap();
        let first: Vec<String> = crop.artifact_paths().into_iter().map(String::from).collect();
        assert_eq!(first.len(), 3);

        crop.crop_x = Some(20);
        generator.generate(&mut crop, &bp).unwrap();

        for old in &first {
            assert!(!media.exists(old), "stale artifact left behind: {old}");
        }
        for new in crop.artifact_paths() {
            assert!(media.exists(new));
            assert!(!first.iter().any(|o| o == new));
        }
        let remaining = std::fs::read_dir(media.absolute("banner_slider/responsive/5"))
            .unwrap()
            .count();
        assert_eq!(remaining, 3);
    }

    #[test]
    fn target_height_follows_crop_aspect() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "hero.png", 400, 300);
        let generator = real_generator(media.clone());
        let mut crop = crop_for(1, 1, "hero.png");
        crop.crop_x = Some(10);
        crop.crop_y = Some(20);
        crop.crop_width = Some(200);
        crop.crop_height = Some(100);
        crop.generate_avif = false;

        generator
            .generate(&mut crop, &breakpoint(1, "desktop", (800, 600), 10))
            .unwrap();

        let cropped = media.absolute(crop.cropped_image.as_deref().unwrap());
        assert_eq!(image::image_dimensions(&cropped).unwrap(), (800, 400));
        let webp = media.absolute(crop.webp_image.as_deref().unwrap());
        assert_eq!(image::image_dimensions(&webp).unwrap(), (800, 400));
    }

    #[test]
    fn crop_size_defaults_to_breakpoint_target() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "hero.png", 400, 300);
        let generator = real_generator(media.clone());
        let mut crop = crop_for(1, 1, "hero.png");
        crop.generate_webp = false;
        crop.generate_avif = false;

        generator
            .generate(&mut crop, &breakpoint(1, "mobile", (200, 100), 40))
            .unwrap();

        let cropped = media.absolute(crop.cropped_image.as_deref().unwrap());
        assert_eq!(image::image_dimensions(&cropped).unwrap(), (200, 100));
    }

    #[test]
    fn delete_clears_paths_and_tolerates_missing_files() {
        let (_tmp, media) = scratch_media();
        std::fs::write(media.absolute("a.jpg"), b"x").unwrap();
        let generator = mock_generator(media.clone(), true, true);
        let mut crop = ResponsiveCrop {
            cropped_image: Some("a.jpg".into()),
            webp_image: Some("never-written.webp".into()),
            ..ResponsiveCrop::new(1, 1)
        };

        assert!(generator.delete_generated_images(&mut crop));
        assert!(!media.exists("a.jpg"));
        assert!(!crop.has_artifacts());
    }

    #[test]
    fn batch_isolates_failing_crop() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "one.png", 100, 100);
        add_source_png(&media, "broken.png", 100, 100);
        add_source_png(&media, "three.png", 100, 100);
        let generator = mock_generator(media, true, true);

        let store = JsonStore::in_memory();
        for (id, name, order) in [(1, "desktop", 10), (2, "tablet", 30), (3, "mobile", 40)] {
            store
                .save_breakpoint(&mut breakpoint(id, name, (100, 100), order))
                .unwrap();
        }
        store.save_crop(&mut crop_for(9, 1, "one.png")).unwrap();
        store.save_crop(&mut crop_for(9, 2, "broken.png")).unwrap();
        store.save_crop(&mut crop_for(9, 3, "three.png")).unwrap();

        let mut generated = Vec::new();
        let logs = capture_logs(|| {
            generated = generator.generate_for_banner(&store, &store, 9).unwrap();
        });

        let sources: Vec<_> = generated.iter().filter_map(|c| c.source()).collect();
        assert_eq!(sources, vec!["one.png", "three.png"]);
        assert!(generated.iter().all(|c| c.webp_image.is_some() && c.avif_image.is_some()));
        assert_eq!(count_level(&logs, "ERROR"), 1, "{logs}");
        assert!(logs.contains("crop_id=Some(2)"), "{logs}");

        // Successful crops were saved as they completed
        let saved = store.get_crop(1).unwrap().unwrap();
        assert!(saved.cropped_image.is_some());
        assert!(store.get_crop(2).unwrap().unwrap().cropped_image.is_none());
    }

    #[test]
    fn batch_skips_crops_without_source() {
        let (_tmp, media) = scratch_media();
        let generator = mock_generator(media, true, true);
        let store = JsonStore::in_memory();
        store
            .save_breakpoint(&mut breakpoint(1, "desktop", (100, 100), 10))
            .unwrap();
        store.save_crop(&mut ResponsiveCrop::new(4, 1)).unwrap();

        let mut generated = Vec::new();
        let logs = capture_logs(|| {
            generated = generator.generate_for_banner(&store, &store, 4).unwrap();
        });

        assert!(generated.is_empty());
        assert_eq!(count_level(&logs, "ERROR"), 0);
    }

    #[test]
    fn batch_logs_missing_breakpoint() {
        let (_tmp, media) = scratch_media();
        add_source_png(&media, "one.png", 10, 10);
        let generator = mock_generator(media, true, true);
        let store = JsonStore::in_memory();
        store.save_crop(&mut crop_for(4, 77, "one.png")).unwrap();

        let logs = capture_logs(|| {
            assert!(generator.generate_for_banner(&store, &store, 4).unwrap().is_empty());
        });
        assert!(logs.contains("Breakpoint 77 not found"), "{logs}");
    }

    #[test]
    fn base_path_is_under_media_root() {
        let generator = mock_generator(MediaDirectory::new("/srv/media"), true, true);
        assert_eq!(
            generator.responsive_base_path(),
            PathBuf::from("/srv/media/banner_slider/responsive")
        );
    }

    #[test]
    fn from_config_searches_vendor_bin_under_root() {
        let generator =
            ResponsiveImageGenerator::from_config(Path::new("/srv/shop"), &SliderConfig::default());
        assert_eq!(
            generator.converter().bin_dir(),
            Some(Path::new("/srv/shop/vendor/bin"))
        );
    }
}
