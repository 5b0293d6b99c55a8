//! CLI output formatting.
//!
//! Every command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Formats
//!
//! ```text
//! Crop adapter: image-rs
//! WebP: supported
//! AVIF: not supported
//! Binaries: /srv/shop/vendor/bin
//! ```
//!
//! ## Breakpoints
//!
//! ```text
//! 001 desktop 1920x600 (min-width: 1200px)
//! 002 tablet 992x400 (min-width: 768px) and (max-width: 1199px)
//! ```
//!
//! ## Crops
//!
//! ```text
//! Banner 12
//! 001 crop 4 (breakpoint 1)
//!     Image: banner_slider/responsive/12/desktop_3f9a0c1e.jpg
//!     WebP: banner_slider/responsive/12/desktop_3f9a0c1e.webp
//!     AVIF: -
//!
//! Generated 1 of 3 crops
//! ```

use crate::imaging::SupportedFormats;
use crate::types::{Breakpoint, ResponsiveCrop};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn support(flag: bool) -> &'static str {
    if flag { "supported" } else { "not supported" }
}

fn artifact(path: Option<&str>) -> &str {
    path.unwrap_or("-")
}

pub fn format_formats(
    formats: SupportedFormats,
    adapter: Option<&str>,
    bin_dir: Option<&Path>,
) -> Vec<String> {
    vec![
        format!("Crop adapter: {}", adapter.unwrap_or("none")),
        format!("WebP: {}", support(formats.webp)),
        format!("AVIF: {}", support(formats.avif)),
        format!(
            "Binaries: {}",
            bin_dir.map_or_else(|| "none".to_string(), |dir| dir.display().to_string())
        ),
    ]
}

pub fn print_formats(formats: SupportedFormats, adapter: Option<&str>, bin_dir: Option<&Path>) {
    for line in format_formats(formats, adapter, bin_dir) {
        println!("{}", line);
    }
}

pub fn format_breakpoints(breakpoints: &[Breakpoint]) -> Vec<String> {
    if breakpoints.is_empty() {
        return vec!["No breakpoints created".to_string()];
    }
    breakpoints
        .iter()
        .enumerate()
        .map(|(i, bp)| {
            format!(
                "{} {} {}x{} {}",
                format_index(i + 1),
                bp.identifier,
                bp.target_width,
                bp.target_height,
                bp.media_query
            )
        })
        .collect()
}

pub fn print_breakpoints(breakpoints: &[Breakpoint]) {
    for line in format_breakpoints(breakpoints) {
        println!("{}", line);
    }
}

/// One crop: header plus its three artifact paths.
pub fn format_crop(index: usize, crop: &ResponsiveCrop) -> Vec<String> {
    let id = crop
        .crop_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "?".to_string());
    vec![
        format!(
            "{} crop {} (breakpoint {})",
            format_index(index),
            id,
            crop.breakpoint_id
        ),
        format!("    Image: {}", artifact(crop.cropped_image.as_deref())),
        format!("    WebP: {}", artifact(crop.webp_image.as_deref())),
        format!("    AVIF: {}", artifact(crop.avif_image.as_deref())),
    ]
}

/// Result of regenerating a banner: `total` is how many crops it owns.
pub fn format_generate_output(banner_id: u32, crops: &[ResponsiveCrop], total: usize) -> Vec<String> {
    let mut lines = vec![format!("Banner {}", banner_id)];
    for (i, crop) in crops.iter().enumerate() {
        lines.extend(format_crop(i + 1, crop));
    }
    lines.push(String::new());
    lines.push(format!("Generated {} of {} crops", crops.len(), total));
    lines
}

pub fn print_generate_output(banner_id: u32, crops: &[ResponsiveCrop], total: usize) {
    for line in format_generate_output(banner_id, crops, total) {
        println!("{}", line);
    }
}

pub fn print_crop(crop: &ResponsiveCrop) {
    for line in format_crop(1, crop) {
        println!("{}", line);
    }
}
