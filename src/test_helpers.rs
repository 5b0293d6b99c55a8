//! Shared test utilities: fixture records, a scratch media directory, and a
//! log capture for asserting on emitted `tracing` events.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (tmp, media) = scratch_media();
//! add_source_png(&media, "banner/hero.png", 400, 200);
//!
//! let logs = capture_logs(|| run_something());
//! assert_eq!(count_level(&logs, "ERROR"), 1);
//! ```

use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::imaging::converters::tests::create_test_png;
use crate::media::MediaDirectory;
use crate::types::{Breakpoint, ResponsiveCrop};

// =========================================================================
// Fixtures
// =========================================================================

/// A temp dir holding a `media/` directory.
pub fn scratch_media() -> (TempDir, MediaDirectory) {
    let tmp = TempDir::new().unwrap();
    let media = MediaDirectory::new(tmp.path().join("media"));
    std::fs::create_dir_all(media.root()).unwrap();
    (tmp, media)
}

/// Write a synthetic PNG at a media-relative path.
pub fn add_source_png(media: &MediaDirectory, relative: &str, width: u32, height: u32) {
    let path = media.absolute(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    create_test_png(&path, width, height);
}

pub fn breakpoint(id: u32, identifier: &str, target: (u32, u32), sort_order: i32) -> Breakpoint {
    Breakpoint {
        id: Some(id),
        slider_id: 1,
        name: identifier.to_string(),
        identifier: identifier.to_string(),
        media_query: String::new(),
        min_width: 0,
        target_width: target.0,
        target_height: target.1,
        sort_order,
        is_active: true,
    }
}

/// Crop of `banner_id` for `breakpoint_id` over `source`, both derivatives on.
pub fn crop_for(banner_id: u32, breakpoint_id: u32, source: &str) -> ResponsiveCrop {
    ResponsiveCrop {
        source_image: Some(source.to_string()),
        ..ResponsiveCrop::new(banner_id, breakpoint_id)
    }
}

// =========================================================================
// Log capture
// =========================================================================

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return everything it logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = capture.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

/// Number of captured lines at `level` (`"ERROR"`, `"WARN"`, ...).
pub fn count_level(logs: &str, level: &str) -> usize {
    logs.lines()
        .filter(|line| line.split_whitespace().nth(1) == Some(level))
        .count()
}
