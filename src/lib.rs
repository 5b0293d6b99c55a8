//! # Slider Media
//!
//! Responsive images for banner sliders. A slider owns breakpoints (named
//! viewport ranges with a target image size); every banner owns one crop
//! per breakpoint describing which rectangle of its source image to use.
//! This crate turns those crops into files:
//!
//! ```text
//! source image ──crop+resize──▶ desktop_3f9a0c1e.jpg ──convert──▶ desktop_3f9a0c1e.webp
//!                                                    └─convert──▶ desktop_3f9a0c1e.avif
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`generator`] | Regenerates one crop or every crop of a banner |
//! | [`upload`] | Stores client-compressed images, bypassing crop and conversion |
//! | [`imaging`] | Crop adapters, WebP/AVIF backends, binary detection, sizing math |
//! | [`naming`] | Content hash and artifact path scheme |
//! | [`breakpoints`] | Default desktop/tablet/mobile breakpoints |
//! | [`store`] | Repository traits and the JSON-file store |
//! | [`media`] | Media directory path resolution and file moves |
//! | [`types`] | `Breakpoint` and `ResponsiveCrop` records |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Loud Crops, Soft Conversions
//!
//! Without a cropped primary image there is nothing to show, so every crop
//! problem is an error. WebP and AVIF are optional extras: a format nobody
//! can encode on this machine leaves its path empty and the slider falls
//! back to the primary image.
//!
//! ## Ordered Backends
//!
//! Each derivative format has a priority-ordered chain of encoders
//! (libwebp, the `image` crate, then the external `cwebp`/`cavif` binaries
//! in `vendor/bin`). The first available encoder that succeeds wins; a
//! failure falls through to the next one.
//!
//! ## Hash-Named Artifacts
//!
//! File names embed a short hash of the source and every crop/quality
//! parameter. Changing anything yields a new URL, so browsers and CDNs never
//! serve a stale crop and no version counter is needed. Regeneration always
//! deletes the previous files first.

pub mod breakpoints;
pub mod config;
pub mod generator;
pub mod imaging;
pub mod media;
pub mod naming;
pub mod output;
pub mod store;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
