//! Default breakpoints for a new slider.

use crate::store::BreakpointRepository;
use crate::types::Breakpoint;
use tracing::{error, info};

/// The desktop/tablet/mobile set every new slider starts with.
pub fn default_breakpoints(slider_id: u32) -> Vec<Breakpoint> {
    let make = |name: &str, media_query: &str, min_width, size: (u32, u32), sort_order| Breakpoint {
        id: None,
        slider_id,
        name: name.to_string(),
        identifier: name.to_lowercase(),
        media_query: media_query.to_string(),
        min_width,
        target_width: size.0,
        target_height: size.1,
        sort_order,
        is_active: true,
    };
    vec![
        make("Desktop", "(min-width: 1200px)", 1200, (1920, 600), 10),
        make(
            "Tablet",
            "(min-width: 768px) and (max-width: 1199px)",
            768,
            (992, 400),
            30,
        ),
        make("Mobile", "(max-width: 767px)", 0, (767, 500), 40),
    ]
}

/// Seed the defaults for `slider_id` unless it already owns breakpoints.
///
/// Returns the breakpoints that were saved. A breakpoint that fails to save
/// is logged and skipped.
pub fn create_for_slider(repo: &impl BreakpointRepository, slider_id: u32) -> Vec<Breakpoint> {
    match repo.breakpoints_for_slider(slider_id) {
        Ok(existing) if !existing.is_empty() => return Vec::new(),
        Ok(_) => {}
        Err(e) => {
            error!(slider_id, error = %e, "Failed to load breakpoints for slider");
            return Vec::new();
        }
    }

    let mut created = Vec::new();
    for mut breakpoint in default_breakpoints(slider_id) {
        match repo.save_breakpoint(&mut breakpoint) {
            Ok(_) => created.push(breakpoint),
            Err(e) => error!(
                slider_id,
                identifier = %breakpoint.identifier,
                error = %e,
                "Failed to create default breakpoint"
            ),
        }
    }
    info!(slider_id, count = created.len(), "Created default breakpoints");
    created
}
