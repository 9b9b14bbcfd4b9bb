//! Uncached, stage-by-stage evaluation of a stack.
//!
//! Every path that produces a stack image (commit, preview miss, reorder)
//! ends up here, so a cached result is always what a replay would produce.

use crate::core::error::FilterResult;
use crate::core::filter::FilterSpec;
use crate::core::types::ImageValue;
use crate::filters::registry::FilterRegistry;
use std::time::{Duration, Instant};

/// Outcome of a replay.
#[derive(Debug, Clone)]
pub struct Replay {
    /// Composed output.
    pub image: ImageValue,
    /// Number of stages applied.
    pub applied: usize,
    /// Number of invisible stages skipped.
    pub skipped: usize,
    /// Wall time of the replay.
    pub duration: Duration,
}

/// Apply every visible stage of `specs`, in order, starting from `base`.
///
/// Invisible stages are skipped entirely: their filter is never instantiated,
/// so an unknown or misconfigured hidden stage does not fail the replay.
pub fn replay(registry: &FilterRegistry, base: &ImageValue, specs: &[FilterSpec]) -> FilterResult<Replay> {
    let start = Instant::now();
    let mut image = base.clone();
    let mut applied = 0;
    let mut skipped = 0;

    for spec in specs {
        if !spec.visible {
            skipped += 1;
            continue;
        }

        let stage_start = Instant::now();
        let filter = registry.create(spec.library, &spec.name, spec.parameter.clone())?;
        let output = filter.apply(image.image())?;
        image = ImageValue::new(output);
        applied += 1;

        log::trace!(
            "applied {}/{} ({}) in {:?}",
            spec.library,
            spec.name,
            spec.identifier,
            stage_start.elapsed()
        );
    }

    Ok(Replay {
        image,
        applied,
        skipped,
        duration: start.elapsed(),
    })
}
