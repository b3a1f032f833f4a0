//! Masked normalized cross-correlation kernels over indexed images.
//!
//! For a palette index `c`, the region is binarized as `I = [pixel == c]`
//! and compared with the pattern's binary template `T` inside its mask `M`:
//!
//! `score = Σ_M T·I / sqrt(Σ_M T² · Σ_M I²)`
//!
//! A score of exactly 1.0 means every foreground pixel has color `c` and no
//! masked background pixel does.

use crate::template::PatternPlan;
use crate::util::{TileMatchError, TileMatchResult};
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Minimum score for a placement to be reported.
    pub threshold: f32,
}

/// A placement whose score reached the threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// X coordinate (column) of the pattern's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the pattern's top-left corner.
    pub y: usize,
    pub score: f32,
    /// Palette index the region was binarized on.
    pub color: u8,
}

/// Kernel trait for scoring and scan operations.
pub trait Kernel {
    type Plan;

    /// Computes the score at a single placement (top-left coordinates).
    ///
    /// Returns `f32::NEG_INFINITY` when the placement is out of range or the
    /// score is undefined (no masked pixel has color `color`).
    fn score_at(image: ImageView<'_, u8>, plan: &Self::Plan, x: usize, y: usize, color: u8)
        -> f32;

    /// Scans every valid placement and returns hits in row-major order.
    fn scan_full(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        color: u8,
        params: ScanParams,
    ) -> TileMatchResult<Vec<Hit>>;
}

/// Largest valid top-left placement, or an error if the pattern does not fit.
pub(crate) fn placement_bounds(
    image: ImageView<'_, u8>,
    plan: &PatternPlan,
) -> TileMatchResult<(usize, usize)> {
    if image.width() < plan.width() || image.height() < plan.height() {
        return Err(TileMatchError::InvalidDimensions {
            width: plan.width(),
            height: plan.height(),
        });
    }
    Ok((image.width() - plan.width(), image.height() - plan.height()))
}

/// Scores one placement, bailing out as soon as the threshold is unreachable.
///
/// The caller guarantees `(x, y)` is a valid placement.
#[inline]
pub(crate) fn score_window(
    image: ImageView<'_, u8>,
    plan: &PatternPlan,
    x: usize,
    y: usize,
    color: u8,
    max_misses: usize,
    threshold: f32,
) -> Option<f32> {
    let data = image.as_slice();
    let stride = image.stride();
    let at = |(dx, dy): (usize, usize)| data[(y + dy) * stride + x + dx];

    let mut misses = 0usize;
    for &offset in plan.foreground() {
        if at(offset) != color {
            misses += 1;
            if misses > max_misses {
                return None;
            }
        }
    }
    let hits = plan.foreground().len() - misses;
    if hits == 0 {
        return None;
    }

    let bg_hits = plan
        .background()
        .iter()
        .filter(|&&offset| at(offset) == color)
        .count();

    let sum_t2 = plan.foreground().len() as f64;
    let sum_i2 = (hits + bg_hits) as f64;
    let score = hits as f64 / (sum_t2 * sum_i2).sqrt();
    if score >= f64::from(threshold) {
        Some(score as f32)
    } else {
        None
    }
}

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;
