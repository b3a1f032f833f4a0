//! Rayon-parallel kernels (feature-gated).
//!
//! Rows of placements are scored in parallel; results are concatenated in
//! row order so the output matches the scalar kernel exactly.

use crate::kernel::{placement_bounds, score_window, Hit, ScanParams};
use crate::template::PatternPlan;
use crate::util::TileMatchResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel full scan for the masked NCC kernel.
pub fn masked_ncc_scan_full_par(
    image: ImageView<'_, u8>,
    plan: &PatternPlan,
    color: u8,
    params: ScanParams,
) -> TileMatchResult<Vec<Hit>> {
    let (max_x, max_y) = placement_bounds(image, plan)?;
    let max_misses = plan.max_misses(params.threshold);

    let rows: Vec<Vec<Hit>> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut row_hits = Vec::new();
            for x in 0..=max_x {
                if let Some(score) =
                    score_window(image, plan, x, y, color, max_misses, params.threshold)
                {
                    row_hits.push(Hit { x, y, score, color });
                }
            }
            row_hits
        })
        .collect();

    Ok(rows.into_iter().flatten().collect())
}
