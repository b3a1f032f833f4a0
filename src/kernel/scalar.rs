//! Scalar reference kernel.

use crate::kernel::{placement_bounds, score_window, Hit, Kernel, ScanParams};
use crate::template::PatternPlan;
use crate::util::TileMatchResult;
use crate::ImageView;

/// Scalar masked NCC kernel.
pub struct MaskedNccScalar;

impl Kernel for MaskedNccScalar {
    type Plan = PatternPlan;

    fn score_at(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        x: usize,
        y: usize,
        color: u8,
    ) -> f32 {
        let Ok((max_x, max_y)) = placement_bounds(image, plan) else {
            return f32::NEG_INFINITY;
        };
        if x > max_x || y > max_y {
            return f32::NEG_INFINITY;
        }
        let total = plan.foreground().len();
        score_window(image, plan, x, y, color, total, f32::NEG_INFINITY)
            .unwrap_or(f32::NEG_INFINITY)
    }

    fn scan_full(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        color: u8,
        params: ScanParams,
    ) -> TileMatchResult<Vec<Hit>> {
        let (max_x, max_y) = placement_bounds(image, plan)?;
        let max_misses = plan.max_misses(params.threshold);

        let mut hits = Vec::new();
        for y in 0..=max_y {
            for x in 0..=max_x {
                if let Some(score) =
                    score_window(image, plan, x, y, color, max_misses, params.threshold)
                {
                    hits.push(Hit { x, y, score, color });
                }
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::MaskedNccScalar;
    use crate::kernel::{Kernel, ScanParams};
    use crate::template::PatternPlan;
    use crate::ImageView;

    // 3x3 plus sign: primary index 1, background index 0.
    const PLUS: [u8; 9] = [0, 1, 0, 1, 1, 1, 0, 1, 0];

    fn region_with_plus(width: usize, height: usize, x0: usize, y0: usize) -> Vec<u8> {
        let mut region = vec![0u8; width * height];
        for ty in 0..3 {
            for tx in 0..3 {
                if PLUS[ty * 3 + tx] == 1 {
                    region[(y0 + ty) * width + x0 + tx] = 2;
                }
            }
        }
        region
    }

    #[test]
    fn exact_shape_scores_one() {
        let region = region_with_plus(8, 6, 3, 2);
        let image = ImageView::from_slice(&region, 8, 6).unwrap();
        let tpl = ImageView::from_slice(&PLUS, 3, 3).unwrap();
        let plan = PatternPlan::from_indexed("plus", tpl, 1).unwrap();

        assert_eq!(MaskedNccScalar::score_at(image, &plan, 3, 2, 2), 1.0);
        assert!(MaskedNccScalar::score_at(image, &plan, 2, 2, 2) < 1.0);
        assert_eq!(
            MaskedNccScalar::score_at(image, &plan, 6, 0, 2),
            f32::NEG_INFINITY
        );

        let hits =
            MaskedNccScalar::scan_full(image, &plan, 2, ScanParams { threshold: 1.0 }).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].x, hits[0].y), (3, 2));
    }

    #[test]
    fn solid_block_does_not_match_shape() {
        let region = vec![5u8; 36];
        let image = ImageView::from_slice(&region, 6, 6).unwrap();
        let tpl = ImageView::from_slice(&PLUS, 3, 3).unwrap();
        let plan = PatternPlan::from_indexed("plus", tpl, 1).unwrap();
        let hits =
            MaskedNccScalar::scan_full(image, &plan, 5, ScanParams { threshold: 1.0 }).unwrap();
        assert!(hits.is_empty());
        // All 5 foreground pixels hit, 4 background pixels also hit.
        let expected = 5.0 / (5.0f64 * 9.0).sqrt();
        let score = MaskedNccScalar::score_at(image, &plan, 0, 0, 5);
        assert!((f64::from(score) - expected).abs() < 1e-6);
    }

    #[test]
    fn early_exit_agrees_with_full_score() {
        let mut region = region_with_plus(9, 9, 2, 2);
        region[3 * 9 + 2] = 0; // knock out one arm pixel
        let image = ImageView::from_slice(&region, 9, 9).unwrap();
        let tpl = ImageView::from_slice(&PLUS, 3, 3).unwrap();
        let plan = PatternPlan::from_indexed("plus", tpl, 1).unwrap();
        let threshold = 0.85;
        let hits = MaskedNccScalar::scan_full(image, &plan, 2, ScanParams { threshold }).unwrap();
        for y in 0..=6 {
            for x in 0..=6 {
                let full = MaskedNccScalar::score_at(image, &plan, x, y, 2);
                let reported = hits.iter().any(|h| h.x == x && h.y == y);
                assert_eq!(reported, full >= threshold, "placement ({x}, {y})");
            }
        }
    }
}
