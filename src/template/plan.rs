//! Mask precomputation for masked normalized cross-correlation.

use crate::image::ImageView;
use crate::palette::UNMATCHED;
use crate::util::{TileMatchError, TileMatchResult};

/// Precomputed mask and binary template for one pattern.
///
/// Pattern pixels carrying the primary index are foreground (template value
/// 1), pixels with any other palette index are background (template value
/// 0), and unmatched or transparent pixels lie outside the mask.
#[derive(Clone, Debug)]
pub struct PatternPlan {
    name: String,
    width: usize,
    height: usize,
    primary: u8,
    mask: Vec<u8>,
    template: Vec<u8>,
    foreground: Vec<(usize, usize)>,
    background: Vec<(usize, usize)>,
}

impl PatternPlan {
    /// Builds a plan from an indexed pattern.
    pub fn from_indexed(
        name: &str,
        pattern: ImageView<'_, u8>,
        primary: u8,
    ) -> TileMatchResult<Self> {
        if primary == UNMATCHED {
            return Err(TileMatchError::DegeneratePattern {
                name: name.to_owned(),
                reason: "primary color is not in the palette",
            });
        }
        let width = pattern.width();
        let height = pattern.height();
        let mut mask = vec![0u8; width * height];
        let mut template = vec![0u8; width * height];
        let mut foreground = Vec::new();
        let mut background = Vec::new();

        for y in 0..height {
            let row = pattern.row(y).ok_or(TileMatchError::BufferTooSmall {
                needed: (y + 1) * pattern.stride(),
                got: pattern.as_slice().len(),
            })?;
            for (x, &value) in row.iter().enumerate() {
                let idx = y * width + x;
                if value == primary {
                    mask[idx] = 1;
                    template[idx] = 1;
                    foreground.push((x, y));
                } else if value != UNMATCHED {
                    mask[idx] = 1;
                    background.push((x, y));
                }
            }
        }

        if foreground.is_empty() {
            return Err(TileMatchError::DegeneratePattern {
                name: name.to_owned(),
                reason: "no foreground pixels",
            });
        }

        Ok(Self {
            name: name.to_owned(),
            width,
            height,
            primary,
            mask,
            template,
            foreground,
            background,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Palette index treated as the pattern's shape.
    pub fn primary(&self) -> u8 {
        self.primary
    }

    /// Row-major mask, 1 where the pixel takes part in the correlation.
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Row-major binary template, 1 on foreground pixels.
    pub fn template(&self) -> &[u8] {
        &self.template
    }

    /// `(x, y)` offsets of foreground pixels.
    pub fn foreground(&self) -> &[(usize, usize)] {
        &self.foreground
    }

    /// `(x, y)` offsets of masked background pixels.
    pub fn background(&self) -> &[(usize, usize)] {
        &self.background
    }

    /// Number of pixels inside the mask.
    pub fn sum_w(&self) -> usize {
        self.foreground.len() + self.background.len()
    }

    /// Most foreground pixels that may miss while the score can still reach
    /// `threshold`.
    ///
    /// With `h` foreground hits out of `F`, the score is at most `sqrt(h / F)`.
    pub fn max_misses(&self, threshold: f32) -> usize {
        let total = self.foreground.len();
        if threshold <= 0.0 {
            return total;
        }
        let t = f64::from(threshold.min(1.0));
        let needed = (t * t * total as f64 - 1e-9).ceil().max(0.0) as usize;
        total - needed.min(total)
    }
}

#[cfg(test)]
mod tests {
    use super::PatternPlan;
    use crate::image::ImageView;
    use crate::palette::UNMATCHED;
    use crate::util::TileMatchError;

    #[test]
    fn mask_splits_foreground_background_and_ignored() {
        let data = [1u8, 0, UNMATCHED, 1];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = PatternPlan::from_indexed("p", view, 1).unwrap();
        assert_eq!(plan.mask(), &[1, 1, 0, 1]);
        assert_eq!(plan.template(), &[1, 0, 0, 1]);
        assert_eq!(plan.foreground(), &[(0, 0), (1, 1)]);
        assert_eq!(plan.background(), &[(1, 0)]);
        assert_eq!(plan.sum_w(), 3);
    }

    #[test]
    fn pattern_without_primary_is_degenerate() {
        let data = [0u8; 4];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let err = PatternPlan::from_indexed("blank", view, 1).unwrap_err();
        assert_eq!(
            err,
            TileMatchError::DegeneratePattern {
                name: "blank".into(),
                reason: "no foreground pixels",
            }
        );
    }

    #[test]
    fn miss_budget_follows_threshold() {
        let data = [1u8; 100];
        let view = ImageView::from_slice(&data, 10, 10).unwrap();
        let plan = PatternPlan::from_indexed("solid", view, 1).unwrap();
        assert_eq!(plan.max_misses(1.0), 0);
        assert_eq!(plan.max_misses(0.9), 19);
        assert_eq!(plan.max_misses(0.0), 100);
    }
}
