//! Color-indexed multi-pattern matching.
//!
//! Every palette color is tried against every pattern: the region is
//! binarized on the color and correlated with the pattern's masked shape.
//! A region with N patterns and M colors costs N×M correlation passes, which
//! is why matching runs on indexed images rather than RGB.

pub(crate) mod scan;

use crate::image::RegionImage;
use crate::kernel::ScanParams;
use crate::palette::{ColorLookup, IndexedImage, Palette};
use crate::template::{PatternPlan, ReferencePattern};
use crate::trace::{trace_event, trace_span};
use crate::util::{TileMatchError, TileMatchResult};
use crate::ImageView;
use std::sync::Arc;

/// Matching parameters.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Minimum correlation for a placement to count; 1.0 keeps only exact shapes.
    pub threshold: f32,
    /// Score rows in parallel when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            parallel: true,
        }
    }
}

/// A detected occurrence, relative to the region origin.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
    pub color_index: u8,
    pub pattern_name: String,
    pub x: usize,
    pub y: usize,
}

/// Finds every `(color, pattern, x, y)` whose score reaches the threshold.
///
/// Patterns that are not strictly smaller than the region on both axes are
/// skipped. Records are ordered by color, then pattern, then row-major
/// position.
pub fn find_matches(
    region: ImageView<'_, u8>,
    palette: &Palette,
    patterns: &[PatternPlan],
    cfg: &MatchConfig,
) -> TileMatchResult<Vec<MatchRecord>> {
    let _span = trace_span!(
        "find_matches",
        width = region.width(),
        height = region.height(),
        colors = palette.len(),
        patterns = patterns.len()
    )
    .entered();

    let params = ScanParams {
        threshold: cfg.threshold,
    };
    let mut records = Vec::new();
    for entry in palette.entries() {
        for plan in patterns {
            if plan.width() >= region.width() || plan.height() >= region.height() {
                continue;
            }
            let hits = scan::scan_pair(region, plan, entry.index, params, cfg.parallel)?;
            records.extend(hits.into_iter().map(|hit| MatchRecord {
                color_index: hit.color,
                pattern_name: plan.name().to_owned(),
                x: hit.x,
                y: hit.y,
            }));
        }
    }
    trace_event!("matches_found", count = records.len());
    Ok(records)
}

/// Immutable matching setup shared by every worker of a run.
pub struct Matcher {
    palette: Arc<Palette>,
    lookup: ColorLookup,
    plans: Vec<PatternPlan>,
    cfg: MatchConfig,
}

impl Matcher {
    /// Precomputes pattern plans with `primary` as the shape color.
    pub fn new(
        palette: Arc<Palette>,
        patterns: &[ReferencePattern],
        primary: [u8; 3],
    ) -> TileMatchResult<Self> {
        let lookup = palette.lookup();
        let primary_index = lookup.index_of([primary[0], primary[1], primary[2], 255]);
        let plans = patterns
            .iter()
            .map(|pattern| pattern.plan(primary_index))
            .collect::<TileMatchResult<Vec<_>>>()?;
        if plans.is_empty() {
            return Err(TileMatchError::InvalidInput("no reference patterns"));
        }
        Ok(Self {
            palette,
            lookup,
            plans,
            cfg: MatchConfig::default(),
        })
    }

    /// Replaces the matching configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    pub fn lookup(&self) -> &ColorLookup {
        &self.lookup
    }

    pub fn plans(&self) -> &[PatternPlan] {
        &self.plans
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Matches an already indexed region.
    pub fn match_indexed(&self, region: &IndexedImage) -> TileMatchResult<Vec<MatchRecord>> {
        find_matches(region.view(), &self.palette, &self.plans, &self.cfg)
    }

    /// Indexes an assembled region and matches it.
    pub fn match_region(&self, region: &RegionImage) -> TileMatchResult<Vec<MatchRecord>> {
        let indexed = self.lookup.to_indexed(region.pixels())?;
        self.match_indexed(&indexed)
    }
}
