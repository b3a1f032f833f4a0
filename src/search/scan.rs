//! Dispatch of one (color, pattern) correlation pass to a kernel.

use crate::kernel::scalar::MaskedNccScalar;
use crate::kernel::{Hit, Kernel, ScanParams};
use crate::template::PatternPlan;
use crate::util::TileMatchResult;
use crate::ImageView;

/// Scans `region` for `plan` binarized on `color`.
pub(crate) fn scan_pair(
    region: ImageView<'_, u8>,
    plan: &PatternPlan,
    color: u8,
    params: ScanParams,
    parallel: bool,
) -> TileMatchResult<Vec<Hit>> {
    #[cfg(feature = "rayon")]
    if parallel {
        return crate::kernel::rayon::masked_ncc_scan_full_par(region, plan, color, params);
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    <MaskedNccScalar as Kernel>::scan_full(region, plan, color, params)
}
