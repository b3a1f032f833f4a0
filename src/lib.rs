//! TileMatch rebuilds canvas regions from remotely stored 256×256 tiles and
//! scans them for reference patterns under every palette recoloring.
//!
//! The pipeline runs in four stages:
//!
//! 1. [`distribute`] splits a large area into megachunks and admits a bounded
//!    number of them at a time.
//! 2. [`assemble`] fetches the tiles of each chunk concurrently and composites
//!    them, falling back to the previous day when a day is blank.
//! 3. [`palette`] turns the RGBA result into a palette-indexed image.
//! 4. [`search`] correlates every (color, pattern) pair and reports exact
//!    shape matches to a [`sink`].
//!
//! [`pipeline::Scanner`] wires the stages together. Row-parallel matching is
//! available via the `rayon` feature.

pub mod assemble;
pub mod canvas;
pub mod distribute;
pub mod fetch;
pub mod image;
pub mod kernel;
pub mod palette;
pub mod pipeline;
pub mod search;
pub mod sink;
pub mod template;
mod trace;
pub mod util;

pub use assemble::{AssembleConfig, Assembler, SnapshotMode, TileGrid};
pub use canvas::{CanvasDescriptor, DateKey, RegionRect, RegionRequest, TimeOfDayKey};
pub use distribute::{partition, DistributeConfig, Distributor, FailurePolicy, Megachunk};
pub use fetch::{Endpoints, FetchResponse, HttpStore, RemoteStore};
pub use image::{ImageView, RegionImage};
pub use palette::{ColorLookup, IndexedImage, Palette, PaletteEntry, UNMATCHED};
pub use pipeline::{ScanReport, Scanner};
pub use search::{find_matches, MatchConfig, MatchRecord, Matcher};
pub use sink::{LinkFormat, LogSink, MatchSink};
pub use template::{load_patterns, PatternPlan, ReferencePattern};
pub use util::{RetryPolicy, TileMatchError, TileMatchResult};
