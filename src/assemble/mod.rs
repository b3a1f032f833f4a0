//! Reconstruction of canvas regions from stored tiles.
//!
//! A region is rebuilt by fetching every tile that intersects it
//! concurrently into one shared buffer. Tiles of one pass write disjoint
//! rectangles, which is checked before any request is issued.

mod grid;

pub use grid::{ensure_disjoint, TileGrid, TilePlacement};

use crate::canvas::{CanvasDescriptor, DateKey, RegionRect, RegionRequest, TimeOfDayKey};
use crate::fetch::{fetch_history, fetch_tile, Endpoints, RemoteStore, TileOutcome};
use crate::image::RegionImage;
use crate::trace::{trace_event, trace_warn};
use crate::util::{RetryPolicy, TileMatchError, TileMatchResult};
use futures::future::try_join_all;
use std::sync::{Arc, Mutex};

/// Which snapshot of a day to reconstruct.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    /// The day's initial full snapshot.
    #[default]
    DayStart,
    /// The day snapshot overlaid with the most recent intra-day snapshot.
    Latest,
    /// The day snapshot overlaid with a specific intra-day snapshot.
    At(TimeOfDayKey),
}

/// Assembly parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembleConfig {
    pub retry: RetryPolicy,
    /// How many days to step back while the assembled day is a single color.
    pub max_rollback_days: u32,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_rollback_days: 1,
        }
    }
}

/// Builds [`RegionImage`]s from the tile storage.
pub struct Assembler<S: ?Sized> {
    store: Arc<S>,
    endpoints: Endpoints,
    cfg: AssembleConfig,
}

impl<S: RemoteStore + ?Sized> Assembler<S> {
    pub fn new(store: Arc<S>, endpoints: Endpoints, cfg: AssembleConfig) -> Self {
        Self {
            store,
            endpoints,
            cfg,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn config(&self) -> &AssembleConfig {
        &self.cfg
    }

    /// Reconstructs `rect` from the day snapshot of `date` without fallback.
    pub async fn assemble_day(
        &self,
        canvas: &CanvasDescriptor,
        rect: RegionRect,
        date: DateKey,
    ) -> TileMatchResult<RegionImage> {
        self.composite(canvas, RegionImage::new(rect), date, None, true)
            .await
            .map_err(|err| request(canvas, rect, date).fail(err))
    }

    /// Reconstructs `rect` for `date`, stepping back a day while the result is
    /// a single color.
    pub async fn assemble(
        &self,
        canvas: &CanvasDescriptor,
        rect: RegionRect,
        date: DateKey,
    ) -> TileMatchResult<RegionImage> {
        self.with_fallback(canvas, rect, date)
            .await
            .map_err(|err| request(canvas, rect, date).fail(err))
    }

    /// Layers the intra-day snapshot `time` of `date` on top of `base`.
    ///
    /// Tiles missing for that time leave the base pixels untouched. The
    /// corrupt `"0000"` snapshot is never fetched; `base` is returned as is.
    pub async fn assemble_relative(
        &self,
        canvas: &CanvasDescriptor,
        base: &RegionImage,
        date: DateKey,
        time: &TimeOfDayKey,
    ) -> TileMatchResult<RegionImage> {
        self.relative(canvas, base.clone(), date, time)
            .await
            .map_err(|err| request(canvas, base.rect(), date).fail(err))
    }

    /// Reconstructs `rect` in the requested snapshot mode.
    pub async fn assemble_snapshot(
        &self,
        canvas: &CanvasDescriptor,
        rect: RegionRect,
        date: DateKey,
        mode: &SnapshotMode,
    ) -> TileMatchResult<RegionImage> {
        self.snapshot(canvas, rect, date, mode)
            .await
            .map_err(|err| request(canvas, rect, date).fail(err))
    }

    /// Pins `mode` to one concrete snapshot of `date`.
    ///
    /// `Latest` is looked up in the history once and becomes `At(key)`, or
    /// `DayStart` when the day has no usable intra-day snapshot. Callers that
    /// assemble several regions of one scene resolve first and pass the
    /// result to every region.
    pub async fn resolve_snapshot(
        &self,
        canvas: &CanvasDescriptor,
        date: DateKey,
        mode: &SnapshotMode,
    ) -> TileMatchResult<SnapshotMode> {
        match mode {
            SnapshotMode::Latest => {
                let times = fetch_history(
                    self.store.as_ref(),
                    &self.endpoints,
                    &self.cfg.retry,
                    date,
                    &canvas.id,
                )
                .await?;
                Ok(match times.into_iter().last() {
                    Some(time) if !time.is_corrupt() => SnapshotMode::At(time),
                    Some(_) => {
                        trace_warn!(
                            "corrupt_snapshot_skipped",
                            canvas = %canvas.id,
                            date = %date
                        );
                        SnapshotMode::DayStart
                    }
                    None => SnapshotMode::DayStart,
                })
            }
            pinned => Ok(pinned.clone()),
        }
    }

    async fn snapshot(
        &self,
        canvas: &CanvasDescriptor,
        rect: RegionRect,
        date: DateKey,
        mode: &SnapshotMode,
    ) -> TileMatchResult<RegionImage> {
        let mode = self.resolve_snapshot(canvas, date, mode).await?;
        let base = self.with_fallback(canvas, rect, date).await?;
        match &mode {
            SnapshotMode::At(time) => self.relative(canvas, base, date, time).await,
            SnapshotMode::DayStart | SnapshotMode::Latest => Ok(base),
        }
    }

    async fn with_fallback(
        &self,
        canvas: &CanvasDescriptor,
        rect: RegionRect,
        date: DateKey,
    ) -> TileMatchResult<RegionImage> {
        let mut day = date;
        let mut image = self
            .composite(canvas, RegionImage::new(rect), day, None, true)
            .await?;
        for _ in 0..self.cfg.max_rollback_days {
            if !image.is_single_color() {
                break;
            }
            let previous = day.previous_day()?;
            trace_warn!(
                "faulty_day",
                canvas = %canvas.id,
                date = %day,
                fallback = %previous,
                rect = %rect
            );
            day = previous;
            image = self
                .composite(canvas, RegionImage::new(rect), day, None, true)
                .await?;
        }
        Ok(image)
    }

    async fn relative(
        &self,
        canvas: &CanvasDescriptor,
        base: RegionImage,
        date: DateKey,
        time: &TimeOfDayKey,
    ) -> TileMatchResult<RegionImage> {
        if time.is_corrupt() {
            trace_warn!("corrupt_snapshot_skipped", canvas = %canvas.id, date = %date);
            return Ok(base);
        }
        self.composite(canvas, base, date, Some(time), false).await
    }

    /// Fetches every tile intersecting `image` and pastes it in place.
    async fn composite(
        &self,
        canvas: &CanvasDescriptor,
        image: RegionImage,
        date: DateKey,
        time: Option<&TimeOfDayKey>,
        required: bool,
    ) -> TileMatchResult<RegionImage> {
        let rect = image.rect();
        let grid = TileGrid::cover(rect, canvas.effective_size(date));
        let placements = grid.placements(rect);
        ensure_disjoint(&placements)?;

        let background = canvas.background();
        let store = self.store.as_ref();
        let retry = &self.cfg.retry;
        let dest = Mutex::new(image);
        let shared = &dest;
        let fetches: Vec<_> = placements
            .into_iter()
            .map(|placement| {
                let url = match time {
                    Some(time) => {
                        self.endpoints
                            .time_tile_url(date, &canvas.id, time, placement.tile)
                    }
                    None => self.endpoints.day_tile_url(date, &canvas.id, placement.tile),
                };
                let offset = (placement.dest_x, placement.dest_y);
                async move {
                    fetch_tile(store, retry, &url, shared, offset, background, required).await
                }
            })
            .collect();
        let outcomes = try_join_all(fetches).await?;
        trace_event!(
            "region_composited",
            x = rect.x,
            y = rect.y,
            tiles = outcomes.len(),
            pasted = outcomes
                .iter()
                .filter(|outcome| **outcome == TileOutcome::Pasted)
                .count(),
            required = required
        );

        dest.into_inner().map_err(|_| TileMatchError::PoisonedBuffer)
    }
}

fn request(canvas: &CanvasDescriptor, rect: RegionRect, date: DateKey) -> RegionRequest {
    RegionRequest {
        canvas_id: canvas.id.clone(),
        rect,
        date,
    }
}
