//! End-to-end scan: distribution on one side, matching on the other.
//!
//! Assembly and matching run concurrently and meet at the bounded hand-off
//! queue. Matching is CPU-bound, so each chunk is indexed and scanned on the
//! blocking pool while the distributor keeps fetching.

use crate::assemble::SnapshotMode;
use crate::canvas::{CanvasDescriptor, DateKey, RegionRect};
use crate::distribute::{AssembledChunk, DistributionReport, Distributor};
use crate::fetch::RemoteStore;
use crate::image::io::save_region;
use crate::search::Matcher;
use crate::sink::MatchSink;
use crate::trace::trace_event;
use crate::util::{TileMatchError, TileMatchResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Totals of one scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanReport {
    pub distribution: DistributionReport,
    /// Chunks that went through matching.
    pub regions_matched: usize,
    pub matches: usize,
}

/// Wires a distributor to a matcher and a result sink.
pub struct Scanner<S: ?Sized> {
    distributor: Distributor<S>,
    matcher: Arc<Matcher>,
    sink: Arc<dyn MatchSink>,
    region_dir: Option<PathBuf>,
}

impl<S: RemoteStore + ?Sized + 'static> Scanner<S> {
    pub fn new(
        distributor: Distributor<S>,
        matcher: Arc<Matcher>,
        sink: Arc<dyn MatchSink>,
    ) -> Self {
        Self {
            distributor,
            matcher,
            sink,
            region_dir: None,
        }
    }

    /// Also saves every assembled region as `chunk{seq}.png` in `dir`.
    pub fn with_region_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.region_dir = Some(dir.into());
        self
    }

    /// Scans `overall` on `date` and appends every match to the sink.
    pub async fn scan(
        &self,
        canvas: Arc<CanvasDescriptor>,
        overall: RegionRect,
        date: DateKey,
        mode: SnapshotMode,
    ) -> TileMatchResult<ScanReport> {
        let (tx, rx) = self.distributor.queue();
        let producer = self.distributor.run(canvas, overall, date, mode, tx);
        let consumer = self.consume(rx);
        let (distribution, (regions_matched, matches)) = tokio::try_join!(producer, consumer)?;
        Ok(ScanReport {
            distribution,
            regions_matched,
            matches,
        })
    }

    async fn consume(
        &self,
        mut rx: mpsc::Receiver<AssembledChunk>,
    ) -> TileMatchResult<(usize, usize)> {
        let mut regions = 0usize;
        let mut matches = 0usize;
        while let Some(chunk) = rx.recv().await {
            let matcher = Arc::clone(&self.matcher);
            let sink = Arc::clone(&self.sink);
            let region_dir = self.region_dir.clone();
            let seq = chunk.seq;
            let found = tokio::task::spawn_blocking(move || -> TileMatchResult<usize> {
                if let Some(dir) = region_dir {
                    save_region(&chunk.image, dir.join(format!("chunk{}.png", chunk.seq)))?;
                }
                let records = matcher.match_region(&chunk.image)?;
                sink.append(chunk.image.rect(), &records)?;
                Ok(records.len())
            })
            .await
            .map_err(|err| TileMatchError::Join(err.to_string()))??;
            trace_event!("chunk_matched", seq = seq, matches = found);
            regions += 1;
            matches += found;
        }
        Ok((regions, matches))
    }
}
