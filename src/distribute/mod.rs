//! Splitting a large area into megachunks and assembling them concurrently.
//!
//! At most `concurrency_limit` chunks are in flight at once. A chunk holds
//! its admission permit until its image has been handed to the bounded
//! queue, so a slow consumer throttles fetching and caps peak memory.

use crate::assemble::{Assembler, SnapshotMode};
use crate::canvas::{CanvasDescriptor, DateKey, RegionRect, RegionRequest};
use crate::fetch::RemoteStore;
use crate::image::RegionImage;
use crate::trace::{trace_event, trace_warn};
use crate::util::{TileMatchError, TileMatchResult};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};

/// One independent unit of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Megachunk {
    /// Dispatch order, for accounting only.
    pub seq: usize,
    pub rect: RegionRect,
}

/// Splits `overall` into chunks of at most `chunk_size` on a side, row-major.
///
/// Boundary chunks are clipped to `overall`, never padded.
pub fn partition(overall: RegionRect, chunk_size: u32) -> TileMatchResult<Vec<Megachunk>> {
    if chunk_size == 0 {
        return Err(TileMatchError::InvalidInput("chunk_size must be positive"));
    }
    let step = i64::from(chunk_size);
    let mut chunks = Vec::new();
    let mut y = overall.y;
    while y < overall.bottom() {
        let height = (overall.bottom() - y).min(step) as u32;
        let mut x = overall.x;
        while x < overall.right() {
            let width = (overall.right() - x).min(step) as u32;
            chunks.push(Megachunk {
                seq: chunks.len(),
                rect: RegionRect::new(x, y, width, height)?,
            });
            x += step;
        }
        y += step;
    }
    Ok(chunks)
}

/// What to do when a chunk fails after exhausting its retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run and cancel chunks still in flight.
    #[default]
    Abort,
    /// Record the failure and keep processing the other chunks.
    Continue,
}

/// Distribution parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DistributeConfig {
    pub chunk_size: u32,
    /// Maximum number of chunks assembled at the same time.
    pub concurrency_limit: usize,
    /// Capacity of the hand-off queue to the matching stage.
    pub queue_capacity: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for DistributeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2560,
            concurrency_limit: 4,
            queue_capacity: 2,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// An assembled chunk on its way to the matching stage.
#[derive(Debug)]
pub struct AssembledChunk {
    pub seq: usize,
    pub image: RegionImage,
}

/// A chunk that could not be assembled.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkFailure {
    pub chunk: Megachunk,
    pub error: TileMatchError,
}

/// Accounting for one distribution run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DistributionReport {
    pub dispatched: usize,
    pub delivered: usize,
    pub failures: Vec<ChunkFailure>,
}

type ChunkResult = Result<Megachunk, ChunkFailure>;

/// Feeds assembled chunks of one area into a bounded queue.
pub struct Distributor<S: ?Sized> {
    assembler: Arc<Assembler<S>>,
    cfg: DistributeConfig,
}

impl<S: RemoteStore + ?Sized + 'static> Distributor<S> {
    pub fn new(assembler: Arc<Assembler<S>>, cfg: DistributeConfig) -> Self {
        Self { assembler, cfg }
    }

    pub fn config(&self) -> &DistributeConfig {
        &self.cfg
    }

    /// Creates the bounded hand-off queue sized from the configuration.
    pub fn queue(&self) -> (mpsc::Sender<AssembledChunk>, mpsc::Receiver<AssembledChunk>) {
        mpsc::channel(self.cfg.queue_capacity.max(1))
    }

    /// Assembles every chunk of `overall` and pushes it to `tx`.
    ///
    /// Returns once every dispatched chunk has been delivered or has failed.
    /// Chunks arrive in completion order, not dispatch order. `mode` is
    /// resolved once up front so every chunk shows the same snapshot.
    pub async fn run(
        &self,
        canvas: Arc<CanvasDescriptor>,
        overall: RegionRect,
        date: DateKey,
        mode: SnapshotMode,
        tx: mpsc::Sender<AssembledChunk>,
    ) -> TileMatchResult<DistributionReport> {
        if self.cfg.concurrency_limit == 0 {
            return Err(TileMatchError::InvalidInput(
                "concurrency_limit must be positive",
            ));
        }
        let chunks = partition(overall, self.cfg.chunk_size)?;
        let mode = self
            .assembler
            .resolve_snapshot(&canvas, date, &mode)
            .await
            .map_err(|err| {
                RegionRequest {
                    canvas_id: canvas.id.clone(),
                    rect: overall,
                    date,
                }
                .fail(err)
            })?;
        let mut report = DistributionReport {
            dispatched: chunks.len(),
            ..DistributionReport::default()
        };
        trace_event!(
            "distribution_started",
            chunks = chunks.len(),
            concurrency = self.cfg.concurrency_limit
        );

        let gate = Arc::new(Semaphore::new(self.cfg.concurrency_limit));
        let mode = Arc::new(mode);
        let mut tasks: JoinSet<ChunkResult> = JoinSet::new();

        for chunk in chunks {
            let permit = gate
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| TileMatchError::Join("admission gate closed".into()))?;
            while let Some(done) = tasks.try_join_next() {
                self.settle(done, &mut report)?;
            }

            let assembler = Arc::clone(&self.assembler);
            let canvas = Arc::clone(&canvas);
            let mode = Arc::clone(&mode);
            let tx = tx.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let image = assembler
                    .assemble_snapshot(&canvas, chunk.rect, date, &mode)
                    .await
                    .map_err(|error| ChunkFailure { chunk, error })?;
                tx.send(AssembledChunk {
                    seq: chunk.seq,
                    image,
                })
                .await
                .map_err(|_| ChunkFailure {
                    chunk,
                    error: TileMatchError::QueueClosed,
                })?;
                Ok(chunk)
            });
        }
        drop(tx);

        while let Some(done) = tasks.join_next().await {
            self.settle(done, &mut report)?;
        }
        trace_event!(
            "distribution_finished",
            delivered = report.delivered,
            failed = report.failures.len()
        );
        Ok(report)
    }

    /// Books a finished task; errors returned here end the run and abort the
    /// remaining tasks when the `JoinSet` is dropped.
    fn settle(
        &self,
        done: Result<ChunkResult, JoinError>,
        report: &mut DistributionReport,
    ) -> TileMatchResult<()> {
        match done.map_err(|err| TileMatchError::Join(err.to_string()))? {
            Ok(chunk) => {
                report.delivered += 1;
                trace_event!("chunk_delivered", seq = chunk.seq);
                Ok(())
            }
            Err(failure) => {
                let fatal = self.cfg.failure_policy == FailurePolicy::Abort
                    || failure.error == TileMatchError::QueueClosed;
                if fatal {
                    return Err(failure.error);
                }
                trace_warn!(
                    "chunk_failed",
                    seq = failure.chunk.seq,
                    rect = %failure.chunk.rect,
                    error = %failure.error
                );
                report.failures.push(failure);
                Ok(())
            }
        }
    }
}
