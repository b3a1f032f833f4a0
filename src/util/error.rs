//! Error types for tilematch.

use thiserror::Error;

/// Result alias for tilematch operations.
pub type TileMatchResult<T> = std::result::Result<T, TileMatchError>;

/// Errors that can occur while fetching, assembling or matching canvas regions.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TileMatchError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The stride is smaller than the row width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The backing buffer cannot hold the requested image.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A date key is not a valid `YYYYMMDD` calendar date.
    #[error("invalid date key {0:?}")]
    InvalidDateKey(String),
    /// A time-of-day key is not four ASCII digits.
    #[error("invalid time key {0:?}")]
    InvalidTimeKey(String),
    /// The requested canvas is not present in the metadata document.
    #[error("unknown canvas {0:?}")]
    UnknownCanvas(String),
    /// 3D canvases have no tile storage.
    #[error("canvas {0:?} is a 3D canvas")]
    Canvas3d(String),
    /// The request did not complete (timeout, reset, truncated body).
    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },
    /// The server answered with a status that is neither success nor not-found.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },
    /// A response body could not be decoded.
    #[error("could not decode {url}: {reason}")]
    Decode { url: String, reason: String },
    /// A transient failure persisted through every allowed attempt.
    #[error("{what} failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        what: String,
        attempts: u32,
        reason: String,
    },
    /// Two tile writes into the same region buffer would overlap.
    #[error("tile writes at ({ax}, {ay}) and ({bx}, {by}) overlap")]
    OverlappingWrites { ax: i64, ay: i64, bx: i64, by: i64 },
    /// The region buffer lock was poisoned by a panicking writer.
    #[error("region buffer poisoned")]
    PoisonedBuffer,
    /// Palette indices must fit below the unmatched sentinel.
    #[error("palette has {len} entries, at most {max} are supported")]
    PaletteTooLarge { len: usize, max: usize },
    /// Two palette entries share a color, so indexing would be ambiguous.
    #[error("palette color {color:?} appears more than once")]
    DuplicatePaletteColor { color: [u8; 3] },
    /// The pattern cannot produce a meaningful correlation.
    #[error("degenerate pattern {name:?}: {reason}")]
    DegeneratePattern { name: String, reason: &'static str },
    /// Filesystem access failed.
    #[error("io error at {path}: {reason}")]
    Io { path: String, reason: String },
    /// A region assembly failed; carries the request for diagnosis.
    #[error("region {canvas_id} ({x}, {y}) {width}x{height} on {date} failed: {source}")]
    Region {
        canvas_id: String,
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        date: String,
        #[source]
        source: Box<TileMatchError>,
    },
    /// The hand-off queue was closed before a chunk could be delivered.
    #[error("hand-off queue closed")]
    QueueClosed,
    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Join(String),
}

impl TileMatchError {
    /// Returns `true` for failures that the retry policy should absorb.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TileMatchError::Transport { .. }
                | TileMatchError::UnexpectedStatus { .. }
                | TileMatchError::Decode { .. }
        )
    }
}
