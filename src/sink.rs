//! Append-only log of match records.
//!
//! Each record becomes one line:
//! `{palette name} {pattern name} - {viewer url}#{canvas id},{x},{y},{zoom}`
//! with `x`/`y` in absolute canvas coordinates.

use crate::canvas::RegionRect;
use crate::palette::Palette;
use crate::search::MatchRecord;
use crate::util::{TileMatchError, TileMatchResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Destination for match records; must accept concurrent, out-of-order writers.
pub trait MatchSink: Send + Sync {
    /// Appends the records found in `region`.
    fn append(&self, region: RegionRect, records: &[MatchRecord]) -> TileMatchResult<()>;
}

/// How a record is turned into a viewer link.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkFormat {
    pub viewer_url: String,
    pub canvas_id: String,
    pub zoom: u32,
}

impl LinkFormat {
    /// Formats one log line.
    pub fn line(&self, palette: &Palette, region: RegionRect, record: &MatchRecord) -> String {
        let color = palette
            .get(record.color_index)
            .map(|entry| entry.name.as_str())
            .unwrap_or("?");
        let x = region.x + record.x as i64;
        let y = region.y + record.y as i64;
        format!(
            "{color} {} - {}#{},{x},{y},{}",
            record.pattern_name, self.viewer_url, self.canvas_id, self.zoom
        )
    }
}

/// Text log sink writing one line per record.
pub struct LogSink<W> {
    out: Mutex<W>,
    palette: Arc<Palette>,
    link: LinkFormat,
}

impl LogSink<BufWriter<File>> {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(
        path: P,
        palette: Arc<Palette>,
        link: LinkFormat,
    ) -> TileMatchResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| TileMatchError::Io {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self::new(BufWriter::new(file), palette, link))
    }
}

impl<W: Write + Send> LogSink<W> {
    pub fn new(out: W, palette: Arc<Palette>, link: LinkFormat) -> Self {
        Self {
            out: Mutex::new(out),
            palette,
            link,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> TileMatchResult<W> {
        self.out
            .into_inner()
            .map_err(|_| TileMatchError::PoisonedBuffer)
    }
}

impl<W: Write + Send> MatchSink for LogSink<W> {
    fn append(&self, region: RegionRect, records: &[MatchRecord]) -> TileMatchResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let io_err = |err: std::io::Error| TileMatchError::Io {
            path: "match log".into(),
            reason: err.to_string(),
        };
        let mut out = self.out.lock().map_err(|_| TileMatchError::PoisonedBuffer)?;
        for record in records {
            writeln!(out, "{}", self.link.line(&self.palette, region, record)).map_err(io_err)?;
        }
        out.flush().map_err(io_err)
    }
}
