//! Canvas data model: descriptors, date and time keys, and region geometry.
//!
//! Canvas coordinates are centered on zero and may be negative. A canvas of
//! effective size `s` spans `[-s/2, s/2)` on both axes, and tile `(0, 0)`
//! starts at `(-s/2, -s/2)`.

pub mod metadata;

use crate::util::{TileMatchError, TileMatchResult};
use chrono::{Datelike, Days, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Edge length of a stored tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// An RGB triple.
pub type Rgb = [u8; 3];

/// Calendar day of a snapshot, written as `YYYYMMDD`.
///
/// Ordering is chronological, which coincides with lexicographic order of the
/// textual form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Wraps a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Returns the underlying calendar date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the key of the preceding calendar day.
    pub fn previous_day(&self) -> TileMatchResult<Self> {
        self.0
            .checked_sub_days(Days::new(1))
            .map(Self)
            .ok_or(TileMatchError::InvalidInput("date key underflow"))
    }

    /// Returns the `(yyyy, mm, dd)` storage path segments.
    pub fn path_segments(&self) -> (String, String, String) {
        (
            format!("{:04}", self.0.year()),
            format!("{:02}", self.0.month()),
            format!("{:02}", self.0.day()),
        )
    }
}

impl FromStr for DateKey {
    type Err = TileMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TileMatchError::InvalidDateKey(s.to_owned()));
        }
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(Self)
            .map_err(|_| TileMatchError::InvalidDateKey(s.to_owned()))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

/// Four-digit key of an intra-day snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimeOfDayKey(String);

impl TimeOfDayKey {
    /// The snapshot key that is known to be corrupt upstream.
    pub const CORRUPT: &'static str = "0000";

    /// Returns `true` for the known-corrupt `"0000"` snapshot.
    pub fn is_corrupt(&self) -> bool {
        self.0 == Self::CORRUPT
    }

    /// Returns the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TimeOfDayKey {
    type Err = TileMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TileMatchError::InvalidTimeKey(s.to_owned()));
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for TimeOfDayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A logical drawing surface as reported by the metadata endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasDescriptor {
    pub id: String,
    pub title: String,
    /// Current edge length in pixels.
    pub pixel_size: u32,
    /// Canvas colors in server order; the first entry is the background.
    pub colors: Vec<Rgb>,
    /// `(date, size)` pairs: the size applies on or after `date`.
    pub historical_sizes: Vec<(DateKey, u32)>,
    pub is_3d: bool,
}

impl CanvasDescriptor {
    /// Background color used to paint missing tiles.
    pub fn background(&self) -> Rgb {
        self.colors.first().copied().unwrap_or([255, 255, 255])
    }

    /// Edge length of the canvas as it was stored on `date`.
    ///
    /// The last qualifying entry wins, so later entries override earlier ones
    /// with smaller or equal keys.
    pub fn effective_size(&self, date: DateKey) -> u32 {
        self.historical_sizes
            .iter()
            .filter(|(since, _)| *since <= date)
            .last()
            .map(|&(_, size)| size)
            .unwrap_or(self.pixel_size)
    }
}

/// Axis-aligned rectangle in canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    /// Creates a rectangle, rejecting empty extents.
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> TileMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(TileMatchError::InvalidDimensions {
                width: width as usize,
                height: height as usize,
            });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Builds the rectangle spanning two inclusive corner points.
    pub fn from_corners(x0: i64, y0: i64, x1: i64, y1: i64) -> TileMatchResult<Self> {
        if x1 < x0 || y1 < y0 {
            return Err(TileMatchError::InvalidInput("corner order"));
        }
        let width = u32::try_from(x1 - x0 + 1)
            .map_err(|_| TileMatchError::InvalidInput("region too wide"))?;
        let height = u32::try_from(y1 - y0 + 1)
            .map_err(|_| TileMatchError::InvalidInput("region too tall"))?;
        Self::new(x0, y0, width, height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y + i64::from(self.height)
    }

    /// Returns `true` if the rectangles share at least one pixel.
    pub fn intersects(&self, other: &RegionRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for RegionRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// One region of one canvas on one day.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionRequest {
    pub canvas_id: String,
    pub rect: RegionRect,
    pub date: DateKey,
}

impl RegionRequest {
    /// Wraps `source` so the failure names this request.
    pub fn fail(&self, source: TileMatchError) -> TileMatchError {
        TileMatchError::Region {
            canvas_id: self.canvas_id.clone(),
            x: self.rect.x,
            y: self.rect.y,
            width: self.rect.width,
            height: self.rect.height,
            date: self.date.to_string(),
            source: Box::new(source),
        }
    }
}

/// Integer tile grid indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    pub tile_x: i64,
    pub tile_y: i64,
}

#[cfg(test)]
mod tests {
    use super::{CanvasDescriptor, DateKey, RegionRect, TimeOfDayKey};

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    #[test]
    fn date_key_round_trips_and_orders() {
        let d = key("20240301");
        assert_eq!(d.to_string(), "20240301");
        assert!(key("20231231") < d);
        assert_eq!(d.previous_day().unwrap(), key("20240229"));
        assert_eq!(
            d.path_segments(),
            ("2024".to_string(), "03".to_string(), "01".to_string())
        );
    }

    #[test]
    fn date_key_rejects_garbage() {
        assert!("2024031".parse::<DateKey>().is_err());
        assert!("20241301".parse::<DateKey>().is_err());
        assert!("2024-3-1".parse::<DateKey>().is_err());
    }

    #[test]
    fn time_key_flags_corrupt_snapshot() {
        let corrupt: TimeOfDayKey = "0000".parse().unwrap();
        let fine: TimeOfDayKey = "1215".parse().unwrap();
        assert!(corrupt.is_corrupt());
        assert!(!fine.is_corrupt());
        assert!("12:15".parse::<TimeOfDayKey>().is_err());
    }

    #[test]
    fn effective_size_takes_last_qualifying_entry() {
        let canvas = CanvasDescriptor {
            id: "0".into(),
            title: "Earth".into(),
            pixel_size: 65536,
            colors: vec![[202, 227, 255]],
            historical_sizes: vec![
                (key("20200101"), 256 * 64),
                (key("20210601"), 256 * 128),
                (key("20210601"), 256 * 160),
            ],
            is_3d: false,
        };
        assert_eq!(canvas.effective_size(key("20191231")), 65536);
        assert_eq!(canvas.effective_size(key("20200101")), 256 * 64);
        assert_eq!(canvas.effective_size(key("20210531")), 256 * 64);
        assert_eq!(canvas.effective_size(key("20210601")), 256 * 160);
        assert_eq!(canvas.effective_size(key("20250101")), 256 * 160);
    }

    #[test]
    fn rect_from_inclusive_corners() {
        let rect = RegionRect::from_corners(0, 0, 2560, 2560).unwrap();
        assert_eq!(rect.width, 2561);
        assert_eq!(rect.right(), 2561);
        assert!(RegionRect::from_corners(5, 0, 4, 0).is_err());
        assert!(RegionRect::new(0, 0, 0, 3).is_err());
    }

    #[test]
    fn rect_intersection_is_half_open() {
        let a = RegionRect::new(0, 0, 10, 10).unwrap();
        let b = RegionRect::new(10, 0, 10, 10).unwrap();
        let c = RegionRect::new(9, 9, 2, 2).unwrap();
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
    }
}
