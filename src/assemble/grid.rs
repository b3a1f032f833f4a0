//! Tile grid arithmetic for a region of a centered canvas.

use crate::canvas::{RegionRect, TileCoordinate, TILE_SIZE};
use crate::util::{TileMatchError, TileMatchResult};

/// Range of tile indices covering a region, for one effective canvas size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    /// Canvas coordinate of the top-left corner of tile `(0, 0)`.
    pub offset: i64,
    pub first: TileCoordinate,
    /// Inclusive.
    pub last: TileCoordinate,
}

/// Where one tile lands inside a region buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePlacement {
    pub tile: TileCoordinate,
    /// Top-left corner relative to the region origin; may be negative.
    pub dest_x: i64,
    pub dest_y: i64,
}

impl TileGrid {
    /// Tiles spanning `[x, x + width]` × `[y, y + height]` after shifting by
    /// the centering offset `-size / 2`.
    pub fn cover(rect: RegionRect, effective_size: u32) -> Self {
        let tile = i64::from(TILE_SIZE);
        let offset = -(i64::from(effective_size) / 2);
        let first = TileCoordinate {
            tile_x: (rect.x - offset).div_euclid(tile),
            tile_y: (rect.y - offset).div_euclid(tile),
        };
        let last = TileCoordinate {
            tile_x: (rect.right() - offset).div_euclid(tile),
            tile_y: (rect.bottom() - offset).div_euclid(tile),
        };
        Self {
            offset,
            first,
            last,
        }
    }

    pub fn columns(&self) -> usize {
        (self.last.tile_x - self.first.tile_x + 1) as usize
    }

    pub fn rows(&self) -> usize {
        (self.last.tile_y - self.first.tile_y + 1) as usize
    }

    /// Placements of every tile that actually intersects `rect`, row-major.
    ///
    /// The grid's trailing column/row starts at the exclusive edge when the
    /// region ends on a tile boundary; such tiles cannot write any pixel and
    /// are left out.
    pub fn placements(&self, rect: RegionRect) -> Vec<TilePlacement> {
        let tile = i64::from(TILE_SIZE);
        let mut out = Vec::with_capacity(self.columns() * self.rows());
        for tile_y in self.first.tile_y..=self.last.tile_y {
            for tile_x in self.first.tile_x..=self.last.tile_x {
                let dest_x = tile_x * tile + self.offset - rect.x;
                let dest_y = tile_y * tile + self.offset - rect.y;
                if dest_x >= i64::from(rect.width) || dest_y >= i64::from(rect.height) {
                    continue;
                }
                out.push(TilePlacement {
                    tile: TileCoordinate { tile_x, tile_y },
                    dest_x,
                    dest_y,
                });
            }
        }
        out
    }
}

/// Fails if any two placements would write overlapping tile rectangles.
pub fn ensure_disjoint(placements: &[TilePlacement]) -> TileMatchResult<()> {
    let size = i64::from(TILE_SIZE);
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            let overlap = a.dest_x < b.dest_x + size
                && b.dest_x < a.dest_x + size
                && a.dest_y < b.dest_y + size
                && b.dest_y < a.dest_y + size;
            if overlap {
                return Err(TileMatchError::OverlappingWrites {
                    ax: a.dest_x,
                    ay: a.dest_y,
                    bx: b.dest_x,
                    by: b.dest_y,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ensure_disjoint, TileGrid, TilePlacement};
    use crate::canvas::{RegionRect, TileCoordinate};
    use crate::util::TileMatchError;

    fn expected_columns(origin: i64, width: i64, size: i64) -> i64 {
        let offset = -(size / 2);
        (origin + width - offset).div_euclid(256) - (origin - offset).div_euclid(256) + 1
    }

    #[test]
    fn column_count_matches_closed_form() {
        let sizes = [256 * 4, 256 * 64, 65536];
        let origins = [-32768, -1000, -1, 0, 1, 255, 256, 777];
        let widths = [1u32, 255, 256, 257, 512, 2561];
        for &size in &sizes {
            for &x in &origins {
                for &w in &widths {
                    let rect = RegionRect::new(x, 0, w, 1).unwrap();
                    let grid = TileGrid::cover(rect, size as u32);
                    assert_eq!(
                        grid.columns() as i64,
                        expected_columns(x, i64::from(w), size),
                        "size={size} x={x} w={w}"
                    );
                }
            }
        }
    }

    #[test]
    fn centered_origin_maps_to_middle_tile() {
        let rect = RegionRect::new(0, 0, 512, 512).unwrap();
        let grid = TileGrid::cover(rect, 1024);
        assert_eq!(grid.offset, -512);
        assert_eq!(grid.first, TileCoordinate { tile_x: 2, tile_y: 2 });
        let placements = grid.placements(rect);
        assert_eq!(placements.len(), 4);
        assert_eq!((placements[0].dest_x, placements[0].dest_y), (0, 0));
        assert_eq!((placements[3].dest_x, placements[3].dest_y), (256, 256));
    }

    #[test]
    fn unaligned_region_has_negative_offsets() {
        let rect = RegionRect::new(-100, 10, 300, 100).unwrap();
        let grid = TileGrid::cover(rect, 1024);
        let placements = grid.placements(rect);
        assert_eq!(placements[0].dest_x, -156);
        assert_eq!(placements[0].dest_y, -10);
        assert!(ensure_disjoint(&placements).is_ok());
    }

    #[test]
    fn overlapping_placements_are_rejected() {
        let tile = TileCoordinate { tile_x: 0, tile_y: 0 };
        let placements = [
            TilePlacement {
                tile,
                dest_x: 0,
                dest_y: 0,
            },
            TilePlacement {
                tile,
                dest_x: 128,
                dest_y: 0,
            },
        ];
        assert_eq!(
            ensure_disjoint(&placements).unwrap_err(),
            TileMatchError::OverlappingWrites {
                ax: 0,
                ay: 0,
                bx: 128,
                by: 0
            }
        );
    }
}
