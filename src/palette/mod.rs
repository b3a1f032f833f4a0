//! Palette lookup and conversion of RGBA images to palette-indexed images.
//!
//! Indexed images hold one byte per pixel: the position of the pixel's color
//! in the palette, or [`UNMATCHED`] when the color is not in the palette or
//! the pixel is fully transparent. Palettes are capped at 255 entries so the
//! sentinel can never be a valid index.

use crate::canvas::{CanvasDescriptor, Rgb};
use crate::image::ImageView;
use crate::util::{TileMatchError, TileMatchResult};
use image::RgbaImage;
use std::collections::HashMap;

/// Index stored for pixels that match no palette entry.
pub const UNMATCHED: u8 = u8::MAX;

/// Largest palette that keeps every index below [`UNMATCHED`].
pub const MAX_PALETTE_LEN: usize = UNMATCHED as usize;

/// One palette color with its display name and dense index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub color: Rgb,
    pub name: String,
    pub index: u8,
}

/// Fixed, ordered list of colors searched for during matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Builds a palette from `(name, color)` pairs, assigning indices in order.
    pub fn new<I, S>(colors: I) -> TileMatchResult<Self>
    where
        I: IntoIterator<Item = (S, Rgb)>,
        S: Into<String>,
    {
        let mut entries: Vec<PaletteEntry> = Vec::new();
        for (name, color) in colors {
            if entries.len() == MAX_PALETTE_LEN {
                return Err(TileMatchError::PaletteTooLarge {
                    len: entries.len() + 1,
                    max: MAX_PALETTE_LEN,
                });
            }
            if entries.iter().any(|e| e.color == color) {
                return Err(TileMatchError::DuplicatePaletteColor { color });
            }
            entries.push(PaletteEntry {
                color,
                name: name.into(),
                index: entries.len() as u8,
            });
        }
        if entries.is_empty() {
            return Err(TileMatchError::InvalidInput("empty palette"));
        }
        Ok(Self { entries })
    }

    /// Uses the canvas colors, dropping the first `skip` entries.
    ///
    /// Entries are named after their hex code, e.g. `#e4e4e4`.
    pub fn from_canvas(canvas: &CanvasDescriptor, skip: usize) -> TileMatchResult<Self> {
        Self::new(
            canvas
                .colors
                .iter()
                .skip(skip)
                .map(|&[r, g, b]| (format!("#{r:02x}{g:02x}{b:02x}"), [r, g, b])),
        )
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry with the given index.
    pub fn get(&self, index: u8) -> Option<&PaletteEntry> {
        self.entries.get(usize::from(index))
    }

    /// Builds the read-only color lookup for this palette.
    pub fn lookup(&self) -> ColorLookup {
        ColorLookup::build(self)
    }
}

/// Read-only mapping from RGB color to palette index.
#[derive(Clone, Debug)]
pub struct ColorLookup {
    map: HashMap<Rgb, u8>,
}

impl ColorLookup {
    /// Builds the lookup once; share it by reference afterwards.
    pub fn build(palette: &Palette) -> Self {
        let map = palette
            .entries()
            .iter()
            .map(|entry| (entry.color, entry.index))
            .collect();
        Self { map }
    }

    /// Index for an RGBA pixel, or [`UNMATCHED`].
    #[inline]
    pub fn index_of(&self, rgba: [u8; 4]) -> u8 {
        if rgba[3] == 0 {
            return UNMATCHED;
        }
        self.map
            .get(&[rgba[0], rgba[1], rgba[2]])
            .copied()
            .unwrap_or(UNMATCHED)
    }

    /// Converts an RGBA image into an indexed image.
    pub fn to_indexed(&self, image: &RgbaImage) -> TileMatchResult<IndexedImage> {
        let data = image.pixels().map(|p| self.index_of(p.0)).collect();
        IndexedImage::new(data, image.width() as usize, image.height() as usize)
    }
}

/// Single-channel image of palette indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl IndexedImage {
    /// Wraps a contiguous index buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> TileMatchResult<Self> {
        ImageView::from_slice(&data, width, height)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Borrowed view for the correlation kernels.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView::from_slice(&self.data, self.width, self.height)
            .expect("indexed image dimensions validated on construction")
    }
}

#[cfg(test)]
mod tests {
    use super::{Palette, UNMATCHED};
    use crate::util::TileMatchError;
    use image::{Rgba, RgbaImage};

    fn palette() -> Palette {
        Palette::new([
            ("white", [255, 255, 255]),
            ("black", [0, 0, 0]),
            ("red", [229, 0, 0]),
        ])
        .unwrap()
    }

    #[test]
    fn indices_are_dense_and_ordered() {
        let palette = palette();
        let indices: Vec<u8> = palette.entries().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(palette.get(2).unwrap().name, "red");
    }

    #[test]
    fn duplicate_colors_are_rejected() {
        let err = Palette::new([("a", [1, 2, 3]), ("b", [1, 2, 3])]).unwrap_err();
        assert_eq!(err, TileMatchError::DuplicatePaletteColor { color: [1, 2, 3] });
    }

    #[test]
    fn oversized_palette_is_rejected() {
        let colors = (0..256u32).map(|i| (format!("c{i}"), [i as u8, (i >> 8) as u8, 7]));
        let err = Palette::new(colors).unwrap_err();
        assert!(matches!(err, TileMatchError::PaletteTooLarge { max: 255, .. }));
    }

    #[test]
    fn unknown_and_transparent_pixels_are_unmatched() {
        let lookup = palette().lookup();
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([229, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([1, 1, 1, 255]));
        img.put_pixel(2, 0, Rgba([0, 0, 0, 0]));
        let indexed = lookup.to_indexed(&img).unwrap();
        assert_eq!(indexed.data(), &[2, UNMATCHED, UNMATCHED]);
    }
}
