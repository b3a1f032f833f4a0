//! Reference patterns and the directory they are loaded from.

use crate::image::io::load_rgba;
use crate::palette::{ColorLookup, IndexedImage};
use crate::util::{TileMatchError, TileMatchResult};
use image::RgbaImage;
use std::path::Path;

mod plan;

pub use plan::PatternPlan;

/// A named reference image together with its palette-indexed form.
#[derive(Clone, Debug)]
pub struct ReferencePattern {
    name: String,
    image: RgbaImage,
    indexed: IndexedImage,
}

impl ReferencePattern {
    /// Indexes `image` with the run's palette lookup.
    pub fn new(
        name: impl Into<String>,
        image: RgbaImage,
        lookup: &ColorLookup,
    ) -> TileMatchResult<Self> {
        let indexed = lookup.to_indexed(&image)?;
        Ok(Self {
            name: name.into(),
            image,
            indexed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn indexed(&self) -> &IndexedImage {
        &self.indexed
    }

    /// Precomputes the correlation mask with `primary` as the foreground index.
    pub fn plan(&self, primary: u8) -> TileMatchResult<PatternPlan> {
        PatternPlan::from_indexed(&self.name, self.indexed.view(), primary)
    }
}

/// Loads every PNG in `dir`, named after the file stem, sorted by name.
pub fn load_patterns<P: AsRef<Path>>(
    dir: P,
    lookup: &ColorLookup,
) -> TileMatchResult<Vec<ReferencePattern>> {
    let dir = dir.as_ref();
    let io_err = |err: std::io::Error| TileMatchError::Io {
        path: dir.display().to_string(),
        reason: err.to_string(),
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if path.is_file() && is_png {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            ReferencePattern::new(name, load_rgba(&path)?, lookup)
        })
        .collect()
}
