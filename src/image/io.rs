//! Encoding and decoding helpers built on the `image` crate.

use crate::image::RegionImage;
use crate::util::{TileMatchError, TileMatchResult};
use image::RgbaImage;
use std::path::Path;

/// Decodes an image body and converts it to RGBA.
///
/// `source` names the body in the error so failed tiles can be traced back
/// to their URL.
pub fn decode_rgba(bytes: &[u8], source: &str) -> TileMatchResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|err| TileMatchError::Decode {
            url: source.to_owned(),
            reason: err.to_string(),
        })
}

/// Loads an image file from disk as RGBA.
pub fn load_rgba<P: AsRef<Path>>(path: P) -> TileMatchResult<RgbaImage> {
    let path = path.as_ref();
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|err| TileMatchError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
}

/// Writes a region to disk; the format follows the file extension.
pub fn save_region<P: AsRef<Path>>(region: &RegionImage, path: P) -> TileMatchResult<()> {
    let path = path.as_ref();
    region
        .pixels()
        .save(path)
        .map_err(|err| TileMatchError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
}
