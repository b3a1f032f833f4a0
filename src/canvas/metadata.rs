//! Parsing of the canvas metadata document.
//!
//! The document is a JSON object with a `canvases` map keyed by canvas id.

use crate::canvas::{CanvasDescriptor, DateKey, Rgb};
use crate::util::{TileMatchError, TileMatchResult};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct MetadataJson {
    canvases: BTreeMap<String, CanvasJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasJson {
    #[serde(default)]
    title: String,
    size: u32,
    colors: Vec<Rgb>,
    #[serde(default)]
    historical_sizes: Vec<(String, u32)>,
    #[serde(default, rename = "v")]
    is_3d: bool,
}

impl CanvasJson {
    fn into_descriptor(self, id: String) -> TileMatchResult<CanvasDescriptor> {
        let historical_sizes = self
            .historical_sizes
            .into_iter()
            .map(|(date, size)| Ok((date.parse::<DateKey>()?, size)))
            .collect::<TileMatchResult<Vec<_>>>()?;
        Ok(CanvasDescriptor {
            id,
            title: self.title,
            pixel_size: self.size,
            colors: self.colors,
            historical_sizes,
            is_3d: self.is_3d,
        })
    }
}

/// Parses every canvas in the metadata document, ordered by id.
///
/// `source` names the document in decode errors.
pub fn parse_canvases(body: &[u8], source: &str) -> TileMatchResult<Vec<CanvasDescriptor>> {
    let doc: MetadataJson = serde_json::from_slice(body).map_err(|err| TileMatchError::Decode {
        url: source.to_owned(),
        reason: err.to_string(),
    })?;
    doc.canvases
        .into_iter()
        .map(|(id, canvas)| canvas.into_descriptor(id))
        .collect()
}

/// Picks the canvas to process, rejecting unknown and 3D canvases.
pub fn select_canvas(
    canvases: Vec<CanvasDescriptor>,
    canvas_id: &str,
) -> TileMatchResult<CanvasDescriptor> {
    let canvas = canvases
        .into_iter()
        .find(|canvas| canvas.id == canvas_id)
        .ok_or_else(|| TileMatchError::UnknownCanvas(canvas_id.to_owned()))?;
    if canvas.is_3d {
        return Err(TileMatchError::Canvas3d(canvas.id));
    }
    Ok(canvas)
}
