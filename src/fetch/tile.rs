//! Fetching a single tile into a shared region buffer.

use crate::canvas::{Rgb, TILE_SIZE};
use crate::fetch::{FetchResponse, RemoteStore};
use crate::image::io::decode_rgba;
use crate::image::RegionImage;
use crate::trace::trace_event;
use crate::util::{RetryPolicy, TileMatchError, TileMatchResult};
use image::RgbaImage;
use std::sync::Mutex;

/// What a tile fetch did to the destination buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileOutcome {
    /// The tile was decoded and pasted.
    Pasted,
    /// The tile does not exist; a background block was painted.
    Painted,
    /// Nothing was written (missing or unavailable, and not required).
    Skipped,
}

enum Fetched {
    Tile(RgbaImage),
    Missing,
    Unavailable,
}

/// Fetches `url` and writes it into `dest` at `offset`.
///
/// * Not found: a required tile is painted as a background block, an optional
///   one leaves `dest` untouched.
/// * Other non-success status: retried when `required`, otherwise skipped.
/// * Transport and decode failures are retried per `retry`; exhausting it is
///   fatal.
///
/// Concurrent callers sharing `dest` must write disjoint rectangles; the lock
/// only guards the paste itself, never a network wait.
pub async fn fetch_tile<S: RemoteStore + ?Sized>(
    store: &S,
    retry: &RetryPolicy,
    url: &str,
    dest: &Mutex<RegionImage>,
    offset: (i64, i64),
    background: Rgb,
    required: bool,
) -> TileMatchResult<TileOutcome> {
    let fetched = retry
        .run(url, || async move {
            match store.get(url).await? {
                FetchResponse::Body(body) => decode_rgba(&body, url).map(Fetched::Tile),
                FetchResponse::NotFound => Ok(Fetched::Missing),
                FetchResponse::Status(status) if required => {
                    Err(TileMatchError::UnexpectedStatus {
                        url: url.to_owned(),
                        status,
                    })
                }
                FetchResponse::Status(_) => Ok(Fetched::Unavailable),
            }
        })
        .await?;

    let (dx, dy) = offset;
    let outcome = match fetched {
        Fetched::Tile(tile) => {
            let mut region = dest.lock().map_err(|_| TileMatchError::PoisonedBuffer)?;
            region.paste_masked(&tile, dx, dy);
            TileOutcome::Pasted
        }
        Fetched::Missing if required => {
            let mut region = dest.lock().map_err(|_| TileMatchError::PoisonedBuffer)?;
            region.fill_block(dx, dy, TILE_SIZE, background);
            trace_event!("tile_missing", url = url);
            TileOutcome::Painted
        }
        Fetched::Missing | Fetched::Unavailable => TileOutcome::Skipped,
    };
    Ok(outcome)
}
