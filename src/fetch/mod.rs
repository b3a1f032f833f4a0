//! Remote access: the storage seam, URL layout, and the tile fetcher.

mod http;
mod tile;

pub use http::HttpStore;
pub use tile::{fetch_tile, TileOutcome};

use crate::canvas::metadata::parse_canvases;
use crate::canvas::{CanvasDescriptor, DateKey, TileCoordinate, TimeOfDayKey};
use crate::util::{RetryPolicy, TileMatchError, TileMatchResult};
use async_trait::async_trait;

/// Outcome of a single GET request that reached the server.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchResponse {
    /// 2xx with the response body.
    Body(Vec<u8>),
    /// 404: the resource never existed.
    NotFound,
    /// Any other status.
    Status(u16),
}

/// GET access to the metadata, history and tile endpoints.
///
/// Transport problems (timeouts, resets, truncated bodies) are reported as
/// [`TileMatchError::Transport`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, url: &str) -> TileMatchResult<FetchResponse>;
}

/// URL layout of the metadata API and the tile storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Endpoints {
    pub api_root: String,
    pub storage_root: String,
}

impl Endpoints {
    pub fn new(api_root: impl Into<String>, storage_root: impl Into<String>) -> Self {
        Self {
            api_root: api_root.into().trim_end_matches('/').to_owned(),
            storage_root: storage_root.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Document describing the available canvases.
    pub fn metadata_url(&self) -> String {
        format!("{}/api/me", self.api_root)
    }

    /// List of intra-day snapshot keys for one canvas and day.
    pub fn history_url(&self, date: DateKey, canvas_id: &str) -> String {
        format!("{}/history?day={date}&id={canvas_id}", self.api_root)
    }

    /// Tile of the day's initial full snapshot.
    pub fn day_tile_url(&self, date: DateKey, canvas_id: &str, tile: TileCoordinate) -> String {
        let (yyyy, mm, dd) = date.path_segments();
        format!(
            "{}/{yyyy}/{mm}/{dd}/{canvas_id}/tiles/{}/{}.png",
            self.storage_root, tile.tile_x, tile.tile_y
        )
    }

    /// Tile of an intra-day snapshot.
    pub fn time_tile_url(
        &self,
        date: DateKey,
        canvas_id: &str,
        time: &TimeOfDayKey,
        tile: TileCoordinate,
    ) -> String {
        let (yyyy, mm, dd) = date.path_segments();
        format!(
            "{}/{yyyy}/{mm}/{dd}/{canvas_id}/{time}/{}/{}.png",
            self.storage_root, tile.tile_x, tile.tile_y
        )
    }
}

/// GETs a JSON-ish body; non-2xx answers are retryable failures.
async fn get_body<S: RemoteStore + ?Sized>(store: &S, url: &str) -> TileMatchResult<Vec<u8>> {
    match store.get(url).await? {
        FetchResponse::Body(body) => Ok(body),
        FetchResponse::NotFound => Err(TileMatchError::UnexpectedStatus {
            url: url.to_owned(),
            status: 404,
        }),
        FetchResponse::Status(status) => Err(TileMatchError::UnexpectedStatus {
            url: url.to_owned(),
            status,
        }),
    }
}

/// Fetches and parses the canvas metadata document.
pub async fn fetch_canvases<S: RemoteStore + ?Sized>(
    store: &S,
    endpoints: &Endpoints,
    retry: &RetryPolicy,
) -> TileMatchResult<Vec<CanvasDescriptor>> {
    let url = &endpoints.metadata_url();
    retry
        .run(url, || async move {
            let body = get_body(store, url).await?;
            parse_canvases(&body, url)
        })
        .await
}

/// Fetches the intra-day snapshot keys of one canvas and day, oldest first.
pub async fn fetch_history<S: RemoteStore + ?Sized>(
    store: &S,
    endpoints: &Endpoints,
    retry: &RetryPolicy,
    date: DateKey,
    canvas_id: &str,
) -> TileMatchResult<Vec<TimeOfDayKey>> {
    let url = &endpoints.history_url(date, canvas_id);
    retry
        .run(url, || async move {
            let body = get_body(store, url).await?;
            let keys: Vec<String> =
                serde_json::from_slice(&body).map_err(|err| TileMatchError::Decode {
                    url: url.clone(),
                    reason: err.to_string(),
                })?;
            keys.iter().map(|key| key.parse()).collect()
        })
        .await
}
