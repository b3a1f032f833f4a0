//! `RemoteStore` backed by `reqwest`.

use crate::fetch::{FetchResponse, RemoteStore};
use crate::util::{TileMatchError, TileMatchResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP client for the metadata API and tile storage.
#[derive(Clone, Debug)]
pub struct HttpStore {
    client: reqwest::Client,
}

impl HttpStore {
    /// Builds a client sending `user_agent` with a per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> TileMatchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|err| TileMatchError::Transport {
                url: String::new(),
                reason: format!("http client init failed: {err}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn get(&self, url: &str) -> TileMatchResult<FetchResponse> {
        let transport = |err: reqwest::Error| TileMatchError::Transport {
            url: url.to_owned(),
            reason: err.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchResponse::NotFound);
        }
        if !status.is_success() {
            return Ok(FetchResponse::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(transport)?;
        Ok(FetchResponse::Body(body.to_vec()))
    }
}
