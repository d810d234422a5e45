//! HTTP client for the channel catalog.
//!
//! `GET channels` lists every channel the server can serve. The list feeds
//! the channel pickers of the "add panel" dialog.

use crate::error::{RegistryError, RegistryResult};
use dashgrid_core::ApiBase;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for catalog requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    /// Series kind as reported by the server (e.g. "timeseries").
    #[serde(rename = "type", default)]
    pub channel_type: String,
    #[serde(default)]
    pub label: String,
}

impl ChannelInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel_type: String::new(),
            label: String::new(),
        }
    }
}

/// Client for the channel catalog endpoint.
pub struct CatalogClient {
    client: Client,
    url: Url,
}

impl CatalogClient {
    /// Create a client for `<base>channels`.
    pub fn new(base: &ApiBase) -> RegistryResult<Self> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base: &ApiBase, timeout: Duration) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: base.endpoint(["channels"]),
        })
    }

    /// Fetch the channel list.
    ///
    /// Entries without a usable name are skipped.
    pub async fn fetch_channels(&self) -> RegistryResult<Vec<ChannelInfo>> {
        info!(url = %self.url, "Fetching channel catalog");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RegistryError::ParseError(format!("Failed to parse response: {e}")))?;

        let entries = body
            .as_array()
            .ok_or_else(|| RegistryError::ParseError("catalog is not an array".to_string()))?;

        let mut channels = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            match serde_json::from_value::<ChannelInfo>(entry.clone()) {
                Ok(info) if !info.name.is_empty() => channels.push(info),
                Ok(_) => warn!(idx, "Skipping catalog entry with empty name"),
                Err(e) => warn!(idx, error = %e, "Skipping malformed catalog entry"),
            }
        }

        debug!(count = channels.len(), "Channel catalog received");
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> ApiBase {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ApiBase::from_page_location(&format!("http://{addr}/index.html")).unwrap()
    }

    #[test]
    fn test_channel_info_defaults() {
        let info: ChannelInfo = serde_json::from_value(json!({"name": "A"})).unwrap();
        assert_eq!(info, ChannelInfo::new("A"));
    }

    #[tokio::test]
    async fn test_fetch_channels() {
        let app = Router::new().route(
            "/channels",
            get(|| async {
                Json(json!([
                    {"name": "psia.Vacuum", "type": "timeseries", "label": "Vacuum"},
                    {"name": "", "type": "timeseries"},
                    {"label": "no name"},
                    {"name": "ch1"}
                ]))
            }),
        );
        let base = serve(app).await;

        let channels = CatalogClient::new(&base).unwrap().fetch_channels().await.unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "psia.Vacuum");
        assert_eq!(channels[0].channel_type, "timeseries");
        assert_eq!(channels[1].name, "ch1");
    }

    #[tokio::test]
    async fn test_fetch_channels_http_error() {
        let app = Router::new().route(
            "/channels",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(app).await;

        let err = CatalogClient::new(&base)
            .unwrap()
            .fetch_channels()
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::HttpClient(msg) if msg.contains("500")));
    }
}
