//! Series sources.
//!
//! `SeriesSource` abstracts the historical data endpoint so the load cycle
//! can be driven against a real server or a scripted one.

use crate::error::{LoadError, LoadResult};
use crate::loader::ChunkResponse;
use crate::plan::DataRequest;
use dashgrid_core::{ApiBase, ChannelData};
use reqwest::Client;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Default timeout for data requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of historical channel data.
pub trait SeriesSource: Send + Sync {
    /// Run one data request.
    fn fetch(&self, request: DataRequest) -> BoxFuture<'_, LoadResult<ChannelData>>;
}

/// Arc wrapper for SeriesSource trait objects.
pub type DynSeriesSource = Arc<dyn SeriesSource>;

/// `GET data/...` against the dashboard server.
pub struct HttpSeriesSource {
    client: Client,
    base: ApiBase,
}

impl HttpSeriesSource {
    pub fn new(base: ApiBase) -> LoadResult<Self> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base: ApiBase, timeout: Duration) -> LoadResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, base })
    }
}

impl SeriesSource for HttpSeriesSource {
    fn fetch(&self, request: DataRequest) -> BoxFuture<'_, LoadResult<ChannelData>> {
        Box::pin(async move {
            let url = self.base.endpoint(["data", request.channel_list().as_str()]);
            debug!(%url, channels = request.channels.len(), "Requesting series");

            let response = self
                .client
                .get(url)
                .query(&request.query())
                .send()
                .await
                .map_err(|e| LoadError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    code: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                });
            }

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| LoadError::Decode(e.to_string()))?;

            match body {
                serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
                other => Err(LoadError::Decode(format!(
                    "expected object of channel series, got {}",
                    json_kind(&other)
                ))),
            }
        })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Issue every request of a load cycle concurrently.
///
/// Each response is sent to `tx` as it resolves, tagged with `generation`.
/// Nothing is cancelled: superseded requests still report back and are fenced
/// by the loader.
pub fn spawn_requests(
    source: DynSeriesSource,
    generation: u64,
    requests: Vec<DataRequest>,
    tx: mpsc::UnboundedSender<ChunkResponse>,
) {
    for request in requests {
        let source = source.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let channels = request.channels.clone();
            let result = source.fetch(request).await;
            trace!(generation, ?channels, ok = result.is_ok(), "Chunk resolved");
            if tx
                .send(ChunkResponse {
                    generation,
                    channels,
                    result,
                })
                .is_err()
            {
                debug!(generation, "Loader gone, chunk response dropped");
            }
        });
    }
}

/// Scripted source for tests and offline runs.
///
/// Answers each channel from a fixed table and fails configured channels
/// with a status code. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockSeriesSource {
    series: parking_lot::Mutex<ChannelData>,
    failures: parking_lot::Mutex<HashMap<String, u16>>,
    requests: parking_lot::Mutex<Vec<DataRequest>>,
}

impl MockSeriesSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for `channel`.
    pub fn set_series(&self, channel: impl Into<String>, value: serde_json::Value) {
        self.series.lock().insert(channel.into(), value);
    }

    /// Fail any request that includes `channel` with `code`.
    pub fn fail_channel(&self, channel: impl Into<String>, code: u16) {
        self.failures.lock().insert(channel.into(), code);
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<DataRequest> {
        self.requests.lock().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

impl SeriesSource for MockSeriesSource {
    fn fetch(&self, request: DataRequest) -> BoxFuture<'_, LoadResult<ChannelData>> {
        Box::pin(async move {
            self.requests.lock().push(request.clone());

            let failure = {
                let failures = self.failures.lock();
                request
                    .channels
                    .iter()
                    .find_map(|ch| failures.get(ch).copied())
            };
            if let Some(code) = failure {
                return Err(LoadError::Status {
                    code,
                    reason: "scripted failure".to_string(),
                });
            }

            let series = self.series.lock();
            Ok(request
                .channels
                .iter()
                .filter_map(|ch| series.get(ch).map(|v| (ch.clone(), v.clone())))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, RawQuery};
    use axum::{routing::get, Json, Router};
    use dashgrid_core::TimeRange;
    use serde_json::json;

    async fn serve(app: Router) -> ApiBase {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ApiBase::from_page_location(&format!("http://{addr}/dash/index.html")).unwrap()
    }

    fn request(channels: &[&str], length: f64) -> DataRequest {
        DataRequest::new(
            channels.iter().map(|s| s.to_string()).collect(),
            &TimeRange::ending_at(1_700_000_000.0, length),
        )
    }

    #[tokio::test]
    async fn test_http_source_path_and_query() {
        let app = Router::new().route(
            "/dash/data/{channels}",
            get(|Path(channels): Path<String>, RawQuery(query): RawQuery| async move {
                Json(json!({
                    "channels": channels,
                    "query": query.unwrap_or_default(),
                    "A": [1, 2, 3],
                }))
            }),
        );
        let base = serve(app).await;
        let source = HttpSeriesSource::new(base).unwrap();

        let data = source.fetch(request(&["A", "B"], 10_000.0)).await.unwrap();
        assert_eq!(data["channels"], json!("A,B"));
        assert_eq!(
            data["query"],
            json!("length=10000&to=1700000000&resample=16.7&reducer=last")
        );
        assert_eq!(data["A"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_http_source_encodes_reserved_channel_names() {
        let app = Router::new().route(
            "/dash/data/{channels}",
            get(|Path(channels): Path<String>, RawQuery(query): RawQuery| async move {
                Json(json!({
                    "channels": channels,
                    "query": query.unwrap_or_default(),
                }))
            }),
        );
        let base = serve(app).await;
        let source = HttpSeriesSource::new(base).unwrap();

        let data = source
            .fetch(request(&["run#2", "B?x", "50%/min"], 10_000.0))
            .await
            .unwrap();
        assert_eq!(data["channels"], json!("run#2,B?x,50%/min"));
        assert_eq!(
            data["query"],
            json!("length=10000&to=1700000000&resample=16.7&reducer=last")
        );
    }

    #[tokio::test]
    async fn test_http_source_status_error() {
        let app = Router::new().route(
            "/dash/data/{channels}",
            get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(app).await;
        let source = HttpSeriesSource::new(base).unwrap();

        let err = source.fetch(request(&["A"], 60.0)).await.unwrap_err();
        let status = err.status();
        assert_eq!(status.code, 500);
        assert_eq!(status.text, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_http_source_rejects_non_object() {
        let app = Router::new().route(
            "/dash/data/{channels}",
            get(|| async { Json(json!([1, 2])) }),
        );
        let base = serve(app).await;
        let source = HttpSeriesSource::new(base).unwrap();

        let err = source.fetch(request(&["A"], 60.0)).await.unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
        assert_eq!(err.status().code, 0);
    }

    #[tokio::test]
    async fn test_http_source_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = ApiBase::from_page_location(&format!("http://{addr}/")).unwrap();
        let source = HttpSeriesSource::with_timeout(base, Duration::from_secs(2)).unwrap();
        let err = source.fetch(request(&["A"], 60.0)).await.unwrap_err();
        assert!(matches!(err, LoadError::Transport(_)));
    }

    #[tokio::test]
    async fn test_spawn_requests_reports_every_chunk() {
        let source = Arc::new(MockSeriesSource::new());
        source.set_series("A", json!([1]));
        source.set_series("B", json!([2]));
        source.fail_channel("C", 503);

        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_requests(
            source.clone(),
            7,
            vec![request(&["A"], 60.0), request(&["B"], 60.0), request(&["C"], 60.0)],
            tx,
        );

        let mut ok = 0;
        let mut failed = 0;
        for _ in 0..3 {
            let response = rx.recv().await.unwrap();
            assert_eq!(response.generation, 7);
            match response.result {
                Ok(data) => {
                    assert_eq!(data.len(), 1);
                    ok += 1;
                }
                Err(e) => {
                    assert_eq!(e.status().code, 503);
                    failed += 1;
                }
            }
        }
        assert_eq!((ok, failed), (2, 1));
        assert_eq!(source.requests().len(), 3);
    }
}
