//! Proxied fetch.
//!
//! Features:
//! - At most [`MAX_CONCURRENT_FETCHES`] transfers in flight, FIFO admission
//! - Transparent response decompression via reqwest
//! - Optional gzip re-compression of the body before it crosses the port
//!
//! The player side cannot always reach a resource itself (cookies, CORS,
//! private hosts), so it asks its peer to fetch on its behalf. The body
//! comes back as a binary payload next to a small JSON meta object.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

/// Hard cap on concurrently running proxied transfers.
pub const MAX_CONCURRENT_FETCHES: usize = 4;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid fetch URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid request method: {0}")]
    InvalidMethod(String),
    #[error("invalid request header {0}")]
    InvalidHeader(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("compression failed: {0}")]
    Compress(#[from] std::io::Error),
    #[error("compression task aborted")]
    CompressorGone,
    #[error("fetch gate closed")]
    GateClosed,
    #[error("malformed fetch reply")]
    MalformedReply,
}

/// FIFO admission gate bounding concurrent transfers.
///
/// Waiting is fair: a slow transfer delays only the queue behind the
/// limit, never a transfer that already holds a slot.
#[derive(Clone)]
pub struct FetchGate {
    permits: Arc<Semaphore>,
}

impl FetchGate {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Run `task` once a slot is free.
    pub async fn run<T>(&self, task: impl std::future::Future<Output = T>) -> Result<T, FetchError> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::GateClosed)?;
        Ok(task.await)
    }
}

/// A fetch on behalf of the peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// HTTP method, GET when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Ask for the body to be gzip-compressed before transfer.
    #[serde(default)]
    pub gzip: bool,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: None,
            headers: HashMap::new(),
            gzip: false,
        }
    }

    #[must_use]
    pub fn gzipped(mut self) -> Self {
        self.gzip = true;
        self
    }
}

/// Outcome of a proxied fetch: meta fields plus the (possibly gzipped) body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// `Content-Type` of the response, when present.
    pub mime: Option<String>,
    pub headers: HashMap<String, String>,
    /// Whether `body` is gzip-compressed.
    pub gzipped: bool,
    pub body: Bytes,
}

impl FetchResponse {
    /// The JSON meta object travelling next to the body payload.
    #[must_use]
    pub fn meta(&self) -> Value {
        json!({
            "status": self.status,
            "mime": self.mime,
            "gzip": self.gzipped,
            "headers": self.headers,
        })
    }

    /// Rebuild from a reply's meta object and body payload.
    pub fn from_meta(meta: &Value, body: Bytes) -> Result<Self, FetchError> {
        let status = meta
            .get("status")
            .and_then(Value::as_u64)
            .ok_or(FetchError::MalformedReply)?;
        let status = u16::try_from(status).map_err(|_| FetchError::MalformedReply)?;
        let mime = meta
            .get("mime")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let headers = meta
            .get("headers")
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_owned())))
                    .collect()
            })
            .unwrap_or_default();
        let gzipped = meta.get("gzip").and_then(Value::as_bool).unwrap_or(false);
        Ok(Self {
            status,
            mime,
            headers,
            gzipped,
            body,
        })
    }
}

/// Executes proxied fetches behind the admission gate.
pub struct FetchProxy {
    client: Client,
    gate: FetchGate,
}

impl FetchProxy {
    /// Build a proxy with its own HTTP client and the default gate.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .use_rustls_tls()
            .gzip(true)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self::with_client(client, MAX_CONCURRENT_FETCHES))
    }

    /// Build around an existing client with an explicit concurrency limit.
    #[must_use]
    pub fn with_client(client: Client, limit: usize) -> Self {
        Self {
            client,
            gate: FetchGate::new(limit),
        }
    }

    /// Fetch a resource, waiting for an admission slot first.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        self.gate.run(self.perform(request)).await?
    }

    async fn perform(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = Url::parse(&request.url).map_err(|source| FetchError::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;
        let method = match &request.method {
            Some(name) => Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                .map_err(|_| FetchError::InvalidMethod(name.clone()))?,
            None => Method::GET,
        };
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        debug!(%url, %method, gzip = request.gzip, "proxied fetch");
        let response = self.client.request(method, url).headers(headers).send().await?;

        let status = response.status().as_u16();
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned()))
            })
            .collect();
        let mut stream = response.bytes_stream();
        let mut collected = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk?);
        }
        let body = collected.freeze();

        let (body, gzipped) = if request.gzip && !body.is_empty() {
            let compressed = tokio::task::spawn_blocking(move || gzip_bytes(&body))
                .await
                .map_err(|_| FetchError::CompressorGone)??;
            (compressed, true)
        } else {
            (body, false)
        };

        Ok(FetchResponse {
            status,
            mime,
            headers: response_headers,
            gzipped,
            body,
        })
    }
}

/// Gzip-compress a body for transfer.
fn gzip_bytes(body: &[u8]) -> Result<Bytes, FetchError> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(body.len() / 2 + 16),
        Compression::default(),
    );
    encoder.write_all(body)?;
    Ok(Bytes::from(encoder.finish()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn gate_admits_at_most_the_limit_at_once() {
        let gate = FetchGate::new(MAX_CONCURRENT_FETCHES);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let gate = gate.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            tasks.push(tokio::spawn(async move {
                gate.run(async {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= MAX_CONCURRENT_FETCHES);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_transfer_does_not_block_free_slots() {
        let gate = FetchGate::new(2);
        let slow = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.run(std::future::pending::<()>()).await.unwrap();
            })
        };
        // One slot is held forever; the other keeps serving.
        let quick = gate.run(async { 7 });
        let got = tokio::time::timeout(Duration::from_millis(200), quick)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, 7);
        slow.abort();
    }

    #[test]
    fn gzip_bytes_round_trips() {
        let body = b"subtitle cue payload, repeated: subtitle cue payload".as_slice();
        let compressed = gzip_bytes(body).unwrap();
        assert_ne!(&compressed[..], body);

        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, body);
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: FetchRequest =
            serde_json::from_str(r#"{"url":"https://example.com/track.vtt"}"#).unwrap();
        assert_eq!(request.url, "https://example.com/track.vtt");
        assert!(request.method.is_none());
        assert!(request.headers.is_empty());
        assert!(!request.gzip);
    }

    #[test]
    fn response_meta_round_trips() {
        let response = FetchResponse {
            status: 200,
            mime: Some("text/vtt".into()),
            headers: HashMap::from([("etag".to_string(), "\"abc\"".to_string())]),
            gzipped: true,
            body: Bytes::from_static(b"x"),
        };
        let rebuilt =
            FetchResponse::from_meta(&response.meta(), response.body.clone()).unwrap();
        assert_eq!(rebuilt.status, 200);
        assert_eq!(rebuilt.mime.as_deref(), Some("text/vtt"));
        assert_eq!(rebuilt.headers.get("etag").map(String::as_str), Some("\"abc\""));
        assert!(rebuilt.gzipped);
    }

    #[test]
    fn meta_without_status_is_rejected()  {
        let err = FetchResponse::from_meta(&json!({"mime": "text/vtt"}), Bytes::new()).unwrap_err();
        assert!(matches!(err, FetchError::MalformedReply));
    }
}
