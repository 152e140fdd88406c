//! HTTP range fetcher.
//!
//! The actual HTTP client is abstracted via [`QueryClient`] so any HTTP
//! library (or an in-process loopback) can carry the JSON range messages.

use crate::error::{SyncError, SyncResult};
use crate::fetcher::RangeFetcher;
use async_trait::async_trait;
use ledgerview_protocol::{RangeCursor, RangePage, RangeRequest, RangeResponse, RemoteErrorKind};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Path of the range query endpoint, relative to the base URL.
pub const RANGE_ENDPOINT: &str = "/collections/range";

/// HTTP client abstraction.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Checks if the client is healthy.
    fn is_healthy(&self) -> bool;
}

/// A [`RangeFetcher`] that posts JSON range requests to a query service.
pub struct HttpRangeFetcher<C: QueryClient> {
    base_url: String,
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: QueryClient> HttpRangeFetcher<C> {
    /// Creates a fetcher for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Checks if the fetcher can issue requests.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    /// Stops issuing requests.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn post_range(&self, request: &RangeRequest) -> SyncResult<RangeResponse> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        let body = request
            .encode()
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {e}")))?;

        let url = format!("{}{}", self.base_url, RANGE_ENDPOINT);
        let response_body = self.client.post(&url, body).await.map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            SyncError::transport_retryable(e)
        })?;

        *self.last_error.write() = None;

        RangeResponse::decode(&response_body)
            .map_err(|e| SyncError::transport_fatal(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl<K, C> RangeFetcher<K> for HttpRangeFetcher<C>
where
    K: fmt::Display + Sync,
    C: QueryClient,
{
    async fn fetch_range(&self, key: &K, cursor: RangeCursor) -> SyncResult<RangePage> {
        let request = RangeRequest::new(key.to_string(), cursor);
        match self.post_range(&request).await? {
            RangeResponse::Page(page) => Ok(page),
            RangeResponse::Error(err) => match err.kind {
                RemoteErrorKind::NotFound => Err(SyncError::not_found(request.key)),
                RemoteErrorKind::Internal => Err(SyncError::transport_retryable(format!(
                    "remote error: {}",
                    err.message
                ))),
            },
        }
    }
}

/// Trait for servers that can handle loopback requests.
#[async_trait]
pub trait LoopbackServer: Send + Sync {
    /// Handles a POST request and returns the response body.
    async fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

#[async_trait]
impl<L: LoopbackServer + ?Sized> LoopbackServer for Arc<L> {
    async fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        (**self).handle_post(path, body).await
    }
}

/// A loopback client that routes requests directly to an in-process server.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a loopback client connected to `server`.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Returns the server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

#[async_trait]
impl<S: LoopbackServer> QueryClient for LoopbackClient<S> {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let path = url
            .find("/collections/")
            .map(|i| &url[i..])
            .unwrap_or(url);

        self.server.handle_post(path, &body).await
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerview_protocol::Record;

    struct TestClient {
        response: RwLock<Option<Vec<u8>>>,
        healthy: AtomicBool,
        last_url: RwLock<Option<String>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: RwLock::new(None),
                healthy: AtomicBool::new(true),
                last_url: RwLock::new(None),
            }
        }

        fn respond_with(self, resp: &RangeResponse) -> Self {
            *self.response.write() = Some(resp.encode().unwrap());
            self
        }

        fn respond_raw(self, body: &[u8]) -> Self {
            *self.response.write() = Some(body.to_vec());
            self
        }
    }

    #[async_trait]
    impl QueryClient for TestClient {
        async fn post(&self, url: &str, _body: Vec<u8>) -> Result<Vec<u8>, String> {
            *self.last_url.write() = Some(url.to_string());
            self.response
                .read()
                .clone()
                .ok_or_else(|| "connection refused".to_string())
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    fn cursor() -> RangeCursor {
        RangeCursor::first(0, 10).unwrap()
    }

    #[test]
    fn fetcher_creation() {
        let fetcher = HttpRangeFetcher::new("https://query.example.com/", TestClient::new());
        assert_eq!(fetcher.base_url(), "https://query.example.com");
        assert!(fetcher.is_connected());
    }

    #[test]
    fn unhealthy_client() {
        let client = TestClient::new();
        client.healthy.store(false, Ordering::SeqCst);
        let fetcher = HttpRangeFetcher::new("https://query.example.com", client);
        assert!(!fetcher.is_connected());
    }

    #[tokio::test]
    async fn closed_fetcher_errors() {
        let fetcher = HttpRangeFetcher::new("https://query.example.com", TestClient::new());
        fetcher.close();
        let result = fetcher.fetch_range(&"0x01", cursor()).await;
        assert!(matches!(result, Err(SyncError::NotConnected)));
    }

    #[tokio::test]
    async fn page_response() {
        let page = RangePage::complete(vec![Record::new(1u64), Record::new(2u64)]);
        let client = TestClient::new().respond_with(&page.clone().into());
        let fetcher = HttpRangeFetcher::new("https://query.example.com", client);

        let result = fetcher.fetch_range(&"0x01", cursor()).await.unwrap();
        assert_eq!(result, page);
        assert_eq!(
            fetcher.client.last_url.read().as_deref(),
            Some("https://query.example.com/collections/range")
        );
    }

    #[tokio::test]
    async fn remote_not_found() {
        let client = TestClient::new().respond_with(&RangeResponse::not_found("no such account"));
        let fetcher = HttpRangeFetcher::new("https://query.example.com", client);

        let result = fetcher.fetch_range(&"0xdead", cursor()).await;
        assert_eq!(result, Err(SyncError::not_found("0xdead")));
    }

    #[tokio::test]
    async fn remote_internal_error_is_transport() {
        let client = TestClient::new().respond_with(&RangeResponse::internal("script panicked"));
        let fetcher = HttpRangeFetcher::new("https://query.example.com", client);

        let err = fetcher.fetch_range(&"0x01", cursor()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("script panicked"));
    }

    #[tokio::test]
    async fn malformed_response() {
        let client = TestClient::new().respond_raw(b"<html>502</html>");
        let fetcher = HttpRangeFetcher::new("https://query.example.com", client);

        let err = fetcher.fetch_range(&"0x01", cursor()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn client_failure_records_last_error() {
        let fetcher = HttpRangeFetcher::new("https://query.example.com", TestClient::new());

        let err = fetcher.fetch_range(&"0x01", cursor()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(fetcher.last_error().as_deref(), Some("connection refused"));
        // a failed request does not close the fetcher
        assert!(fetcher.is_connected());
    }
}
