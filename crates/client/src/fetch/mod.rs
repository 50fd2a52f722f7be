//! Live network fetches.
//!
//! ### Fetch semantics
//! - A `Fetcher` resolves with a response for every HTTP status; only
//!   transport failures are errors. Callers decide what a non-success
//!   status means for them.
//! - `Error::Network` means the request never reached the server: DNS,
//!   refused connection, or a timeout before any status arrived.
//! - `Error::InvalidInput` means the request could not be built, e.g. an
//!   illegal header name. Nothing was sent.
//! - `Error::Interrupted` means the exchange broke off after the request
//!   may have been delivered, including a body cut short after the status.
//! - Request headers and body are forwarded as captured, in order.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Timeout: 20s (configurable), the only timeout on the fetch path

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, same_origin};

use shelfsync_core::{Error, Request, Response, WorkerConfig};

/// Performs live fetches on behalf of the worker.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send the request over the network.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shelfsync/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shelfsync/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&WorkerConfig> for FetchConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed fetcher.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn check_size(&self, len: usize) -> Result<(), Error> {
        if len > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| send_error(request, e))?;

        let status = response.status();

        if let Some(len) = response.content_length() {
            self.check_size(len as usize)?;
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Interrupted(format!("{} {}: body cut short: {}", request.method, request.url, e)))?;

        self.check_size(bytes.len())?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(Response { status: status.as_u16(), headers, body: bytes.to_vec() })
    }
}

/// Classify a failure to obtain a response status.
fn send_error(request: &Request, e: reqwest::Error) -> Error {
    let msg = format!("{} {}: {}", request.method, request.url, e);
    if e.is_builder() {
        Error::InvalidInput(msg)
    } else if e.is_connect() || e.is_timeout() {
        Error::Network(msg)
    } else {
        Error::Interrupted(msg)
    }
}

/// Content type of a response, if it declared one.
pub fn content_type(response: &Response) -> Option<&str> {
    response.header(header::CONTENT_TYPE.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "shelfsync/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_worker_config() {
        let worker = WorkerConfig { user_agent: "book-logger/2".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&worker);
        assert_eq!(config.user_agent, "book-logger/2");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_content_type_lookup() {
        let response = Response::new(200, "{}").with_header("Content-Type", "application/json");
        assert_eq!(content_type(&response), Some("application/json"));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_method() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let request = Request::new("BAD METHOD", "http://localhost:1/");
        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_invalid_input() {
        let (base, hits) = testing::serve_raw("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let request = Request::new("POST", format!("{base}/books")).with_header("bad header", "x");

        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))), "{result:?}");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_truncated_body_is_interrupted() {
        let (base, hits) = testing::serve_raw("HTTP/1.1 201 Created\r\nContent-Length: 100\r\n\r\nshort").await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let request = Request::new("POST", format!("{base}/books")).with_body("{}");

        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::Interrupted(_))), "{result:?}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_connection_is_network() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let request = Request::new("GET", format!("{}/", testing::refused_url().await));

        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let (base, _) = testing::serve_raw("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\n\r\nbusy").await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();

        let response = client.fetch(&Request::new("GET", format!("{base}/"))).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.body, b"busy");
    }
}
