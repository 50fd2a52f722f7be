//! HTTP request and response records.
//!
//! These are the values flowing through the intercepted fetch path. They are
//! plain data so they can be stored in SQLite, replayed later, and handed to
//! the host without tying the core to an HTTP client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Synthetic header carrying the time an API response was fetched, in
/// milliseconds since the Unix epoch.
pub const FRESHNESS_HEADER: &str = "sw-fetched-on";

/// Header set on the synthetic response returned for a queued mutation.
pub const QUEUED_HEADER: &str = "x-shelfsync-queued";

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Request {
    pub method: String,
    pub url: String,
    /// Header name/value pairs in the order they were sent.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".into(), url: url.into(), headers: Vec::new(), body: None }
    }

    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into(), headers: Vec::new(), body: None }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the request declares an HTML document as acceptable content.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }

    /// Whether the method changes server state and so can never be answered
    /// from a cache.
    pub fn is_mutation(&self) -> bool {
        !matches!(self.method.to_ascii_uppercase().as_str(), "GET" | "HEAD" | "OPTIONS")
    }
}

/// A response, live or cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Copy of this response carrying a freshness timestamp, replacing any
    /// earlier stamp.
    pub fn stamped(&self, now_ms: i64) -> Self {
        let mut stamped = self.clone();
        stamped.headers.retain(|(name, _)| !name.eq_ignore_ascii_case(FRESHNESS_HEADER));
        stamped.headers.push((FRESHNESS_HEADER.to_string(), now_ms.to_string()));
        stamped
    }

    /// Freshness timestamp, if the response was stamped when stored.
    pub fn fetched_at(&self) -> Option<i64> {
        self.header(FRESHNESS_HEADER).and_then(|v| v.trim().parse().ok())
    }

    /// Fresh iff `now - fetched_at < max_age`. Unstamped responses are never fresh.
    pub fn is_fresh(&self, now_ms: i64, max_age_ms: i64) -> bool {
        self.fetched_at().is_some_and(|at| is_fresh(at, now_ms, max_age_ms))
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// `now - fetched_at < max_age`.
pub fn is_fresh(fetched_at_ms: i64, now_ms: i64, max_age_ms: i64) -> bool {
    now_ms.saturating_sub(fetched_at_ms) < max_age_ms
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;

    #[test]
    fn test_freshness_boundary() {
        let now = 1_700_000_000_000;
        assert!(is_fresh(now - DAY_MS + 1, now, DAY_MS));
        assert!(!is_fresh(now - DAY_MS, now, DAY_MS));
        assert!(!is_fresh(now - DAY_MS - 1, now, DAY_MS));
    }

    #[test]
    fn test_stamp_replaces_previous_stamp() {
        let response = Response::new(200, "[]").with_header("Sw-Fetched-On", "1");
        let stamped = response.stamped(42);
        assert_eq!(stamped.fetched_at(), Some(42));
        assert_eq!(stamped.headers.len(), 1);
    }

    #[test]
    fn test_unstamped_is_never_fresh() {
        let response = Response::new(200, "{}");
        assert!(!response.is_fresh(0, DAY_MS));
    }

    #[test]
    fn test_accepts_html() {
        let nav = Request::get("http://localhost:8080/pwa-book-logger/")
            .with_header("Accept", "text/html,application/xhtml+xml;q=0.9");
        assert!(nav.accepts_html());

        let script = Request::get("http://localhost:8080/app.js").with_header("accept", "*/*");
        assert!(!script.accepts_html());
        assert!(!Request::get("http://localhost:8080/").accepts_html());
    }

    #[test]
    fn test_mutation_methods() {
        assert!(Request::new("post", "https://firestore.googleapis.com/v1/books").is_mutation());
        assert!(Request::new("PATCH", "https://firestore.googleapis.com/v1/books/1").is_mutation());
        assert!(Request::new("DELETE", "https://firestore.googleapis.com/v1/books/1").is_mutation());
        assert!(!Request::get("https://firestore.googleapis.com/v1/books").is_mutation());
        assert!(!Request::new("HEAD", "https://firestore.googleapis.com/v1/books").is_mutation());
    }
}
