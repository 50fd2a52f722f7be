//! worker_fetch tool implementation.
//!
//! Delivers a fetch event to the worker. Requests the worker doesn't intercept
//! are fetched directly, as a browser would without a worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_client::fetch::content_type;
use shelfsync_client::{Event, EventOutcome, Fetcher, ResponseSource, Worker};
use shelfsync_core::http::QUEUED_HEADER;
use shelfsync_core::{Request, Response};

use super::{json_result, lifecycle::unexpected, rfc3339};

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path under the worker's origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers as name/value pairs, sent in the given order,
    /// e.g. [["Accept", "text/html"]]. Names may repeat.
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Request body for writes.
    #[serde(default)]
    pub body: Option<String>,

    /// Wait for background revalidation to finish before returning.
    #[serde(default)]
    pub wait: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub method: String,
    /// Where the response came from; absent when the worker didn't intercept.
    pub source: Option<ResponseSource>,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// When the response was fetched, for stamped API responses.
    pub fetched_at: Option<String>,
    /// Queue timestamp of a write stored for replay.
    pub queued: Option<i64>,
}

impl WorkerFetchOutput {
    fn new(request: &Request, source: Option<ResponseSource>, response: &Response) -> Self {
        Self {
            url: request.url.clone(),
            method: request.method.clone(),
            source,
            status: response.status,
            content_type: content_type(response).map(String::from),
            headers: response.headers.clone(),
            body: response.body_text(),
            fetched_at: response.fetched_at().and_then(rfc3339),
            queued: response.header(QUEUED_HEADER).and_then(|t| t.parse().ok()),
        }
    }
}

pub async fn fetch_impl(
    worker: &Worker, fetcher: &dyn Fetcher, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    let mut request = Request::new(params.method, params.url);
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    let request = if worker.router().is_foreign_scheme(&request.url) {
        request
    } else {
        worker.router().resolve(&request)?
    };

    let output = match worker.dispatch(Event::Fetch(request.clone())).await? {
        EventOutcome::Fetched(outcome) => {
            let output = WorkerFetchOutput::new(&request, Some(outcome.source), &outcome.response);
            if let Some(refresh) = outcome.wait_until {
                if params.wait {
                    if let Err(e) = refresh.await {
                        tracing::warn!("background refresh of {} aborted: {}", request.url, e);
                    }
                }
            }
            output
        }
        EventOutcome::Passthrough(resolved) => {
            tracing::debug!("{} {} not intercepted", resolved.method, resolved.url);
            let response = fetcher.fetch(&resolved).await?;
            WorkerFetchOutput::new(&resolved, None, &response)
        }
        other => return Err(unexpected("fetch", &other).into()),
    };

    json_result(&output)
}
