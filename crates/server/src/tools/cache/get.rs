//! cache_get tool implementation.
//!
//! Looks up the cached response for a request without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_client::Worker;
use shelfsync_core::{Error, Request};

use crate::tools::{json_result, rfc3339};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path under the worker's origin.
    pub url: String,

    /// HTTP method of the cached request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Partition to search; all partitions, oldest first, when absent.
    #[serde(default)]
    pub partition: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub partition: Option<String>,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub fetched_at: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let request = worker.router().resolve(&Request::new(params.method, params.url))?;

    let cached = match &params.partition {
        Some(name) => worker.db().match_in(name, &request).await?,
        None => worker.db().match_any(&request).await?,
    };
    let response = cached.ok_or_else(|| Error::CacheMiss(format!("{} {}", request.method, request.url)))?;

    let output = CacheGetOutput {
        url: request.url,
        partition: params.partition,
        status: response.status,
        headers: response.headers.clone(),
        body: response.body_text(),
        fetched_at: response.fetched_at().and_then(rfc3339),
    };
    json_result(&output)
}
