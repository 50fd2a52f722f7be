//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shelfsync server.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod queue;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shelfsync_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Epoch milliseconds as an RFC 3339 timestamp.
pub(crate) fn rfc3339(ms: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(ms).map(|t| t.to_rfc3339())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use shelfsync_client::{Fetcher, Worker};
    use shelfsync_core::{CacheDb, Error, Request, Response, WorkerConfig};

    use crate::host::LogHost;

    pub const ORIGIN: &str = "http://localhost:8080";

    /// Fetcher answering from a fixed table; anything else is unreachable.
    #[derive(Default)]
    pub struct TableFetcher {
        routes: Mutex<HashMap<(String, String), Response>>,
    }

    impl TableFetcher {
        pub fn serve(&self, method: &str, url: &str, response: Response) {
            self.routes
                .lock()
                .unwrap()
                .insert((method.to_string(), url.to_string()), response);
        }

        pub fn clear(&self) {
            self.routes.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Fetcher for TableFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.routes
                .lock()
                .unwrap()
                .get(&(request.method.clone(), request.url.clone()))
                .cloned()
                .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
        }
    }

    /// A worker whose fetcher serves the default manifest.
    pub async fn worker() -> (Arc<Worker>, Arc<TableFetcher>) {
        let config = WorkerConfig::default();
        let fetcher = Arc::new(TableFetcher::default());
        for path in &config.precache {
            fetcher.serve("GET", &format!("{ORIGIN}{path}"), Response::new(200, format!("asset {path}")));
        }
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = Worker::new(config, db, fetcher.clone(), Arc::new(LogHost)).unwrap();
        (Arc::new(worker), fetcher)
    }

    /// A worker that has been installed and activated.
    pub async fn active_worker() -> (Arc<Worker>, Arc<TableFetcher>) {
        let (worker, fetcher) = worker().await;
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        (worker, fetcher)
    }

    /// Parse the JSON text content of a tool result.
    pub fn json(result: &CallToolResult) -> serde_json::Value {
        let text = result.content.first().and_then(|c| c.as_text()).expect("text content");
        serde_json::from_str(&text.text).unwrap()
    }
}
