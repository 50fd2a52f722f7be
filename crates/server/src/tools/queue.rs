//! worker_sync and queue_list tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_client::{DrainReport, Event, EventOutcome, Worker};
use shelfsync_core::QueuedMutation;

use super::{json_result, lifecycle::unexpected, rfc3339};

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Sync tag to deliver (default: the worker's own tag).
    #[serde(default)]
    pub tag: Option<String>,
}

/// Output from the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncOutput {
    pub tag: String,
    /// False when the tag belongs to someone else and nothing was replayed.
    pub handled: bool,
    pub report: Option<DrainReport>,
}

pub async fn sync_impl(worker: &Worker, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| worker.config().sync_tag.clone());

    let report = match worker.dispatch(Event::Sync { tag: tag.clone() }).await? {
        EventOutcome::Synced(report) => Some(report),
        EventOutcome::Ignored => None,
        other => return Err(unexpected("sync", &other).into()),
    };

    json_result(&WorkerSyncOutput { tag, handled: report.is_some(), report })
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueuedItem {
    #[serde(flatten)]
    pub mutation: QueuedMutation,
    pub queued_at: Option<String>,
}

/// Output from the queue_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueListOutput {
    pub count: usize,
    /// Pending writes, oldest first.
    pub mutations: Vec<QueuedItem>,
}

pub async fn list_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let mutations: Vec<QueuedItem> = worker
        .queue()
        .pending()
        .await?
        .into_iter()
        .map(|mutation| QueuedItem { queued_at: rfc3339(mutation.timestamp), mutation })
        .collect();

    json_result(&QueueListOutput { count: mutations.len(), mutations })
}
