//! worker_push and worker_notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_client::{Event, EventOutcome, Worker};

use super::{json_result, lifecycle::unexpected};

/// Parameters for the worker_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Push message text; empty or absent uses the default body.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the worker_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Action button clicked, if any.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickOutput {
    pub opened: String,
}

pub async fn push_impl(worker: &Worker, params: WorkerPushParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::Push { payload: params.payload }).await? {
        EventOutcome::NotificationShown(notification) => json_result(&notification),
        other => Err(unexpected("push", &other).into()),
    }
}

pub async fn click_impl(worker: &Worker, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    match worker
        .dispatch(Event::NotificationClick { action: params.action })
        .await?
    {
        EventOutcome::WindowOpened(opened) => json_result(&NotificationClickOutput { opened }),
        other => Err(unexpected("notification click", &other).into()),
    }
}
