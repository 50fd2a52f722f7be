//! worker_install and worker_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_client::{ActivateReport, Event, EventOutcome, InstallReport, LifecycleState, Worker};
use shelfsync_core::Error;

use super::json_result;

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    pub state: LifecycleState,
    #[serde(flatten)]
    pub report: InstallReport,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub state: LifecycleState,
    #[serde(flatten)]
    pub report: ActivateReport,
}

pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = match worker.dispatch(Event::Install).await? {
        EventOutcome::Installed(report) => report,
        other => return Err(unexpected("install", &other).into()),
    };
    json_result(&InstallOutput { state: worker.state().await, report })
}

pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = match worker.dispatch(Event::Activate).await? {
        EventOutcome::Activated(report) => report,
        other => return Err(unexpected("activate", &other).into()),
    };
    json_result(&ActivateOutput { state: worker.state().await, report })
}

pub(crate) fn unexpected(event: &str, outcome: &EventOutcome) -> Error {
    Error::InvalidState(format!("{event} produced {outcome:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fixtures;

    #[tokio::test]
    async fn test_install_then_activate() {
        let (worker, _fetcher) = fixtures::worker().await;

        let installed = fixtures::json(&install_impl(&worker).await.unwrap());
        assert_eq!(installed["state"], "installed");
        assert_eq!(installed["cached"], 12);
        assert_eq!(installed["partitions"][0], "book-logger-static-v1");

        let activated = fixtures::json(&activate_impl(&worker).await.unwrap());
        assert_eq!(activated["state"], "active");
        assert_eq!(activated["deleted"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_failed_install_reports_error() {
        let (worker, fetcher) = fixtures::worker().await;
        fetcher.clear();

        let err = install_impl(&worker).await.unwrap_err();
        assert_eq!(err.code.0, -32020);
        assert!(err.message.contains("/pwa-book-logger/"));
        assert_eq!(worker.state().await, LifecycleState::Redundant);
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let (worker, _fetcher) = fixtures::worker().await;
        assert!(activate_impl(&worker).await.is_err());
    }
}
