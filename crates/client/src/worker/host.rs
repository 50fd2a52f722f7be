//! Capabilities the worker borrows from its host runtime.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_core::{Error, WorkerConfig};

/// The one action offered on push notifications.
pub const EXPLORE_ACTION: &str = "explore";

/// Host runtime services the worker relies on but doesn't implement:
/// taking control of open pages, version supersession, notifications and
/// windows.
#[async_trait]
pub trait Host: Send + Sync {
    /// Take control of every page already open in scope.
    async fn claim_clients(&self) -> Result<(), Error>;

    /// Activate this version without waiting for the previous version's
    /// pages to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn open_window(&self, url: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification built from a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Payload text becomes the body; an empty payload gets the configured
    /// default.
    pub fn from_push(config: &WorkerConfig, payload: Option<&str>) -> Self {
        let body = payload
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(config.notification_default_body.as_str());

        Self {
            title: config.notification_title.clone(),
            body: body.to_string(),
            icon: config.notification_icon.clone(),
            badge: config.notification_badge.clone(),
            actions: vec![NotificationAction { action: EXPLORE_ACTION.into(), title: "Open library".into() }],
        }
    }
}
