//! Host capabilities for the stdio server.
//!
//! There is no browser behind the server: page control, notifications and
//! windows are reported through the log, and the tools hand the notification
//! or target URL back to the caller.

use async_trait::async_trait;
use shelfsync_client::{Host, Notification};
use shelfsync_core::Error;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogHost;

#[async_trait]
impl Host for LogHost {
    async fn claim_clients(&self) -> Result<(), Error> {
        tracing::info!("claimed open clients");
        Ok(())
    }

    async fn skip_waiting(&self) -> Result<(), Error> {
        tracing::info!("skipping the waiting phase");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "notification shown");
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        tracing::info!("opening window {}", url);
        Ok(())
    }
}
