//! shelfsync server entry point.
//!
//! This is the main binary that boots the worker and serves its events as MCP
//! tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shelfsync_client::{FetchClient, FetchConfig, Fetcher, Worker};
use shelfsync_core::{CacheDb, WorkerConfig};
use tracing_subscriber::EnvFilter;

mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        db = %config.db_path.display(),
        "Starting shelfsync server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Worker::new(config, db, fetcher.clone(), Arc::new(host::LogHost))?;

    let handler = handler::ShelfSyncServer::new(Arc::new(worker), fetcher);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
