//! Durable mutation queue: offline writes and their replay.
//!
//! A write that can't reach the network is stored and acknowledged with a
//! synthetic `202 Accepted`, so the page carries on as if it succeeded. The
//! host's background sync signal triggers [`MutationQueue::drain`], which
//! replays every stored write oldest first and removes the ones the server
//! accepted. One failed replay never blocks the others.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_core::http::QUEUED_HEADER;
use shelfsync_core::{CacheDb, Error, QueuedMutation, Request, Response};

use crate::fetch::Fetcher;
use crate::strategy::{FetchOutcome, ResponseSource};

/// Summary of one drain cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DrainReport {
    pub attempted: usize,
    /// Timestamps of mutations replayed and removed.
    pub replayed: Vec<i64>,
    /// Timestamps of mutations left queued for the next cycle.
    pub failed: Vec<i64>,
    /// Queue length after the cycle.
    pub remaining: u64,
}

/// Submits state-changing requests and replays the ones that were queued.
#[derive(Clone)]
pub struct MutationQueue {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
}

impl MutationQueue {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { db, fetcher }
    }

    /// Send a write, queueing it when the network is unreachable.
    ///
    /// Any HTTP response, error statuses included, is returned unchanged: the
    /// server was reached, so there is nothing to replay.
    pub async fn submit(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(FetchOutcome::ready(response, ResponseSource::Network)),
            Err(err) if err.is_network() => {
                let queued = self.db.enqueue_mutation(request).await?;
                tracing::info!("queued {} {} for replay ({})", request.method, request.url, err);
                Ok(FetchOutcome::ready(acknowledgement(&queued), ResponseSource::Queued))
            }
            Err(err) => Err(err),
        }
    }

    /// Replay every queued mutation, oldest first.
    pub async fn drain(&self) -> Result<DrainReport, Error> {
        let queued = self.db.queued_mutations().await?;
        let mut report = DrainReport { attempted: queued.len(), ..Default::default() };

        for mutation in queued {
            match self.replay(&mutation).await {
                Ok(()) => {
                    self.db.remove_mutation(mutation.timestamp).await?;
                    report.replayed.push(mutation.timestamp);
                }
                Err(e) => {
                    tracing::warn!(
                        "replay of {} {} (queued at {}) failed: {}",
                        mutation.method,
                        mutation.url,
                        mutation.timestamp,
                        e
                    );
                    report.failed.push(mutation.timestamp);
                }
            }
        }

        report.remaining = self.db.queued_count().await?;
        tracing::info!(
            attempted = report.attempted,
            replayed = report.replayed.len(),
            failed = report.failed.len(),
            "mutation queue drained"
        );
        Ok(report)
    }

    /// Every mutation still waiting, oldest first.
    pub async fn pending(&self) -> Result<Vec<QueuedMutation>, Error> {
        self.db.queued_mutations().await
    }

    async fn replay(&self, mutation: &QueuedMutation) -> Result<(), Error> {
        let response = self.fetcher.fetch(&mutation.to_request()).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("status {}", response.status)));
        }
        Ok(())
    }
}

fn acknowledgement(queued: &QueuedMutation) -> Response {
    let body = serde_json::json!({ "queued": true, "timestamp": queued.timestamp });
    Response::new(202, body.to_string())
        .with_header("Content-Type", "application/json")
        .with_header(QUEUED_HEADER, queued.timestamp.to_string())
}
