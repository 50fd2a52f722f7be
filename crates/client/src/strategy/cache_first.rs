//! Cache-first for pre-cached static assets.

use shelfsync_core::{Error, Partition, Request};

use super::{FetchOutcome, ResponseSource, StrategyEngine};

impl StrategyEngine {
    /// Serve from the static partition; fetch and store only on a miss.
    pub async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let partition = self.partition(Partition::Static);

        if let Some(cached) = self.db.match_in(partition, request).await? {
            tracing::debug!("cache hit for {}", request.url);
            return Ok(FetchOutcome::ready(cached, ResponseSource::Cache));
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.db.put(partition, request, &response).await?;
                }
                Ok(FetchOutcome::ready(response, ResponseSource::Network))
            }
            Err(err) => self.offline_fallback(request, err).await,
        }
    }
}
