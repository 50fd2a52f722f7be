//! Stale-while-revalidate for runtime same-origin resources.

use shelfsync_core::{Error, Partition, Request, Response};

use super::{FetchOutcome, ResponseSource, StrategyEngine};

impl StrategyEngine {
    /// Answer from the dynamic partition at once and refresh it in the
    /// background. Without a cached entry the caller waits for the network.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(cached) = self.db.match_in(self.partition(Partition::Dynamic), request).await? {
            tracing::debug!("cache hit for {}, revalidating", request.url);
            let engine = self.clone();
            let request = request.clone();
            let refresh = tokio::spawn(async move {
                if let Err(e) = engine.revalidate(&request).await {
                    tracing::warn!("background refresh of {} dropped: {}", request.url, e);
                }
            });
            return Ok(FetchOutcome { response: cached, source: ResponseSource::Cache, wait_until: Some(refresh) });
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_dynamic(request, &response).await?;
                }
                Ok(FetchOutcome::ready(response, ResponseSource::Network))
            }
            Err(err) => self.offline_fallback(request, err).await,
        }
    }

    async fn revalidate(&self, request: &Request) -> Result<(), Error> {
        let response = self.fetcher.fetch(request).await?;
        if response.is_success() {
            self.store_dynamic(request, &response).await?;
        }
        Ok(())
    }

    /// Write then trim; eviction never runs before the write it follows.
    async fn store_dynamic(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let partition = self.partition(Partition::Dynamic);
        self.db.put(partition, request, response).await?;
        self.eviction.enforce(&self.db, partition).await?;
        Ok(())
    }
}
