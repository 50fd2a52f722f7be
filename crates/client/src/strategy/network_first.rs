//! Network-first with expiry for API traffic.

use shelfsync_core::{Error, Partition, Request};

use super::{FetchOutcome, ResponseSource, StrategyEngine, now_ms};

impl StrategyEngine {
    /// Prefer the live response; fall back to a cached copy younger than the
    /// max age.
    ///
    /// Successful live responses are stamped with the fetch time before they
    /// are stored and returned. A stale cached copy is never served.
    pub async fn network_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let partition = self.partition(Partition::Api);

        let err = match self.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => {
                let stamped = response.stamped(now_ms());
                self.db.put(partition, request, &stamped).await?;
                return Ok(FetchOutcome::ready(stamped, ResponseSource::Network));
            }
            Ok(response) => return Ok(FetchOutcome::ready(response, ResponseSource::Network)),
            Err(err) => err,
        };

        match self.db.match_in(partition, request).await? {
            Some(cached) if cached.is_fresh(now_ms(), self.api_max_age_ms) => {
                tracing::debug!("serving cached api response for {} ({})", request.url, err);
                Ok(FetchOutcome::ready(cached, ResponseSource::Cache))
            }
            Some(cached) => Err(Error::StaleResponse(format!(
                "{} cached at {:?} is older than {}ms ({})",
                request.url,
                cached.fetched_at(),
                self.api_max_age_ms,
                err
            ))),
            None => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use shelfsync_core::Response;

    use super::*;
    use crate::testing::{FakeFetcher, engine};

    const API: &str = "book-logger-api-v1";
    const BOOKS: &str = "https://firestore.googleapis.com/v1/projects/p/databases/(default)/documents/books";
    const DAY_MS: i64 = 86_400_000;

    #[tokio::test]
    async fn test_live_response_is_stamped_and_stored() {
        let fetcher = FakeFetcher::new();
        fetcher.respond("GET", BOOKS, Response::new(200, r#"{"documents":[]}"#));
        let (engine, db) = engine(fetcher).await;
        let before = now_ms();

        let outcome = engine.network_first(&Request::get(BOOKS)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        let stamp = outcome.response.fetched_at().unwrap();
        assert!(stamp >= before);
        assert!(stamp <= now_ms());

        let stored = db.match_in(API, &Request::get(BOOKS)).await.unwrap().unwrap();
        assert_eq!(stored.fetched_at(), Some(stamp));
    }

    #[tokio::test]
    async fn test_live_error_status_is_not_cached() {
        let fetcher = FakeFetcher::new();
        fetcher.respond("GET", BOOKS, Response::new(503, "unavailable"));
        let (engine, db) = engine(fetcher).await;

        let outcome = engine.network_first(&Request::get(BOOKS)).await.unwrap();
        assert_eq!(outcome.response.status, 503);
        assert!(outcome.response.fetched_at().is_none());
        assert!(db.match_in(API, &Request::get(BOOKS)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fresh_fallback_is_served() {
        let fetcher = FakeFetcher::new();
        let (engine, db) = engine(fetcher).await;
        let cached = Response::new(200, "cached books").stamped(now_ms() - DAY_MS + 60_000);
        db.put(API, &Request::get(BOOKS), &cached).await.unwrap();

        let outcome = engine.network_first(&Request::get(BOOKS)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body, b"cached books");
    }

    #[tokio::test]
    async fn test_expired_fallback_is_refused() {
        let fetcher = FakeFetcher::new();
        let (engine, db) = engine(fetcher).await;
        let cached = Response::new(200, "old books").stamped(now_ms() - DAY_MS);
        db.put(API, &Request::get(BOOKS), &cached).await.unwrap();

        let result = engine.network_first(&Request::get(BOOKS)).await;
        assert!(matches!(result, Err(Error::StaleResponse(_))));

        // staleness disqualifies the entry but does not delete it
        assert!(db.match_in(API, &Request::get(BOOKS)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_no_fallback_propagates_network_error() {
        let fetcher = FakeFetcher::new();
        let (engine, _db) = engine(fetcher).await;

        let result = engine.network_first(&Request::get(BOOKS)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_unstamped_fallback_is_refused() {
        let fetcher = FakeFetcher::new();
        let (engine, db) = engine(fetcher).await;
        db.put(API, &Request::get(BOOKS), &Response::new(200, "legacy")).await.unwrap();

        let result = engine.network_first(&Request::get(BOOKS)).await;
        assert!(matches!(result, Err(Error::StaleResponse(_))));
    }
}
