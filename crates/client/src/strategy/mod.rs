//! Freshness strategies for intercepted fetches.
//!
//! ### Routing (first match wins)
//! - `GET` to a declared API origin prefix: network-first, api partition.
//! - `GET` same-origin whose path is a manifest asset: cache-first, static partition.
//! - Any other same-origin `GET`: stale-while-revalidate, dynamic partition.
//! - State-changing methods to the own origin or an API origin: mutation path.
//! - Everything else (third-party traffic, `HEAD`, `OPTIONS`) is not intercepted.
//!
//! ### Failure handling
//! - Requests accepting `text/html` fall back to the pre-cached offline page
//!   when cache-first or stale-while-revalidate can't produce a response.
//! - API responses serve as fallback only within their max age.

mod cache_first;
mod network_first;
mod revalidate;

use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_core::{CacheDb, Error, EvictionPolicy, Partition, PartitionRegistry, Request, Response, WorkerConfig};
use tokio::task::JoinHandle;
use url::Url;

use crate::fetch::{Fetcher, canonicalize, same_origin};

/// How an intercepted request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    Mutation,
    /// Not intercepted; left to the host's default handling.
    Passthrough,
}

/// Where the response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflinePage,
    /// Synthetic acknowledgement of a mutation stored for replay.
    Queued,
}

/// Result of handling one intercepted fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
    /// Work that keeps running after the response was handed back, such as a
    /// background revalidation.
    pub wait_until: Option<JoinHandle<()>>,
}

impl FetchOutcome {
    pub fn ready(response: Response, source: ResponseSource) -> Self {
        Self { response, source, wait_until: None }
    }
}

/// Classifies requests by URL.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    manifest: HashSet<String>,
    api_origins: Vec<String>,
}

impl Router {
    pub fn new(origin: Url, manifest: impl IntoIterator<Item = String>, api_origins: Vec<String>) -> Self {
        Self { origin, manifest: manifest.into_iter().collect(), api_origins }
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self::new(origin, config.precache.iter().cloned(), config.api_origins.clone()))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL of a path under the worker's origin.
    pub fn absolute(&self, path: &str) -> Result<String, Error> {
        canonicalize(&self.origin, path)
            .map(String::from)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    /// Whether `url` is absolute with a scheme other than http(s), such as
    /// `data:`, `blob:` or an extension scheme. Those are never intercepted.
    pub fn is_foreign_scheme(&self, url: &str) -> bool {
        self.origin
            .join(url)
            .is_ok_and(|u| !matches!(u.scheme(), "http" | "https"))
    }

    /// Copy of the request with its URL canonicalized and made absolute.
    pub fn resolve(&self, request: &Request) -> Result<Request, Error> {
        let url = self.absolute(&request.url)?;
        Ok(Request { method: request.method.to_ascii_uppercase(), url, ..request.clone() })
    }

    /// Pick the route for a resolved request.
    pub fn classify(&self, request: &Request) -> Result<Route, Error> {
        let url = Url::parse(&request.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", request.url)))?;
        let is_api = self.is_api(&url);
        let own = same_origin(&self.origin, &url);

        if request.is_mutation() {
            return Ok(if is_api || own { Route::Mutation } else { Route::Passthrough });
        }
        if request.method != "GET" {
            return Ok(Route::Passthrough);
        }

        let route = if is_api {
            Route::NetworkFirst
        } else if own && self.manifest.contains(url.path()) {
            Route::CacheFirst
        } else if own {
            Route::StaleWhileRevalidate
        } else {
            Route::Passthrough
        };
        Ok(route)
    }

    fn is_api(&self, url: &Url) -> bool {
        self.api_origins.iter().any(|prefix| url.as_str().starts_with(prefix.as_str()))
    }
}

/// Runs the three freshness strategies against the partitions.
#[derive(Clone)]
pub struct StrategyEngine {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    registry: PartitionRegistry,
    eviction: EvictionPolicy,
    api_max_age_ms: i64,
    offline_page: Request,
}

impl StrategyEngine {
    pub fn new(config: &WorkerConfig, router: &Router, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        Ok(Self {
            db,
            fetcher,
            registry: config.registry(),
            eviction: config.eviction(),
            api_max_age_ms: config.api_max_age(),
            offline_page: Request::get(router.absolute(&config.offline_page)?),
        })
    }

    /// Run the strategy for a cacheable route.
    pub async fn respond(&self, route: Route, request: &Request) -> Result<FetchOutcome, Error> {
        match route {
            Route::CacheFirst => self.cache_first(request).await,
            Route::NetworkFirst => self.network_first(request).await,
            Route::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
            Route::Mutation | Route::Passthrough => {
                Err(Error::InvalidInput(format!("{route:?} has no caching strategy")))
            }
        }
    }

    fn partition(&self, partition: Partition) -> &str {
        self.registry.name(partition)
    }

    /// Serve the offline page to HTML requests, or give back the failure.
    async fn offline_fallback(&self, request: &Request, err: Error) -> Result<FetchOutcome, Error> {
        if !request.accepts_html() {
            return Err(err);
        }

        match self.db.match_in(self.partition(Partition::Static), &self.offline_page).await? {
            Some(page) => {
                tracing::debug!("serving offline page for {} ({})", request.url, err);
                Ok(FetchOutcome::ready(page, ResponseSource::OfflinePage))
            }
            None => Err(err),
        }
    }
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
