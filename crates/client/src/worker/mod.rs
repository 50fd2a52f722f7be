//! Worker lifecycle and event dispatch.
//!
//! A [`Worker`] is one installed version of the offline layer. The host
//! delivers events to [`Worker::dispatch`]; the worker moves through
//! `Installing -> Installed -> Active -> Superseded`, or to `Redundant` when
//! its install fails.
//!
//! Install pre-caches the whole manifest or nothing. Activation deletes
//! partitions left behind by earlier versions and claims open pages.

mod host;

pub use host::{EXPLORE_ACTION, Host, Notification, NotificationAction};

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_core::{CacheDb, Error, Partition, PartitionRegistry, Request, Response, WorkerConfig};
use tokio::sync::RwLock;

use crate::fetch::Fetcher;
use crate::strategy::{FetchOutcome, Route, Router, StrategyEngine};
use crate::sync::{DrainReport, MutationQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    /// Installed and waiting for the host to activate it.
    Installed,
    Active,
    /// A newer version took over.
    Superseded,
    /// Install failed; the host discards this version.
    Redundant,
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push { payload: Option<String> },
    NotificationClick { action: Option<String> },
}

/// What handling an event produced.
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    /// The request is not intercepted; the host handles it as usual.
    Passthrough(Request),
    Synced(DrainReport),
    /// Sync event for a tag this worker doesn't own.
    Ignored,
    NotificationShown(Notification),
    WindowOpened(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub partitions: Vec<String>,
    /// Number of manifest assets stored in the static partition.
    pub cached: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    /// Orphaned partitions that were deleted.
    pub deleted: Vec<String>,
}

/// One version of the offline layer, with its storage and host injected.
pub struct Worker {
    config: WorkerConfig,
    db: CacheDb,
    router: Router,
    registry: PartitionRegistry,
    engine: StrategyEngine,
    queue: MutationQueue,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn Host>,
    state: RwLock<LifecycleState>,
}

impl Worker {
    pub fn new(
        config: WorkerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let router = Router::from_config(&config)?;
        let engine = StrategyEngine::new(&config, &router, db.clone(), fetcher.clone())?;
        let queue = MutationQueue::new(db.clone(), fetcher.clone());
        let registry = config.registry();

        Ok(Self {
            config,
            db,
            router,
            registry,
            engine,
            queue,
            fetcher,
            host,
            state: RwLock::new(LifecycleState::Installing),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn registry(&self) -> &PartitionRegistry {
        &self.registry
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    async fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().await;
        tracing::info!("worker {:?} -> {:?}", *state, next);
        *state = next;
    }

    async fn require(&self, allowed: &[LifecycleState], event: &str) -> Result<(), Error> {
        let state = self.state().await;
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(Error::InvalidState(format!("{event} while {state:?}")))
        }
    }

    /// Route an event to its handler.
    pub async fn dispatch(&self, event: Event) -> Result<EventOutcome, Error> {
        match event {
            Event::Install => self.install().await.map(EventOutcome::Installed),
            Event::Activate => self.activate().await.map(EventOutcome::Activated),
            Event::Fetch(request) => self.fetch(&request).await,
            Event::Sync { tag } => match self.sync(&tag).await? {
                Some(report) => Ok(EventOutcome::Synced(report)),
                None => Ok(EventOutcome::Ignored),
            },
            Event::Push { payload } => self.push(payload.as_deref()).await.map(EventOutcome::NotificationShown),
            Event::NotificationClick { action } => self
                .notification_click(action.as_deref())
                .await
                .map(EventOutcome::WindowOpened),
        }
    }

    /// Create the partitions and pre-cache the manifest.
    ///
    /// Any manifest fetch failing, at the network or with a non-success
    /// status, fails the install and leaves the static partition untouched.
    /// A host refusing `skip_waiting` afterwards is logged; the install stands.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.require(&[LifecycleState::Installing], "install").await?;

        match self.precache().await {
            Ok(report) => {
                self.set_state(LifecycleState::Installed).await;
                if self.config.skip_waiting {
                    if let Err(e) = self.host.skip_waiting().await {
                        tracing::warn!("skip_waiting failed, waiting for activation: {}", e);
                    }
                }
                Ok(report)
            }
            Err(err) => {
                tracing::error!("install failed: {}", err);
                self.set_state(LifecycleState::Redundant).await;
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        let partitions = self.registry.active_names();
        for name in &partitions {
            self.db.open_partition(name).await?;
        }

        let mut entries: Vec<(Request, Response)> = Vec::with_capacity(self.config.precache.len());
        for path in &self.config.precache {
            let request = Request::get(self.router.absolute(path)?);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            if !response.is_success() {
                return Err(Error::InstallFailed(format!("{path} returned status {}", response.status)));
            }
            entries.push((request, response));
        }

        let cached = entries.len();
        self.db.put_all(self.registry.name(Partition::Static), entries).await?;
        tracing::info!("pre-cached {} assets", cached);

        Ok(InstallReport { partitions, cached })
    }

    /// Delete orphaned partitions and take control of open pages.
    ///
    /// Re-running on an active worker repeats the cleanup.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.require(&[LifecycleState::Installed, LifecycleState::Active], "activate")
            .await?;

        let deleted = self.db.delete_all_except(&self.registry.active_names()).await?;
        self.host.claim_clients().await?;
        self.set_state(LifecycleState::Active).await;

        Ok(ActivateReport { deleted })
    }

    /// Mark this version as replaced by a newer one.
    pub async fn supersede(&self) {
        self.set_state(LifecycleState::Superseded).await;
    }

    /// Handle an intercepted fetch.
    pub async fn fetch(&self, request: &Request) -> Result<EventOutcome, Error> {
        self.require(&[LifecycleState::Active], "fetch").await?;

        if self.router.is_foreign_scheme(&request.url) {
            tracing::debug!("{} {} not http(s), passing through", request.method, request.url);
            return Ok(EventOutcome::Passthrough(request.clone()));
        }
        let request = self.router.resolve(request)?;
        let route = self.router.classify(&request)?;
        tracing::debug!("{} {} -> {:?}", request.method, request.url, route);

        let outcome = match route {
            Route::Passthrough => return Ok(EventOutcome::Passthrough(request)),
            Route::Mutation => self.queue.submit(&request).await?,
            cached => self.engine.respond(cached, &request).await?,
        };
        Ok(EventOutcome::Fetched(outcome))
    }

    /// Drain the mutation queue when `tag` is this worker's sync tag.
    pub async fn sync(&self, tag: &str) -> Result<Option<DrainReport>, Error> {
        self.require(&[LifecycleState::Active], "sync").await?;

        if tag != self.config.sync_tag {
            tracing::debug!("ignoring sync tag {}", tag);
            return Ok(None);
        }
        self.queue.drain().await.map(Some)
    }

    pub async fn push(&self, payload: Option<&str>) -> Result<Notification, Error> {
        let notification = Notification::from_push(&self.config, payload);
        self.host.show_notification(&notification).await?;
        Ok(notification)
    }

    /// Open the in-app page behind notifications, whichever action was
    /// clicked.
    pub async fn notification_click(&self, action: Option<&str>) -> Result<String, Error> {
        let url = self.router.absolute(&self.config.notification_url)?;
        tracing::debug!("notification click ({}) opens {}", action.unwrap_or("default"), url);
        self.host.open_window(&url).await?;
        Ok(url)
    }
}
