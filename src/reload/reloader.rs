//! Rate-limited reload triggers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;
use crate::reload::{Limiter, Outcome, ReloadError, Site, SourceSync};

/// Result of one limited execution; shared so it can be handed to every
/// caller that got coalesced into it.
pub type ReloadResult = Result<(), Arc<ReloadError>>;

/// Owns the limiters guarding plain reloads and sync-then-reload.
pub struct Reloader {
    reload: Arc<Limiter<ReloadResult>>,
    sync: Option<Arc<Limiter<ReloadResult>>>,
}

impl Reloader {
    pub fn new(
        site: Arc<Site>,
        source: Option<Arc<dyn SourceSync>>,
        interval: Duration,
        capacity: usize,
    ) -> Self {
        let plain = site.clone();
        let reload = Arc::new(Limiter::new(interval, capacity, move || {
            plain.reload().map(|_| ()).map_err(Arc::new)
        }));

        let sync = source.map(|source| {
            Arc::new(Limiter::new(interval, capacity, move || {
                source.sync().map_err(|e| {
                    tracing::warn!(error = %e, "Content sync failed");
                    Arc::new(ReloadError::from(e))
                })?;
                site.reload().map(|_| ()).map_err(Arc::new)
            }))
        });

        Self { reload, sync }
    }

    pub fn has_sync(&self) -> bool {
        self.sync.is_some()
    }

    /// Blocks while a reload runs.
    pub fn trigger_reload(&self) -> Outcome<ReloadResult> {
        self.reload.trigger()
    }

    /// `None` when no source sync is configured. Blocks while it runs.
    pub fn trigger_sync(&self) -> Option<Outcome<ReloadResult>> {
        self.sync.as_ref().map(|limiter| limiter.trigger())
    }

    /// One ticker per limiter, all stopped by `shutdown`.
    pub fn spawn_tickers(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        std::iter::once(&self.reload)
            .chain(self.sync.as_ref())
            .map(|limiter| limiter.clone().spawn_ticker(shutdown.subscribe()))
            .collect()
    }
}
