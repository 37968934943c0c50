//! Sync controller: drives fetch → merge for paginated collections.

use crate::config::SyncConfig;
use crate::store::{CollectionState, CollectionStore, FetchKind, FetchTicket, LoadOutcome};
use crate::transport::PageFetcher;
use parking_lot::RwLock;
use rekindle_protocol::Identified;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Counters describing controller activity.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Fetches that reached the fetcher.
    pub fetches_started: u64,
    /// Pages merged into a collection.
    pub pages_applied: u64,
    /// Items added to collections by fetched pages.
    pub items_applied: u64,
    /// Failed fetches.
    pub failures: u64,
    /// Responses dropped because their collection was cleared.
    pub stale_discarded: u64,
    /// Calls that did not fetch because of a guard.
    pub skipped: u64,
    /// Completion time of the last applied page.
    pub last_applied_at: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Restores the idle phase if a fetch future is dropped mid-flight.
struct InFlight<'a, T: Identified + Clone> {
    store: &'a CollectionStore<T>,
    ticket: Option<FetchTicket>,
}

impl<T: Identified + Clone> InFlight<'_, T> {
    fn disarm(mut self) {
        self.ticket = None;
    }
}

impl<T: Identified + Clone> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.store.abandon_fetch(&ticket);
        }
    }
}

/// Orchestrates page fetches and merges them into a [`CollectionStore`].
///
/// At most one fetch per parent key is in flight. A call made while one is
/// pending is dropped, not queued. Failures never escape: they are recorded
/// as the collection's error and reported through [`LoadOutcome::Failed`].
pub struct SyncController<F: PageFetcher> {
    config: SyncConfig,
    fetcher: F,
    store: Arc<CollectionStore<F::Item>>,
    stats: RwLock<SyncStats>,
}

impl<F: PageFetcher> SyncController<F> {
    /// Creates a controller over an existing store.
    pub fn new(config: SyncConfig, fetcher: F, store: Arc<CollectionStore<F::Item>>) -> Self {
        Self {
            config,
            fetcher,
            store,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Creates a controller with a store of its own.
    pub fn with_new_store(config: SyncConfig, fetcher: F) -> Self {
        Self::new(config, fetcher, Arc::new(CollectionStore::new()))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<CollectionStore<F::Item>> {
        &self.store
    }

    /// Returns the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns a snapshot of the collection for `parent_id`.
    pub fn state(&self, parent_id: &str) -> Option<CollectionState<F::Item>> {
        self.store.snapshot(parent_id)
    }

    /// Loads the first page (`reset`) or the next page for `parent_id`.
    pub async fn load(&self, parent_id: &str, page_size: u32, reset: bool) -> LoadOutcome {
        let kind = if reset { FetchKind::Reset } else { FetchKind::More };
        self.run(parent_id, page_size, kind).await
    }

    /// Loads the page after the stored cursor and appends it.
    pub async fn load_more(&self, parent_id: &str, page_size: u32) -> LoadOutcome {
        self.run(parent_id, page_size, FetchKind::More).await
    }

    /// Reloads the first page using the configured page size.
    pub async fn refresh(&self, parent_id: &str) -> LoadOutcome {
        self.run(parent_id, self.config.default_page_size, FetchKind::Reset)
            .await
    }

    /// Drops all state for `parent_id`. Responses still in flight for it
    /// will be discarded.
    pub fn clear(&self, parent_id: &str) {
        if self.store.clear(parent_id) {
            debug!(parent = parent_id, "collection cleared");
        }
    }

    async fn run(&self, parent_id: &str, page_size: u32, kind: FetchKind) -> LoadOutcome {
        let ticket = match self.store.begin_fetch(parent_id, kind) {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!(parent = parent_id, ?kind, ?reason, "fetch skipped");
                let outcome = LoadOutcome::Skipped(reason);
                self.record(&outcome);
                return outcome;
            }
        };

        debug!(
            parent = parent_id,
            ?kind,
            cursor = ticket.cursor(),
            page_size,
            "fetching page"
        );
        self.stats.write().fetches_started += 1;

        let in_flight = InFlight {
            store: &self.store,
            ticket: Some(ticket.clone()),
        };
        let result = self
            .fetcher
            .fetch_page(ticket.parent_id(), page_size, ticket.cursor())
            .await;
        in_flight.disarm();

        if let Err(err) = &result {
            warn!(parent = parent_id, ?kind, error = %err, "page fetch failed");
        }

        let outcome = self.store.complete_fetch(ticket, result);
        self.record(&outcome);
        outcome
    }

    fn record(&self, outcome: &LoadOutcome) {
        let mut stats = self.stats.write();
        match outcome {
            LoadOutcome::Applied { appended, .. } => {
                stats.pages_applied += 1;
                stats.items_applied += *appended as u64;
                stats.last_applied_at = Some(Instant::now());
                stats.last_error = None;
            }
            LoadOutcome::Failed(err) => {
                stats.failures += 1;
                stats.last_error = Some(err.to_string());
            }
            LoadOutcome::Stale => stats.stale_discarded += 1,
            LoadOutcome::Skipped(_) => stats.skipped += 1,
        }
    }
}
