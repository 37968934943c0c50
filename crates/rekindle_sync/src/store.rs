//! Collection store: per-parent ordered item lists with cursor state.
//!
//! The store owns every [`CollectionState`] and is the only place they are
//! mutated. Readers get cloned snapshots.
//!
//! ## Invariants
//!
//! - A collection never holds two items with the same id
//! - At most one fetch is in flight per parent key ([`FetchPhase`])
//! - `has_more` / `next_cursor` reflect the last completed fetch; failures
//!   leave them untouched
//! - A fetch result is applied only to the state that issued it; states
//!   that were cleared (or cleared and recreated) discard it

use crate::error::{SyncError, SyncResult};
use parking_lot::RwLock;
use rekindle_protocol::{Identified, PageResult};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Fetch activity for one parent key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// No fetch in flight.
    #[default]
    Idle,
    /// A reset (first page) fetch is in flight.
    Loading,
    /// An incremental fetch is in flight.
    LoadingMore,
}

/// Which page a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First page; replaces held items.
    Reset,
    /// Page after the stored cursor; appended to held items.
    More,
}

/// State of one paginated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<T> {
    items: Vec<T>,
    has_more: bool,
    next_cursor: Option<String>,
    phase: FetchPhase,
    error: Option<String>,
    generation: u64,
}

impl<T> CollectionState<T> {
    fn new(generation: u64) -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
            next_cursor: None,
            phase: FetchPhase::Idle,
            error: None,
            generation,
        }
    }

    /// Items in server order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the state, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Whether a further page exists.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Cursor for the next page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Current fetch phase.
    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// Whether a reset fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == FetchPhase::Loading
    }

    /// Whether an incremental fetch is in flight.
    pub fn is_loading_more(&self) -> bool {
        self.phase == FetchPhase::LoadingMore
    }

    /// Message from the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Identified> CollectionState<T> {
    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn replace_with(&mut self, page: PageResult<T>) -> usize {
        let mut seen = HashSet::with_capacity(page.items.len());
        let received = page.items.len();
        self.items = page
            .items
            .into_iter()
            .filter(|item| seen.insert(item.id().to_owned()))
            .collect();
        if self.items.len() != received {
            debug!(
                dropped = received - self.items.len(),
                "duplicate ids inside a single page"
            );
        }
        self.has_more = page.has_more;
        self.next_cursor = page.next_cursor;
        self.items.len()
    }

    fn merge(&mut self, page: PageResult<T>) -> usize {
        let mut seen: HashSet<String> = self.items.iter().map(|i| i.id().to_owned()).collect();
        let before = self.items.len();
        for item in page.items {
            if seen.insert(item.id().to_owned()) {
                self.items.push(item);
            }
        }
        self.has_more = page.has_more;
        self.next_cursor = page.next_cursor;
        self.items.len() - before
    }
}

/// Why a fetch was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch for the key is already in flight.
    InFlight(FetchPhase),
    /// The last page has been reached (or nothing was loaded yet).
    NoMorePages,
    /// The server reported more pages without a cursor to fetch them.
    MissingCursor,
}

/// Permission to run one fetch, issued by [`CollectionStore::begin_fetch`].
///
/// The ticket pins the parent key and state generation at the time the
/// fetch started; completion is matched against those, never against
/// whatever key the caller currently cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    parent_id: String,
    kind: FetchKind,
    cursor: Option<String>,
    generation: u64,
}

impl FetchTicket {
    /// Parent key the fetch belongs to.
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// Reset or incremental.
    pub fn kind(&self) -> FetchKind {
        self.kind
    }

    /// Cursor to send; `None` for the first page.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

/// Result of attempting a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was merged into the collection.
    Applied {
        /// Items in the fetched page.
        received: usize,
        /// Items that ended up in the collection from this page.
        appended: usize,
    },
    /// No fetch was issued.
    Skipped(SkipReason),
    /// The fetch failed; the message is stored as the collection's error.
    Failed(SyncError),
    /// The response arrived after its collection was cleared and was dropped.
    Stale,
}

impl LoadOutcome {
    /// Returns true if a page was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied { .. })
    }
}

struct Inner<T> {
    states: HashMap<String, CollectionState<T>>,
    next_generation: u64,
}

impl<T> Inner<T> {
    fn state_mut(&mut self, parent_id: &str) -> &mut CollectionState<T> {
        let next_generation = &mut self.next_generation;
        self.states
            .entry(parent_id.to_string())
            .or_insert_with(|| {
                *next_generation += 1;
                CollectionState::new(*next_generation)
            })
    }
}

/// Owner of every paginated collection, keyed by parent id.
pub struct CollectionStore<T> {
    inner: RwLock<Inner<T>>,
}

impl<T> CollectionStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                states: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Removes all state for `parent_id`. Returns false if none existed.
    pub fn clear(&self, parent_id: &str) -> bool {
        self.inner.write().states.remove(parent_id).is_some()
    }

    /// Removes every collection.
    pub fn clear_all(&self) {
        self.inner.write().states.clear();
    }

    /// Returns true if state exists for `parent_id`.
    pub fn contains(&self, parent_id: &str) -> bool {
        self.inner.read().states.contains_key(parent_id)
    }

    /// Number of items held for `parent_id`.
    pub fn len(&self, parent_id: &str) -> usize {
        self.inner
            .read()
            .states
            .get(parent_id)
            .map_or(0, CollectionState::len)
    }

    /// Parent keys with state, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().states.keys().cloned().collect()
    }
}

impl<T: Clone> CollectionStore<T> {
    /// Returns a copy of the state for `parent_id`.
    pub fn snapshot(&self, parent_id: &str) -> Option<CollectionState<T>> {
        self.inner.read().states.get(parent_id).cloned()
    }
}

impl<T: Identified + Clone> CollectionStore<T> {
    /// Replaces the items for `parent_id` with `page`.
    pub fn reset(&self, parent_id: &str, page: PageResult<T>) {
        self.inner.write().state_mut(parent_id).replace_with(page);
    }

    /// Appends the items of `page` whose ids are not already held.
    ///
    /// Returns the number of items appended. Appending the same page twice
    /// changes nothing the second time.
    pub fn append(&self, parent_id: &str, page: PageResult<T>) -> usize {
        self.inner.write().state_mut(parent_id).merge(page)
    }

    /// Inserts a newly created item at the front, replacing any item with
    /// the same id.
    pub fn prepend(&self, parent_id: &str, item: T) {
        let mut inner = self.inner.write();
        let state = inner.state_mut(parent_id);
        if let Some(index) = state.position(item.id()) {
            state.items.remove(index);
        }
        state.items.insert(0, item);
    }

    /// Replaces the held item with the same id, keeping its position.
    ///
    /// Returns false if no such item is held.
    pub fn update(&self, parent_id: &str, item: T) -> bool {
        let mut inner = self.inner.write();
        let Some(state) = inner.states.get_mut(parent_id) else {
            return false;
        };
        match state.position(item.id()) {
            Some(index) => {
                state.items[index] = item;
                true
            }
            None => false,
        }
    }

    /// Removes the item with `id`, returning it.
    pub fn remove(&self, parent_id: &str, id: &str) -> Option<T> {
        let mut inner = self.inner.write();
        let state = inner.states.get_mut(parent_id)?;
        let index = state.position(id)?;
        Some(state.items.remove(index))
    }

    /// Returns a copy of the item with `id`.
    pub fn get(&self, parent_id: &str, id: &str) -> Option<T> {
        let inner = self.inner.read();
        let state = inner.states.get(parent_id)?;
        state.position(id).map(|index| state.items[index].clone())
    }

    /// Marks a fetch as in flight and returns its ticket, or the reason no
    /// fetch should run.
    ///
    /// A reset creates the state if needed; an incremental fetch never
    /// does. Any in-flight fetch for the key blocks both kinds.
    pub fn begin_fetch(&self, parent_id: &str, kind: FetchKind) -> Result<FetchTicket, SkipReason> {
        let mut inner = self.inner.write();
        let state = match kind {
            FetchKind::Reset => inner.state_mut(parent_id),
            FetchKind::More => inner
                .states
                .get_mut(parent_id)
                .ok_or(SkipReason::NoMorePages)?,
        };

        if state.phase != FetchPhase::Idle {
            return Err(SkipReason::InFlight(state.phase));
        }

        let cursor = match kind {
            FetchKind::Reset => None,
            FetchKind::More => {
                if !state.has_more {
                    return Err(SkipReason::NoMorePages);
                }
                Some(state.next_cursor.clone().ok_or(SkipReason::MissingCursor)?)
            }
        };

        state.phase = match kind {
            FetchKind::Reset => FetchPhase::Loading,
            FetchKind::More => FetchPhase::LoadingMore,
        };
        state.error = None;

        Ok(FetchTicket {
            parent_id: parent_id.to_string(),
            kind,
            cursor,
            generation: state.generation,
        })
    }

    /// Returns the collection to idle after a fetch was abandoned without a
    /// result (its future was dropped). No-op if the state has moved on.
    pub fn abandon_fetch(&self, ticket: &FetchTicket) {
        let mut inner = self.inner.write();
        if let Some(state) = inner.states.get_mut(&ticket.parent_id) {
            if state.generation == ticket.generation && state.phase != FetchPhase::Idle {
                debug!(parent = %ticket.parent_id, "fetch abandoned");
                state.phase = FetchPhase::Idle;
            }
        }
    }

    /// Applies the result of the fetch identified by `ticket`.
    ///
    /// On failure only the error is recorded; items and cursor state are
    /// left as they were.
    pub fn complete_fetch(&self, ticket: FetchTicket, result: SyncResult<PageResult<T>>) -> LoadOutcome {
        let mut inner = self.inner.write();
        let state = match inner.states.get_mut(&ticket.parent_id) {
            Some(state) if state.generation == ticket.generation => state,
            _ => {
                debug!(parent = %ticket.parent_id, "discarding response for cleared collection");
                return LoadOutcome::Stale;
            }
        };

        state.phase = FetchPhase::Idle;
        match result {
            Ok(page) => {
                let received = page.items.len();
                let appended = match ticket.kind {
                    FetchKind::Reset => state.replace_with(page),
                    FetchKind::More => state.merge(page),
                };
                state.error = None;
                LoadOutcome::Applied { received, appended }
            }
            Err(err) => {
                state.error = Some(err.to_string());
                LoadOutcome::Failed(err)
            }
        }
    }
}

impl<T> Default for CollectionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
