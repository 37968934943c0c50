//! Remote page fetching.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use rekindle_protocol::{Identified, PageResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Fetches one page of a parent-scoped collection.
///
/// Implementations are stateless I/O: no caching and no retries. Errors are
/// surfaced to the caller as-is.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Item type carried by the pages.
    type Item: Identified + Clone + Send + Sync + 'static;

    /// Fetches the page after `cursor`, or the first page if `cursor` is `None`.
    async fn fetch_page(
        &self,
        parent_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> SyncResult<PageResult<Self::Item>>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    type Item = F::Item;

    async fn fetch_page(
        &self,
        parent_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> SyncResult<PageResult<Self::Item>> {
        (**self).fetch_page(parent_id, page_size, cursor).await
    }
}

/// Rejects a zero page size before any I/O happens.
pub fn check_page_size(page_size: u32) -> SyncResult<()> {
    if page_size == 0 {
        return Err(SyncError::Validation("page size must be positive".into()));
    }
    Ok(())
}

/// A fetch observed by [`MockFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    /// Parent key requested.
    pub parent_id: String,
    /// Page size requested.
    pub page_size: u32,
    /// Cursor sent.
    pub cursor: Option<String>,
}

/// A scripted fetcher for testing.
///
/// Responses are queued per parent key and consumed in order. While the
/// fetcher is held, every fetch blocks after being recorded until
/// [`MockFetcher::release`] or [`MockFetcher::open`] lets it through.
pub struct MockFetcher<T> {
    responses: Mutex<HashMap<String, VecDeque<SyncResult<PageResult<T>>>>>,
    calls: Mutex<Vec<FetchCall>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl<T> MockFetcher<T> {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Queues a page for `parent_id`.
    pub fn push_page(&self, parent_id: &str, page: PageResult<T>) {
        self.push_response(parent_id, Ok(page));
    }

    /// Queues a failure for `parent_id`.
    pub fn push_error(&self, parent_id: &str, error: SyncError) {
        self.push_response(parent_id, Err(error));
    }

    fn push_response(&self, parent_id: &str, response: SyncResult<PageResult<T>>) {
        self.responses
            .lock()
            .entry(parent_id.to_string())
            .or_default()
            .push_back(response);
    }

    /// Returns every fetch that reached the mock.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    /// Number of fetches that reached the mock.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of responses still queued for `parent_id`.
    pub fn pending(&self, parent_id: &str) -> usize {
        self.responses.lock().get(parent_id).map_or(0, VecDeque::len)
    }

    /// Holds subsequent fetches in flight.
    pub fn hold(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets `n` held fetches complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Lets every held and future fetch through.
    pub fn open(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.close();
        }
    }

    /// Yields until at least `n` fetches have been recorded.
    ///
    /// Returns false if they did not arrive within a bounded number of
    /// scheduler turns.
    pub async fn wait_for_calls(&self, n: usize) -> bool {
        for _ in 0..10_000 {
            if self.call_count() >= n {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }
}

impl<T> Default for MockFetcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> PageFetcher for MockFetcher<T>
where
    T: Identified + Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch_page(
        &self,
        parent_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> SyncResult<PageResult<T>> {
        check_page_size(page_size)?;

        self.calls.lock().push(FetchCall {
            parent_id: parent_id.to_string(),
            page_size,
            cursor: cursor.map(str::to_string),
        });

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            // A closed gate means the mock was opened while we waited.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.responses
            .lock()
            .get_mut(parent_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(SyncError::network_fatal(format!(
                    "no scripted response for {parent_id}"
                )))
            })
    }
}
