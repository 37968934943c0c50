//! Consumer binding: lifecycle adapter between a view and the controller.

use crate::controller::SyncController;
use crate::store::{CollectionState, LoadOutcome};
use crate::transport::PageFetcher;
use parking_lot::Mutex;
use std::sync::Arc;

/// Read-only snapshot of a collection for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView<T> {
    /// Items in server order.
    pub items: Vec<T>,
    /// A reset fetch is in flight.
    pub loading: bool,
    /// An incremental fetch is in flight.
    pub loading_more: bool,
    /// Another page can be requested.
    pub has_more: bool,
    /// Message from the last failed fetch.
    pub error: Option<String>,
}

impl<T> Default for FeedView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            loading_more: false,
            has_more: false,
            error: None,
        }
    }
}

impl<T> From<CollectionState<T>> for FeedView<T> {
    fn from(state: CollectionState<T>) -> Self {
        let loading = state.is_loading();
        let loading_more = state.is_loading_more();
        let has_more = state.has_more();
        let error = state.error().map(str::to_string);
        Self {
            items: state.into_items(),
            loading,
            loading_more,
            has_more,
            error,
        }
    }
}

/// Binds one view to the collection of its current parent key.
///
/// The first observation of a parent triggers exactly one reset load.
/// Switching to another parent, unmounting, or dropping the binding clears
/// the previous parent's collection; a response still in flight for it is
/// discarded by the store.
pub struct FeedBinding<F: PageFetcher> {
    controller: Arc<SyncController<F>>,
    parent: Mutex<Option<String>>,
    page_size: u32,
}

impl<F: PageFetcher> FeedBinding<F> {
    /// Creates an unmounted binding using the controller's default page size.
    pub fn new(controller: Arc<SyncController<F>>) -> Self {
        let page_size = controller.config().default_page_size;
        Self {
            controller,
            parent: Mutex::new(None),
            page_size,
        }
    }

    /// Sets the page size used for every fetch of this binding.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the mounted parent key.
    pub fn parent(&self) -> Option<String> {
        self.parent.lock().clone()
    }

    /// Mounts the binding on `parent_id` and performs the initial load.
    ///
    /// Returns `None` without fetching if already mounted on `parent_id`.
    pub async fn on_mount(&self, parent_id: &str) -> Option<LoadOutcome> {
        {
            let mut current = self.parent.lock();
            if current.as_deref() == Some(parent_id) {
                return None;
            }
            if let Some(previous) = current.replace(parent_id.to_string()) {
                self.controller.clear(&previous);
            }
        }
        Some(self.controller.load(parent_id, self.page_size, true).await)
    }

    /// Unmounts the binding and clears its collection.
    pub fn on_unmount(&self) {
        if let Some(previous) = self.parent.lock().take() {
            self.controller.clear(&previous);
        }
    }

    /// Follows a parent key that may become undefined.
    pub async fn set_parent(&self, parent_id: Option<&str>) -> Option<LoadOutcome> {
        match parent_id {
            Some(parent_id) => self.on_mount(parent_id).await,
            None => {
                self.on_unmount();
                None
            }
        }
    }

    /// Loads the next page for the mounted parent.
    pub async fn load_more(&self) -> Option<LoadOutcome> {
        let parent_id = self.parent()?;
        Some(self.controller.load_more(&parent_id, self.page_size).await)
    }

    /// Reloads the first page for the mounted parent.
    pub async fn refresh(&self) -> Option<LoadOutcome> {
        let parent_id = self.parent()?;
        Some(self.controller.load(&parent_id, self.page_size, true).await)
    }

    /// Returns the current view; empty when unmounted.
    pub fn view(&self) -> FeedView<F::Item> {
        self.parent()
            .and_then(|parent_id| self.controller.state(&parent_id))
            .map(FeedView::from)
            .unwrap_or_default()
    }
}

impl<F: PageFetcher> Drop for FeedBinding<F> {
    fn drop(&mut self) {
        self.on_unmount();
    }
}
