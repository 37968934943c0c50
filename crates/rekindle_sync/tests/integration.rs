//! Integration tests: controller, binding, and HTTP fetcher together.

use async_trait::async_trait;
use parking_lot::Mutex;
use rekindle_sync::{
    CollectionStore, FeedBinding, FetchPhase, HttpClient, HttpPageFetcher, HttpResponse,
    LoadOutcome, MockFetcher, PagedResource, SkipReason, SyncConfig, SyncController, SyncError,
};
use rekindle_testkit::prelude::*;
use std::sync::Arc;
use url::Url;

type MockController = SyncController<MockFetcher<TestItem>>;

fn mock_controller() -> Arc<MockController> {
    Arc::new(SyncController::with_new_store(
        SyncConfig::default(),
        MockFetcher::new(),
    ))
}

fn held_ids(controller: &MockController, parent: &str) -> Vec<String> {
    controller
        .state(parent)
        .map(|state| ids_of(state.items()))
        .unwrap_or_default()
}

#[tokio::test]
async fn documented_scenario() {
    let controller = mock_controller();
    let fetcher = controller.fetcher();
    fetcher.push_page("m1", page(&["a", "b"], Some("c2"), true));
    fetcher.push_page("m1", page(&["b", "c"], Some("c3"), false));

    controller.load("m1", 2, true).await;
    assert_eq!(held_ids(&controller, "m1"), ["a", "b"]);

    controller.load_more("m1", 2).await;
    let state = controller.state("m1").unwrap();
    assert_eq!(ids_of(state.items()), ["a", "b", "c"]);
    assert!(!state.has_more());
}

#[tokio::test]
async fn concurrent_load_more_fetches_once() {
    let controller = mock_controller();
    let fetcher = controller.fetcher();
    fetcher.push_page("m1", page(&["a"], Some("c2"), true));
    fetcher.push_page("m1", page(&["b"], Some("c3"), true));
    fetcher.push_page("m1", page(&["c"], None, false));

    controller.load("m1", 1, true).await;
    fetcher.hold();

    let (first, second, ()) = tokio::join!(
        controller.load_more("m1", 1),
        controller.load_more("m1", 1),
        async {
            assert!(fetcher.wait_for_calls(2).await);
            fetcher.open();
        }
    );

    assert!(first.is_applied());
    assert_eq!(
        second,
        LoadOutcome::Skipped(SkipReason::InFlight(FetchPhase::LoadingMore))
    );
    // One reset plus exactly one incremental fetch.
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(held_ids(&controller, "m1"), ["a", "b"]);
}

#[tokio::test]
async fn reset_while_loading_more_is_dropped() {
    let controller = mock_controller();
    let fetcher = controller.fetcher();
    fetcher.push_page("m1", page(&["a"], Some("c2"), true));
    fetcher.push_page("m1", page(&["b"], None, false));

    controller.load("m1", 1, true).await;
    fetcher.hold();

    let (more, reset, ()) = tokio::join!(
        controller.load_more("m1", 1),
        controller.load("m1", 1, true),
        async {
            assert!(fetcher.wait_for_calls(2).await);
            let state = controller.state("m1").unwrap();
            assert!(state.is_loading_more());
            assert!(!state.is_loading());
            fetcher.open();
        }
    );

    assert!(more.is_applied());
    assert!(matches!(reset, LoadOutcome::Skipped(SkipReason::InFlight(_))));
}

#[tokio::test]
async fn no_fetch_when_exhausted() {
    let controller = mock_controller();
    let fetcher = controller.fetcher();
    fetcher.push_page("m1", page(&["a"], None, false));

    controller.load("m1", 20, true).await;
    for _ in 0..3 {
        assert_eq!(
            controller.load_more("m1", 20).await,
            LoadOutcome::Skipped(SkipReason::NoMorePages)
        );
    }
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn load_more_before_any_load_does_nothing() {
    let controller = mock_controller();
    assert_eq!(
        controller.load_more("m1", 20).await,
        LoadOutcome::Skipped(SkipReason::NoMorePages)
    );
    assert_eq!(controller.fetcher().call_count(), 0);
    assert!(controller.state("m1").is_none());
}

#[tokio::test]
async fn failures_preserve_collection() {
    let controller = mock_controller();
    let fetcher = controller.fetcher();
    fetcher.push_page("m1", page(&["a", "b"], Some("c2"), true));
    fetcher.push_error("m1", SyncError::Auth("session expired".into()));
    fetcher.push_error("m1", SyncError::from_status(500, b""));

    controller.load("m1", 2, true).await;
    let before = controller.state("m1").unwrap();

    controller.load_more("m1", 2).await;
    let after_more = controller.state("m1").unwrap();
    assert_eq!(after_more.items(), before.items());
    assert_eq!(after_more.next_cursor(), Some("c2"));
    assert_eq!(
        after_more.error(),
        Some("authentication failed: session expired")
    );

    controller.load("m1", 2, true).await;
    let after_reset = controller.state("m1").unwrap();
    assert_eq!(after_reset.items(), before.items());
    assert!(after_reset.has_more());
    assert!(after_reset.error().unwrap().starts_with("server error (500)"));
}

#[tokio::test]
async fn clear_during_fetch_discards_response() {
    let controller = mock_controller();
    let fetcher = controller.fetcher();
    fetcher.push_page("m1", page(&["a"], None, false));
    fetcher.hold();

    let (outcome, ()) = tokio::join!(controller.load("m1", 5, true), async {
        assert!(fetcher.wait_for_calls(1).await);
        controller.clear("m1");
        fetcher.open();
    });

    assert_eq!(outcome, LoadOutcome::Stale);
    assert!(controller.state("m1").is_none());
    assert_eq!(controller.stats().stale_discarded, 1);
}

#[tokio::test]
async fn parent_switch_ignores_stale_response() {
    let controller = mock_controller();
    let fetcher = controller.fetcher();
    fetcher.push_page("m1", page(&["old-1", "old-2"], Some("x"), true));
    fetcher.push_page("m2", page(&["new-1"], None, false));
    fetcher.hold();

    let binding = FeedBinding::new(Arc::clone(&controller));

    let (first, second) = tokio::join!(binding.on_mount("m1"), async {
        assert!(fetcher.wait_for_calls(1).await);
        let (second, ()) = tokio::join!(binding.on_mount("m2"), async {
            assert!(fetcher.wait_for_calls(2).await);
            fetcher.open();
        });
        second
    });

    assert_eq!(first, Some(LoadOutcome::Stale));
    assert!(second.unwrap().is_applied());
    assert!(controller.state("m1").is_none());

    let view = binding.view();
    assert_eq!(ids_of(&view.items), ["new-1"]);
    assert!(!view.has_more);
}

#[tokio::test]
async fn store_is_shared_between_controllers() {
    let store = Arc::new(CollectionStore::new());
    let activities = SyncController::new(
        SyncConfig::default(),
        MockFetcher::new(),
        Arc::clone(&store),
    );
    activities
        .fetcher()
        .push_page("m1", page(&["a"], None, false));
    activities.load("m1", 20, true).await;

    store.prepend("m1", labeled("fresh", "just posted"));
    let view = activities.state("m1").unwrap();
    assert_eq!(ids_of(view.items()), ["fresh", "a"]);
}

/// Serves pages of an in-memory, newest-first feed.
///
/// The cursor is the id of the last item delivered and the next page starts
/// at that item, so consecutive pages overlap by one.
struct FeedServer {
    feed: Mutex<Vec<TestItem>>,
    shift_on_next: Mutex<Option<TestItem>>,
    requests: Mutex<Vec<String>>,
}

impl FeedServer {
    fn new(ids: &[&str]) -> Self {
        Self {
            feed: Mutex::new(items(ids)),
            shift_on_next: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn handle(&self, url: &str) -> HttpResponse {
        self.requests.lock().push(url.to_string());
        if let Some(item) = self.shift_on_next.lock().take() {
            self.feed.lock().insert(0, item);
        }

        let url = Url::parse(url).unwrap();
        let mut size = 20usize;
        let mut cursor = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "pageSize" => size = value.parse().unwrap_or(20),
                "cursor" => cursor = Some(value.into_owned()),
                _ => {}
            }
        }

        let feed = self.feed.lock();
        let start = match cursor {
            Some(c) => match feed.iter().position(|i| i.id == c) {
                Some(pos) => pos,
                None => return HttpResponse::new(400, r#"{"message":"unknown cursor"}"#),
            },
            None => 0,
        };
        let end = (start + size).min(feed.len());
        let ids: Vec<&str> = feed[start..end].iter().map(|i| i.id.as_str()).collect();
        let has_more = end < feed.len();
        let next = if has_more { ids.last().copied() } else { None };
        HttpResponse::new(200, page_json(&ids, next, has_more))
    }
}

struct LoopbackClient {
    server: Arc<FeedServer>,
}

#[async_trait]
impl HttpClient for LoopbackClient {
    async fn get(&self, url: &str, _headers: &[(String, String)]) -> Result<HttpResponse, String> {
        Ok(self.server.handle(url))
    }
}

#[tokio::test]
async fn http_feed_pages_through_shifting_window() {
    let server = Arc::new(FeedServer::new(&["e", "d", "c", "b", "a"]));
    let fetcher: HttpPageFetcher<LoopbackClient, TestItem> = HttpPageFetcher::new(
        SyncConfig::default(),
        PagedResource::MemoryActivities,
        LoopbackClient {
            server: Arc::clone(&server),
        },
    );
    let controller = Arc::new(SyncController::with_new_store(
        SyncConfig::default(),
        fetcher,
    ));
    let binding = FeedBinding::new(Arc::clone(&controller)).with_page_size(2);

    binding.on_mount("m1").await;
    assert_eq!(ids_of(&binding.view().items), ["e", "d"]);

    *server.shift_on_next.lock() = Some(item("f"));
    binding.load_more().await;
    // Overlap on "d" is merged away.
    assert_eq!(ids_of(&binding.view().items), ["e", "d", "c"]);

    binding.load_more().await;
    binding.load_more().await;
    let view = binding.view();
    assert_eq!(ids_of(&view.items), ["e", "d", "c", "b", "a"]);
    assert!(!view.has_more);

    assert_eq!(
        binding.load_more().await,
        Some(LoadOutcome::Skipped(SkipReason::NoMorePages))
    );

    let requests = server.requests.lock().clone();
    assert_eq!(requests.len(), 4);
    assert!(requests[0].ends_with("/memories-api/memories/m1/activities?pageSize=2"));
    assert!(requests[1].ends_with("pageSize=2&cursor=d"));
}

#[tokio::test]
async fn http_rejection_surfaces_in_view() {
    let server = Arc::new(FeedServer::new(&["a", "b", "c"]));
    let fetcher: HttpPageFetcher<LoopbackClient, TestItem> = HttpPageFetcher::new(
        SyncConfig::default(),
        PagedResource::MemoryActivities,
        LoopbackClient {
            server: Arc::clone(&server),
        },
    );
    let controller = Arc::new(SyncController::with_new_store(
        SyncConfig::default(),
        fetcher,
    ));
    let binding = FeedBinding::new(Arc::clone(&controller)).with_page_size(1);

    binding.on_mount("m1").await;
    // The cursor item disappears server-side.
    server.feed.lock().retain(|i| i.id != "a");
    let outcome = binding.load_more().await.unwrap();
    assert!(matches!(
        outcome,
        LoadOutcome::Failed(SyncError::Rejected { status: 400, .. })
    ));

    let view = binding.view();
    assert_eq!(ids_of(&view.items), ["a"]);
    assert!(view.has_more);
    assert_eq!(
        view.error.as_deref(),
        Some("request rejected (400): bad request: unknown cursor")
    );
}
