//! Property-based test generators using proptest.
//!
//! Ids are drawn from a small alphabet so that independently generated
//! pages overlap often, which is the interesting case for merging.

use crate::fixtures::TestItem;
use proptest::prelude::*;
use rekindle_protocol::PageResult;

/// Strategy for item ids from a small, collision-prone alphabet.
pub fn id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-h][0-3]?").expect("Invalid regex")
}

/// Strategy for items.
pub fn item_strategy() -> impl Strategy<Value = TestItem> {
    (id_strategy(), prop::string::string_regex("[a-z]{0,6}").expect("Invalid regex"))
        .prop_map(|(id, label)| TestItem { id, label })
}

/// Strategy for opaque cursors.
pub fn cursor_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::string::string_regex("[A-Za-z0-9+/=]{1,16}").expect("Invalid regex"))
}

/// Strategy for pages of up to `max_items` items (ids may repeat).
pub fn page_strategy(max_items: usize) -> impl Strategy<Value = PageResult<TestItem>> {
    (
        prop::collection::vec(item_strategy(), 0..=max_items),
        cursor_strategy(),
        any::<bool>(),
    )
        .prop_map(|(items, next_cursor, has_more)| PageResult::new(items, next_cursor, has_more))
}

/// Strategy for pages whose ids are unique within the page.
pub fn distinct_page_strategy(max_items: usize) -> impl Strategy<Value = PageResult<TestItem>> {
    page_strategy(max_items).prop_map(|mut page| {
        let mut seen = std::collections::HashSet::new();
        page.items.retain(|item| seen.insert(item.id.clone()));
        page
    })
}

/// Strategy for a sequence of pages fetched for one parent key.
pub fn page_sequence_strategy(
    max_pages: usize,
    max_items: usize,
) -> impl Strategy<Value = Vec<PageResult<TestItem>>> {
    prop::collection::vec(page_strategy(max_items), 1..=max_pages)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
