//! Item and page fixtures.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rekindle_protocol::{ActivityType, Identified, Memory, MemoryActivity, PageResult};
use serde::{Deserialize, Serialize};

/// Minimal item for pagination tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestItem {
    /// Item id.
    pub id: String,
    /// Free-form payload, used to tell apart two versions of one id.
    #[serde(default)]
    pub label: String,
}

impl Identified for TestItem {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Creates an item with an empty label.
pub fn item(id: &str) -> TestItem {
    TestItem {
        id: id.to_string(),
        label: String::new(),
    }
}

/// Creates an item with a label.
pub fn labeled(id: &str, label: &str) -> TestItem {
    TestItem {
        id: id.to_string(),
        label: label.to_string(),
    }
}

/// Creates items for `ids`, in order.
pub fn items(ids: &[&str]) -> Vec<TestItem> {
    ids.iter().map(|id| item(id)).collect()
}

/// Creates a page of items for `ids`.
pub fn page(ids: &[&str], cursor: Option<&str>, has_more: bool) -> PageResult<TestItem> {
    PageResult::new(items(ids), cursor.map(str::to_string), has_more)
}

/// Serializes a page the way the API sends it.
pub fn page_json(ids: &[&str], cursor: Option<&str>, has_more: bool) -> String {
    serde_json::json!({
        "items": ids.iter().map(|id| serde_json::json!({ "id": id })).collect::<Vec<_>>(),
        "nextCursor": cursor,
        "hasMore": has_more,
    })
    .to_string()
}

/// Returns the ids of `items`, in order.
pub fn ids_of<T: Identified>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.id().to_string()).collect()
}

/// Returns a random unique id.
pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fixed base time for deterministic timestamps.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Creates a post in `memory_id`'s feed, `minutes` after the base time.
pub fn post(id: &str, memory_id: &str, minutes: i64) -> MemoryActivity {
    MemoryActivity {
        id: id.to_string(),
        memory_id: memory_id.to_string(),
        content: format!("post {id}"),
        created_at: base_time() + Duration::minutes(minutes),
        creator_user_id: "user-1".to_string(),
        activity_type: ActivityType::Post,
        reply_to_post_id: None,
        reply_to_comment_id: None,
        is_reply_to_post: false,
        is_reply_to_comment: false,
        is_top_level_comment: false,
        reaction_summary: Default::default(),
        images: Vec::new(),
    }
}

/// Creates a comment replying to `post_id`.
pub fn comment(id: &str, memory_id: &str, post_id: &str, minutes: i64) -> MemoryActivity {
    MemoryActivity {
        content: format!("comment {id}"),
        activity_type: ActivityType::Comment,
        reply_to_post_id: Some(post_id.to_string()),
        is_reply_to_post: true,
        is_top_level_comment: true,
        ..post(id, memory_id, minutes)
    }
}

/// Creates a memory in `group_id`.
pub fn memory(id: &str, group_id: &str, minutes: i64) -> Memory {
    let created_at = base_time() + Duration::minutes(minutes);
    Memory {
        id: id.to_string(),
        title: format!("memory {id}"),
        description: None,
        created_at,
        updated_at: Some(created_at),
        author_id: "user-1".to_string(),
        author_name: "Test User".to_string(),
        is_public: false,
        group_id: Some(group_id.to_string()),
        images: Vec::new(),
    }
}
