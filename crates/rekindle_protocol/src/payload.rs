//! Domain payloads carried by the Rekindle paged endpoints.
//!
//! Only `id` and `createdAt` matter to pagination; the remaining fields are
//! decoded for the benefit of rendering code. Unknown fields are ignored.

use crate::item::{Identified, Timestamped};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of entry in a memory's activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    /// A top-level post, possibly with images.
    Post,
    /// A comment on a post or on another comment.
    Comment,
}

/// Aggregated reactions on a post or comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionSummary {
    /// Total number of reactions.
    pub total_count: u32,
    /// Count per reaction type.
    pub reaction_counts: BTreeMap<String, u32>,
    /// The current user's reaction, if any.
    pub user_reaction: Option<String>,
}

/// An image attached to a post or memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Image id.
    pub id: String,
    /// Full-size URL.
    pub url: String,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// A post or comment in a memory's activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryActivity {
    /// Activity id.
    pub id: String,
    /// Memory the activity belongs to.
    pub memory_id: String,
    /// Text content.
    pub content: String,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// Author's user id.
    pub creator_user_id: String,
    /// Post or comment.
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Post this replies to.
    #[serde(default)]
    pub reply_to_post_id: Option<String>,
    /// Comment this replies to.
    #[serde(default)]
    pub reply_to_comment_id: Option<String>,
    /// Whether this is a reply to a post.
    #[serde(default)]
    pub is_reply_to_post: bool,
    /// Whether this is a reply to a comment.
    #[serde(default)]
    pub is_reply_to_comment: bool,
    /// Whether this is a top-level comment.
    #[serde(default)]
    pub is_top_level_comment: bool,
    /// Reaction totals.
    #[serde(default)]
    pub reaction_summary: ReactionSummary,
    /// Attached images.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl MemoryActivity {
    /// Returns true for comments.
    pub fn is_comment(&self) -> bool {
        self.activity_type == ActivityType::Comment
    }
}

impl Identified for MemoryActivity {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Timestamped for MemoryActivity {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A memory posted to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    /// Memory id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Author's user id.
    pub author_id: String,
    /// Author's display name.
    #[serde(default)]
    pub author_name: String,
    /// Whether the memory is visible outside the group.
    #[serde(default)]
    pub is_public: bool,
    /// Owning group.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Attached images.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl Identified for Memory {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Timestamped for Memory {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Error body returned by the API on failed requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiErrorBody {
    /// Human-readable error message.
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Extracts the server message from a raw body, if it has one.
    pub fn message_from(bytes: &[u8]) -> Option<String> {
        serde_json::from_slice::<ApiErrorBody>(bytes)
            .ok()
            .and_then(|body| body.message)
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageResult;

    const ACTIVITY_PAGE: &str = r#"{
        "items": [{
            "id": "act-1",
            "memoryId": "m1",
            "content": "first!",
            "createdAt": "2024-05-01T10:00:00Z",
            "creatorUserId": "u1",
            "type": "Post",
            "reactions": [],
            "reactionSummary": {"totalCount": 2, "reactionCounts": {"Love": 2}},
            "images": [{"id": "i1", "url": "https://cdn/i1.jpg"}],
            "replyToPostId": null,
            "replyToCommentId": null,
            "isReplyToPost": false,
            "isReplyToComment": false,
            "isTopLevelComment": false
        }],
        "nextCursor": "c2",
        "hasMore": true
    }"#;

    #[test]
    fn decode_activity_page() {
        let page: PageResult<MemoryActivity> = PageResult::decode(ACTIVITY_PAGE.as_bytes()).unwrap();
        let activity = &page.items[0];
        assert_eq!(activity.id(), "act-1");
        assert_eq!(activity.activity_type, ActivityType::Post);
        assert!(!activity.is_comment());
        assert_eq!(activity.reaction_summary.total_count, 2);
        assert_eq!(activity.images.len(), 1);
        assert_eq!(
            activity.created_at().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
    }

    #[test]
    fn decode_memory_with_sparse_fields() {
        let body = br#"{"id":"mem-1","title":"Beach","createdAt":"2024-06-01T08:30:00Z","authorId":"u2"}"#;
        let memory: Memory = serde_json::from_slice(body).unwrap();
        assert_eq!(memory.id(), "mem-1");
        assert_eq!(memory.description, None);
        assert!(memory.images.is_empty());
    }

    #[test]
    fn error_body_message() {
        assert_eq!(
            ApiErrorBody::message_from(br#"{"message":"group not found"}"#).as_deref(),
            Some("group not found")
        );
        assert_eq!(ApiErrorBody::message_from(br#"{"message":"  "}"#), None);
        assert_eq!(ApiErrorBody::message_from(b"<html>oops</html>"), None);
    }
}
