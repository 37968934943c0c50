//! Cursor pagination messages.

use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Query parameter carrying the continuation cursor.
pub const CURSOR_PARAM: &str = "cursor";

/// A request for one page of a parent-scoped collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Parent key (group id, memory id, ...).
    pub parent_id: String,
    /// Maximum number of items to return.
    pub page_size: u32,
    /// Continuation token from the previous page; `None` asks for the first page.
    pub cursor: Option<String>,
}

impl PageRequest {
    /// Creates a request for the first page.
    pub fn first(parent_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            parent_id: parent_id.into(),
            page_size,
            cursor: None,
        }
    }

    /// Creates a request for the page following `cursor`.
    pub fn after(parent_id: impl Into<String>, page_size: u32, cursor: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            page_size,
            cursor: Some(cursor.into()),
        }
    }

    /// Returns true if this asks for the first page.
    pub fn is_first(&self) -> bool {
        self.cursor.as_deref().map_or(true, str::is_empty)
    }

    /// Builds the query pairs for this request.
    ///
    /// Endpoints disagree on the page size parameter name (`pageSize` vs
    /// `limit`), so the caller supplies it. The cursor pair is omitted for
    /// the first page.
    pub fn query_pairs(&self, page_size_param: &str) -> Vec<(String, String)> {
        let mut pairs = vec![(page_size_param.to_string(), self.page_size.to_string())];
        if let Some(cursor) = self.cursor.as_deref().filter(|c| !c.is_empty()) {
            pairs.push((CURSOR_PARAM.to_string(), cursor.to_string()));
        }
        pairs
    }
}

/// One page of items returned by a paged endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    /// Items in server order. Clients must not re-sort.
    pub items: Vec<T>,
    /// Opaque continuation token, never interpreted client-side.
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Whether a further page exists.
    pub has_more: bool,
}

impl<T> PageResult<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, next_cursor: Option<String>, has_more: bool) -> Self {
        Self {
            items,
            next_cursor,
            has_more,
        }
    }

    /// Creates a final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None, false)
    }

    /// Creates an empty final page.
    pub fn empty() -> Self {
        Self::last(Vec::new())
    }

    /// Number of items in the page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maps the items of this page.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

impl<T: DeserializeOwned> PageResult<T> {
    /// Decodes a page from a JSON body.
    ///
    /// The page shape is checked before the items are decoded so that a
    /// body missing `items` or `hasMore` is reported as an invalid page
    /// rather than a generic JSON error. An empty `nextCursor` is treated
    /// as absent.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::InvalidPage("expected a JSON object".into()))?;

        match object.get("items") {
            Some(serde_json::Value::Array(_)) => {}
            Some(_) => return Err(ProtocolError::InvalidPage("`items` is not an array".into())),
            None => return Err(ProtocolError::InvalidPage("missing `items`".into())),
        }
        match object.get("hasMore") {
            Some(serde_json::Value::Bool(_)) => {}
            Some(_) => return Err(ProtocolError::InvalidPage("`hasMore` is not a boolean".into())),
            None => return Err(ProtocolError::InvalidPage("missing `hasMore`".into())),
        }
        if let Some(cursor) = object.get("nextCursor") {
            if !(cursor.is_string() || cursor.is_null()) {
                return Err(ProtocolError::InvalidPage(
                    "`nextCursor` is neither a string nor null".into(),
                ));
            }
        }

        let mut page: PageResult<T> = serde_json::from_value(value)?;
        if page.next_cursor.as_deref() == Some("") {
            page.next_cursor = None;
        }
        Ok(page)
    }
}

impl<T: Serialize> PageResult<T> {
    /// Encodes this page as JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
