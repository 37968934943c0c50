//! Traits implemented by items held in paged collections.

use chrono::{DateTime, Utc};

/// An item with a stable, server-assigned identifier.
///
/// Collections de-duplicate by this id; nothing else about the item is
/// interpreted by the pagination layer.
pub trait Identified {
    /// Returns the item's unique id.
    fn id(&self) -> &str;
}

/// An item carrying a server-assigned creation timestamp.
pub trait Timestamped {
    /// Returns when the server created the item.
    fn created_at(&self) -> DateTime<Utc>;
}

impl<T: Identified + ?Sized> Identified for &T {
    fn id(&self) -> &str {
        (**self).id()
    }
}

impl<T: Identified + ?Sized> Identified for std::sync::Arc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }
}
