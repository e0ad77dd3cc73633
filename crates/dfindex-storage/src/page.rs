//! Cursor pagination.

use serde::{Deserialize, Serialize};

use crate::key::Key;

/// One page of query results.
///
/// `next` is the sort key of the last item when the page is full; pass it
/// back through [`Query::after`](crate::Query::after) to continue. A page
/// shorter than the limit (including an empty one) carries no cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Key>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
