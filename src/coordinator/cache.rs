//! Latest-status cache.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::data::StatusSnapshot;

/// Holds the most recent successfully decoded snapshot.
///
/// Written only by the poll path; read by any number of consumers. No
/// history is kept.
#[derive(Debug, Default)]
pub struct StatusCache {
    latest: RwLock<Option<Arc<StatusSnapshot>>>,
}

impl StatusCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest snapshot, or `None` before the first successful poll.
    pub fn get(&self) -> Option<Arc<StatusSnapshot>> {
        self.latest.read().clone()
    }

    /// Replace the cached snapshot.
    pub fn set(&self, snapshot: Arc<StatusSnapshot>) {
        *self.latest.write() = Some(snapshot);
    }

    /// Whether a snapshot has been cached.
    pub fn is_empty(&self) -> bool {
        self.latest.read().is_none()
    }
}
