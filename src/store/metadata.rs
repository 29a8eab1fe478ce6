//! Diagnostic counters tracked by a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata tracked by a store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Unique store identifier
    pub id: Uuid,

    /// Name used in log events
    pub name: String,

    /// When the store was created
    pub created_at: DateTime<Utc>,

    /// Last committed update
    pub updated_at: DateTime<Utc>,

    /// Committed updates
    pub updates: u64,

    /// Updates skipped because the updater returned the current state
    pub skipped_updates: u64,

    /// Listener invocations across all notification passes
    pub notifications: u64,

    /// Subscriptions that panicked during notification passes
    pub failures: u64,
}

impl StoreMetadata {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            updates: 0,
            skipped_updates: 0,
            notifications: 0,
            failures: 0,
        }
    }

    pub(crate) fn record_commit(&mut self) {
        self.updates += 1;
        self.updated_at = Utc::now();
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped_updates += 1;
    }

    pub(crate) fn record_pass(&mut self, notified: usize, failed: usize) {
        self.notifications += notified as u64;
        self.failures += failed as u64;
    }

    /// Serialize to JSON for diagnostics output.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
