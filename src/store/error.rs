//! Store error types.

use super::subscription::SubscriptionId;
use std::fmt;
use thiserror::Error;

/// A subscription that panicked during a notification pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriberFailure {
    /// The failing subscription
    pub id: SubscriptionId,

    /// Panic message, or a placeholder when the payload was not a string
    pub message: String,
}

impl fmt::Display for SubscriberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription {} panicked: {}", self.id, self.message)
    }
}

/// Errors that can occur when updating a store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A fallible updater returned an error; the state was not touched
    #[error("Updater failed: {0}")]
    Updater(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// `update` was called from inside an updater or a notification pass
    #[error("Reentrant update: the store is already running an update")]
    ReentrantUpdate,

    /// The update was committed, but some subscriptions failed during the pass
    #[error("{} subscription(s) failed during notification", .failures.len())]
    Subscribers {
        notified: usize,
        failures: Vec<SubscriberFailure>,
    },
}

impl StoreError {
    /// Failures isolated during the notification pass, if any.
    pub fn failures(&self) -> &[SubscriberFailure] {
        match self {
            Self::Subscribers { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Whether the state was committed despite this error.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Subscribers { .. })
    }
}
