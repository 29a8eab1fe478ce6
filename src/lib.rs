//! Mindstore: an observable state container
//!
//! Mindstore follows the "pure core, imperative shell" split. The core is a
//! side-effect-free shallow equality engine; the shell is a single-threaded
//! store that holds application state, notifies subscribers whose selected
//! slice changed, serves referentially stable snapshots and runs scoped
//! effects with guaranteed cleanup.
//!
//! # Core Concepts
//!
//! - **Equality**: `Same` (identity) and `Shallow` (one level of structure)
//! - **Store**: current/previous state plus a subscription registry
//! - **Selector**: registered handle used for cached snapshot reads
//! - **Effect**: callback re-run on change, cleaned up before each re-run
//! - **Context**: explicit, injected registry of stores
//!
//! # Example
//!
//! ```rust
//! use mindstore::{Cleanup, Store};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! #[derive(Clone)]
//! struct Counter {
//!     count: u32,
//! }
//!
//! let store = Store::new(Counter { count: 0 });
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&log);
//! let effect = store.effect(
//!     |s: &Counter| s.count,
//!     move |state: &Counter, previous: &Counter| {
//!         sink.borrow_mut()
//!             .push(format!("run {}->{}", previous.count, state.count));
//!         let sink = Rc::clone(&sink);
//!         Cleanup::new(move || sink.borrow_mut().push("cleanup".to_string()))
//!     },
//! );
//!
//! store.modify(|s| Counter { count: s.count + 1 }).unwrap();
//! effect.unsubscribe();
//!
//! assert_eq!(
//!     *log.borrow(),
//!     vec!["run 0->0", "cleanup", "run 0->1", "cleanup"]
//! );
//! ```

pub mod builder;
pub mod context;
pub mod core;
pub mod external;
pub mod store;

// Re-export commonly used types
pub use builder::{BuildError, StoreBuilder};
pub use context::{ContextError, StoreContext};
pub use crate::core::{shallow_equal, Category, Same, Shallow};
pub use external::ExternalSource;
pub use store::{
    Cleanup, EffectGuard, IntoCleanup, Selector, SelectorId, SnapshotReader, Store, StoreError,
    StoreMetadata, SubscribeOptions, SubscriberFailure, SubscriptionId, Unsubscribe, Update,
    WeakStore,
};
