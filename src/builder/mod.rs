//! Builder API for configuring stores.
//!
//! This module provides the fluent [`StoreBuilder`] for stores that need
//! more than an initial state, such as a name for their log events.

pub mod error;
pub mod store;

pub use error::BuildError;
pub use store::StoreBuilder;

use crate::store::Store;

/// Create a named store in one call.
///
/// # Example
///
/// ```
/// use mindstore::builder::named_store;
///
/// let store = named_store("sidebar", vec!["inbox", "archive"]).unwrap();
/// assert_eq!(store.name(), "sidebar");
/// assert_eq!(store.state().len(), 2);
/// ```
pub fn named_store<S: 'static>(name: impl Into<String>, initial: S) -> Result<Store<S>, BuildError> {
    StoreBuilder::new().initial(initial).name(name).build()
}
