//! Builder for constructing stores.

use crate::builder::error::BuildError;
use crate::store::{Store, DEFAULT_NAME};

/// Builder for constructing stores with a fluent API.
pub struct StoreBuilder<S: 'static> {
    initial: Option<S>,
    name: Option<String>,
}

impl<S: 'static> StoreBuilder<S> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            name: None,
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Set the name attached to this store's log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the store.
    /// Returns an error if required fields are missing or invalid.
    pub fn build(self) -> Result<Store<S>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        let name = match self.name {
            Some(name) if name.trim().is_empty() => return Err(BuildError::EmptyName),
            Some(name) => name,
            None => DEFAULT_NAME.to_string(),
        };

        Ok(Store::named(initial, name))
    }
}

impl<S: 'static> Default for StoreBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
