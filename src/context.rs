//! Explicit store registry passed to consumers.
//!
//! A [`StoreContext`] holds at most one store per state type, so code that
//! needs "the calendar store" asks its context for `Store<CalendarState>`
//! instead of reaching for a global.

use crate::store::Store;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use thiserror::Error;
use tracing::trace;

/// Errors returned by [`StoreContext`] lookups
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    #[error("No store provided for state type {type_name}")]
    Missing { type_name: &'static str },
}

/// Registry of stores keyed by state type.
///
/// # Example
///
/// ```rust
/// use mindstore::{Store, StoreContext};
///
/// struct Theme {
///     dark: bool,
/// }
///
/// let mut context = StoreContext::new();
/// context.provide(Store::new(Theme { dark: false }));
///
/// let theme = context.require::<Theme>().unwrap();
/// assert!(!theme.state().dark);
/// ```
#[derive(Default)]
pub struct StoreContext {
    stores: HashMap<TypeId, Box<dyn Any>>,
}

impl StoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store`, returning the store it replaced, if any.
    pub fn provide<S: 'static>(&mut self, store: Store<S>) -> Option<Store<S>> {
        trace!(state = type_name::<S>(), store = store.name(), "store provided");
        self.stores
            .insert(TypeId::of::<S>(), Box::new(store))
            .and_then(|previous| previous.downcast::<Store<S>>().ok())
            .map(|previous| *previous)
    }

    /// Builder-style [`provide`](Self::provide).
    pub fn with<S: 'static>(mut self, store: Store<S>) -> Self {
        self.provide(store);
        self
    }

    pub fn get<S: 'static>(&self) -> Option<Store<S>> {
        self.stores
            .get(&TypeId::of::<S>())
            .and_then(|store| store.downcast_ref::<Store<S>>())
            .cloned()
    }

    pub fn require<S: 'static>(&self) -> Result<Store<S>, ContextError> {
        self.get::<S>().ok_or(ContextError::Missing {
            type_name: type_name::<S>(),
        })
    }

    pub fn remove<S: 'static>(&mut self) -> Option<Store<S>> {
        self.stores
            .remove(&TypeId::of::<S>())
            .and_then(|store| store.downcast::<Store<S>>().ok())
            .map(|store| *store)
    }

    pub fn contains<S: 'static>(&self) -> bool {
        self.stores.contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Calendar {
        day: u32,
    }

    struct Theme {
        dark: bool,
    }

    #[test]
    fn provides_one_store_per_type() {
        let mut context = StoreContext::new()
            .with(Store::new(Calendar { day: 1 }))
            .with(Store::new(Theme { dark: true }));

        assert_eq!(context.len(), 2);
        assert_eq!(context.require::<Calendar>().unwrap().state().day, 1);
        assert!(context.get::<Theme>().unwrap().state().dark);

        let replaced = context.provide(Store::new(Calendar { day: 7 }));
        assert_eq!(replaced.unwrap().state().day, 1);
        assert_eq!(context.require::<Calendar>().unwrap().state().day, 7);
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn lookups_share_the_same_store() {
        let store = Store::new(Calendar { day: 3 });
        let context = StoreContext::new().with(store.clone());

        let resolved = context.require::<Calendar>().unwrap();
        assert!(resolved.ptr_eq(&store));

        resolved.set(Calendar { day: 4 }).unwrap();
        assert_eq!(store.state().day, 4);
    }

    #[test]
    fn missing_store_is_reported() {
        let mut context = StoreContext::new();
        assert!(context.is_empty());

        let err = context.require::<Theme>().unwrap_err();
        assert!(matches!(err, ContextError::Missing { .. }));
        assert!(err.to_string().contains("Theme"));

        context.provide(Store::new(Theme { dark: false }));
        assert!(context.contains::<Theme>());
        assert!(context.remove::<Theme>().is_some());
        assert!(!context.contains::<Theme>());
    }
}
