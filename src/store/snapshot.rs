//! Selector handles and cached snapshot reads.
//!
//! A [`Selector`] is registered once and reused through its handle; the
//! snapshot cache is keyed by the handle's [`SelectorId`], so cache hits never
//! depend on closure identity.

use super::Store;
use crate::core::{shallow_equal, Shallow};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::trace;
use uuid::Uuid;

/// Identifier of a registered selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SelectorId(Uuid);

impl fmt::Display for SelectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A pure function deriving a slice of interest from the full state.
///
/// Clones share the same [`SelectorId`] and therefore the same snapshot
/// cache entry.
///
/// # Example
///
/// ```rust
/// use mindstore::Selector;
///
/// struct Counter {
///     count: u32,
/// }
///
/// let count = Selector::new(|s: &Counter| s.count);
/// assert_eq!(count.select(&Counter { count: 3 }), 3);
/// assert_eq!(count.id(), count.clone().id());
/// ```
pub struct Selector<S, T> {
    inner: Rc<SelectorInner<S, T>>,
}

struct SelectorInner<S, T> {
    id: SelectorId,
    select: Box<dyn Fn(&S) -> T>,
    caches: RefCell<Vec<Weak<RefCell<SnapshotCache>>>>,
}

impl<S, T> Drop for SelectorInner<S, T> {
    // Last clone gone: no reader can hit these entries again.
    fn drop(&mut self) {
        for cache in self.caches.get_mut().drain(..) {
            let Some(cache) = cache.upgrade() else {
                continue;
            };
            if let Ok(mut cache) = cache.try_borrow_mut() {
                cache.evict(self.id);
            };
        }
    }
}

impl<S, T> Selector<S, T> {
    pub fn new<F>(select: F) -> Self
    where
        F: Fn(&S) -> T + 'static,
    {
        Self {
            inner: Rc::new(SelectorInner {
                id: SelectorId(Uuid::new_v4()),
                select: Box::new(select),
                caches: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> SelectorId {
        self.inner.id
    }

    pub fn select(&self, state: &S) -> T {
        (self.inner.select)(state)
    }

    /// Remember `cache` so the entry for this selector is evicted on drop.
    pub(crate) fn track(&self, cache: &Rc<RefCell<SnapshotCache>>) {
        let mut caches = self.inner.caches.borrow_mut();
        caches.retain(|known| known.strong_count() > 0);
        let target = Rc::downgrade(cache);
        if !caches.iter().any(|known| Weak::ptr_eq(known, &target)) {
            caches.push(target);
        }
    }
}

impl<S, T> Clone for Selector<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, T> fmt::Debug for Selector<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector").field("id", &self.inner.id).finish()
    }
}

/// Most recent derived value per selector.
#[derive(Default)]
pub(crate) struct SnapshotCache {
    entries: HashMap<SelectorId, Rc<dyn Any>>,
}

impl SnapshotCache {
    /// Return the cached value when it is shallow-equal to `fresh`,
    /// otherwise cache and return `fresh`.
    pub(crate) fn resolve<T: Shallow + 'static>(&mut self, id: SelectorId, fresh: T) -> Rc<T> {
        let cached = self
            .entries
            .get(&id)
            .and_then(|entry| Rc::clone(entry).downcast::<T>().ok());

        if let Some(cached) = cached {
            if shallow_equal(&*cached, &fresh) {
                trace!(selector = %id, "snapshot cache hit");
                return cached;
            }
        }

        trace!(selector = %id, "snapshot cache miss");
        let fresh = Rc::new(fresh);
        self.entries.insert(id, Rc::clone(&fresh) as Rc<dyn Any>);
        fresh
    }

    pub(crate) fn evict(&mut self, id: SelectorId) {
        if self.entries.remove(&id).is_some() {
            trace!(selector = %id, "snapshot evicted");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Zero-argument reader bound to one selector.
///
/// Successive reads return the same `Rc` for as long as the derived value is
/// shallow-equal to the cached one, so a host comparing reads with
/// [`Rc::ptr_eq`] can skip redundant work.
pub struct SnapshotReader<S: 'static, T> {
    store: Store<S>,
    selector: Selector<S, T>,
}

impl<S: 'static, T: Shallow + 'static> SnapshotReader<S, T> {
    pub(crate) fn new(store: Store<S>, selector: Selector<S, T>) -> Self {
        Self { store, selector }
    }

    /// Select from the current state, returning the cached value if unchanged.
    pub fn read(&self) -> Rc<T> {
        let state = self.store.state();
        let fresh = self.selector.select(&state);
        self.store.resolve_snapshot(self.selector.id(), fresh)
    }

    pub fn selector(&self) -> &Selector<S, T> {
        &self.selector
    }
}

impl<S: 'static, T> Clone for SnapshotReader<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            selector: self.selector.clone(),
        }
    }
}
