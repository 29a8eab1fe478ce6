//! Observable state container.
//!
//! A [`Store`] holds the current and previous state of one logical piece of
//! application state and a registry of subscriptions. Each subscription
//! pairs a selector with a listener; an update runs one synchronous
//! notification pass that invokes only the listeners whose selected slice
//! changed according to [`shallow_equal`](crate::core::shallow_equal).
//!
//! # Key Concepts
//!
//! - **Update**: compute the next state from the current one; returning the
//!   same `Rc` is a silent no-op
//! - **Subscription**: selector + listener, disposed through [`Unsubscribe`]
//! - **Snapshot**: cached, referentially stable read through a [`Selector`]
//! - **Effect**: callback re-run when its slice changes, with cleanup
//!
//! The store is single-threaded. Updaters, selectors and listeners run on
//! the caller's stack and must not call [`Store::update`] themselves; doing
//! so returns [`StoreError::ReentrantUpdate`].

mod effect;
mod error;
mod metadata;
mod snapshot;
mod subscription;

pub use effect::{Cleanup, EffectGuard, IntoCleanup};
pub use error::{StoreError, SubscriberFailure};
pub use metadata::StoreMetadata;
pub use snapshot::{Selector, SelectorId, SnapshotReader};
pub use subscription::{SubscribeOptions, SubscriptionId, Unsubscribe};

use crate::core::Shallow;
use crate::external::ExternalSource;
use effect::EffectSlot;
use snapshot::SnapshotCache;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use subscription::{Subscription, Watcher};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Name used when none is configured.
pub const DEFAULT_NAME: &str = "store";

/// Result of a successful update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Update {
    /// The updater returned the current state; nothing was notified
    Unchanged,

    /// The state was replaced and a notification pass ran
    Changed { notified: usize },
}

impl Update {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

struct Shared<S> {
    id: Uuid,
    name: String,
    current: RefCell<Rc<S>>,
    previous: RefCell<Rc<S>>,
    registry: RefCell<Vec<Rc<dyn Watcher<S>>>>,
    snapshots: Rc<RefCell<SnapshotCache>>,
    next_id: Cell<u64>,
    updating: Cell<bool>,
    metadata: RefCell<StoreMetadata>,
}

impl<S> Shared<S> {
    fn allocate_id(&self) -> SubscriptionId {
        let raw = self.next_id.get();
        self.next_id.set(raw + 1);
        SubscriptionId::from_raw(raw)
    }

    fn states(&self) -> (Rc<S>, Rc<S>) {
        (
            Rc::clone(&self.current.borrow()),
            Rc::clone(&self.previous.borrow()),
        )
    }

    fn remove(&self, id: SubscriptionId) {
        let removed = {
            let mut registry = self.registry.borrow_mut();
            registry
                .iter()
                .position(|watcher| watcher.id() == id)
                .map(|index| registry.remove(index))
        };
        if removed.is_some() {
            trace!(store = %self.name, subscription = %id, "subscription removed");
        }
    }
}

impl<S> Drop for Shared<S> {
    fn drop(&mut self) {
        for watcher in self.registry.get_mut().iter() {
            watcher.deactivate();
        }
    }
}

/// Clears the in-progress flag on every exit path of an update.
struct UpdateGuard<'a>(&'a Cell<bool>);

impl<'a> UpdateGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self(flag))
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to an observable state container.
///
/// Clones are cheap and refer to the same store.
///
/// # Example
///
/// ```rust
/// use mindstore::Store;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// #[derive(Clone)]
/// struct Counter {
///     count: u32,
/// }
///
/// let store = Store::new(Counter { count: 0 });
/// let fired = Rc::new(Cell::new(0));
///
/// let seen = Rc::clone(&fired);
/// let handle = store.subscribe(|s: &Counter| s.count, move || seen.set(seen.get() + 1));
///
/// store.modify(|s| Counter { count: s.count + 1 }).unwrap();
/// assert_eq!(store.state().count, 1);
/// assert_eq!(store.previous_state().count, 0);
/// assert_eq!(fired.get(), 1);
///
/// // Returning the same state is a silent no-op
/// store.update(|s| Rc::clone(s)).unwrap();
/// assert_eq!(fired.get(), 1);
///
/// handle.unsubscribe();
/// ```
pub struct Store<S> {
    shared: Rc<Shared<S>>,
}

impl<S: 'static> Store<S> {
    /// Create a store whose current and previous state are both `initial`.
    pub fn new(initial: S) -> Self {
        Self::named(initial, DEFAULT_NAME)
    }

    pub(crate) fn named(initial: S, name: impl Into<String>) -> Self {
        let initial = Rc::new(initial);
        let metadata = StoreMetadata::new(name);
        debug!(store = %metadata.name, id = %metadata.id, "store created");
        Self {
            shared: Rc::new(Shared {
                id: metadata.id,
                name: metadata.name.clone(),
                current: RefCell::new(Rc::clone(&initial)),
                previous: RefCell::new(initial),
                registry: RefCell::new(Vec::new()),
                snapshots: Rc::new(RefCell::new(SnapshotCache::default())),
                next_id: Cell::new(0),
                updating: Cell::new(false),
                metadata: RefCell::new(metadata),
            }),
        }
    }

    /// Current state (pure)
    pub fn state(&self) -> Rc<S> {
        Rc::clone(&self.shared.current.borrow())
    }

    /// State immediately before the last committed update (pure)
    pub fn previous_state(&self) -> Rc<S> {
        Rc::clone(&self.shared.previous.borrow())
    }

    /// Replace the state with `updater(current)` and notify changed slices.
    ///
    /// Returning `Rc::clone(current)` skips the update entirely: the previous
    /// state is kept and no listener runs. A panicking updater leaves the
    /// store untouched and the panic propagates to the caller.
    pub fn update<F>(&self, updater: F) -> Result<Update, StoreError>
    where
        F: FnOnce(&Rc<S>) -> Rc<S>,
    {
        self.try_update(|state| Ok::<_, Infallible>(updater(state)))
    }

    /// Like [`update`](Self::update), for updaters that can fail.
    ///
    /// An `Err` from the updater aborts before anything is mutated or
    /// notified and is returned as [`StoreError::Updater`].
    pub fn try_update<F, E>(&self, updater: F) -> Result<Update, StoreError>
    where
        F: FnOnce(&Rc<S>) -> Result<Rc<S>, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let Some(_guard) = UpdateGuard::acquire(&self.shared.updating) else {
            warn!(store = %self.shared.name, "update called while another update is running");
            return Err(StoreError::ReentrantUpdate);
        };

        let current = self.state();
        let next = updater(&current).map_err(|e| StoreError::Updater(e.into()))?;

        if Rc::ptr_eq(&current, &next) {
            trace!(store = %self.shared.name, "updater returned current state; skipping");
            self.shared.metadata.borrow_mut().record_skip();
            return Ok(Update::Unchanged);
        }

        *self.shared.previous.borrow_mut() = current;
        *self.shared.current.borrow_mut() = Rc::clone(&next);
        self.shared.metadata.borrow_mut().record_commit();

        let (notified, failures) = self.notify_subscribers(&next);
        self.shared
            .metadata
            .borrow_mut()
            .record_pass(notified, failures.len());
        debug!(
            store = %self.shared.name,
            notified,
            failed = failures.len(),
            "state updated"
        );

        if failures.is_empty() {
            Ok(Update::Changed { notified })
        } else {
            Err(StoreError::Subscribers { notified, failures })
        }
    }

    /// Replace the state with a value computed from the current one.
    ///
    /// Always commits, since the result is a fresh allocation.
    pub fn modify<F>(&self, f: F) -> Result<Update, StoreError>
    where
        F: FnOnce(&S) -> S,
    {
        self.update(|state| Rc::new(f(&**state)))
    }

    /// Replace the state outright.
    pub fn set(&self, next: S) -> Result<Update, StoreError> {
        self.update(|_| Rc::new(next))
    }

    // One pass over the registry as it was when the pass began. Each
    // subscription is isolated: a panic is recorded and the pass moves on.
    fn notify_subscribers(&self, state: &S) -> (usize, Vec<SubscriberFailure>) {
        let watchers: Vec<Rc<dyn Watcher<S>>> = self.shared.registry.borrow().clone();
        let mut notified = 0;
        let mut failures = Vec::new();

        for watcher in watchers {
            if !watcher.is_active() {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                watcher.observe(state) && watcher.notify()
            }));

            match outcome {
                Ok(true) => {
                    notified += 1;
                    trace!(store = %self.shared.name, subscription = %watcher.id(), "subscriber notified");
                }
                Ok(false) => {}
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(
                        store = %self.shared.name,
                        subscription = %watcher.id(),
                        %message,
                        "subscriber failed during notification"
                    );
                    failures.push(SubscriberFailure {
                        id: watcher.id(),
                        message,
                    });
                }
            }
        }

        (notified, failures)
    }

    /// Register `listener` to run whenever `selector`'s slice changes.
    pub fn subscribe<T, F, L>(&self, selector: F, listener: L) -> Unsubscribe
    where
        T: Shallow + 'static,
        F: Fn(&S) -> T + 'static,
        L: FnMut() + 'static,
    {
        self.subscribe_with(selector, listener, SubscribeOptions::default())
    }

    /// Register a subscription with explicit options.
    ///
    /// The selector is evaluated once against the current state to seed the
    /// last observed value; if it panics, nothing is registered.
    pub fn subscribe_with<T, F, L>(
        &self,
        selector: F,
        listener: L,
        options: SubscribeOptions,
    ) -> Unsubscribe
    where
        T: Shallow + 'static,
        F: Fn(&S) -> T + 'static,
        L: FnMut() + 'static,
    {
        let subscription = Rc::new(self.subscription(selector, listener));
        let id = subscription.id();
        let active = subscription.active_flag();
        self.register(Rc::clone(&subscription) as Rc<dyn Watcher<S>>);

        if options.fire_immediately {
            // Already registered: updates issued by the listener refresh it.
            let fired = panic::catch_unwind(AssertUnwindSafe(|| subscription.notify()));
            if let Err(payload) = fired {
                active.set(false);
                self.shared.remove(id);
                panic::resume_unwind(payload);
            }
        }

        let shared = Rc::downgrade(&self.shared);
        Unsubscribe::new(id, move || {
            if !active.replace(false) {
                return;
            }
            if let Some(shared) = shared.upgrade() {
                shared.remove(id);
            }
        })
    }

    /// Run `callback(current, previous)` now and again whenever `selector`'s
    /// slice changes.
    ///
    /// A cleanup returned by one run executes before the next run, and once
    /// more when the returned handle is disposed. Disposing never runs the
    /// callback again.
    pub fn effect<T, F, C, R>(&self, selector: F, mut callback: C) -> Unsubscribe
    where
        T: Shallow + 'static,
        F: Fn(&S) -> T + 'static,
        C: FnMut(&S, &S) -> R + 'static,
        R: IntoCleanup,
    {
        let slot = Rc::new(EffectSlot::default());
        let (current, previous) = self.shared.states();
        slot.store(callback(&current, &previous).into_cleanup());

        let shared = Rc::downgrade(&self.shared);
        let rerun = Rc::clone(&slot);
        let subscription = self.subscription(selector, move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            rerun.run_cleanup();
            let (current, previous) = shared.states();
            rerun.store(callback(&current, &previous).into_cleanup());
        });

        let id = subscription.id();
        let active = subscription.active_flag();
        self.register(Rc::new(subscription));
        trace!(store = %self.shared.name, subscription = %id, "effect registered");

        let shared = Rc::downgrade(&self.shared);
        Unsubscribe::new(id, move || {
            if !active.replace(false) {
                slot.discard();
                return;
            }
            if let Some(shared) = shared.upgrade() {
                shared.remove(id);
            }
            slot.close();
        })
    }

    /// Like [`effect`](Self::effect), disposed when the guard is dropped.
    pub fn scoped_effect<T, F, C, R>(&self, selector: F, callback: C) -> EffectGuard
    where
        T: Shallow + 'static,
        F: Fn(&S) -> T + 'static,
        C: FnMut(&S, &S) -> R + 'static,
        R: IntoCleanup,
    {
        EffectGuard::new(self.effect(selector, callback))
    }

    fn subscription<T, F, L>(&self, selector: F, listener: L) -> Subscription<S, T>
    where
        T: Shallow + 'static,
        F: Fn(&S) -> T + 'static,
        L: FnMut() + 'static,
    {
        let id = self.shared.allocate_id();
        let state = self.state();
        Subscription::new(id, &state, selector, listener)
    }

    fn register(&self, subscription: Rc<dyn Watcher<S>>) {
        let id = subscription.id();
        self.shared.registry.borrow_mut().push(subscription);
        trace!(store = %self.shared.name, subscription = %id, "subscription registered");
    }

    /// Register a selector for use with [`snapshot`](Self::snapshot).
    pub fn selector<T, F>(&self, select: F) -> Selector<S, T>
    where
        F: Fn(&S) -> T + 'static,
    {
        Selector::new(select)
    }

    /// Reader returning a cached, referentially stable value for `selector`.
    ///
    /// Readers built from clones of the same selector share one cache entry,
    /// which is evicted once the last clone is dropped.
    pub fn snapshot<T: Shallow + 'static>(&self, selector: &Selector<S, T>) -> SnapshotReader<S, T> {
        selector.track(&self.shared.snapshots);
        SnapshotReader::new(self.clone(), selector.clone())
    }

    pub(crate) fn resolve_snapshot<T: Shallow + 'static>(&self, id: SelectorId, fresh: T) -> Rc<T> {
        self.shared.snapshots.borrow_mut().resolve(id, fresh)
    }

    /// Subscribe/snapshot pair for a rendering host.
    pub fn external<T: Shallow + 'static>(&self, selector: &Selector<S, T>) -> ExternalSource<S, T> {
        ExternalSource::new(self.clone(), selector.clone())
    }

    /// Drop every subscription and cached snapshot.
    ///
    /// No listener or cleanup runs; outstanding disposers become no-ops.
    /// The store itself stays usable.
    pub fn destroy(&self) {
        let watchers = std::mem::take(&mut *self.shared.registry.borrow_mut());
        for watcher in &watchers {
            watcher.deactivate();
        }
        self.shared.snapshots.borrow_mut().clear();
        debug!(store = %self.shared.name, subscriptions = watchers.len(), "store destroyed");
    }
}

impl<S> Store<S> {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Number of registered subscriptions, effects included.
    pub fn subscriber_count(&self) -> usize {
        self.shared.registry.borrow().len()
    }

    /// Number of cached snapshot entries.
    pub fn snapshot_count(&self) -> usize {
        self.shared.snapshots.borrow().len()
    }

    /// Whether an update (updater or notification pass) is in progress.
    pub fn is_updating(&self) -> bool {
        self.shared.updating.get()
    }

    pub fn metadata(&self) -> StoreMetadata {
        self.shared.metadata.borrow().clone()
    }

    /// Weak handle that does not keep the store alive.
    ///
    /// Listeners that need to read the store should capture one of these
    /// rather than a `Store` clone, which would form a reference cycle.
    pub fn downgrade(&self) -> WeakStore<S> {
        WeakStore {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.shared.name)
            .field("id", &self.shared.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Non-owning store handle.
pub struct WeakStore<S> {
    shared: Weak<Shared<S>>,
}

impl<S> WeakStore<S> {
    pub fn upgrade(&self) -> Option<Store<S>> {
        self.shared.upgrade().map(|shared| Store { shared })
    }
}

impl<S> Clone for WeakStore<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        count: u32,
        label: &'static str,
    }

    fn counter() -> Store<Counter> {
        Store::new(Counter {
            count: 0,
            label: "clicks",
        })
    }

    fn tally() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        (hits, move || counter.set(counter.get() + 1))
    }

    fn increment(s: &Counter) -> Counter {
        Counter {
            count: s.count + 1,
            ..s.clone()
        }
    }

    #[test]
    fn initial_state_is_also_previous() {
        let store = counter();
        assert!(Rc::ptr_eq(&store.state(), &store.previous_state()));
    }

    #[test]
    fn update_replaces_state_and_keeps_previous() {
        let store = counter();
        let before = store.state();

        let outcome = store.modify(increment).unwrap();

        assert_eq!(outcome, Update::Changed { notified: 0 });
        assert_eq!(store.state().count, 1);
        assert!(Rc::ptr_eq(&store.previous_state(), &before));
    }

    #[test]
    fn identity_update_is_silent() {
        let store = counter();
        let (hits, listener) = tally();
        let _handle = store.subscribe(|s: &Counter| s.count, listener);
        store.modify(increment).unwrap();
        let previous = store.previous_state();

        let outcome = store.update(|s| Rc::clone(s)).unwrap();

        assert_eq!(outcome, Update::Unchanged);
        assert!(Rc::ptr_eq(&store.previous_state(), &previous));
        assert_eq!(hits.get(), 1);
        assert_eq!(store.metadata().skipped_updates, 1);
    }

    #[test]
    fn only_changed_slices_notify() {
        let store = counter();
        let (count_hits, count_listener) = tally();
        let (label_hits, label_listener) = tally();
        let _a = store.subscribe(|s: &Counter| s.count, count_listener);
        let _b = store.subscribe(|s: &Counter| s.label, label_listener);

        let outcome = store.modify(increment).unwrap();

        assert_eq!(outcome, Update::Changed { notified: 1 });
        assert_eq!(count_hits.get(), 1);
        assert_eq!(label_hits.get(), 0);
    }

    #[test]
    fn fire_immediately_runs_listener_once() {
        let store = counter();
        let (hits, listener) = tally();
        let _handle = store.subscribe_with(
            |s: &Counter| s.count,
            listener,
            SubscribeOptions::fire_immediately(),
        );
        assert_eq!(hits.get(), 1);

        // The seeded value is unchanged, so an unrelated update does not fire.
        store
            .modify(|s| Counter {
                label: "taps",
                ..s.clone()
            })
            .unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let store = counter();
        let (hits, listener) = tally();
        let handle = store.subscribe(|s: &Counter| s.count, listener);
        assert_eq!(store.subscriber_count(), 1);

        handle.unsubscribe();
        handle.unsubscribe();
        store.modify(increment).unwrap();

        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn subscriptions_added_during_pass_wait_for_next_pass() {
        let store = counter();
        let (late_hits, late_listener) = tally();
        let late_listener = RefCell::new(Some(late_listener));
        let handles = Rc::new(RefCell::new(Vec::new()));

        let weak = store.downgrade();
        let sink = Rc::clone(&handles);
        let _first = store.subscribe(
            |s: &Counter| s.count,
            move || {
                if let (Some(store), Some(listener)) = (weak.upgrade(), late_listener.borrow_mut().take()) {
                    sink.borrow_mut().push(store.subscribe(|s: &Counter| s.count, listener));
                }
            },
        );

        store.modify(increment).unwrap();
        assert_eq!(late_hits.get(), 0);
        assert_eq!(store.subscriber_count(), 2);

        store.modify(increment).unwrap();
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn subscriptions_removed_during_pass_are_skipped() {
        let store = counter();
        let (second_hits, second_listener) = tally();
        let victim: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let target = Rc::clone(&victim);
        let _first = store.subscribe(
            |s: &Counter| s.count,
            move || {
                if let Some(handle) = target.borrow().as_ref() {
                    handle.unsubscribe();
                }
            },
        );
        let second = store.subscribe(|s: &Counter| s.count, second_listener);
        *victim.borrow_mut() = Some(second);

        store.modify(increment).unwrap();

        assert_eq!(second_hits.get(), 0);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_stop_pass() {
        let store = counter();
        let (hits, listener) = tally();
        let failing = store.subscribe(|s: &Counter| s.count, || panic!("listener exploded"));
        let _ok = store.subscribe(|s: &Counter| s.count, listener);

        let err = store.modify(increment).unwrap_err();

        assert!(err.is_committed());
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].id, failing.id());
        assert_eq!(err.failures()[0].message, "listener exploded");
        assert_eq!(hits.get(), 1);
        assert_eq!(store.state().count, 1);
        assert_eq!(store.metadata().failures, 1);
    }

    #[test]
    fn panicking_selector_is_isolated() {
        let store = counter();
        let (hits, listener) = tally();
        let _bad = store.subscribe(
            |s: &Counter| {
                if s.count > 0 {
                    panic!("selector exploded");
                }
                s.count
            },
            || {},
        );
        let _ok = store.subscribe(|s: &Counter| s.count, listener);

        let err = store.modify(increment).unwrap_err();

        assert!(matches!(err, StoreError::Subscribers { notified: 1, .. }));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn failing_updater_leaves_state_untouched() {
        let store = counter();
        let (hits, listener) = tally();
        let _handle = store.subscribe(|s: &Counter| s.count, listener);
        let before = store.state();

        let err = store
            .try_update(|_| Err::<Rc<Counter>, _>("validation failed"))
            .unwrap_err();

        assert!(matches!(err, StoreError::Updater(_)));
        assert!(Rc::ptr_eq(&store.state(), &before));
        assert!(Rc::ptr_eq(&store.previous_state(), &before));
        assert_eq!(hits.get(), 0);
        assert!(!store.is_updating());
    }

    #[test]
    fn panicking_updater_propagates_and_releases_store() {
        let store = counter();
        let before = store.state();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = store.update(|_| panic!("updater exploded"));
        }));

        assert!(result.is_err());
        assert!(Rc::ptr_eq(&store.state(), &before));
        assert!(!store.is_updating());
        assert!(store.modify(increment).is_ok());
    }

    #[test]
    fn update_from_listener_is_rejected() {
        let store = counter();
        let outcome = Rc::new(RefCell::new(None));

        let weak = store.downgrade();
        let sink = Rc::clone(&outcome);
        let _handle = store.subscribe(
            |s: &Counter| s.count,
            move || {
                if let Some(store) = weak.upgrade() {
                    *sink.borrow_mut() = Some(store.modify(increment));
                }
            },
        );

        store.modify(increment).unwrap();

        assert!(matches!(
            outcome.borrow_mut().take(),
            Some(Err(StoreError::ReentrantUpdate))
        ));
        assert_eq!(store.state().count, 1);
    }

    #[test]
    fn effect_runs_immediately_with_initial_state_twice() {
        let store = counter();
        let calls = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&calls);
        let _handle = store.effect(
            |s: &Counter| s.count,
            move |state: &Counter, previous: &Counter| {
                log.borrow_mut().push((state.count, previous.count));
            },
        );

        assert_eq!(*calls.borrow(), vec![(0, 0)]);
    }

    #[test]
    fn effect_cleans_up_before_rerun() {
        let store = counter();
        let events = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&events);
        let handle = store.effect(
            |s: &Counter| s.count,
            move |state: &Counter, previous: &Counter| {
                log.borrow_mut()
                    .push(format!("run {}<-{}", state.count, previous.count));
                let log = Rc::clone(&log);
                let count = state.count;
                Cleanup::new(move || log.borrow_mut().push(format!("cleanup {count}")))
            },
        );

        store.modify(increment).unwrap();
        handle.unsubscribe();
        handle.unsubscribe();
        store.modify(increment).unwrap();

        assert_eq!(
            *events.borrow(),
            vec!["run 0<-0", "cleanup 0", "run 1<-0", "cleanup 1"]
        );
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn effect_ignores_unrelated_changes() {
        let store = counter();
        let runs = Rc::new(Cell::new(0));

        let seen = Rc::clone(&runs);
        let _handle = store.effect(
            |s: &Counter| s.label,
            move |_: &Counter, _: &Counter| seen.set(seen.get() + 1),
        );
        store.modify(increment).unwrap();

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn failed_effect_run_registers_no_cleanup() {
        let store = counter();
        let cleanups = Rc::new(Cell::new(0));

        let seen = Rc::clone(&cleanups);
        let handle = store.effect(
            |s: &Counter| s.count,
            move |state: &Counter, _: &Counter| {
                if state.count == 1 {
                    panic!("effect exploded");
                }
                let seen = Rc::clone(&seen);
                Cleanup::new(move || seen.set(seen.get() + 1))
            },
        );

        let err = store.modify(increment).unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(cleanups.get(), 1);

        handle.unsubscribe();
        assert_eq!(cleanups.get(), 1);
    }

    #[test]
    fn scoped_effect_disposes_on_drop() {
        let store = counter();
        let cleanups = Rc::new(Cell::new(0));

        {
            let seen = Rc::clone(&cleanups);
            let _guard = store.scoped_effect(
                |s: &Counter| s.count,
                move |_: &Counter, _: &Counter| {
                    let seen = Rc::clone(&seen);
                    Cleanup::new(move || seen.set(seen.get() + 1))
                },
            );
            assert_eq!(store.subscriber_count(), 1);
        }

        assert_eq!(cleanups.get(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn destroy_clears_without_running_anything() {
        let store = counter();
        let (hits, listener) = tally();
        let cleanups = Rc::new(Cell::new(0));
        let handle = store.subscribe(|s: &Counter| s.count, listener);

        let seen = Rc::clone(&cleanups);
        let effect = store.effect(
            |s: &Counter| s.count,
            move |_: &Counter, _: &Counter| {
                let seen = Rc::clone(&seen);
                Cleanup::new(move || seen.set(seen.get() + 1))
            },
        );
        let selector = store.selector(|s: &Counter| s.count);
        store.snapshot(&selector).read();
        assert_eq!(store.snapshot_count(), 1);

        store.destroy();
        store.modify(increment).unwrap();
        handle.unsubscribe();
        effect.unsubscribe();

        assert_eq!(hits.get(), 0);
        assert_eq!(cleanups.get(), 0);
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(store.snapshot_count(), 0);
    }

    #[test]
    fn disposers_outlive_store() {
        let store = counter();
        let handle = store.subscribe(|s: &Counter| s.count, || {});
        let effect = store.effect(|s: &Counter| s.count, |_: &Counter, _: &Counter| {});

        drop(store);

        handle.unsubscribe();
        effect.unsubscribe();
        assert!(handle.is_disposed());
    }

    #[test]
    fn snapshot_is_stable_until_slice_changes() {
        let store = counter();
        let selector = store.selector(|s: &Counter| vec![s.count]);
        let reader = store.snapshot(&selector);

        let first = reader.read();
        let second = reader.read();
        assert!(Rc::ptr_eq(&first, &second));

        store
            .modify(|s| Counter {
                label: "taps",
                ..s.clone()
            })
            .unwrap();
        let third = reader.read();
        assert!(Rc::ptr_eq(&first, &third));

        store.modify(increment).unwrap();
        let fourth = reader.read();
        assert!(!Rc::ptr_eq(&third, &fourth));
        assert_eq!(*fourth, vec![1]);
    }

    #[test]
    fn readers_from_one_selector_share_cache() {
        let store = counter();
        let selector = store.selector(|s: &Counter| s.label.to_string());
        let a = store.snapshot(&selector);
        let b = store.snapshot(&selector.clone());

        assert!(Rc::ptr_eq(&a.read(), &b.read()));
        assert_eq!(store.snapshot_count(), 1);
    }

    #[test]
    fn metadata_counts_notifications() {
        let store = counter();
        let _a = store.subscribe(|s: &Counter| s.count, || {});
        let _b = store.subscribe(|s: &Counter| s.count, || {});

        store.modify(increment).unwrap();
        store.modify(increment).unwrap();

        let meta = store.metadata();
        assert_eq!(meta.updates, 2);
        assert_eq!(meta.notifications, 4);
        assert_eq!(meta.name, DEFAULT_NAME);
        assert_eq!(meta.id, store.id());
    }

    #[test]
    fn panicking_initial_selector_registers_nothing() {
        let store = counter();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = store.subscribe(|_: &Counter| -> u32 { panic!("selector exploded") }, || {});
        }));

        assert!(result.is_err());
        assert_eq!(store.subscriber_count(), 0);
        assert!(store.modify(increment).is_ok());
    }

    #[test]
    fn panicking_reader_keeps_cached_snapshot() {
        let store = counter();
        let selector = store.selector(|s: &Counter| {
            if s.count == 1 {
                panic!("reader exploded");
            }
            s.label
        });
        let reader = store.snapshot(&selector);
        let first = reader.read();

        store.modify(increment).unwrap();
        let result = panic::catch_unwind(AssertUnwindSafe(|| reader.read()));
        assert!(result.is_err());
        assert_eq!(store.snapshot_count(), 1);

        store.modify(increment).unwrap();
        assert!(Rc::ptr_eq(&first, &reader.read()));
    }

    fn explode(_: &Counter, _: &Counter) {
        panic!("effect exploded")
    }

    #[test]
    fn panicking_first_effect_run_registers_nothing() {
        let store = counter();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = store.effect(|s: &Counter| s.count, explode);
        }));

        assert!(result.is_err());
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(store.modify(increment).unwrap(), Update::Changed { notified: 0 });
    }

    #[test]
    fn effect_disposing_itself_still_cleans_up() {
        let store = Store::new(0_u32);
        let cleanups = Rc::new(Cell::new(0));
        let own: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let seen = Rc::clone(&cleanups);
        let target = Rc::clone(&own);
        let effect = store.effect(
            |s: &u32| *s,
            move |state: &u32, _: &u32| {
                if *state == 1 {
                    if let Some(handle) = target.borrow().as_ref() {
                        handle.unsubscribe();
                    }
                }
                let seen = Rc::clone(&seen);
                Cleanup::new(move || seen.set(seen.get() + 1))
            },
        );
        *own.borrow_mut() = Some(effect.clone());

        store.set(1).unwrap();
        assert_eq!(cleanups.get(), 2);
        assert_eq!(store.subscriber_count(), 0);

        effect.unsubscribe();
        store.set(2).unwrap();
        assert_eq!(cleanups.get(), 2);
    }

    #[test]
    fn destroy_during_effect_run_drops_late_cleanup() {
        let store = Store::new(0_u32);
        let cleanups = Rc::new(Cell::new(0));
        let own: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let seen = Rc::clone(&cleanups);
        let target = Rc::clone(&own);
        let weak = store.downgrade();
        let effect = store.effect(
            |s: &u32| *s,
            move |state: &u32, _: &u32| {
                if *state == 1 {
                    if let Some(store) = weak.upgrade() {
                        store.destroy();
                    }
                    if let Some(handle) = target.borrow().as_ref() {
                        handle.unsubscribe();
                    }
                }
                let seen = Rc::clone(&seen);
                Cleanup::new(move || seen.set(seen.get() + 1))
            },
        );
        *own.borrow_mut() = Some(effect);

        store.set(1).unwrap();
        assert_eq!(cleanups.get(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn dropped_selectors_release_their_snapshots() {
        let store = counter();
        for _ in 0..100 {
            let selector = store.selector(|s: &Counter| s.count);
            store.snapshot(&selector).read();
        }
        assert_eq!(store.snapshot_count(), 0);

        let kept = store.selector(|s: &Counter| s.count);
        let reader = store.snapshot(&kept);
        reader.read();
        drop(kept);
        assert_eq!(store.snapshot_count(), 1);

        drop(reader);
        assert_eq!(store.snapshot_count(), 0);
    }

    #[test]
    fn fire_immediately_listener_update_is_observed() {
        let store = counter();
        let (hits, mut listener) = tally();
        let weak = store.downgrade();
        let fired = Cell::new(false);

        let _handle = store.subscribe_with(
            |s: &Counter| s.count,
            move || {
                listener();
                if !fired.replace(true) {
                    if let Some(store) = weak.upgrade() {
                        store.modify(increment).unwrap();
                    }
                }
            },
            SubscribeOptions::fire_immediately(),
        );
        assert_eq!(hits.get(), 1);
        assert_eq!(store.state().count, 1);

        // The update above already moved the last observed count to 1.
        store
            .modify(|s| Counter {
                label: "taps",
                ..s.clone()
            })
            .unwrap();
        assert_eq!(hits.get(), 1);

        store.modify(increment).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn panicking_immediate_listener_is_unregistered() {
        let store = counter();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = store.subscribe_with(
                |s: &Counter| s.count,
                || panic!("listener exploded"),
                SubscribeOptions::fire_immediately(),
            );
        }));

        assert!(result.is_err());
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(store.modify(increment).unwrap(), Update::Changed { notified: 0 });
    }
}
