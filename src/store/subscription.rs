//! Subscriptions and their disposers.

use crate::core::{shallow_equal, Shallow};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifier of a subscription, unique within one store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options accepted by [`Store::subscribe_with`](crate::Store::subscribe_with).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Invoke the listener once, synchronously, before returning
    pub fire_immediately: bool,
}

impl SubscribeOptions {
    pub fn fire_immediately() -> Self {
        Self {
            fire_immediately: true,
        }
    }
}

/// A registered subscription as seen by the notification pass.
///
/// The selected type is erased so that one registry can hold subscriptions
/// to slices of different types.
pub(crate) trait Watcher<S> {
    fn id(&self) -> SubscriptionId;

    fn is_active(&self) -> bool;

    fn deactivate(&self);

    /// Re-select from `state`; on change, record the new value and return true.
    fn observe(&self, state: &S) -> bool;

    /// Invoke the listener; false if it is already running further up the stack.
    fn notify(&self) -> bool;
}

pub(crate) struct Subscription<S, T> {
    id: SubscriptionId,
    selector: Box<dyn Fn(&S) -> T>,
    listener: RefCell<Box<dyn FnMut()>>,
    last_observed: RefCell<T>,
    active: Rc<Cell<bool>>,
}

impl<S, T: Shallow> Subscription<S, T> {
    /// Build a subscription whose last observed value is `selector(state)`.
    pub(crate) fn new<F, L>(id: SubscriptionId, state: &S, selector: F, listener: L) -> Self
    where
        F: Fn(&S) -> T + 'static,
        L: FnMut() + 'static,
    {
        let initial = selector(state);
        Self {
            id,
            selector: Box::new(selector),
            listener: RefCell::new(Box::new(listener)),
            last_observed: RefCell::new(initial),
            active: Rc::new(Cell::new(true)),
        }
    }

    pub(crate) fn active_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.active)
    }
}

impl<S, T: Shallow> Watcher<S> for Subscription<S, T> {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn deactivate(&self) {
        self.active.set(false);
    }

    fn observe(&self, state: &S) -> bool {
        let next = (self.selector)(state);
        let mut last = self.last_observed.borrow_mut();
        if shallow_equal(&*last, &next) {
            return false;
        }
        *last = next;
        true
    }

    fn notify(&self) -> bool {
        match self.listener.try_borrow_mut() {
            Ok(mut listener) => {
                (*listener)();
                true
            }
            Err(_) => false,
        }
    }
}

/// Disposer returned by `subscribe` and `effect`.
///
/// Calling [`unsubscribe`](Self::unsubscribe) removes exactly one
/// subscription. Further calls, calls through clones of the handle, and calls
/// made after the store was destroyed or dropped are no-ops. Dropping the
/// handle does not unsubscribe.
#[must_use = "dropping an Unsubscribe handle leaves the subscription registered with no way to remove it"]
#[derive(Clone)]
pub struct Unsubscribe {
    id: SubscriptionId,
    dispose: Rc<Cell<Option<Box<dyn FnOnce()>>>>,
}

impl Unsubscribe {
    pub(crate) fn new<F>(id: SubscriptionId, dispose: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            id,
            dispose: Rc::new(Cell::new(Some(Box::new(dispose)))),
        }
    }

    /// The subscription this handle disposes.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has already been called.
    pub fn is_disposed(&self) -> bool {
        // Cell<Option<Box<..>>> cannot be peeked; swap out and back in.
        let pending = self.dispose.take();
        let disposed = pending.is_none();
        self.dispose.set(pending);
        disposed
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
