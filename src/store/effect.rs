//! Scoped side effects and their cleanups.

use super::subscription::Unsubscribe;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Cleanup returned by an effect run.
///
/// Runs at most once: before the effect re-runs, or when the effect is
/// disposed.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Box::new(cleanup))
    }

    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect callback may return.
///
/// `()` means "no cleanup"; a [`Cleanup`] or `Option<Cleanup>` registers one.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum SlotState {
    #[default]
    Open,
    /// Disposed: a cleanup arriving late runs immediately.
    Closed,
    /// Torn down with the store: a cleanup arriving late is dropped.
    Discarded,
}

/// Pending cleanup of one effect.
#[derive(Default)]
pub(crate) struct EffectSlot {
    pending: RefCell<Option<Cleanup>>,
    state: Cell<SlotState>,
}

impl EffectSlot {
    /// Hold `cleanup` until the next run or disposal.
    ///
    /// An effect can dispose itself from inside its callback, in which case
    /// the slot is already closed when the run returns its cleanup.
    pub(crate) fn store(&self, cleanup: Option<Cleanup>) {
        match self.state.get() {
            SlotState::Open => *self.pending.borrow_mut() = cleanup,
            SlotState::Closed => {
                if let Some(cleanup) = cleanup {
                    cleanup.run();
                }
            }
            SlotState::Discarded => {}
        }
    }

    /// Take and run the pending cleanup, if any.
    pub(crate) fn run_cleanup(&self) {
        let pending = self.pending.borrow_mut().take();
        if let Some(cleanup) = pending {
            cleanup.run();
        }
    }

    /// Run the pending cleanup and any cleanup stored afterwards.
    pub(crate) fn close(&self) {
        self.state.set(SlotState::Closed);
        self.run_cleanup();
    }

    /// Drop the pending cleanup and any cleanup stored afterwards.
    pub(crate) fn discard(&self) {
        self.state.set(SlotState::Discarded);
        self.pending.borrow_mut().take();
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

/// Owns an effect and disposes it when dropped.
///
/// Use this where the effect should live exactly as long as some enclosing
/// scope, such as a view or a session.
#[must_use = "the effect is disposed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct EffectGuard {
    handle: Unsubscribe,
    armed: bool,
}

impl EffectGuard {
    pub fn new(handle: Unsubscribe) -> Self {
        Self {
            handle,
            armed: true,
        }
    }

    /// Dispose now instead of at drop.
    pub fn dispose(self) {
        self.handle.unsubscribe();
    }

    /// Give up scoped ownership and return the plain disposer.
    pub fn into_inner(mut self) -> Unsubscribe {
        self.armed = false;
        self.handle.clone()
    }
}

impl Drop for EffectGuard {
    fn drop(&mut self) {
        if self.armed {
            self.handle.unsubscribe();
        }
    }
}
