//! Integration point for rendering hosts that read external stores.
//!
//! A host of this kind is handed two functions: one to subscribe to change
//! notifications, and one to read the current value. It calls the reader
//! during rendering and again for its fallback/hydration read, with the same
//! reader instance, and compares successive results by reference.
//! [`ExternalSource`] bundles both around a single [`Selector`] so the two
//! always agree.

use crate::core::Shallow;
use crate::store::{Selector, SnapshotReader, Store, Unsubscribe};
use std::rc::Rc;

/// Subscribe function and snapshot reader sharing one selector.
///
/// # Example
///
/// ```rust
/// use mindstore::Store;
/// use std::rc::Rc;
///
/// struct Calendar {
///     view: &'static str,
///     day: u32,
/// }
///
/// let store = Store::new(Calendar { view: "week", day: 1 });
/// let view = store.selector(|s: &Calendar| s.view);
/// let source = store.external(&view);
///
/// let handle = source.subscribe(|| {});
/// let rendered = source.snapshot();
/// assert!(Rc::ptr_eq(&rendered, &source.server_snapshot()));
///
/// store.modify(|s| Calendar { view: s.view, day: s.day + 1 }).unwrap();
/// assert!(Rc::ptr_eq(&rendered, &source.snapshot()));
/// handle.unsubscribe();
/// ```
pub struct ExternalSource<S: 'static, T> {
    store: Store<S>,
    selector: Selector<S, T>,
    reader: SnapshotReader<S, T>,
}

impl<S: 'static, T: Shallow + 'static> ExternalSource<S, T> {
    pub(crate) fn new(store: Store<S>, selector: Selector<S, T>) -> Self {
        let reader = store.snapshot(&selector);
        Self {
            store,
            selector,
            reader,
        }
    }

    /// Notify `listener` whenever the selected slice changes.
    pub fn subscribe<L>(&self, listener: L) -> Unsubscribe
    where
        L: FnMut() + 'static,
    {
        let selector = self.selector.clone();
        self.store
            .subscribe(move |state: &S| selector.select(state), listener)
    }

    /// Value for the render pass.
    pub fn snapshot(&self) -> Rc<T> {
        self.reader.read()
    }

    /// Value for the fallback/hydration read; same reader as [`snapshot`](Self::snapshot).
    pub fn server_snapshot(&self) -> Rc<T> {
        self.reader.read()
    }

    pub fn reader(&self) -> &SnapshotReader<S, T> {
        &self.reader
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }
}

impl<S: 'static, T> Clone for ExternalSource<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            selector: self.selector.clone(),
            reader: self.reader.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Clone)]
    struct Session {
        user: Option<Rc<str>>,
        clicks: u32,
    }

    fn session() -> Store<Session> {
        Store::new(Session {
            user: None,
            clicks: 0,
        })
    }

    #[test]
    fn subscribe_follows_selector() {
        let store = session();
        let user = store.selector(|s: &Session| s.user.clone());
        let source = store.external(&user);
        let hits = Rc::new(Cell::new(0));

        let seen = Rc::clone(&hits);
        let handle = source.subscribe(move || seen.set(seen.get() + 1));

        store
            .modify(|s| Session {
                clicks: s.clicks + 1,
                ..s.clone()
            })
            .unwrap();
        assert_eq!(hits.get(), 0);

        store
            .modify(|s| Session {
                user: Some(Rc::from("ada")),
                ..s.clone()
            })
            .unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(source.snapshot().as_deref(), Some("ada"));

        handle.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn render_and_fallback_reads_are_identical() {
        let store = session();
        let clicks = store.selector(|s: &Session| (s.clicks, s.user.is_some()));
        let source = store.external(&clicks);

        let render = source.snapshot();
        let fallback = source.server_snapshot();
        assert!(Rc::ptr_eq(&render, &fallback));

        let clone = source.clone();
        assert!(Rc::ptr_eq(&render, &clone.snapshot()));
        assert!(clone.store().ptr_eq(&store));
    }
}
