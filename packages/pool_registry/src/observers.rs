use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A lifecycle transition of a pooled instance.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum PoolEvent {
    /// A new instance was manufactured.
    Create,

    /// An instance was handed out.
    Get,

    /// An instance was returned.
    Release,

    /// An instance was discarded for good.
    Destroy,
}

impl PoolEvent {
    /// All events, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Create, Self::Get, Self::Release, Self::Destroy];
}

/// An append-only list of observers, invoked in registration order.
pub(crate) struct ObserverList<F: ?Sized> {
    entries: RefCell<Vec<Rc<F>>>,
}

impl<F: ?Sized> ObserverList<F> {
    fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, observer: Rc<F>) {
        self.entries.borrow_mut().push(observer);
    }

    /// Copies the current entries so that observers can register further observers
    /// while being notified. Such late registrations take effect from the next event.
    fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries.borrow().clone()
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// One observer list per [`PoolEvent`].
pub(crate) struct EventObservers<F: ?Sized> {
    create: ObserverList<F>,
    get: ObserverList<F>,
    release: ObserverList<F>,
    destroy: ObserverList<F>,
}

impl<F: ?Sized> EventObservers<F> {
    pub(crate) fn new() -> Self {
        Self {
            create: ObserverList::new(),
            get: ObserverList::new(),
            release: ObserverList::new(),
            destroy: ObserverList::new(),
        }
    }

    fn list(&self, event: PoolEvent) -> &ObserverList<F> {
        match event {
            PoolEvent::Create => &self.create,
            PoolEvent::Get => &self.get,
            PoolEvent::Release => &self.release,
            PoolEvent::Destroy => &self.destroy,
        }
    }

    pub(crate) fn add(&self, event: PoolEvent, observer: Rc<F>) {
        self.list(event).push(observer);
    }

    pub(crate) fn count(&self, event: PoolEvent) -> usize {
        self.list(event).len()
    }
}

/// Observers of a single pool.
pub(crate) type Observers<T> = EventObservers<dyn Fn(&T)>;

/// Observers of a keyed pool, which additionally receive the key of the sub-pool.
pub(crate) type KeyedObservers<K, T> = EventObservers<dyn Fn(&K, &T)>;

impl<T: ?Sized> EventObservers<dyn Fn(&T)> {
    pub(crate) fn notify(&self, event: PoolEvent, obj: &T) {
        for observer in self.list(event).snapshot() {
            observer(obj);
        }
    }
}

impl<K: ?Sized, T: ?Sized> EventObservers<dyn Fn(&K, &T)> {
    pub(crate) fn notify(&self, event: PoolEvent, key: &K, obj: &T) {
        for observer in self.list(event).snapshot() {
            observer(key, obj);
        }
    }
}

impl<F: ?Sized> fmt::Debug for EventObservers<F> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventObservers")
            .field("create", &self.create.len())
            .field("get", &self.get.len())
            .field("release", &self.release.len())
            .field("destroy", &self.destroy.len())
            .finish()
    }
}
