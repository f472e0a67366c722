use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::ptr;
use std::rc::Rc;

use crate::error::Result;
use crate::observers::Observers;
use crate::{
    DefaultStrategy, Error, ObjectPool, PoolBuilder, PoolConfig, PoolEvent, PoolStrategy,
    Poolable, Pooled,
};

/// A pool of reusable instances of a single type.
///
/// The pool couples a [strategy][PoolStrategy] that decides what happens at each lifecycle
/// transition with an [`ObjectPool`] that stores the idle instances. Observers can be
/// attached for each [`PoolEvent`] and fire after the strategy has handled the transition.
///
/// A pool must be [realized][Self::realize] before instances can be acquired from it.
/// Pools obtained from a [`Registry`][crate::Registry] are always realized.
///
/// This is a cheaply cloneable handle. All clones refer to the same pool.
///
/// # Example
///
/// ```rust
/// use pool_registry::Pool;
///
/// let pool = Pool::<String>::new();
/// pool.realize();
///
/// pool.on_create(|text: &String| println!("created {text:?}"));
///
/// let mut text = pool.get().unwrap();
/// text.push_str("hello");
/// pool.release(text);
///
/// assert_eq!(pool.count_all(), 1);
/// assert_eq!(pool.count_inactive(), 1);
/// ```
///
/// # Thread safety
///
/// The pool is single-threaded. It is neither [`Send`] nor [`Sync`].
pub struct Pool<T: 'static> {
    shared: Rc<Shared<T>>,
}

struct Shared<T: 'static> {
    /// Storage bound to this pool. `None` until realized and again after clearing.
    primitive: RefCell<Option<ObjectPool<T>>>,

    hooks: Rc<Hooks<T>>,

    config: PoolConfig,
}

/// The transition logic shared between the pool and the callbacks of its storage.
struct Hooks<T: 'static> {
    strategy: RefCell<Box<dyn PoolStrategy<T>>>,

    observers: Observers<T>,

    /// Forwarders installed by keyed pools, at most one per keyed pool. They always fire
    /// after `observers`.
    relays: RefCell<Vec<Relay<T>>>,
}

struct Relay<T: 'static> {
    /// Identifies the keyed pool that installed the relay.
    owner: *const (),

    forward: Rc<dyn Fn(PoolEvent, &T)>,
}

impl<T: 'static> Hooks<T> {
    fn notify(&self, event: PoolEvent, obj: &T) {
        self.observers.notify(event, obj);

        let forwards: Vec<_> = self
            .relays
            .borrow()
            .iter()
            .map(|relay| Rc::clone(&relay.forward))
            .collect();

        for forward in forwards {
            forward(event, obj);
        }
    }

    fn create(&self) -> Result<T> {
        let obj = self.strategy.borrow_mut().create_object()?;
        self.notify(PoolEvent::Create, &obj);
        Ok(obj)
    }

    fn acquire(&self, obj: &mut T) {
        self.strategy.borrow_mut().on_get_object(obj);
        self.notify(PoolEvent::Get, obj);
    }

    fn give_back(&self, obj: &mut T) {
        self.strategy.borrow_mut().on_release_object(obj);
        self.notify(PoolEvent::Release, obj);
    }

    fn destroy(&self, mut obj: T) {
        self.strategy.borrow_mut().on_destroy_object(&mut obj);
        self.notify(PoolEvent::Destroy, &obj);
    }
}

impl<T: Poolable> Pool<T> {
    /// Creates a pool that uses the strategy selected from the capabilities of `T`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategy(DefaultStrategy::new())
    }

    /// Creates a pool that uses the strategy selected from the capabilities of `T`,
    /// manufacturing new instances from `prototype`.
    #[must_use]
    pub fn with_prototype(prototype: T) -> Self {
        Self::with_strategy(DefaultStrategy::with_prototype(prototype))
    }
}

impl<T: 'static> Pool<T> {
    /// Creates a pool that uses a caller-supplied strategy.
    #[must_use]
    pub fn with_strategy<S>(strategy: S) -> Self
    where
        S: PoolStrategy<T> + 'static,
    {
        Self::new_inner(Box::new(strategy), PoolConfig::default())
    }

    /// Creates a builder for a pool with custom sizing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pool_registry::{DefaultStrategy, Pool};
    ///
    /// let pool = Pool::<Vec<u8>>::builder()
    ///     .max_size(4)
    ///     .build(DefaultStrategy::new());
    /// ```
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new()
    }

    pub(crate) fn new_inner(strategy: Box<dyn PoolStrategy<T>>, config: PoolConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                primitive: RefCell::new(None),
                hooks: Rc::new(Hooks {
                    strategy: RefCell::new(strategy),
                    observers: Observers::new(),
                    relays: RefCell::new(Vec::new()),
                }),
                config,
            }),
        }
    }

    /// Binds the pool to fresh storage, unless it is already bound.
    ///
    /// Calling this on a realized pool has no effect. A pool that has been
    /// [cleared][Self::clear] can be realized again.
    pub fn realize(&self) {
        let mut primitive = self.shared.primitive.borrow_mut();

        if primitive.is_some() {
            return;
        }

        tracing::debug!(pool = type_name::<T>(), "realizing pool");

        let hooks = &self.shared.hooks;

        *primitive = Some(
            ObjectPool::builder({
                let hooks = Rc::clone(hooks);
                move || hooks.create()
            })
            .on_get({
                let hooks = Rc::clone(hooks);
                move |obj| hooks.acquire(obj)
            })
            .on_release({
                let hooks = Rc::clone(hooks);
                move |obj| hooks.give_back(obj)
            })
            .on_destroy({
                let hooks = Rc::clone(hooks);
                move |obj| hooks.destroy(obj)
            })
            .config(self.shared.config)
            .build(),
        );
    }

    /// Whether the pool is currently bound to storage.
    #[must_use]
    pub fn is_realized(&self) -> bool {
        self.shared.primitive.borrow().is_some()
    }

    /// Acquires an instance, reusing an idle one if available.
    ///
    /// The instance has been through the acquire transition: a self-lifecycle instance has
    /// had its get hook called and a host-native instance is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRealized`] if the pool is not realized, or the error of the
    /// strategy if a new instance could not be manufactured.
    pub fn get(&self) -> Result<T> {
        let mut primitive = self.shared.primitive.borrow_mut();

        let primitive = primitive.as_mut().ok_or_else(|| Error::NotRealized {
            type_name: type_name::<T>(),
        })?;

        primitive.get()
    }

    /// Acquires an instance wrapped in a guard that releases it back to this pool when
    /// dropped.
    ///
    /// # Errors
    ///
    /// Same as [`get()`][Self::get].
    pub fn get_pooled(&self) -> Result<Pooled<T>> {
        let obj = self.get()?;
        Ok(Pooled::new(self.clone(), obj))
    }

    /// Returns an instance to the pool.
    ///
    /// If the pool is not realized, the instance goes through the destroy transition
    /// immediately.
    pub fn release(&self, obj: T) {
        let obj = match self.shared.primitive.borrow_mut().as_mut() {
            Some(primitive) => {
                primitive.release(obj);
                return;
            }
            None => obj,
        };

        self.shared.hooks.destroy(obj);
    }

    /// Destroys every idle instance and unbinds the pool from its storage.
    ///
    /// Calling this on a pool that is not realized has no effect.
    pub fn clear(&self) {
        // Take the storage out first so the destroy transitions run without it borrowed.
        let Some(primitive) = self.shared.primitive.borrow_mut().take() else {
            return;
        };

        tracing::debug!(
            pool = type_name::<T>(),
            idle = primitive.count_inactive(),
            "clearing pool"
        );

        drop(primitive);
    }

    /// Registers an observer of the create transition.
    pub fn on_create(&self, observer: impl Fn(&T) + 'static) {
        self.observe(PoolEvent::Create, observer);
    }

    /// Registers an observer of the acquire transition.
    pub fn on_get(&self, observer: impl Fn(&T) + 'static) {
        self.observe(PoolEvent::Get, observer);
    }

    /// Registers an observer of the release transition.
    pub fn on_release(&self, observer: impl Fn(&T) + 'static) {
        self.observe(PoolEvent::Release, observer);
    }

    /// Registers an observer of the destroy transition.
    pub fn on_destroy(&self, observer: impl Fn(&T) + 'static) {
        self.observe(PoolEvent::Destroy, observer);
    }

    /// Registers an observer of `event`.
    ///
    /// Observers of the same event fire in registration order, after the strategy has
    /// handled the transition. Observers must not call back into this pool.
    pub fn observe(&self, event: PoolEvent, observer: impl Fn(&T) + 'static) {
        self.shared.hooks.observers.add(event, Rc::new(observer));
    }

    /// Installs a forwarder of every event on behalf of `owner`. It fires after all
    /// observers registered through [`observe()`][Self::observe], regardless of
    /// registration order.
    ///
    /// A forwarder previously installed by the same `owner` is replaced.
    pub(crate) fn relay(&self, owner: *const (), forward: Rc<dyn Fn(PoolEvent, &T)>) {
        let mut relays = self.shared.hooks.relays.borrow_mut();

        relays.retain(|relay| !ptr::eq(relay.owner, owner));
        relays.push(Relay { owner, forward });
    }

    /// Removes the forwarder installed by `owner`, if any.
    pub(crate) fn detach(&self, owner: *const ()) {
        self.shared
            .hooks
            .relays
            .borrow_mut()
            .retain(|relay| !ptr::eq(relay.owner, owner));
    }

    /// Number of instances created by the pool's current storage that have not been
    /// destroyed. Zero if the pool is not realized.
    #[must_use]
    pub fn count_all(&self) -> usize {
        self.shared
            .primitive
            .borrow()
            .as_ref()
            .map_or(0, ObjectPool::count_all)
    }

    /// Number of instances currently handed out. Zero if the pool is not realized.
    #[must_use]
    pub fn count_active(&self) -> usize {
        self.shared
            .primitive
            .borrow()
            .as_ref()
            .map_or(0, ObjectPool::count_active)
    }

    /// Number of idle instances waiting for reuse. Zero if the pool is not realized.
    #[must_use]
    pub fn count_inactive(&self) -> usize {
        self.shared
            .primitive
            .borrow()
            .as_ref()
            .map_or(0, ObjectPool::count_inactive)
    }

    /// Whether two handles refer to the same pool.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: 'static> fmt::Debug for Pool<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("realized", &self.is_realized())
            .field("count_all", &self.count_all())
            .field("count_inactive", &self.count_inactive())
            .field("observers", &self.shared.hooks.observers)
            .field("relays", &self.shared.hooks.relays.borrow().len())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::MockPoolStrategy;

    assert_not_impl_any!(Pool<u32>: Send, Sync);

    fn counting_strategy(
        creates: usize,
        gets: usize,
        releases: usize,
        destroys: usize,
    ) -> MockPoolStrategy<u32> {
        let mut strategy = MockPoolStrategy::new();
        let next = Cell::new(0_u32);

        strategy
            .expect_create_object()
            .times(creates)
            .returning(move || {
                next.set(next.get() + 1);
                Ok(next.get())
            });
        strategy.expect_on_get_object().times(gets).return_const(());
        strategy
            .expect_on_release_object()
            .times(releases)
            .return_const(());
        strategy
            .expect_on_destroy_object()
            .times(destroys)
            .return_const(());

        strategy
    }

    #[test]
    fn round_trip_reuses_instance() {
        let pool = Pool::with_strategy(counting_strategy(1, 2, 1, 1));
        pool.realize();

        let first = pool.get().unwrap();
        pool.release(first);
        let second = pool.get().unwrap();

        assert_eq!(first, second);
        assert_eq!(pool.count_active(), 1);

        pool.release(second);
        pool.clear();
    }

    #[test]
    fn get_requires_realize() {
        let pool = Pool::with_strategy(counting_strategy(0, 0, 0, 0));

        assert!(!pool.is_realized());
        assert!(matches!(pool.get(), Err(Error::NotRealized { .. })));
    }

    #[test]
    fn realize_is_idempotent() {
        let pool = Pool::with_strategy(counting_strategy(1, 1, 1, 1));
        pool.realize();

        let obj = pool.get().unwrap();
        pool.release(obj);

        pool.realize();

        assert_eq!(pool.count_inactive(), 1);
        pool.clear();
    }

    #[test]
    fn clear_twice_destroys_once() {
        let pool = Pool::with_strategy(counting_strategy(2, 2, 2, 2));
        pool.realize();

        let first = pool.get().unwrap();
        let second = pool.get().unwrap();
        pool.release(first);
        pool.release(second);

        pool.clear();
        pool.clear();

        assert!(!pool.is_realized());
        assert_eq!(pool.count_all(), 0);
    }

    #[test]
    fn release_after_clear_destroys() {
        let pool = Pool::with_strategy(counting_strategy(1, 1, 0, 1));
        pool.realize();

        let obj = pool.get().unwrap();
        pool.clear();
        pool.release(obj);

        assert!(!pool.is_realized());
    }

    #[test]
    fn observers_fire_after_strategy_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pool = Pool::<String>::new();
        pool.realize();

        for event in PoolEvent::ALL {
            let log = Rc::clone(&log);
            pool.observe(event, move |_: &String| log.borrow_mut().push(event));
        }

        let obj = pool.get().unwrap();
        pool.release(obj);
        pool.clear();

        assert_eq!(
            *log.borrow(),
            vec![
                PoolEvent::Create,
                PoolEvent::Get,
                PoolEvent::Release,
                PoolEvent::Destroy
            ]
        );
    }

    #[test]
    fn relays_fire_after_observers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pool = Pool::<String>::new();
        pool.realize();

        {
            let log = Rc::clone(&log);
            pool.relay(
                ptr::null(),
                Rc::new(move |event: PoolEvent, _: &String| {
                    if event == PoolEvent::Get {
                        log.borrow_mut().push("relay");
                    }
                }),
            );
        }

        {
            let log = Rc::clone(&log);
            pool.on_get(move |_| log.borrow_mut().push("local"));
        }

        let _obj = pool.get().unwrap();

        assert_eq!(*log.borrow(), vec!["local", "relay"]);
    }

    #[test]
    fn relay_is_replaced_per_owner_and_detached() {
        let calls = Rc::new(Cell::new(0));
        let pool = Pool::<String>::new();
        pool.realize();

        let owner = Rc::as_ptr(&calls).cast::<()>();

        for _ in 0..2 {
            let calls = Rc::clone(&calls);
            pool.relay(
                owner,
                Rc::new(move |event: PoolEvent, _: &String| {
                    if event == PoolEvent::Get {
                        calls.set(calls.get() + 1);
                    }
                }),
            );
        }

        let text = pool.get().unwrap();
        pool.release(text);
        assert_eq!(calls.get(), 1);

        pool.detach(owner);

        let _text = pool.get().unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn create_error_propagates() {
        let mut strategy = MockPoolStrategy::<u32>::new();
        strategy.expect_create_object().returning(|| {
            Err(Error::UnsupportedCreationKind {
                type_name: "u32",
                reason: "test",
            })
        });

        let pool = Pool::with_strategy(strategy);
        pool.realize();

        assert!(matches!(
            pool.get(),
            Err(Error::UnsupportedCreationKind { .. })
        ));
        assert_eq!(pool.count_all(), 0);
    }

    #[test]
    fn pooled_guard_releases_on_drop() {
        let pool = Pool::<String>::new();
        pool.realize();

        {
            let mut text = pool.get_pooled().unwrap();
            text.push_str("scratch");
            assert_eq!(pool.count_active(), 1);
        }

        assert_eq!(pool.count_active(), 0);
        assert_eq!(pool.count_inactive(), 1);
    }

    #[test]
    fn clones_share_state() {
        let pool = Pool::<String>::new();
        let clone = pool.clone();

        clone.realize();

        assert!(pool.is_realized());
        assert!(pool.ptr_eq(&clone));
        assert!(!pool.ptr_eq(&Pool::new()));
    }
}
