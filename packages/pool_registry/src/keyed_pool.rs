use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};

use crate::error::Result;
use crate::observers::KeyedObservers;
use crate::{Error, Pool, PoolEvent, Poolable};

type Factory<T, K> = Box<dyn Fn(&K) -> Pool<T>>;

/// A pool that fans out into an independent [`Pool`] per key.
///
/// Sub-pools are created on first use of a key, either through the default strategy
/// selection or through a caller-supplied factory, and are always realized before they
/// are stored. Every sub-pool relays its events to the observers of the keyed pool,
/// which receive the key alongside the instance. Relayed observers fire after the
/// sub-pool's own observers and never replace them.
///
/// This is a cheaply cloneable handle. All clones refer to the same keyed pool.
///
/// # Example
///
/// ```rust
/// use pool_registry::KeyedPool;
///
/// let pool = KeyedPool::<String, &'static str>::new();
///
/// pool.on_get(|key, _text| println!("acquired a string for {key}"));
///
/// let greeting = pool.get(&"greeting").unwrap();
/// pool.release(&"greeting", greeting);
///
/// assert!(pool.has_key(&"greeting"));
/// assert!(!pool.has_key(&"farewell"));
/// ```
///
/// # Thread safety
///
/// The keyed pool is single-threaded. It is neither [`Send`] nor [`Sync`].
pub struct KeyedPool<T: 'static, K: 'static> {
    shared: Rc<KeyedShared<T, K>>,
}

struct KeyedShared<T: 'static, K: 'static> {
    sub_pools: RefCell<HashMap<K, Pool<T>>>,
    factory: Factory<T, K>,
    observers: Rc<KeyedObservers<K, T>>,
}

impl<T, K> KeyedPool<T, K>
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    /// Creates a keyed pool whose sub-pools use the strategy selected from the
    /// capabilities of `T`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(|_| Pool::new())
    }
}

impl<T, K> KeyedPool<T, K>
where
    T: 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    /// Creates a keyed pool that builds each sub-pool by calling `factory` with its key.
    ///
    /// The factory does not need to realize the sub-pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pool_registry::{DefaultStrategy, KeyedPool, Pool};
    ///
    /// // Buffers for each size class are kept in their own sub-pool.
    /// let pool = KeyedPool::<Vec<u8>, usize>::with_factory(|_size_class| {
    ///     Pool::builder().max_size(8).build(DefaultStrategy::new())
    /// });
    ///
    /// let buffer = pool.get(&4096).unwrap();
    /// pool.release(&4096, buffer);
    /// ```
    #[must_use]
    pub fn with_factory(factory: impl Fn(&K) -> Pool<T> + 'static) -> Self {
        Self {
            shared: Rc::new(KeyedShared {
                sub_pools: RefCell::new(HashMap::new()),
                factory: Box::new(factory),
                observers: Rc::new(KeyedObservers::new()),
            }),
        }
    }

    /// Installs a sub-pool for `key`, building one with the factory if `pool` is `None`.
    ///
    /// The sub-pool is realized and its events are relayed to the observers of this keyed
    /// pool. A different sub-pool already installed for `key` is cleared, stops relaying
    /// and is replaced. Installing the same sub-pool again has no effect.
    pub fn create_sub_pool(&self, key: K, pool: Option<Pool<T>>) -> Pool<T> {
        let pool = pool.unwrap_or_else(|| (self.shared.factory)(&key));

        let previous = self.shared.sub_pools.borrow_mut().remove(&key);

        if let Some(previous) = previous {
            if previous.ptr_eq(&pool) {
                previous.realize();
                self.shared.sub_pools.borrow_mut().insert(key, previous);
                return pool;
            }

            tracing::warn!(
                pool = type_name::<T>(),
                key = ?key,
                "sub-pool already exists for key, clearing and replacing it"
            );
            self.retire(&previous);
        }

        pool.realize();
        self.relay_events(&key, &pool);

        self.shared
            .sub_pools
            .borrow_mut()
            .insert(key, pool.clone());

        pool
    }

    /// Identifies this keyed pool to the sub-pools that relay to it.
    ///
    /// The relays keep the observers alive, so the address is not reused while any
    /// sub-pool still relays to them.
    fn relay_owner(&self) -> *const () {
        Rc::as_ptr(&self.shared.observers).cast()
    }

    fn relay_events(&self, key: &K, pool: &Pool<T>) {
        let observers = Rc::clone(&self.shared.observers);
        let key = key.clone();

        pool.relay(
            self.relay_owner(),
            Rc::new(move |event: PoolEvent, obj: &T| observers.notify(event, &key, obj)),
        );
    }

    /// Clears a sub-pool that is leaving this keyed pool and stops its relay. Its destroy
    /// transitions are still reported to the observers of this keyed pool.
    fn retire(&self, pool: &Pool<T>) {
        pool.clear();
        pool.detach(self.relay_owner());
    }

    /// The sub-pool for `key`, creating it with the factory if there is none.
    ///
    /// An existing sub-pool that was cleared through another handle is realized again.
    pub fn get_or_create_sub_pool(&self, key: &K) -> Pool<T> {
        let existing = self.shared.sub_pools.borrow().get(key).cloned();

        match existing {
            Some(pool) => {
                pool.realize();
                pool
            }
            None => self.create_sub_pool(key.clone(), None),
        }
    }

    /// The sub-pool for `key`.
    ///
    /// An existing sub-pool that was cleared through another handle is realized again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if there is no sub-pool for `key`.
    pub fn sub_pool(&self, key: &K) -> Result<Pool<T>> {
        let pool = self
            .shared
            .sub_pools
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound {
                key: format!("{key:?}"),
            })?;

        pool.realize();
        Ok(pool)
    }

    /// Acquires an instance from the sub-pool for `key`, creating the sub-pool if needed.
    ///
    /// # Errors
    ///
    /// Returns the error of the sub-pool's strategy if a new instance could not be
    /// manufactured.
    pub fn get(&self, key: &K) -> Result<T> {
        self.get_or_create_sub_pool(key).get()
    }

    /// Returns an instance to the sub-pool for `key`, creating the sub-pool if needed.
    pub fn release(&self, key: &K, obj: T) {
        self.get_or_create_sub_pool(key).release(obj);
    }

    /// Clears the sub-pool for `key` and removes it from this keyed pool.
    ///
    /// The removed sub-pool no longer relays its events to this keyed pool. Returns
    /// whether there was a sub-pool for `key`.
    pub fn clear_key(&self, key: &K) -> bool {
        let removed = self.shared.sub_pools.borrow_mut().remove(key);

        match removed {
            Some(pool) => {
                self.retire(&pool);
                true
            }
            None => false,
        }
    }

    /// Clears every sub-pool and removes all of them from this keyed pool.
    pub fn clear(&self) {
        let sub_pools = mem::take(&mut *self.shared.sub_pools.borrow_mut());

        if sub_pools.is_empty() {
            return;
        }

        tracing::debug!(
            pool = type_name::<T>(),
            key_type = type_name::<K>(),
            sub_pools = sub_pools.len(),
            "clearing keyed pool"
        );

        for pool in sub_pools.into_values() {
            self.retire(&pool);
        }
    }

    /// Whether there is a sub-pool for `key`.
    #[must_use]
    pub fn has_key(&self, key: &K) -> bool {
        self.shared.sub_pools.borrow().contains_key(key)
    }

    /// Number of sub-pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.sub_pools.borrow().len()
    }

    /// Whether there are no sub-pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.sub_pools.borrow().is_empty()
    }

    /// The keys that have a sub-pool, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.shared.sub_pools.borrow().keys().cloned().collect()
    }

    /// Registers an observer of the create transition in any sub-pool.
    pub fn on_create(&self, observer: impl Fn(&K, &T) + 'static) {
        self.observe(PoolEvent::Create, observer);
    }

    /// Registers an observer of the acquire transition in any sub-pool.
    pub fn on_get(&self, observer: impl Fn(&K, &T) + 'static) {
        self.observe(PoolEvent::Get, observer);
    }

    /// Registers an observer of the release transition in any sub-pool.
    pub fn on_release(&self, observer: impl Fn(&K, &T) + 'static) {
        self.observe(PoolEvent::Release, observer);
    }

    /// Registers an observer of the destroy transition in any sub-pool.
    pub fn on_destroy(&self, observer: impl Fn(&K, &T) + 'static) {
        self.observe(PoolEvent::Destroy, observer);
    }

    /// Registers an observer of `event` in any sub-pool, including sub-pools created
    /// before the observer was registered.
    pub fn observe(&self, event: PoolEvent, observer: impl Fn(&K, &T) + 'static) {
        self.shared.observers.add(event, Rc::new(observer));
    }

    /// Whether two handles refer to the same keyed pool.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T, K> Default for KeyedPool<T, K>
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static, K: 'static> Clone for KeyedPool<T, K> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: 'static, K: 'static> fmt::Debug for KeyedPool<T, K> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("key_type", &format_args!("{}", type_name::<K>()))
            .field("sub_pools", &self.shared.sub_pools.borrow().len())
            .field("observers", &self.shared.observers)
            .finish()
    }
}
