use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::mem;

use foldhash::{HashMap, HashMapExt};

use crate::error::Result;
use crate::{
    DefaultStrategy, Error, KeyedPool, Pool, PoolConfig, Poolable, Pooled, RegistryBuilder,
};

/// A pool held by the registry, with its concrete type erased.
trait ErasedPool {
    fn clear(&self);

    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> ErasedPool for Pool<T> {
    fn clear(&self) {
        Pool::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T, K> ErasedPool for KeyedPool<T, K>
where
    T: 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    fn clear(&self) {
        KeyedPool::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type PoolTable = HashMap<TypeId, Box<dyn ErasedPool>>;

/// Owns one pool per type and one keyed pool per type and key type.
///
/// Pools are created on first use with the strategy selected from the capabilities of the
/// type, or registered explicitly. Registering a pool where one already exists clears the
/// existing pool and replaces it, with a warning.
///
/// Every operation takes `&self`. The registry never keeps its tables borrowed while pool
/// code or observers run, so observers may use the registry, except to re-enter the pool
/// that is notifying them.
///
/// Dropping the registry clears every pool it owns.
///
/// # Example
///
/// ```rust
/// use pool_registry::Registry;
///
/// let registry = Registry::new();
///
/// let mut text = registry.get::<String>().unwrap();
/// text.push_str("reused");
/// registry.release(text);
///
/// assert!(registry.has_pool::<String>());
///
/// let labels = registry.get_keyed::<Vec<u8>, &'static str>(&"labels").unwrap();
/// registry.release_keyed(&"labels", labels);
///
/// assert!(registry.has_sub_pool::<Vec<u8>, &'static str>(&"labels"));
///
/// registry.clear();
/// assert_eq!(registry.pool_count(), 0);
/// ```
///
/// # Thread safety
///
/// The registry is single-threaded. It is neither [`Send`] nor [`Sync`].
pub struct Registry {
    label: String,
    pool_config: PoolConfig,

    pools: RefCell<PoolTable>,

    /// Keyed pools by pooled type, then by key type.
    keyed_pools: RefCell<HashMap<TypeId, PoolTable>>,
}

impl Registry {
    /// Label used by [`Registry::new()`].
    pub const DEFAULT_LABEL: &'static str = "Pooled Objects";

    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for a registry with a custom label or pool configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pool_registry::{PoolConfig, Registry};
    ///
    /// let registry = Registry::builder()
    ///     .label("particles")
    ///     .pool_config(PoolConfig::new().max_size(512))
    ///     .build();
    ///
    /// assert_eq!(registry.label(), "particles");
    /// ```
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn new_inner(label: String, pool_config: PoolConfig) -> Self {
        Self {
            label,
            pool_config,
            pools: RefCell::new(HashMap::new()),
            keyed_pools: RefCell::new(HashMap::new()),
        }
    }

    /// Name that identifies this registry in diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The sizing configuration of pools created by this registry.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        self.pool_config
    }

    fn default_pool<T: Poolable>(&self) -> Pool<T> {
        Pool::builder()
            .config(self.pool_config)
            .build(DefaultStrategy::new())
    }

    fn default_keyed_pool<T, K>(&self) -> KeyedPool<T, K>
    where
        T: Poolable,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        let config = self.pool_config;

        KeyedPool::with_factory(move |_| {
            Pool::builder()
                .config(config)
                .build(DefaultStrategy::new())
        })
    }

    /// Registers `pool` as the pool for `T` and realizes it.
    ///
    /// If a different pool is already registered for `T`, it is cleared and replaced.
    pub fn register_pool<T: 'static>(&self, pool: Pool<T>) -> Pool<T> {
        pool.realize();

        let type_id = TypeId::of::<T>();
        let previous = self.pools.borrow_mut().remove(&type_id);

        if let Some(previous) = previous {
            if downcast::<Pool<T>>(previous.as_ref()).is_some_and(|p| p.ptr_eq(&pool)) {
                self.pools.borrow_mut().insert(type_id, previous);
                return pool;
            }

            self.warn_duplicate(type_name::<T>(), None);
            previous.clear();
        }

        let displaced = self
            .pools
            .borrow_mut()
            .insert(type_id, Box::new(pool.clone()));

        // Clearing the previous pool may have run observers that registered a pool again.
        if let Some(displaced) = displaced {
            self.warn_duplicate(type_name::<T>(), None);
            displaced.clear();
        }

        tracing::debug!(
            registry = %self.label,
            pool = type_name::<T>(),
            "registered pool"
        );

        pool
    }

    /// Registers `pool` as the pool for `T`, or a new default pool if `pool` is `None`.
    ///
    /// Any pool already registered for `T` is cleared and replaced.
    pub fn create_pool<T: Poolable>(&self, pool: Option<Pool<T>>) -> Pool<T> {
        let pool = pool.unwrap_or_else(|| self.default_pool());
        self.register_pool(pool)
    }

    /// The pool for `T`, creating and registering a default pool if there is none.
    ///
    /// A registered pool that was cleared through one of its handles is realized again.
    pub fn get_pool<T: Poolable>(&self) -> Pool<T> {
        match self.lookup_pool::<T>() {
            Some(pool) => {
                pool.realize();
                pool
            }
            None => self.create_pool(None),
        }
    }

    fn lookup_pool<T: 'static>(&self) -> Option<Pool<T>> {
        self.pools
            .borrow()
            .get(&TypeId::of::<T>())
            .and_then(|pool| downcast::<Pool<T>>(pool.as_ref()))
            .cloned()
    }

    /// Acquires an instance of `T` from its pool.
    ///
    /// # Errors
    ///
    /// Returns the error of the pool's strategy if a new instance could not be manufactured.
    pub fn get<T: Poolable>(&self) -> Result<T> {
        self.get_pool::<T>().get()
    }

    /// Acquires an instance of `T` wrapped in a guard that releases it when dropped.
    ///
    /// # Errors
    ///
    /// Same as [`get()`][Self::get].
    pub fn get_pooled<T: Poolable>(&self) -> Result<Pooled<T>> {
        self.get_pool::<T>().get_pooled()
    }

    /// Returns an instance of `T` to its pool.
    pub fn release<T: Poolable>(&self, obj: T) {
        self.get_pool::<T>().release(obj);
    }

    /// Registers `pool` as the keyed pool for `T` and `K`.
    ///
    /// If a different keyed pool is already registered for `T` and `K`, it is cleared and
    /// replaced. Keyed pools for `T` with other key types are not affected.
    pub fn register_keyed_pool<T, K>(&self, pool: KeyedPool<T, K>) -> KeyedPool<T, K>
    where
        T: 'static,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        let type_id = TypeId::of::<T>();
        let key_type_id = TypeId::of::<K>();

        let previous = self
            .keyed_pools
            .borrow_mut()
            .get_mut(&type_id)
            .and_then(|by_key| by_key.remove(&key_type_id));

        if let Some(previous) = previous {
            if downcast::<KeyedPool<T, K>>(previous.as_ref()).is_some_and(|p| p.ptr_eq(&pool)) {
                self.insert_keyed(type_id, key_type_id, previous);
                return pool;
            }

            self.warn_duplicate(type_name::<T>(), Some(type_name::<K>()));
            previous.clear();
        }

        if let Some(displaced) = self.insert_keyed(type_id, key_type_id, Box::new(pool.clone())) {
            self.warn_duplicate(type_name::<T>(), Some(type_name::<K>()));
            displaced.clear();
        }

        tracing::debug!(
            registry = %self.label,
            pool = type_name::<T>(),
            key_type = type_name::<K>(),
            "registered keyed pool"
        );

        pool
    }

    fn insert_keyed(
        &self,
        type_id: TypeId,
        key_type_id: TypeId,
        pool: Box<dyn ErasedPool>,
    ) -> Option<Box<dyn ErasedPool>> {
        self.keyed_pools
            .borrow_mut()
            .entry(type_id)
            .or_default()
            .insert(key_type_id, pool)
    }

    /// Registers `pool` as the keyed pool for `T` and `K`, or a new default keyed pool if
    /// `pool` is `None`.
    pub fn create_keyed_pool<T, K>(&self, pool: Option<KeyedPool<T, K>>) -> KeyedPool<T, K>
    where
        T: Poolable,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        let pool = pool.unwrap_or_else(|| self.default_keyed_pool());
        self.register_keyed_pool(pool)
    }

    /// The keyed pool for `T` and `K`, creating and registering a default one if there
    /// is none.
    pub fn get_keyed_pool<T, K>(&self) -> KeyedPool<T, K>
    where
        T: Poolable,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.lookup_keyed_pool::<T, K>()
            .unwrap_or_else(|| self.create_keyed_pool(None))
    }

    fn lookup_keyed_pool<T, K>(&self) -> Option<KeyedPool<T, K>>
    where
        T: 'static,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.keyed_pools
            .borrow()
            .get(&TypeId::of::<T>())
            .and_then(|by_key| by_key.get(&TypeId::of::<K>()))
            .and_then(|pool| downcast::<KeyedPool<T, K>>(pool.as_ref()))
            .cloned()
    }

    /// Installs a sub-pool for `key` in the keyed pool for `T` and `K`, building a default
    /// one if `pool` is `None`. See [`KeyedPool::create_sub_pool()`].
    pub fn create_sub_pool<T, K>(&self, key: K, pool: Option<Pool<T>>) -> Pool<T>
    where
        T: Poolable,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.get_keyed_pool::<T, K>().create_sub_pool(key, pool)
    }

    /// The sub-pool for `key` in the keyed pool for `T` and `K`, creating both if needed.
    pub fn get_sub_pool<T, K>(&self, key: &K) -> Pool<T>
    where
        T: Poolable,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.get_keyed_pool::<T, K>().get_or_create_sub_pool(key)
    }

    /// Acquires an instance of `T` from the sub-pool for `key`.
    ///
    /// # Errors
    ///
    /// Returns the error of the sub-pool's strategy if a new instance could not be
    /// manufactured.
    pub fn get_keyed<T, K>(&self, key: &K) -> Result<T>
    where
        T: Poolable,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.get_sub_pool::<T, K>(key).get()
    }

    /// Returns an instance of `T` to the sub-pool for `key`.
    pub fn release_keyed<T, K>(&self, key: &K, obj: T)
    where
        T: Poolable,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.get_sub_pool::<T, K>(key).release(obj);
    }

    fn prototype_pool<T>(&self) -> KeyedPool<T, T>
    where
        T: Poolable + Clone + Eq + Hash + fmt::Debug,
    {
        self.lookup_keyed_pool::<T, T>().unwrap_or_else(|| {
            let config = self.pool_config;

            self.register_keyed_pool(KeyedPool::with_factory(move |prototype: &T| {
                Pool::builder()
                    .config(config)
                    .build(DefaultStrategy::with_prototype(prototype.clone()))
            }))
        })
    }

    /// Acquires an instance manufactured from `prototype`.
    ///
    /// Every distinct prototype has its own sub-pool in the keyed pool whose key type is
    /// `T` itself.
    ///
    /// # Errors
    ///
    /// Returns the error of the sub-pool's strategy if a new instance could not be
    /// manufactured.
    pub fn get_from_prototype<T>(&self, prototype: &T) -> Result<T>
    where
        T: Poolable + Clone + Eq + Hash + fmt::Debug,
    {
        self.prototype_pool::<T>().get(prototype)
    }

    /// Returns an instance to the sub-pool of `prototype`.
    pub fn release_to_prototype<T>(&self, prototype: &T, obj: T)
    where
        T: Poolable + Clone + Eq + Hash + fmt::Debug,
    {
        self.prototype_pool::<T>().release(prototype, obj);
    }

    /// Whether a pool is registered for `T`.
    #[must_use]
    pub fn has_pool<T: 'static>(&self) -> bool {
        self.pools.borrow().contains_key(&TypeId::of::<T>())
    }

    /// Whether a keyed pool is registered for `T` and `K`.
    #[must_use]
    pub fn has_keyed_pool<T: 'static, K: 'static>(&self) -> bool {
        self.keyed_pools
            .borrow()
            .get(&TypeId::of::<T>())
            .is_some_and(|by_key| by_key.contains_key(&TypeId::of::<K>()))
    }

    /// Whether the keyed pool for `T` and `K` has a sub-pool for `key`.
    #[must_use]
    pub fn has_sub_pool<T, K>(&self, key: &K) -> bool
    where
        T: 'static,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.lookup_keyed_pool::<T, K>()
            .is_some_and(|pool| pool.has_key(key))
    }

    /// Clears the pool for `T` and removes it from the registry.
    pub fn clear_pool<T: 'static>(&self) {
        let removed = self.pools.borrow_mut().remove(&TypeId::of::<T>());

        if let Some(pool) = removed {
            pool.clear();
        }
    }

    /// Clears the keyed pool for `T` and `K` and removes it from the registry.
    pub fn clear_keyed_pool<T: 'static, K: 'static>(&self) {
        let removed = self.remove_keyed(TypeId::of::<T>(), TypeId::of::<K>());

        if let Some(pool) = removed {
            pool.clear();
        }
    }

    fn remove_keyed(&self, type_id: TypeId, key_type_id: TypeId) -> Option<Box<dyn ErasedPool>> {
        let mut keyed_pools = self.keyed_pools.borrow_mut();

        let by_key = keyed_pools.get_mut(&type_id)?;
        let removed = by_key.remove(&key_type_id);

        if by_key.is_empty() {
            keyed_pools.remove(&type_id);
        }

        removed
    }

    /// Clears the sub-pool for `key` and removes it from the keyed pool for `T` and `K`.
    ///
    /// When the last sub-pool is removed, the keyed pool is removed from the registry.
    pub fn clear_sub_pool<T, K>(&self, key: &K)
    where
        T: 'static,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        let Some(pool) = self.lookup_keyed_pool::<T, K>() else {
            return;
        };

        if !pool.clear_key(key) {
            return;
        }

        // Observers may have replaced the keyed pool while the sub-pool was cleared.
        let still_registered = self
            .lookup_keyed_pool::<T, K>()
            .is_some_and(|current| current.ptr_eq(&pool));

        if pool.is_empty() && still_registered {
            self.remove_keyed(TypeId::of::<T>(), TypeId::of::<K>());
        }
    }

    /// Clears every pool and removes all of them from the registry.
    ///
    /// Calling this on an empty registry has no effect.
    pub fn clear(&self) {
        let pools = mem::take(&mut *self.pools.borrow_mut());
        let keyed_pools = mem::take(&mut *self.keyed_pools.borrow_mut());

        if pools.is_empty() && keyed_pools.is_empty() {
            return;
        }

        tracing::debug!(
            registry = %self.label,
            pools = pools.len(),
            keyed_pools = keyed_pools.values().map(HashMap::len).sum::<usize>(),
            "clearing registry"
        );

        for pool in pools.into_values() {
            pool.clear();
        }

        for pool in keyed_pools.into_values().flat_map(HashMap::into_values) {
            pool.clear();
        }
    }

    /// Number of pools and keyed pools registered.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        let keyed = self
            .keyed_pools
            .borrow()
            .values()
            .map(HashMap::len)
            .sum::<usize>();

        self.pools
            .borrow()
            .len()
            .checked_add(keyed)
            .expect("pool count cannot overflow")
    }

    fn warn_duplicate(&self, type_name: &'static str, key_type_name: Option<&'static str>) {
        let error = Error::DuplicateRegistration {
            type_name,
            key_type_name,
        };

        tracing::warn!(registry = %self.label, "{error}");
    }
}

fn downcast<P: 'static>(pool: &dyn ErasedPool) -> Option<&P> {
    pool.as_any().downcast_ref::<P>()
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Registry {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("label", &self.label)
            .field("pool_config", &self.pool_config)
            .field("pool_count", &self.pool_count())
            .finish()
    }
}
