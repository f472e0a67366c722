use std::fmt;
use std::mem;

use crate::PoolConfig;
use crate::error::Result;

type CreateFn<T> = Box<dyn FnMut() -> Result<T>>;
type TransitionFn<T> = Box<dyn FnMut(&mut T)>;
type DestroyFn<T> = Box<dyn FnMut(T)>;

/// Storage for idle instances of a single type.
///
/// The storage keeps released instances on a stack and hands them out again on the next
/// [`get()`][Self::get]. It knows nothing about the type it stores: the four callbacks supplied
/// when it is built decide how instances are created, acquired, released and destroyed.
///
/// Instances that are handed out are owned by the caller. The storage only tracks how many
/// instances it has created so that it can report how many are currently in use.
///
/// Dropping the storage destroys every idle instance, exactly like [`clear()`][Self::clear].
///
/// # Example
///
/// ```rust
/// use pool_registry::ObjectPool;
///
/// let mut storage = ObjectPool::builder(|| Ok(Vec::<u8>::with_capacity(1024)))
///     .on_release(|buffer| buffer.clear())
///     .build();
///
/// let mut buffer = storage.get().unwrap();
/// buffer.extend_from_slice(b"hello");
/// storage.release(buffer);
///
/// assert_eq!(storage.count_inactive(), 1);
///
/// let buffer = storage.get().unwrap();
/// assert!(buffer.is_empty());
/// assert!(buffer.capacity() >= 1024);
/// ```
///
/// # Thread safety
///
/// The callbacks are not required to be thread-safe, so this type is neither [`Send`]
/// nor [`Sync`].
pub struct ObjectPool<T> {
    idle: Vec<T>,

    /// Instances created by this storage and not yet destroyed, whether idle or in use.
    count_all: usize,

    max_size: usize,

    create: CreateFn<T>,
    on_get: TransitionFn<T>,
    on_release: TransitionFn<T>,
    on_destroy: DestroyFn<T>,
}

impl<T> ObjectPool<T> {
    /// Creates a builder for storage that manufactures new instances with `create`.
    pub fn builder<F>(create: F) -> ObjectPoolBuilder<T>
    where
        F: FnMut() -> Result<T> + 'static,
    {
        ObjectPoolBuilder::new(Box::new(create))
    }

    /// Takes an idle instance, or creates a new one if none is idle, and runs the
    /// acquire callback on it.
    ///
    /// # Errors
    ///
    /// Returns the error of the create callback if a new instance could not be created.
    pub fn get(&mut self) -> Result<T> {
        let mut obj = match self.idle.pop() {
            Some(obj) => obj,
            None => {
                let obj = (self.create)()?;
                self.count_all = self
                    .count_all
                    .checked_add(1)
                    .expect("instance count cannot overflow");
                obj
            }
        };

        (self.on_get)(&mut obj);
        Ok(obj)
    }

    /// Runs the release callback on an instance and keeps it for reuse.
    ///
    /// If the storage already holds `max_size` idle instances, the released instance is
    /// destroyed instead.
    pub fn release(&mut self, mut obj: T) {
        (self.on_release)(&mut obj);

        if self.idle.len() < self.max_size {
            self.idle.push(obj);
        } else {
            self.count_all = self.count_all.saturating_sub(1);
            (self.on_destroy)(obj);
        }
    }

    /// Destroys every idle instance.
    ///
    /// Instances that are currently in use are not affected.
    pub fn clear(&mut self) {
        let idle = mem::take(&mut self.idle);
        self.count_all = self.count_all.saturating_sub(idle.len());

        for obj in idle {
            (self.on_destroy)(obj);
        }
    }

    /// Number of instances created by this storage that have not been destroyed.
    #[must_use]
    pub fn count_all(&self) -> usize {
        self.count_all
    }

    /// Number of instances currently handed out.
    #[must_use]
    pub fn count_active(&self) -> usize {
        self.count_all.saturating_sub(self.idle.len())
    }

    /// Number of idle instances waiting for reuse.
    #[must_use]
    pub fn count_inactive(&self) -> usize {
        self.idle.len()
    }
}

impl<T> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("count_all", &self.count_all)
            .field("count_inactive", &self.idle.len())
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

/// Builder for creating an instance of [`ObjectPool`].
///
/// The create callback is mandatory and is supplied to [`ObjectPool::builder()`]; the
/// transition callbacks and the sizing configuration are optional.
///
/// # Examples
///
/// ```
/// use pool_registry::{ObjectPool, PoolConfig};
///
/// let storage = ObjectPool::builder(|| Ok(String::new()))
///     .on_release(String::clear)
///     .config(PoolConfig::new().max_size(16))
///     .build();
///
/// assert_eq!(storage.count_all(), 0);
/// ```
#[must_use]
pub struct ObjectPoolBuilder<T> {
    config: PoolConfig,
    create: CreateFn<T>,
    on_get: Option<TransitionFn<T>>,
    on_release: Option<TransitionFn<T>>,
    on_destroy: Option<DestroyFn<T>>,
}

impl<T> ObjectPoolBuilder<T> {
    fn new(create: CreateFn<T>) -> Self {
        Self {
            config: PoolConfig::default(),
            create,
            on_get: None,
            on_release: None,
            on_destroy: None,
        }
    }

    /// Sets the sizing configuration of the storage.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the callback that runs every time an instance is handed out.
    pub fn on_get<F>(mut self, on_get: F) -> Self
    where
        F: FnMut(&mut T) + 'static,
    {
        self.on_get = Some(Box::new(on_get));
        self
    }

    /// Sets the callback that runs every time an instance is returned.
    pub fn on_release<F>(mut self, on_release: F) -> Self
    where
        F: FnMut(&mut T) + 'static,
    {
        self.on_release = Some(Box::new(on_release));
        self
    }

    /// Sets the callback that receives every instance the storage discards.
    pub fn on_destroy<F>(mut self, on_destroy: F) -> Self
    where
        F: FnMut(T) + 'static,
    {
        self.on_destroy = Some(Box::new(on_destroy));
        self
    }

    /// Builds the storage.
    #[must_use]
    pub fn build(self) -> ObjectPool<T>
    where
        T: 'static,
    {
        ObjectPool {
            idle: Vec::with_capacity(self.config.capacity()),
            count_all: 0,
            max_size: self.config.limit(),
            create: self.create,
            on_get: self.on_get.unwrap_or_else(|| Box::new(|_: &mut T| {})),
            on_release: self.on_release.unwrap_or_else(|| Box::new(|_: &mut T| {})),
            on_destroy: self.on_destroy.unwrap_or_else(|| Box::new(drop)),
        }
    }
}

impl<T> fmt::Debug for ObjectPoolBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPoolBuilder")
            .field("config", &self.config)
            .field("on_get", &self.on_get.is_some())
            .field("on_release", &self.on_release.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .finish_non_exhaustive()
    }
}
