use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{Pool, PoolConfig, PoolStrategy};

/// Builder for creating an instance of [`Pool`].
///
/// You only need to use this builder if you want to customize the sizing of the pool.
/// The default configuration used by [`Pool::new()`] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use pool_registry::{DefaultStrategy, Pool};
///
/// let pool = Pool::<String>::builder()
///     .default_capacity(4)
///     .max_size(64)
///     .build(DefaultStrategy::new());
///
/// pool.realize();
/// assert!(pool.is_realized());
/// ```
#[must_use]
pub struct PoolBuilder<T> {
    config: PoolConfig,

    _item: PhantomData<T>,
}

impl<T: 'static> PoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            config: PoolConfig::default(),
            _item: PhantomData,
        }
    }

    /// Sets the maximum number of idle instances the pool keeps. Instances released
    /// while the pool is full are destroyed.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.config = self.config.max_size(max_size);
        self
    }

    /// Sets the number of idle slots reserved when the pool is realized.
    pub fn default_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.default_capacity(capacity);
        self
    }

    /// Replaces the whole sizing configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the pool with the specified configuration and strategy.
    ///
    /// The pool is not realized yet.
    #[must_use]
    pub fn build<S>(self, strategy: S) -> Pool<T>
    where
        S: PoolStrategy<T> + 'static,
    {
        Pool::new_inner(Box::new(strategy), self.config)
    }
}

impl<T> fmt::Debug for PoolBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("config", &self.config)
            .finish()
    }
}
