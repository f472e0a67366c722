use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::Pool;

/// An instance acquired from a [`Pool`] that is released back to the pool when dropped.
///
/// # Example
///
/// ```rust
/// use pool_registry::Pool;
///
/// let pool = Pool::<Vec<u32>>::new();
/// pool.realize();
///
/// {
///     let mut numbers = pool.get_pooled().unwrap();
///     numbers.push(1);
/// }
///
/// assert_eq!(pool.count_inactive(), 1);
/// ```
pub struct Pooled<T: 'static> {
    pool: Pool<T>,

    /// Always `Some` until the guard is consumed or dropped.
    value: Option<T>,
}

impl<T: 'static> Pooled<T> {
    pub(crate) fn new(pool: Pool<T>, value: T) -> Self {
        Self {
            pool,
            value: Some(value),
        }
    }

    /// Takes the instance out of the guard. It is no longer released automatically.
    #[must_use]
    pub fn into_inner(mut self) -> T {
        self.value
            .take()
            .expect("value is present until the guard is consumed")
    }

    /// The pool the instance is released to.
    #[must_use]
    pub fn pool(&self) -> &Pool<T> {
        &self.pool
    }
}

impl<T: 'static> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value
            .as_ref()
            .expect("value is present until the guard is consumed")
    }
}

impl<T: 'static> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value
            .as_mut()
            .expect("value is present until the guard is consumed")
    }
}

impl<T: 'static> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Pooled<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
