//! A lazily created registry shared by all code on the current thread.
//!
//! Code that does not want to own a [`Registry`] can use the free functions of this module,
//! which forward to the shared instance. The instance is created with the label
//! [`DEFAULT_LABEL`] on first use, or can be supplied up front with [`configure()`].
//!
//! The host runtime calls [`bootstrap()`] when it reloads, which clears every pool and the
//! prototype cache and resets the shared instance, so the next access starts from scratch.
//!
//! # Example
//!
//! ```rust
//! use pool_registry::global;
//!
//! let text = global::get::<String>().unwrap();
//! global::release(text);
//!
//! assert!(global::has_pool::<String>());
//!
//! global::teardown();
//! assert!(!global::is_configured());
//! ```
//!
//! # Thread safety
//!
//! Registries are single-threaded, so each thread has its own shared instance.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::error::Result;
use crate::{KeyedPool, Pool, Poolable, Pooled, Registry, clear_prototype_cache};

/// Label of the shared registry when it is created on first use.
pub const DEFAULT_LABEL: &str = "Global Object Pooler";

thread_local! {
    static INSTANCE: RefCell<Option<Rc<Registry>>> = const { RefCell::new(None) };
}

/// The shared registry, created with the default configuration if there is none.
#[must_use]
pub fn registry() -> Rc<Registry> {
    if let Some(registry) = INSTANCE.with_borrow(Clone::clone) {
        return registry;
    }

    let registry = Rc::new(Registry::builder().label(DEFAULT_LABEL).build());
    INSTANCE.with_borrow_mut(|instance| *instance = Some(Rc::clone(&registry)));

    registry
}

/// Installs `registry` as the shared registry.
///
/// If a shared registry already exists, it is cleared and replaced, with a warning.
pub fn configure(registry: Registry) {
    let previous = INSTANCE.with_borrow_mut(|instance| instance.replace(Rc::new(registry)));

    if let Some(previous) = previous {
        tracing::warn!(
            registry = previous.label(),
            "global registry is already configured, reconfiguring clears all of its pools"
        );
        previous.clear();
    }
}

/// Whether the shared registry currently exists.
#[must_use]
pub fn is_configured() -> bool {
    INSTANCE.with_borrow(Option::is_some)
}

/// Clears the shared registry and resets it, so the next access creates a new one.
///
/// Calling this when there is no shared registry has no effect.
pub fn teardown() {
    let previous = INSTANCE.with_borrow_mut(Option::take);

    if let Some(previous) = previous {
        tracing::debug!(registry = previous.label(), "tearing down global registry");
        previous.clear();
    }
}

/// Resets all process-wide pooling state: the shared registry and the prototype cache.
///
/// This is the hook for the host runtime to call when it reloads.
pub fn bootstrap() {
    teardown();
    clear_prototype_cache();
}

/// See [`Registry::register_pool()`].
pub fn register_pool<T: 'static>(pool: Pool<T>) -> Pool<T> {
    registry().register_pool(pool)
}

/// See [`Registry::create_pool()`].
pub fn create_pool<T: Poolable>(pool: Option<Pool<T>>) -> Pool<T> {
    registry().create_pool(pool)
}

/// See [`Registry::get_pool()`].
pub fn get_pool<T: Poolable>() -> Pool<T> {
    registry().get_pool()
}

/// See [`Registry::get()`].
///
/// # Errors
///
/// Same as [`Registry::get()`].
pub fn get<T: Poolable>() -> Result<T> {
    registry().get()
}

/// See [`Registry::get_pooled()`].
///
/// # Errors
///
/// Same as [`Registry::get_pooled()`].
pub fn get_pooled<T: Poolable>() -> Result<Pooled<T>> {
    registry().get_pooled()
}

/// See [`Registry::release()`].
pub fn release<T: Poolable>(obj: T) {
    registry().release(obj);
}

/// See [`Registry::register_keyed_pool()`].
pub fn register_keyed_pool<T, K>(pool: KeyedPool<T, K>) -> KeyedPool<T, K>
where
    T: 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().register_keyed_pool(pool)
}

/// See [`Registry::create_keyed_pool()`].
pub fn create_keyed_pool<T, K>(pool: Option<KeyedPool<T, K>>) -> KeyedPool<T, K>
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().create_keyed_pool(pool)
}

/// See [`Registry::get_keyed_pool()`].
pub fn get_keyed_pool<T, K>() -> KeyedPool<T, K>
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().get_keyed_pool()
}

/// See [`Registry::create_sub_pool()`].
pub fn create_sub_pool<T, K>(key: K, pool: Option<Pool<T>>) -> Pool<T>
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().create_sub_pool(key, pool)
}

/// See [`Registry::get_sub_pool()`].
pub fn get_sub_pool<T, K>(key: &K) -> Pool<T>
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().get_sub_pool(key)
}

/// See [`Registry::get_keyed()`].
///
/// # Errors
///
/// Same as [`Registry::get_keyed()`].
pub fn get_keyed<T, K>(key: &K) -> Result<T>
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().get_keyed(key)
}

/// See [`Registry::release_keyed()`].
pub fn release_keyed<T, K>(key: &K, obj: T)
where
    T: Poolable,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().release_keyed(key, obj);
}

/// See [`Registry::get_from_prototype()`].
///
/// # Errors
///
/// Same as [`Registry::get_from_prototype()`].
pub fn get_from_prototype<T>(prototype: &T) -> Result<T>
where
    T: Poolable + Clone + Eq + Hash + fmt::Debug,
{
    registry().get_from_prototype(prototype)
}

/// See [`Registry::release_to_prototype()`].
pub fn release_to_prototype<T>(prototype: &T, obj: T)
where
    T: Poolable + Clone + Eq + Hash + fmt::Debug,
{
    registry().release_to_prototype(prototype, obj);
}

/// See [`Registry::has_pool()`].
#[must_use]
pub fn has_pool<T: 'static>() -> bool {
    registry().has_pool::<T>()
}

/// See [`Registry::has_keyed_pool()`].
#[must_use]
pub fn has_keyed_pool<T: 'static, K: 'static>() -> bool {
    registry().has_keyed_pool::<T, K>()
}

/// See [`Registry::has_sub_pool()`].
#[must_use]
pub fn has_sub_pool<T, K>(key: &K) -> bool
where
    T: 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().has_sub_pool::<T, K>(key)
}

/// See [`Registry::clear_pool()`].
pub fn clear_pool<T: 'static>() {
    registry().clear_pool::<T>();
}

/// See [`Registry::clear_keyed_pool()`].
pub fn clear_keyed_pool<T: 'static, K: 'static>() {
    registry().clear_keyed_pool::<T, K>();
}

/// See [`Registry::clear_sub_pool()`].
pub fn clear_sub_pool<T, K>(key: &K)
where
    T: 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    registry().clear_sub_pool::<T, K>(key);
}

/// See [`Registry::clear()`].
pub fn clear() {
    registry().clear();
}
