//! Manufacturing of fresh instances for pools.

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::mem;

use foldhash::{HashMap, HashMapExt};

use crate::capabilities::HostFns;
use crate::error::Result;
use crate::{Capabilities, Error, Poolable};

/// A prototype cached for a type whose pool was not given one explicitly.
struct CachedPrototype {
    value: Box<dyn Any>,
    retire: fn(Box<dyn Any>),
}

thread_local! {
    static PROTOTYPES: RefCell<HashMap<TypeId, CachedPrototype>> = RefCell::new(HashMap::new());
}

/// Manufactures a fresh instance of `T`, optionally from a prototype.
///
/// Without a prototype, the first matching strategy is used:
///
/// 1. If `T` is [`Reusable`][crate::Reusable], a cached prototype of `T` creates the
///    instance. On first use the prototype is built as a bare instance (attached through the
///    host if `T` is a host object, default-constructed otherwise) and cached.
/// 2. If `T` is a [`HostObject`][crate::HostObject], a bare host container is attached.
/// 3. Otherwise `T` is default-constructed.
///
/// With a prototype, a [`Reusable`][crate::Reusable] prototype creates the instance, while a
/// [`HostObject`][crate::HostObject] prototype is duplicated by the host. The prototype is
/// deactivated for the duration of the duplication so the template never observes
/// activation side effects, and its previous state is restored afterwards.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCreationKind`] if no strategy applies to `T`.
///
/// # Example
///
/// ```rust
/// let text = pool_registry::manufacture::<String>(None).unwrap();
/// assert!(text.is_empty());
/// ```
pub fn manufacture<T: Poolable>(prototype: Option<&mut T>) -> Result<T> {
    manufacture_with(&T::capabilities(), prototype)
}

pub(crate) fn manufacture_with<T: Poolable>(
    capabilities: &Capabilities<T>,
    prototype: Option<&mut T>,
) -> Result<T> {
    match prototype {
        Some(prototype) => from_prototype(capabilities, prototype),
        None => without_prototype(capabilities),
    }
}

/// Default-constructs `T`, the only creation path of the plain strategy.
pub(crate) fn construct<T>(capabilities: &Capabilities<T>) -> Result<T> {
    let construct = capabilities
        .construct()
        .ok_or_else(|| unsupported::<T>("the type has no default constructor"))?;

    Ok(construct())
}

fn without_prototype<T: Poolable>(capabilities: &Capabilities<T>) -> Result<T> {
    if let Some(lifecycle) = capabilities.lifecycle() {
        // The prototype is taken out of the cache while `create` runs so that
        // a `create` implementation may itself manufacture other pooled types.
        let prototype = match take_cached::<T>() {
            Some(prototype) => prototype,
            None => {
                tracing::trace!(
                    prototype = type_name::<T>(),
                    "caching bare prototype for self-lifecycle type"
                );
                bare_prototype(capabilities)?
            }
        };

        let obj = (lifecycle.create)(&prototype);
        store_cached(prototype);
        return Ok(obj);
    }

    if let Some(host) = capabilities.host() {
        return Ok((host.attach_new)());
    }

    construct(capabilities)
}

fn from_prototype<T>(capabilities: &Capabilities<T>, prototype: &mut T) -> Result<T> {
    if let Some(lifecycle) = capabilities.lifecycle() {
        return Ok((lifecycle.create)(prototype));
    }

    if let Some(host) = capabilities.host() {
        return Ok(duplicate_inactive(host, prototype));
    }

    Err(unsupported::<T>(
        "the prototype is neither reusable nor a host object",
    ))
}

fn bare_prototype<T>(capabilities: &Capabilities<T>) -> Result<T> {
    if let Some(host) = capabilities.host() {
        let mut prototype = (host.attach_new)();
        (host.set_active)(&mut prototype, false);
        return Ok(prototype);
    }

    capabilities
        .construct()
        .map(|construct| construct())
        .ok_or_else(|| unsupported::<T>("no bare prototype can be constructed for the type"))
}

fn duplicate_inactive<T>(host: HostFns<T>, prototype: &mut T) -> T {
    let was_active = (host.is_active)(prototype);

    (host.set_active)(prototype, false);
    let obj = (host.duplicate)(prototype);
    (host.set_active)(prototype, was_active);

    obj
}

fn unsupported<T>(reason: &'static str) -> Error {
    Error::UnsupportedCreationKind {
        type_name: type_name::<T>(),
        reason,
    }
}

fn take_cached<T: 'static>() -> Option<T> {
    let cached = PROTOTYPES.with_borrow_mut(|prototypes| prototypes.remove(&TypeId::of::<T>()))?;

    cached.value.downcast::<T>().ok().map(|prototype| *prototype)
}

fn store_cached<T: Poolable>(prototype: T) {
    let displaced = PROTOTYPES.with_borrow_mut(|prototypes| {
        prototypes.insert(
            TypeId::of::<T>(),
            CachedPrototype {
                value: Box::new(prototype),
                retire: retire::<T>,
            },
        )
    });

    // A `create` implementation that manufactures its own type caches a prototype
    // of its own before the outer call stores the one it took out.
    if let Some(displaced) = displaced {
        (displaced.retire)(displaced.value);
    }
}

fn retire<T: Poolable>(value: Box<dyn Any>) {
    let Ok(mut prototype) = value.downcast::<T>() else {
        return;
    };

    let capabilities = T::capabilities();

    if let Some(dispose) = capabilities.dispose() {
        dispose(&mut prototype);
    } else if let Some(host) = capabilities.host() {
        (host.destroy)(&mut prototype);
    }
}

/// Whether a prototype of `T` has been cached by [`manufacture()`].
#[must_use]
pub fn has_cached_prototype<T: 'static>() -> bool {
    PROTOTYPES.with_borrow(|prototypes| prototypes.contains_key(&TypeId::of::<T>()))
}

/// Discards every cached prototype on the current thread.
///
/// Cached prototypes are retired through their disposer if they have one, otherwise
/// through the host's destroy primitive if they are host objects.
///
/// This is part of the bootstrap sequence performed by [`global::bootstrap()`][1].
///
/// [1]: crate::global::bootstrap
pub fn clear_prototype_cache() {
    let prototypes = PROTOTYPES.with_borrow_mut(mem::take);

    for cached in prototypes.into_values() {
        (cached.retire)(cached.value);
    }
}
