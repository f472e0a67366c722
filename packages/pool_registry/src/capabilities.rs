use std::collections::VecDeque;
use std::fmt;

/// The self-lifecycle capability: a type that manages its own reuse.
///
/// A pool that holds a `Reusable` type delegates every transition to the instance
/// itself. New instances are produced by calling [`create()`][Self::create] on a
/// prototype, which is either supplied by the caller or cached on first use.
///
/// # Example
///
/// ```rust
/// use pool_registry::{Capabilities, Poolable, Registry, Reusable};
///
/// #[derive(Default)]
/// struct Projectile {
///     live: bool,
/// }
///
/// impl Reusable for Projectile {
///     fn create(&self) -> Self {
///         Self::default()
///     }
///
///     fn on_get(&mut self) {
///         self.live = true;
///     }
///
///     fn on_release(&mut self) {
///         self.live = false;
///     }
/// }
///
/// impl Poolable for Projectile {
///     fn capabilities() -> Capabilities<Self> {
///         Capabilities::new().constructible().reusable()
///     }
/// }
///
/// let registry = Registry::new();
/// let projectile = registry.get::<Projectile>().unwrap();
/// assert!(projectile.live);
/// ```
pub trait Reusable: Sized {
    /// Manufactures a fresh instance, using `self` as the template.
    fn create(&self) -> Self;

    /// Called when the instance is handed out by a pool.
    fn on_get(&mut self) {}

    /// Called when the instance is returned to a pool.
    fn on_release(&mut self) {}

    /// Called when the pool discards the instance for good.
    fn on_destroy(&mut self) {}
}

/// The host-native composable capability: an object that belongs to the native object
/// model of the host runtime.
///
/// Host objects can be activated and deactivated, duplicated from a template and destroyed
/// through the host's own primitives. All of these are assumed to be synchronous.
pub trait HostObject: Sized {
    /// Instantiates a bare host container with this behavior attached to it.
    fn attach_new() -> Self;

    /// Duplicates `self` through the host's native instantiation primitive.
    fn duplicate(&self) -> Self;

    /// Marks the object as active or inactive in the host runtime.
    fn set_active(&mut self, active: bool);

    /// Whether the object is currently active in the host runtime.
    fn is_active(&self) -> bool;

    /// Destroys the object through the host's native destroy primitive.
    fn destroy(&mut self);
}

/// The disposer capability: an object that must release resources when it is discarded.
pub trait Dispose {
    /// Releases the resources held by the object.
    fn dispose(&mut self);
}

/// Opt-in trait for types that can be pooled with the default strategy selection.
///
/// The implementation declares which capabilities the type exposes. The pool uses this
/// table to choose a [`StrategyKind`] and to manufacture, activate and destroy instances.
///
/// # Example
///
/// ```rust
/// use pool_registry::{Capabilities, Poolable, StrategyKind};
///
/// #[derive(Default)]
/// struct Scratch {
///     bytes: Vec<u8>,
/// }
///
/// impl Poolable for Scratch {
///     fn capabilities() -> Capabilities<Self> {
///         Capabilities::new().constructible()
///     }
/// }
///
/// assert_eq!(
///     StrategyKind::select(&Scratch::capabilities()),
///     StrategyKind::Plain
/// );
/// ```
pub trait Poolable: Sized + 'static {
    /// Returns the capability table of the type.
    fn capabilities() -> Capabilities<Self>;
}

/// The pooling strategy chosen for a type, based on its capabilities.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum StrategyKind {
    /// The type implements [`Reusable`] and manages its own transitions.
    SelfLifecycle,

    /// The type is a [`HostObject`] without the self-lifecycle capability. Instances are
    /// activated when acquired and deactivated when released.
    HostNative,

    /// The type exposes neither capability. Instances are default-constructed and
    /// destroyed through their disposer, if any.
    Plain,
}

impl StrategyKind {
    /// Selects the strategy for a capability table.
    ///
    /// This is a pure function: the same table always produces the same strategy.
    #[must_use]
    pub fn select<T>(capabilities: &Capabilities<T>) -> Self {
        if capabilities.lifecycle.is_some() {
            Self::SelfLifecycle
        } else if capabilities.host.is_some() {
            Self::HostNative
        } else {
            Self::Plain
        }
    }
}

/// Hooks of the self-lifecycle capability, resolved for a concrete type.
pub(crate) struct LifecycleFns<T> {
    pub(crate) create: fn(&T) -> T,
    pub(crate) on_get: fn(&mut T),
    pub(crate) on_release: fn(&mut T),
    pub(crate) on_destroy: fn(&mut T),
}

impl<T> Clone for LifecycleFns<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LifecycleFns<T> {}

/// Primitives of the host object model, resolved for a concrete type.
pub(crate) struct HostFns<T> {
    pub(crate) attach_new: fn() -> T,
    pub(crate) duplicate: fn(&T) -> T,
    pub(crate) set_active: fn(&mut T, bool),
    pub(crate) is_active: fn(&T) -> bool,
    pub(crate) destroy: fn(&mut T),
}

impl<T> Clone for HostFns<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for HostFns<T> {}

/// The capabilities a type exposes to the pooling machinery.
///
/// Each builder method is only available when the type implements the matching trait,
/// so a table can never claim a capability the type does not have.
///
/// # Example
///
/// ```rust
/// use pool_registry::{Capabilities, Dispose, StrategyKind};
///
/// #[derive(Default)]
/// struct Connection;
///
/// impl Dispose for Connection {
///     fn dispose(&mut self) {}
/// }
///
/// let capabilities = Capabilities::<Connection>::new()
///     .constructible()
///     .disposable();
///
/// assert!(capabilities.is_constructible());
/// assert!(capabilities.is_disposable());
/// assert_eq!(StrategyKind::select(&capabilities), StrategyKind::Plain);
/// ```
#[must_use]
pub struct Capabilities<T> {
    construct: Option<fn() -> T>,
    lifecycle: Option<LifecycleFns<T>>,
    host: Option<HostFns<T>>,
    dispose: Option<fn(&mut T)>,
}

impl<T> Capabilities<T> {
    /// Creates an empty table. A type with an empty table cannot be manufactured.
    pub const fn new() -> Self {
        Self {
            construct: None,
            lifecycle: None,
            host: None,
            dispose: None,
        }
    }

    /// Declares that the type can be default-constructed.
    pub fn constructible(mut self) -> Self
    where
        T: Default,
    {
        self.construct = Some(T::default);
        self
    }

    /// Declares the self-lifecycle capability.
    pub fn reusable(mut self) -> Self
    where
        T: Reusable,
    {
        self.lifecycle = Some(LifecycleFns {
            create: T::create,
            on_get: T::on_get,
            on_release: T::on_release,
            on_destroy: T::on_destroy,
        });
        self
    }

    /// Declares that the type is a host-native composable.
    pub fn host_object(mut self) -> Self
    where
        T: HostObject,
    {
        self.host = Some(HostFns {
            attach_new: T::attach_new,
            duplicate: T::duplicate,
            set_active: T::set_active,
            is_active: T::is_active,
            destroy: T::destroy,
        });
        self
    }

    /// Declares the disposer capability.
    pub fn disposable(mut self) -> Self
    where
        T: Dispose,
    {
        self.dispose = Some(T::dispose);
        self
    }

    /// Whether the type can be default-constructed.
    #[must_use]
    pub fn is_constructible(&self) -> bool {
        self.construct.is_some()
    }

    /// Whether the type exposes the self-lifecycle capability.
    #[must_use]
    pub fn is_reusable(&self) -> bool {
        self.lifecycle.is_some()
    }

    /// Whether the type is a host-native composable.
    #[must_use]
    pub fn is_host_object(&self) -> bool {
        self.host.is_some()
    }

    /// Whether the type exposes the disposer capability.
    #[must_use]
    pub fn is_disposable(&self) -> bool {
        self.dispose.is_some()
    }

    pub(crate) fn construct(&self) -> Option<fn() -> T> {
        self.construct
    }

    pub(crate) fn lifecycle(&self) -> Option<LifecycleFns<T>> {
        self.lifecycle
    }

    pub(crate) fn host(&self) -> Option<HostFns<T>> {
        self.host
    }

    pub(crate) fn dispose(&self) -> Option<fn(&mut T)> {
        self.dispose
    }
}

impl<T> Default for Capabilities<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Capabilities<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Capabilities<T> {}

impl<T> fmt::Debug for Capabilities<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("constructible", &self.is_constructible())
            .field("reusable", &self.is_reusable())
            .field("host_object", &self.is_host_object())
            .field("disposable", &self.is_disposable())
            .finish()
    }
}

impl Poolable for String {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible()
    }
}

impl<T: 'static> Poolable for Vec<T> {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible()
    }
}

impl<T: 'static> Poolable for VecDeque<T> {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible()
    }
}
