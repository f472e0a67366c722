use std::any::type_name;
use std::fmt;

use crate::capabilities::HostFns;
use crate::error::Result;
use crate::{Capabilities, Poolable, StrategyKind, creator};

/// The lifecycle contract that every pool strategy implements.
///
/// A [`Pool`][crate::Pool] calls these methods at each transition of an instance, before
/// notifying its observers of the same transition:
///
/// * [`create_object()`][Self::create_object] when the pool needs a new instance,
/// * [`on_get_object()`][Self::on_get_object] when an instance is handed out,
/// * [`on_release_object()`][Self::on_release_object] when an instance is returned,
/// * [`on_destroy_object()`][Self::on_destroy_object] when an instance is discarded.
///
/// Most types are served by [`DefaultStrategy`], which is selected from the capabilities of
/// the type. Implement this trait to customize reuse behavior for a type without touching
/// the type itself.
///
/// # Example
///
/// ```rust
/// use pool_registry::{Pool, PoolStrategy};
///
/// struct ZeroedBuffers;
///
/// impl PoolStrategy<Vec<u8>> for ZeroedBuffers {
///     fn create_object(&mut self) -> Result<Vec<u8>, pool_registry::Error> {
///         Ok(vec![0; 64])
///     }
///
///     fn on_get_object(&mut self, _obj: &mut Vec<u8>) {}
///
///     fn on_release_object(&mut self, obj: &mut Vec<u8>) {
///         obj.fill(0);
///     }
///
///     fn on_destroy_object(&mut self, _obj: &mut Vec<u8>) {}
/// }
///
/// let pool = Pool::with_strategy(ZeroedBuffers);
/// pool.realize();
///
/// let mut buffer = pool.get().unwrap();
/// buffer[0] = 42;
/// pool.release(buffer);
///
/// assert_eq!(pool.get().unwrap()[0], 0);
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait PoolStrategy<T: 'static> {
    /// Manufactures a new instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance cannot be manufactured. The error is propagated to
    /// the caller of [`Pool::get()`][crate::Pool::get].
    fn create_object(&mut self) -> Result<T>;

    /// Prepares an instance that is being handed out.
    fn on_get_object(&mut self, obj: &mut T);

    /// Prepares an instance that is being returned.
    fn on_release_object(&mut self, obj: &mut T);

    /// Tears down an instance that is being discarded. The instance is dropped afterwards.
    fn on_destroy_object(&mut self, obj: &mut T);
}

/// The strategy chosen for a type from its [capabilities][Capabilities].
///
/// The strategy kind is selected once, when the strategy is created, and never changes:
///
/// | Kind | Create | Get / release | Destroy |
/// |---|---|---|---|
/// | [`SelfLifecycle`][StrategyKind::SelfLifecycle] | the prototype's `create()` | the instance's hooks | the instance's `on_destroy()` |
/// | [`HostNative`][StrategyKind::HostNative] | attach or duplicate the prototype | activate / deactivate | disposer, else host destroy |
/// | [`Plain`][StrategyKind::Plain] | default constructor | nothing | disposer, else nothing |
///
/// # Example
///
/// ```rust
/// use pool_registry::{DefaultStrategy, StrategyKind};
///
/// let strategy = DefaultStrategy::<String>::new();
/// assert_eq!(strategy.kind(), StrategyKind::Plain);
/// ```
pub struct DefaultStrategy<T> {
    kind: StrategyKind,
    capabilities: Capabilities<T>,

    /// Template for new instances. Never set for the plain strategy.
    prototype: Option<T>,
}

impl<T: Poolable> DefaultStrategy<T> {
    /// Creates the strategy selected by the capabilities of `T`.
    #[must_use]
    pub fn new() -> Self {
        let capabilities = T::capabilities();

        Self {
            kind: StrategyKind::select(&capabilities),
            capabilities,
            prototype: None,
        }
    }

    /// Creates the strategy selected by the capabilities of `T`, manufacturing new instances
    /// from `prototype`.
    ///
    /// The plain strategy does not use prototypes. If `T` selects it, the prototype is
    /// dropped and new instances are default-constructed.
    #[must_use]
    pub fn with_prototype(prototype: T) -> Self {
        let mut strategy = Self::new();

        if strategy.kind == StrategyKind::Plain {
            tracing::debug!(
                pool = type_name::<T>(),
                "plain strategy ignores the supplied prototype"
            );
        } else {
            strategy.prototype = Some(prototype);
        }

        strategy
    }

    /// The kind of strategy in use.
    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Whether new instances are manufactured from an explicit prototype.
    #[must_use]
    pub fn has_prototype(&self) -> bool {
        self.prototype.is_some()
    }

    /// Host primitives, only when the host-native strategy is in use.
    fn native_host(&self) -> Option<HostFns<T>> {
        if self.kind == StrategyKind::HostNative {
            self.capabilities.host()
        } else {
            None
        }
    }
}

impl<T: Poolable> Default for DefaultStrategy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> PoolStrategy<T> for DefaultStrategy<T> {
    fn create_object(&mut self) -> Result<T> {
        match self.kind {
            StrategyKind::Plain => creator::construct(&self.capabilities),
            StrategyKind::SelfLifecycle | StrategyKind::HostNative => {
                creator::manufacture_with(&self.capabilities, self.prototype.as_mut())
            }
        }
    }

    fn on_get_object(&mut self, obj: &mut T) {
        if let Some(lifecycle) = self.capabilities.lifecycle() {
            (lifecycle.on_get)(obj);
        } else if let Some(host) = self.native_host() {
            (host.set_active)(obj, true);
        }
    }

    fn on_release_object(&mut self, obj: &mut T) {
        if let Some(lifecycle) = self.capabilities.lifecycle() {
            (lifecycle.on_release)(obj);
        } else if let Some(host) = self.native_host() {
            (host.set_active)(obj, false);
        }
    }

    fn on_destroy_object(&mut self, obj: &mut T) {
        // Exactly one destroy path runs, in priority order.
        if let Some(lifecycle) = self.capabilities.lifecycle() {
            (lifecycle.on_destroy)(obj);
        } else if let Some(dispose) = self.capabilities.dispose() {
            dispose(obj);
        } else if let Some(host) = self.native_host() {
            (host.destroy)(obj);
        }
    }
}

impl<T> fmt::Debug for DefaultStrategy<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultStrategy")
            .field("kind", &self.kind)
            .field("capabilities", &self.capabilities)
            .field("has_prototype", &self.prototype.is_some())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{Dispose, HostObject, Reusable};

    thread_local! {
        static CALLS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    fn record(call: &'static str) {
        CALLS.with_borrow_mut(|calls| calls.push(call));
    }

    fn calls() -> Vec<&'static str> {
        CALLS.with_borrow(Clone::clone)
    }

    #[derive(Default)]
    struct Managed;

    impl Reusable for Managed {
        fn create(&self) -> Self {
            record("create");
            Self
        }

        fn on_get(&mut self) {
            record("on_get");
        }

        fn on_release(&mut self) {
            record("on_release");
        }

        fn on_destroy(&mut self) {
            record("on_destroy");
        }
    }

    impl Dispose for Managed {
        fn dispose(&mut self) {
            record("dispose");
        }
    }

    impl Poolable for Managed {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new().constructible().reusable().disposable()
        }
    }

    struct Node {
        active: bool,
        destroyed: bool,
    }

    impl HostObject for Node {
        fn attach_new() -> Self {
            record("attach_new");
            Self {
                active: true,
                destroyed: false,
            }
        }

        fn duplicate(&self) -> Self {
            record("duplicate");
            Self {
                active: self.active,
                destroyed: false,
            }
        }

        fn set_active(&mut self, active: bool) {
            self.active = active;
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn destroy(&mut self) {
            self.destroyed = true;
        }
    }

    impl Poolable for Node {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new().host_object()
        }
    }

    #[derive(Default)]
    struct Handle {
        disposed: bool,
    }

    impl Dispose for Handle {
        fn dispose(&mut self) {
            self.disposed = true;
        }
    }

    impl Poolable for Handle {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new().constructible().disposable()
        }
    }

    #[test]
    fn self_lifecycle_delegates_to_instance() {
        let mut strategy = DefaultStrategy::<Managed>::new();
        assert_eq!(strategy.kind(), StrategyKind::SelfLifecycle);

        let mut obj = strategy.create_object().unwrap();
        strategy.on_get_object(&mut obj);
        strategy.on_release_object(&mut obj);
        strategy.on_destroy_object(&mut obj);

        // The lifecycle destroy hook takes priority over the disposer.
        assert_eq!(calls(), vec!["create", "on_get", "on_release", "on_destroy"]);
    }

    #[test]
    fn host_native_toggles_activation() {
        let mut strategy = DefaultStrategy::<Node>::new();
        assert_eq!(strategy.kind(), StrategyKind::HostNative);

        let mut obj = strategy.create_object().unwrap();
        assert_eq!(calls(), vec!["attach_new"]);

        strategy.on_release_object(&mut obj);
        assert!(!obj.active);

        strategy.on_get_object(&mut obj);
        assert!(obj.active);

        strategy.on_destroy_object(&mut obj);
        assert!(obj.destroyed);
    }

    #[test]
    fn host_native_duplicates_prototype() {
        let prototype = Node {
            active: true,
            destroyed: false,
        };
        let mut strategy = DefaultStrategy::with_prototype(prototype);
        assert!(strategy.has_prototype());

        let obj = strategy.create_object().unwrap();

        assert_eq!(calls(), vec!["duplicate"]);
        assert!(!obj.active);
    }

    #[test]
    fn plain_strategy_disposes() {
        let mut strategy = DefaultStrategy::<Handle>::new();
        assert_eq!(strategy.kind(), StrategyKind::Plain);

        let mut obj = strategy.create_object().unwrap();
        strategy.on_get_object(&mut obj);
        strategy.on_release_object(&mut obj);
        assert!(!obj.disposed);

        strategy.on_destroy_object(&mut obj);
        assert!(obj.disposed);
    }

    #[test]
    fn plain_strategy_ignores_prototype() {
        let strategy = DefaultStrategy::with_prototype(Handle { disposed: true });

        assert!(!strategy.has_prototype());
    }

    #[test]
    fn mock_strategy_is_object_safe() {
        let mut strategy = MockPoolStrategy::<u32>::new();
        strategy.expect_create_object().returning(|| Ok(3));

        let mut boxed: Box<dyn PoolStrategy<u32>> = Box::new(strategy);

        assert_eq!(boxed.create_object().unwrap(), 3);
    }
}
