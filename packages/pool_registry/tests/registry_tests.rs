//! Integration tests for `Registry` with types that use each of the default strategies.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pool_registry::{
    Capabilities, Dispose, Error, HostObject, Pool, PoolEvent, Poolable, Registry, Reusable,
    StrategyKind,
};

thread_local! {
    static DISPOSED: Cell<usize> = const { Cell::new(0) };
    static SHELL_GETS: Cell<usize> = const { Cell::new(0) };
    static SHELL_DESTROYS: Cell<usize> = const { Cell::new(0) };
}

/// A type without any capabilities beyond default construction.
#[derive(Debug, Default)]
struct Scratch {
    bytes: Vec<u8>,
}

impl Poolable for Scratch {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible()
    }
}

/// A plain type that releases resources when discarded.
#[derive(Debug, Default)]
struct Connection;

impl Dispose for Connection {
    fn dispose(&mut self) {
        DISPOSED.set(DISPOSED.get().wrapping_add(1));
    }
}

impl Poolable for Connection {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible().disposable()
    }
}

/// A type that manages its own reuse.
#[derive(Debug, Default)]
struct Shell {
    armed: bool,
}

impl Reusable for Shell {
    fn create(&self) -> Self {
        Self::default()
    }

    fn on_get(&mut self) {
        SHELL_GETS.set(SHELL_GETS.get().wrapping_add(1));
        self.armed = true;
    }

    fn on_release(&mut self) {
        self.armed = false;
    }

    fn on_destroy(&mut self) {
        SHELL_DESTROYS.set(SHELL_DESTROYS.get().wrapping_add(1));
    }
}

impl Poolable for Shell {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible().reusable()
    }
}

/// A host object that models activation of a node in a scene graph.
#[derive(Debug)]
struct Sprite {
    active: bool,
}

impl HostObject for Sprite {
    fn attach_new() -> Self {
        Self { active: true }
    }

    fn duplicate(&self) -> Self {
        Self {
            active: self.active,
        }
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn destroy(&mut self) {}
}

impl Poolable for Sprite {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().host_object()
    }
}

/// A type that cannot be manufactured at all.
#[derive(Debug)]
struct Opaque;

impl Poolable for Opaque {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new()
    }
}

#[test]
fn plain_type_is_default_constructed() {
    let registry = Registry::new();

    let scratch = registry.get::<Scratch>().unwrap();

    assert!(scratch.bytes.is_empty());
    assert!(registry.has_pool::<Scratch>());
    assert_eq!(
        StrategyKind::select(&Scratch::capabilities()),
        StrategyKind::Plain
    );
}

#[test]
fn round_trip_fires_get_hook_once_per_acquire() {
    let registry = Registry::new();

    let shell = registry.get::<Shell>().unwrap();
    assert!(shell.armed);
    registry.release(shell);

    let shell = registry.get::<Shell>().unwrap();
    assert!(shell.armed);

    assert_eq!(SHELL_GETS.get(), 2);
    assert_eq!(registry.get_pool::<Shell>().count_all(), 1);
}

#[test]
fn clear_twice_destroys_once() {
    let registry = Registry::new();

    let first = registry.get::<Shell>().unwrap();
    let second = registry.get::<Shell>().unwrap();
    registry.release(first);
    registry.release(second);

    registry.clear();
    registry.clear();

    assert_eq!(SHELL_DESTROYS.get(), 2);
    assert!(!registry.has_pool::<Shell>());
}

#[test]
fn disposer_runs_when_plain_pool_is_cleared() {
    let registry = Registry::new();

    let connection = registry.get::<Connection>().unwrap();
    registry.release(connection);
    registry.clear_pool::<Connection>();

    assert_eq!(DISPOSED.get(), 1);
    assert!(!registry.has_pool::<Connection>());
}

#[test]
fn registering_replacement_destroys_idle_instances_first() {
    let registry = Registry::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let original = registry.get_pool::<Scratch>();
    {
        let log = Rc::clone(&log);
        original.on_destroy(move |_| log.borrow_mut().push("original destroyed"));
    }

    let scratch = original.get().unwrap();
    original.release(scratch);

    let replacement = Pool::<Scratch>::new();
    {
        let log = Rc::clone(&log);
        replacement.on_create(move |_| log.borrow_mut().push("replacement created"));
    }

    registry.register_pool(replacement.clone());
    let _scratch = registry.get::<Scratch>().unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["original destroyed", "replacement created"]
    );
    assert!(registry.get_pool::<Scratch>().ptr_eq(&replacement));
}

#[test]
fn host_object_is_active_only_while_acquired() {
    let registry = Registry::new();
    let acquired = Rc::new(Cell::new(0_usize));

    {
        let acquired = Rc::clone(&acquired);
        registry
            .get_pool::<Sprite>()
            .observe(PoolEvent::Get, move |sprite| {
                assert!(sprite.is_active());
                acquired.set(acquired.get().wrapping_add(1));
            });
    }

    let sprite = registry.get::<Sprite>().unwrap();
    assert!(sprite.is_active());

    registry.release(sprite);
    assert_eq!(registry.get_pool::<Sprite>().count_inactive(), 1);

    let sprite = registry.get::<Sprite>().unwrap();
    assert!(sprite.is_active());
    assert_eq!(acquired.get(), 2);

    registry.release(sprite);
}

#[test]
fn released_host_object_is_inactive() {
    let pool = Pool::<Sprite>::new();
    pool.realize();

    let observed = Rc::new(Cell::new(true));
    {
        let observed = Rc::clone(&observed);
        pool.on_release(move |sprite| observed.set(sprite.is_active()));
    }

    let sprite = pool.get().unwrap();
    pool.release(sprite);

    assert!(!observed.get());
}

#[test]
fn unsupported_type_fails_to_create() {
    let registry = Registry::new();

    let result = registry.get::<Opaque>();

    assert!(matches!(result, Err(Error::UnsupportedCreationKind { .. })));
    // The pool exists even though no instance could be created for it.
    assert!(registry.has_pool::<Opaque>());
}

#[test]
fn pooled_guard_returns_to_registry_pool() {
    let registry = Registry::new();

    {
        let mut scratch = registry.get_pooled::<Scratch>().unwrap();
        scratch.bytes.push(1);
    }

    let pool = registry.get_pool::<Scratch>();
    assert_eq!(pool.count_inactive(), 1);
    assert_eq!(pool.count_active(), 0);
}
