//! Integration tests for keyed pools owned by a `Registry`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};
use pool_registry::{
    Capabilities, DefaultStrategy, Error, HostObject, KeyedPool, Pool, Poolable, Registry,
};

#[derive(Debug, Default)]
struct Bullet {
    caliber: u32,
}

impl Poolable for Bullet {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().constructible()
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct Prefab {
    name: &'static str,
    active: bool,
}

impl HostObject for Prefab {
    fn attach_new() -> Self {
        Self {
            name: "bare",
            active: true,
        }
    }

    fn duplicate(&self) -> Self {
        self.clone()
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn destroy(&mut self) {}
}

impl Poolable for Prefab {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().host_object()
    }
}

#[test]
fn thousand_sub_pools_are_created_and_cleared() {
    const KEYS: u32 = 1000;

    let registry = Registry::new();
    let destroyed_per_key = Rc::new(RefCell::new(HashMap::<u32, usize>::new()));

    {
        let destroyed_per_key = Rc::clone(&destroyed_per_key);
        registry
            .get_keyed_pool::<Bullet, u32>()
            .on_destroy(move |key, _| {
                *destroyed_per_key.borrow_mut().entry(*key).or_default() += 1;
            });
    }

    for key in 0..KEYS {
        assert!(!registry.has_sub_pool::<Bullet, u32>(&key));

        // Two instances per key: one returned to the pool, one still outstanding.
        let idle = registry.get_keyed::<Bullet, u32>(&key).unwrap();
        let _outstanding = registry.get_keyed::<Bullet, u32>(&key).unwrap();
        registry.release_keyed(&key, idle);

        assert!(registry.has_sub_pool::<Bullet, u32>(&key));
    }

    assert_eq!(registry.get_keyed_pool::<Bullet, u32>().len(), 1000);

    let keyed = registry.get_keyed_pool::<Bullet, u32>();
    registry.clear();

    for key in 0..KEYS {
        assert!(!registry.has_sub_pool::<Bullet, u32>(&key));
    }

    let destroyed_per_key = destroyed_per_key.borrow();
    assert_eq!(destroyed_per_key.len(), 1000);
    assert!(destroyed_per_key.values().all(|&count| count == 1));
    assert!(keyed.is_empty());
}

#[test]
fn keyed_observers_add_to_sub_pool_observers() {
    let registry = Registry::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let sub_pool = Pool::<Bullet>::new();
    {
        let log = Rc::clone(&log);
        sub_pool.on_get(move |bullet| log.borrow_mut().push(format!("sub {}", bullet.caliber)));
    }

    let keyed = registry.get_keyed_pool::<Bullet, &'static str>();
    {
        let log = Rc::clone(&log);
        keyed.on_get(move |key, bullet| {
            log.borrow_mut().push(format!("keyed {key} {}", bullet.caliber));
        });
    }

    registry.create_sub_pool("rifle", Some(sub_pool));
    let bullet = registry.get_keyed::<Bullet, &'static str>(&"rifle").unwrap();
    registry.release_keyed(&"rifle", bullet);

    assert_eq!(*log.borrow(), vec!["sub 0", "keyed rifle 0"]);
}

#[test]
fn sub_pool_lookup_reports_missing_key() {
    let keyed = KeyedPool::<Bullet, u32>::new();

    let result = keyed.sub_pool(&7);

    assert!(matches!(result, Err(Error::KeyNotFound { .. })));
}

#[test]
fn registering_keyed_pool_replaces_only_same_key_type() {
    let registry = Registry::new();
    let destroyed = Rc::new(Cell::new(0_usize));

    let by_number = registry.get_keyed_pool::<Bullet, u32>();
    {
        let destroyed = Rc::clone(&destroyed);
        by_number.on_destroy(move |_, _| destroyed.set(destroyed.get().wrapping_add(1)));
    }
    let bullet = by_number.get(&1).unwrap();
    by_number.release(&1, bullet);

    registry.get_sub_pool::<Bullet, &'static str>(&"pistol");

    registry.register_keyed_pool(KeyedPool::<Bullet, u32>::with_factory(|_| {
        Pool::builder().max_size(2).build(DefaultStrategy::new())
    }));

    assert_eq!(destroyed.get(), 1);
    assert!(!by_number.has_key(&1));
    assert!(registry.has_keyed_pool::<Bullet, u32>());
    assert!(!registry.has_sub_pool::<Bullet, u32>(&1));
    assert!(registry.has_sub_pool::<Bullet, &'static str>(&"pistol"));
}

#[test]
fn clearing_one_key_keeps_the_others() {
    let registry = Registry::new();

    for key in 0..3_u32 {
        registry.get_sub_pool::<Bullet, u32>(&key);
    }

    registry.clear_sub_pool::<Bullet, u32>(&1);

    assert!(registry.has_sub_pool::<Bullet, u32>(&0));
    assert!(!registry.has_sub_pool::<Bullet, u32>(&1));
    assert!(registry.has_sub_pool::<Bullet, u32>(&2));

    // Clearing a missing key is harmless.
    registry.clear_sub_pool::<Bullet, u32>(&1);
    registry.clear_sub_pool::<Bullet, u64>(&1);
}

#[test]
fn each_prototype_has_its_own_sub_pool() {
    let registry = Registry::new();
    let tree = Prefab {
        name: "tree",
        active: true,
    };
    let rock = Prefab {
        name: "rock",
        active: true,
    };

    let first_tree = registry.get_from_prototype(&tree).unwrap();
    let first_rock = registry.get_from_prototype(&rock).unwrap();

    assert_eq!(first_tree.name, "tree");
    assert!(first_tree.is_active());
    assert_eq!(first_rock.name, "rock");

    registry.release_to_prototype(&tree, first_tree);

    let tree_pool = registry.get_sub_pool::<Prefab, Prefab>(&tree);
    assert_eq!(tree_pool.count_inactive(), 1);
    assert_eq!(registry.get_sub_pool::<Prefab, Prefab>(&rock).count_active(), 1);
}
