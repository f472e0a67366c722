//! Integration tests for the thread-local shared registry.

use pool_registry::{Pool, Registry, global};

#[test]
fn forwards_to_shared_registry() {
    let text = global::get::<String>().unwrap();
    global::release(text);

    assert!(global::has_pool::<String>());
    assert!(global::get_pool::<String>().ptr_eq(&global::registry().get_pool::<String>()));

    let bytes = global::get_keyed::<Vec<u8>, u16>(&512).unwrap();
    global::release_keyed::<Vec<u8>, u16>(&512, bytes);

    assert!(global::has_keyed_pool::<Vec<u8>, u16>());
    assert!(global::has_sub_pool::<Vec<u8>, u16>(&512));

    global::clear_sub_pool::<Vec<u8>, u16>(&512);
    assert!(!global::has_keyed_pool::<Vec<u8>, u16>());

    global::clear();
    assert!(!global::has_pool::<String>());
    assert!(global::is_configured());
}

#[test]
fn reconfiguring_clears_previous_registry() {
    let pool = global::create_pool(Some(Pool::<String>::new()));
    let text = pool.get().unwrap();
    pool.release(text);

    global::configure(Registry::builder().label("level two").build());

    assert!(!pool.is_realized());
    assert_eq!(global::registry().label(), "level two");
}

#[test]
fn bootstrap_allows_clean_recreation() {
    global::get_sub_pool::<String, u8>(&1);
    assert!(global::is_configured());

    global::bootstrap();
    assert!(!global::is_configured());

    assert!(!global::has_sub_pool::<String, u8>(&1));
    assert_eq!(global::registry().label(), global::DEFAULT_LABEL);
}
