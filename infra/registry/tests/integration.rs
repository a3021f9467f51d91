use dynconf_registry::{MemoryStore, Registry, RegistryError};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const WRITERS: usize = 16;

#[test]
fn concurrent_register_has_exactly_one_winner() {
    let registry = Registry::new();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.register("limit", i)
            })
        })
        .collect();

    let results: Vec<Result<(), RegistryError>> =
        handles.into_iter().map(|h| h.join().expect("writer thread panicked")).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results.iter().filter(|r| matches!(r, Err(e) if e.is_already_exists())).count();
    assert_eq!(winners, 1);
    assert_eq!(losers, WRITERS - 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn concurrent_upsert_creates_once_and_keeps_one_value() {
    let registry = Registry::new();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.upsert("limit", i).expect("upsert should not fail")
            })
        })
        .collect();

    let previous: Vec<Option<usize>> =
        handles.into_iter().map(|h| h.join().expect("writer thread panicked")).collect();

    assert_eq!(previous.iter().filter(|p| p.is_none()).count(), 1, "exactly one creation");

    let stored = registry.get::<usize>("limit").expect("slot must exist");
    assert!(stored < WRITERS);
    assert_eq!(registry.len(), 1);
}

#[test]
fn custom_store_is_used() {
    let registry = Registry::with_store(MemoryStore::with_write_timeout(Duration::from_millis(50)));
    registry.register("degrade", false).expect("register");
    assert!(!registry.get_within::<bool>("degrade", Duration::from_millis(50)).expect("get"));
}
