//! # Selection Store Tests
//!
//! Identity, isolation and expiry of per-channel selections.


use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use test_helpers::{simple_product, variable_product, variant};
use ticket_checkout_bot::cache::{Cache, CacheStats};
use ticket_checkout_bot::selection::{SelectionHandle, SelectionStore, SelectionUpdate};

#[test]
fn test_get_or_create_returns_same_handle() {
    let store = SelectionStore::in_memory(Duration::from_secs(60));

    let first = store.get_or_create(1);
    let second = store.get_or_create(1);
    let other = store.get_or_create(2);

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(store.len(), 2);
}

#[test]
fn test_writes_through_handle_are_visible() {
    let store = SelectionStore::in_memory(Duration::from_secs(60));

    let handle = store.get_or_create(1);
    handle.lock().product = Some(simple_product(7, "Prime", "5.00"));

    let snapshot = store.get(1).expect("selection exists");
    assert_eq!(snapshot.product.map(|p| p.id), Some(7));
}

#[test]
fn test_clear_starts_fresh_selection() {
    let store = SelectionStore::in_memory(Duration::from_secs(60));

    let before = store.get_or_create(1);
    before.lock().product = Some(simple_product(7, "Prime", "5.00"));
    assert!(store.clear(1));
    assert!(!store.clear(1));

    let after = store.get_or_create(1);
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.lock().product.is_none());
}

#[test]
fn test_expired_selection_is_replaced() {
    let store = SelectionStore::in_memory(Duration::from_millis(20));

    let before = store.get_or_create(1);
    std::thread::sleep(Duration::from_millis(40));

    assert!(store.get(1).is_none());
    let after = store.get_or_create(1);
    assert!(!Arc::ptr_eq(&before, &after));
}

#[test]
fn test_evict_expired_only_drops_idle_channels() {
    let store = SelectionStore::in_memory(Duration::from_millis(30));

    store.set(1, SelectionUpdate::Product(simple_product(7, "Prime", "5.00")));
    std::thread::sleep(Duration::from_millis(50));
    store.set(2, SelectionUpdate::Product(simple_product(8, "Ranked", "7.00")));

    assert_eq!(store.evict_expired(), 1);
    assert!(!store.contains(1));
    assert!(store.contains(2));
    assert_eq!(store.stats().evictions, 1);
}

#[test]
fn test_variant_follows_its_product() {
    let store = SelectionStore::in_memory(Duration::from_secs(60));

    store.set(1, SelectionUpdate::Product(variable_product(42, "Faceit", &[101])));
    assert!(store.set(1, SelectionUpdate::Variant(variant(101, 42, "EU", "20.00"))));

    let selection = store.get(1).expect("selection exists");
    assert_eq!(selection.item_label().as_deref(), Some("Faceit - EU"));
    assert_eq!(selection.price(), Some("20.00"));
}

/// Backend without expiry that counts how the store drives it
#[derive(Default)]
struct CountingCache {
    entries: Mutex<HashMap<u64, SelectionHandle>>,
    reads: AtomicUsize,
    creates: AtomicUsize,
    removes: AtomicUsize,
}

impl Cache<u64, SelectionHandle> for CountingCache {
    fn get(&self, key: &u64) -> Option<SelectionHandle> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().get(key).cloned()
    }

    fn insert(&self, key: u64, value: SelectionHandle, _ttl: Duration) {
        self.entries.lock().insert(key, value);
    }

    fn get_or_insert_with(
        &self,
        key: u64,
        _ttl: Duration,
        make: &dyn Fn() -> SelectionHandle,
    ) -> SelectionHandle {
        self.entries
            .lock()
            .entry(key)
            .or_insert_with(|| {
                self.creates.fetch_add(1, Ordering::SeqCst);
                make()
            })
            .clone()
    }

    fn remove(&self, key: &u64) -> Option<SelectionHandle> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().remove(key)
    }

    fn cleanup(&self) -> usize {
        0
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            ..CacheStats::default()
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[test]
fn test_custom_backend_is_used() {
    let store = SelectionStore::with_backend(CountingCache::default(), Duration::from_millis(1));

    store.set(9, SelectionUpdate::Product(simple_product(7, "Prime", "5.00")));
    assert!(store.set(9, SelectionUpdate::Product(simple_product(8, "Ranked", "7.00"))));
    std::thread::sleep(Duration::from_millis(10));

    // The backend ignores TTLs, so the selection outlives the store's TTL
    assert_eq!(store.get(9).and_then(|s| s.product).map(|p| p.id), Some(8));
    assert_eq!(store.evict_expired(), 0);
    assert!(store.clear(9));
    assert!(!store.contains(9));

    let backend = store.backend();
    assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
    assert_eq!(backend.removes.load(Ordering::SeqCst), 1);
    assert_eq!(backend.reads.load(Ordering::SeqCst), 2);
    assert_eq!(store.stats().entries, 0);
}

#[test]
fn test_concurrent_channels_do_not_interfere() {
    let store = Arc::new(SelectionStore::in_memory(Duration::from_secs(60)));

    let handles: Vec<_> = (0..8u64)
        .map(|channel| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    store.set(
                        channel,
                        SelectionUpdate::Product(simple_product(channel, "Item", "1.00")),
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8);
    for channel in 0..8u64 {
        let product = store.get(channel).and_then(|s| s.product);
        assert_eq!(product.map(|p| p.id), Some(channel));
    }
}
