//! Integration tests for infrastructure_handle_registry crate
//!
//! These tests verify identity allocation under concurrency and the
//! find/remove lifecycle.

use entities_socket::HandleId;
use infrastructure_handle_registry::*;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_registration_yields_unique_ids() {
    let registry = Arc::new(HandleRegistry::new());
    let mut workers = Vec::new();
    for t in 0..8u32 {
        let registry = Arc::clone(&registry);
        workers.push(thread::spawn(move || {
            (0..250u32)
                .map(|i| registry.register(t * 1000 + i).unwrap())
                .collect::<Vec<HandleId>>()
        }));
    }

    let mut seen = HashSet::new();
    for worker in workers {
        for id in worker.join().unwrap() {
            assert!(seen.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(seen.len(), 2000);
    assert_eq!(registry.len(), 2000);
}

#[test]
fn test_concurrent_churn_never_resolves_removed_ids() {
    const WRITERS: u32 = 4;
    const PER_WRITER: u32 = 500;
    let registry = Arc::new(HandleRegistry::new());
    let issued: Arc<Mutex<HashMap<HandleId, u32>>> = Arc::new(Mutex::new(HashMap::new()));
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let registry = Arc::clone(&registry);
        let issued = Arc::clone(&issued);
        let done = Arc::clone(&done);
        readers.push(thread::spawn(move || {
            let mut hits = 0usize;
            while !done.load(Ordering::Acquire) {
                for raw in 1..=u64::from(WRITERS * PER_WRITER) {
                    let id = HandleId::new(raw);
                    if let Some(handle) = registry.find(id) {
                        let value = *handle.lock();
                        if let Some(expected) = issued.lock().get(&id) {
                            assert_eq!(value, *expected, "id {} resolved to a foreign value", id);
                        }
                        hits += 1;
                    }
                }
            }
            hits
        }));
    }

    let mut writers = Vec::new();
    for t in 0..WRITERS {
        let registry = Arc::clone(&registry);
        let issued = Arc::clone(&issued);
        writers.push(thread::spawn(move || {
            let mut removed = Vec::new();
            for i in 0..PER_WRITER {
                let token = t * PER_WRITER + i;
                let id = registry.register(token).unwrap();
                issued.lock().insert(id, token);
                if i % 2 == 0 {
                    assert_eq!(*registry.remove(id).unwrap().lock(), token);
                    assert!(registry.find(id).is_none());
                    removed.push(id);
                }
            }
            removed
        }));
    }

    let removed: Vec<HandleId> = writers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    let issued = issued.lock();
    assert_eq!(issued.len(), (WRITERS * PER_WRITER) as usize);
    for id in &removed {
        assert!(registry.find(*id).is_none(), "removed id {} still resolves", id);
    }
    assert_eq!(registry.len(), issued.len() - removed.len());

    // Later registrations never reuse an identity that was handed out.
    let fresh = registry.register(u32::MAX).unwrap();
    assert!(!issued.contains_key(&fresh));
    assert!(issued.keys().all(|id| *id < fresh));
}

#[test]
fn test_ids_are_sorted_and_complete() {
    let registry = HandleRegistry::new();
    let ids: Vec<HandleId> = (0..20).map(|n| registry.register(n).unwrap()).collect();
    assert_eq!(registry.ids(), ids);
    registry.remove(ids[3]);
    assert_eq!(registry.ids().len(), 19);
    assert!(!registry.ids().contains(&ids[3]));
}

#[test]
fn test_removed_handle_stays_usable_by_holder() {
    let registry = HandleRegistry::new();
    let id = registry.register(vec![1, 2, 3]).unwrap();
    let held = registry.find(id).unwrap();
    let removed = registry.remove(id).unwrap();
    assert!(Arc::ptr_eq(&held, &removed));
    assert_eq!(held.lock().len(), 3);
    assert!(registry.find(id).is_none());
}

#[test]
fn test_cascade_of_wraps() {
    assert_eq!(HandleRegistry::<()>::cascade_of(HandleId::new(9)), 0);
    assert_eq!(HandleRegistry::<()>::cascade_of(HandleId::new(10)), 1);
}
