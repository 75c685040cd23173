//! Concurrent access tests
//!
//! Sign-ups racing on one phone number must produce exactly one account,
//! and concurrent writers to the key-value file must not lose updates.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use barberbook_core::adapters::duckdb::DuckDbRepository;
use barberbook_core::adapters::key_value::FileKeyValueStore;
use barberbook_core::ports::KeyValueStore;
use barberbook_core::services::{ClientAuthService, PasswordService};
use barberbook_core::{Error, NewUser};

/// Number of concurrent threads for stress tests.
const THREAD_COUNT: usize = 6;

#[test]
fn test_concurrent_signups_on_one_phone() {
    let temp_dir = TempDir::new().unwrap();
    let repo = Arc::new(DuckDbRepository::new(&temp_dir.path().join("barberbook.duckdb")).unwrap());
    repo.ensure_schema().unwrap();
    let auth = Arc::new(ClientAuthService::new(repo.clone(), PasswordService::default()));

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let created = Arc::new(AtomicUsize::new(0));
    let conflicts = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|i| {
            let auth = Arc::clone(&auth);
            let barrier = Arc::clone(&barrier);
            let created = Arc::clone(&created);
            let conflicts = Arc::clone(&conflicts);

            thread::spawn(move || {
                barrier.wait();
                match auth.create_user(NewUser::new(format!("Client {}", i), "+250788000000", "secret1")) {
                    Ok(_) => created.fetch_add(1, Ordering::SeqCst),
                    Err(Error::Conflict(_)) => conflicts.fetch_add(1, Ordering::SeqCst),
                    Err(e) => panic!("Thread {}: unexpected error: {}", i, e),
                };
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    println!(
        "Results: {} created, {} conflicts",
        created.load(Ordering::SeqCst),
        conflicts.load(Ordering::SeqCst)
    );
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(conflicts.load(Ordering::SeqCst), THREAD_COUNT - 1);
    assert_eq!(repo.count_users().unwrap(), 1);
}

#[test]
fn test_concurrent_signups_on_one_email() {
    let temp_dir = TempDir::new().unwrap();
    let repo = Arc::new(DuckDbRepository::new(&temp_dir.path().join("barberbook.duckdb")).unwrap());
    repo.ensure_schema().unwrap();
    let auth = Arc::new(ClientAuthService::new(repo.clone(), PasswordService::default()));

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|i| {
            let auth = Arc::clone(&auth);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                auth.create_user(
                    NewUser::new("Client", format!("+1555000000{}", i), "secret1").with_email("same@example.com"),
                )
                .is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(repo.count_users().unwrap(), 1);
}

/// Separate store instances on one file, as separate `bb` processes would have
#[test]
fn test_concurrent_key_value_writers() {
    let temp_dir = TempDir::new().unwrap();
    let dir = Arc::new(temp_dir.path().to_path_buf());
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|i| {
            let dir = Arc::clone(&dir);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = FileKeyValueStore::in_dir(&dir);
                barrier.wait();
                for j in 0..5 {
                    store.set_item(&format!("@key_{}_{}", i, j), "value").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = FileKeyValueStore::in_dir(&dir);
    for i in 0..THREAD_COUNT {
        for j in 0..5 {
            assert_eq!(
                store.get_item(&format!("@key_{}_{}", i, j)).unwrap().as_deref(),
                Some("value")
            );
        }
    }
}
