//! Integration tests for the Redis counter store.
//!
//! These tests require a Redis instance running at `redis://127.0.0.1/`.
//! Tests are ignored by default - run with `cargo test --features redis-storage --test redis_store -- --ignored`

#![cfg(feature = "redis-storage")]

use admission_gate::{
    AdmissionGate, AdmissionVerdict, ClientIdentity, CounterStore, GateConfig,
    RedisCounterStore, RedisCounterStoreConfig, StoreError,
};
use std::sync::Arc;
use std::time::Duration;

/// Check if Redis is available before running tests
async fn redis_available() -> bool {
    RedisCounterStore::connect("redis://127.0.0.1/").await.is_ok()
}

/// Create a store whose keys cannot collide with other tests
async fn create_test_store(test_name: &str) -> RedisCounterStore {
    let config = RedisCounterStoreConfig {
        key_prefix: format!("test:{}:{}:", test_name, std::process::id()),
        ..RedisCounterStoreConfig::default()
    };

    RedisCounterStore::connect_with_config("redis://127.0.0.1/", config)
        .await
        .expect("Failed to connect to Redis")
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Redis
async fn test_increment_and_get() {
    if !redis_available().await {
        eprintln!("Skipping test: Redis not available at redis://127.0.0.1/");
        return;
    }

    let store = create_test_store("increment_and_get").await;
    let window = Duration::from_secs(60);

    assert_eq!(store.get_async("rate:a").await.unwrap(), None);
    assert_eq!(store.increment_async("rate:a", window).await.unwrap(), 1);
    assert_eq!(store.increment_async("rate:a", window).await.unwrap(), 2);
    assert_eq!(store.get_async("rate:a").await.unwrap(), Some(2));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Redis
async fn test_counter_expires() {
    if !redis_available().await {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let store = create_test_store("counter_expires").await;

    store
        .increment_async("rate:b", Duration::from_millis(200))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(store.get_async("rate:b").await.unwrap(), None);
    assert_eq!(
        store
            .increment_async("rate:b", Duration::from_millis(200))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Redis
async fn test_sync_port_inside_runtime() {
    if !redis_available().await {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let store = create_test_store("sync_port").await;
    let window = Duration::from_secs(60);

    assert_eq!(store.increment("flood:c", window).unwrap(), 1);
    assert_eq!(store.get("flood:c").unwrap(), Some(1));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Redis
async fn test_concurrent_increments_are_atomic() {
    if !redis_available().await {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let store = create_test_store("concurrent").await;
    let window = Duration::from_secs(60);

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..10 {
                    store.increment_async("rate:d", window).await.unwrap();
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.get_async("rate:d").await.unwrap(), Some(200));
}

#[tokio::test(flavor = "current_thread")]
#[ignore] // Requires Redis
async fn test_current_thread_runtime_fails_open() {
    if !redis_available().await {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let store = create_test_store("current_thread").await;
    let result = store.increment("rate:e", Duration::from_secs(60));
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires Redis
async fn test_gate_over_redis() {
    if !redis_available().await {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let store = create_test_store("gate").await;
    let gate = AdmissionGate::builder()
        .with_config(GateConfig::default().with_rate_limit(2, Duration::from_secs(60)))
        .with_counter_store(Arc::new(store))
        .build()
        .unwrap();
    let c: ClientIdentity = "203.0.113.7".parse().unwrap();

    assert_eq!(gate.admit(&c), AdmissionVerdict::Allow);
    assert_eq!(gate.admit(&c), AdmissionVerdict::Allow);
    assert_eq!(gate.admit(&c), AdmissionVerdict::Challenge);
}
