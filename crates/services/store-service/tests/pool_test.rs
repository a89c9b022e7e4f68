//! Connection pool behaviour under exhaustion.

mod support;

use std::time::{Duration, Instant};

use tokio_test::{assert_pending, assert_ready_ok};

use common::{AppError, ProfileResolver};
use store_service_lib::Persistence;

use crate::support::{mock_env, open_store, open_store_with, settings};

#[tokio::test]
async fn test_prewarmed_pool_reports_capacity() {
    let store = open_store().await;

    assert_eq!(store.pool().max_size(), 4);
    assert_eq!(store.pool().available(), 4);
    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_acquire_times_out_when_exhausted() {
    let store = open_store_with(&[
        ("STORE_POOL_INITIAL_SIZE", "1"),
        ("STORE_POOL_MIN_SIZE", "1"),
        ("STORE_POOL_MAX_SIZE", "1"),
        ("STORE_CONN_TIMEOUT_MS", "50"),
    ])
    .await;
    let pool = store.pool();

    let held = pool.acquire().await.unwrap();
    let started = Instant::now();
    let err = pool.acquire().await.unwrap_err();

    assert!(matches!(err, AppError::PoolTimeout { timeout_ms: 50 }));
    assert!(err.is_retryable());
    assert!(started.elapsed() >= Duration::from_millis(50));

    pool.release(held);
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_extra_acquire_suspends_until_release() {
    let store = open_store_with(&[
        ("STORE_POOL_INITIAL_SIZE", "2"),
        ("STORE_POOL_MIN_SIZE", "1"),
        ("STORE_POOL_MAX_SIZE", "2"),
    ])
    .await;
    let pool = store.pool();

    let first = pool.acquire().await.unwrap();
    let _second = pool.acquire().await.unwrap();
    assert_eq!(pool.available(), 0);

    let mut waiting = tokio_test::task::spawn(pool.acquire());
    assert_pending!(waiting.poll());

    pool.release(first);
    assert!(waiting.is_woken());
    let third = assert_ready_ok!(waiting.poll());
    third.connection().ping().await.unwrap();
}

#[tokio::test]
async fn test_lease_returned_when_task_aborted() {
    let store = open_store().await;
    let pool = store.pool().clone();

    let holder = tokio::spawn({
        let pool = pool.clone();
        async move {
            let _handle = pool.acquire().await.unwrap();
            std::future::pending::<()>().await;
        }
    });

    while pool.available() == pool.max_size() as usize {
        tokio::task::yield_now().await;
    }
    holder.abort();
    let _ = holder.await;

    assert_eq!(pool.available(), pool.max_size() as usize);
}

#[tokio::test]
async fn test_open_before_resolution_fails() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ProfileResolver::new(settings(mock_env(dir.path())));

    let result = Persistence::open(&resolver).await;
    assert!(matches!(result, Err(AppError::NotInitialized)));

    resolver.resolve("mock").unwrap();
    assert!(Persistence::open(&resolver).await.is_ok());
}
