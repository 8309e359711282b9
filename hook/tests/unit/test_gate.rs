//! Deploy gate tests

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use renderhook::errors::GateError;
use renderhook::gate::DeployGate;
use renderhook::storage::layout::StorageLayout;

const INTERVAL: Duration = Duration::from_secs(60);

async fn open_gate(dir: &tempfile::TempDir) -> DeployGate {
    DeployGate::open(StorageLayout::new(dir.path())).await.unwrap()
}

#[tokio::test]
async fn test_lock_is_exclusive_until_released() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;

    let lock = gate.try_acquire("demo").await.unwrap();
    assert_eq!(lock.key(), "demo");
    assert!(dir.path().join("demo.lock").exists());

    match gate.try_acquire("demo").await {
        Err(GateError::Busy { project }) => assert_eq!(project, "demo"),
        other => panic!("expected Busy, got {:?}", other),
    }

    gate.release(lock);
    let again = gate.try_acquire("demo").await.unwrap();
    drop(again);
    assert!(gate.try_acquire("demo").await.is_ok());
}

#[tokio::test]
async fn test_lock_excludes_other_gate_instances() {
    let dir = tempfile::tempdir().unwrap();
    let first = open_gate(&dir).await;
    let second = open_gate(&dir).await;

    let _lock = first.try_acquire("demo").await.unwrap();
    assert!(matches!(second.try_acquire("demo").await, Err(GateError::Busy { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquires_admit_one() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;

    let attempts = (0..8).map(|_| {
        let gate = gate.clone();
        tokio::spawn(async move { gate.try_acquire("demo").await })
    });
    let mut held = Vec::new();
    let mut busy = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        match attempt.await.unwrap() {
            Ok(lock) => held.push(lock),
            Err(GateError::Busy { .. }) => busy += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(held.len(), 1);
    assert_eq!(busy, 7);
}

#[tokio::test]
async fn test_projects_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;

    let _demo = gate.try_acquire("demo").await.unwrap();
    let _nav = gate.try_acquire("nav").await.unwrap();

    let now = Utc::now();
    gate.record_acceptance("demo", now).await.unwrap();
    assert!(gate.check_cooldown("nav", now, INTERVAL).await.is_ok());
}

#[tokio::test]
async fn test_no_record_means_no_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;
    assert!(gate.check_cooldown("demo", Utc::now(), INTERVAL).await.is_ok());
}

#[tokio::test]
async fn test_record_then_check_is_rate_limited() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;

    let now = Utc::now();
    gate.record_acceptance("demo", now).await.unwrap();

    match gate.check_cooldown("demo", now, INTERVAL).await {
        Err(GateError::RateLimited {
            project,
            interval_secs,
            remaining_secs,
        }) => {
            assert_eq!(project, "demo");
            assert_eq!(interval_secs, 60);
            assert_eq!(remaining_secs, 60);
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_after_shrinks_with_elapsed_time() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;

    let t0 = Utc::now();
    gate.record_acceptance("demo", t0).await.unwrap();

    let later = t0 + TimeDelta::milliseconds(15_400);
    match gate.check_cooldown("demo", later, INTERVAL).await {
        Err(GateError::RateLimited { remaining_secs, .. }) => assert_eq!(remaining_secs, 45),
        other => panic!("expected RateLimited, got {:?}", other),
    }

    let expired = t0 + TimeDelta::seconds(60);
    assert!(gate.check_cooldown("demo", expired, INTERVAL).await.is_ok());
}

#[tokio::test]
async fn test_cooldown_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    {
        let gate = open_gate(&dir).await;
        gate.record_acceptance("demo", now).await.unwrap();
    }

    let gate = open_gate(&dir).await;
    let result = gate
        .check_cooldown("demo", now + TimeDelta::seconds(1), INTERVAL)
        .await;
    assert!(matches!(result, Err(GateError::RateLimited { remaining_secs: 59, .. })));
}

#[tokio::test]
async fn test_record_file_shape() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;

    let now = Utc::now();
    gate.record_acceptance("demo", now).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("demo.status")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let stored = value["last_accepted_at"].as_str().unwrap();
    assert_eq!(
        chrono::DateTime::parse_from_rfc3339(stored).unwrap(),
        now
    );
}

#[tokio::test]
async fn test_corrupt_record_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let gate = open_gate(&dir).await;

    std::fs::write(dir.path().join("demo.status"), "not json").unwrap();
    assert!(gate.check_cooldown("demo", Utc::now(), INTERVAL).await.is_ok());

    gate.record_acceptance("demo", Utc::now()).await.unwrap();
    assert!(gate.check_cooldown("demo", Utc::now(), INTERVAL).await.is_err());
}

#[tokio::test]
async fn test_open_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("locks");
    let gate = DeployGate::open(StorageLayout::new(&nested)).await.unwrap();

    assert!(nested.is_dir());
    assert!(gate.try_acquire("demo").await.is_ok());
}
