//! Persistent quota accounting across process (instance) lifetimes.

use std::fs;
use std::time::Duration;

use model_relay_ratelimiter::{
    PersistentRateLimiter, QuotaState, RateLimiterConfig, DAY_WINDOW_SECS, MINUTE_WINDOW_SECS,
};
use tempfile::TempDir;

fn config(name: &str, rpm: u32) -> RateLimiterConfig {
    RateLimiterConfig::builder()
        .requests_per_minute(rpm)
        .name(name)
        .build()
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[tokio::test]
async fn quota_usage_survives_a_restart() {
    let dir = TempDir::new().unwrap();

    {
        let limiter = PersistentRateLimiter::open(config("openai", 10), dir.path()).unwrap();
        limiter.acquire().await;
        assert_eq!(limiter.state().minute_request_count, 1);
    }

    // A second instance against the same path sees the same counters.
    let reborn = PersistentRateLimiter::open(config("openai", 10), dir.path()).unwrap();
    assert_eq!(reborn.state().minute_request_count, 1);
    assert_eq!(reborn.state().day_request_count, 1);
    assert_eq!(reborn.remaining_minute(), 9);
}

#[tokio::test]
async fn each_provider_gets_its_own_record() {
    let dir = TempDir::new().unwrap();

    let a = PersistentRateLimiter::open(config("openai", 10), dir.path()).unwrap();
    let b = PersistentRateLimiter::open(config("ollama", 10), dir.path()).unwrap();
    a.acquire().await;
    a.acquire().await;
    b.acquire().await;

    assert_eq!(a.state().minute_request_count, 2);
    assert_eq!(b.state().minute_request_count, 1);
    assert!(dir.path().join("openai.json").exists());
    assert!(dir.path().join("ollama.json").exists());
}

#[tokio::test]
async fn fresh_file_is_created_on_first_open() {
    let dir = TempDir::new().unwrap();
    let limiter = PersistentRateLimiter::open(config("fresh", 10), dir.path()).unwrap();

    // Loadable before any admission.
    let on_disk: QuotaState =
        serde_json::from_str(&fs::read_to_string(limiter.path()).unwrap()).unwrap();
    assert_eq!(on_disk.minute_request_count, 0);
    assert_eq!(on_disk.day_request_count, 0);
}

#[tokio::test]
async fn stale_windows_roll_over_instead_of_blocking() {
    let dir = TempDir::new().unwrap();
    let stale = QuotaState {
        minute_window_start: unix_now() - 3 * MINUTE_WINDOW_SECS,
        minute_request_count: 10,
        day_window_start: unix_now() - 2 * DAY_WINDOW_SECS,
        day_request_count: 9_999,
    };
    fs::write(
        dir.path().join("yesterday.json"),
        serde_json::to_string_pretty(&stale).unwrap(),
    )
    .unwrap();

    let limiter = PersistentRateLimiter::open(config("yesterday", 10), dir.path()).unwrap();
    let waited = limiter.acquire().await;
    assert!(waited < Duration::from_secs(1));

    let state = limiter.state();
    assert_eq!(state.minute_request_count, 1);
    assert_eq!(state.day_request_count, 1);
    assert!(state.minute_window_start >= stale.minute_window_start + 3 * MINUTE_WINDOW_SECS);
}

#[tokio::test]
async fn full_minute_window_defers_until_rollover() {
    let dir = TempDir::new().unwrap();
    let full = QuotaState {
        minute_window_start: unix_now(),
        minute_request_count: 10,
        day_window_start: unix_now(),
        day_request_count: 10,
    };
    fs::write(
        dir.path().join("busy.json"),
        serde_json::to_string_pretty(&full).unwrap(),
    )
    .unwrap();

    let limiter = PersistentRateLimiter::open(config("busy", 10), dir.path()).unwrap();
    assert_eq!(limiter.remaining_minute(), 0);

    let err = limiter
        .acquire_before(tokio::time::Instant::now() + Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    // The refused request was not counted or persisted.
    assert_eq!(limiter.state().minute_request_count, 10);
}

#[tokio::test]
async fn corrupt_state_is_replaced_not_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("mangled.json"), "][ definitely not json").unwrap();

    let limiter = PersistentRateLimiter::open(config("mangled", 10), dir.path()).unwrap();
    limiter.acquire().await;
    assert_eq!(limiter.state().minute_request_count, 1);

    // And the replacement is well-formed on disk again.
    let on_disk: QuotaState =
        serde_json::from_str(&fs::read_to_string(limiter.path()).unwrap()).unwrap();
    assert_eq!(on_disk.minute_request_count, 1);
}

#[tokio::test]
async fn admissions_leave_no_partial_writes_behind() {
    let dir = TempDir::new().unwrap();
    let limiter = PersistentRateLimiter::open(config("atomic", 60), dir.path()).unwrap();

    for _ in 0..20 {
        limiter.acquire().await;
    }

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["atomic.json".to_string()]);
}
