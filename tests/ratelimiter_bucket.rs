//! Token-bucket admission behavior under a controlled clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use model_relay_ratelimiter::{RateLimiterConfig, TokenBucket};
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn capacity_admits_without_waiting_then_blocks() {
    let bucket = TokenBucket::new(
        RateLimiterConfig::builder()
            .requests_per_minute(5)
            .name("burst")
            .build(),
    );

    for _ in 0..5 {
        assert_eq!(bucket.acquire().await, Duration::ZERO);
    }

    // The sixth call suspends until one token refills (60/5 = 12s).
    let before = Instant::now();
    bucket.acquire().await;
    let waited = before.elapsed();
    assert!(waited >= Duration::from_secs(11), "waited {waited:?}");
    assert!(waited <= Duration::from_secs(13), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn refill_is_continuous_not_cliff_edged() {
    let bucket = TokenBucket::new(
        RateLimiterConfig::builder()
            .requests_per_minute(60)
            .name("smooth")
            .build(),
    );

    for _ in 0..60 {
        bucket.acquire().await;
    }
    assert!(bucket.available_tokens() < 1.0);

    // One token per second at rpm=60: after 5 seconds, about 5 tokens.
    sleep(Duration::from_secs(5)).await;
    let available = bucket.available_tokens();
    assert!((4.5..=5.5).contains(&available), "available {available}");
}

#[tokio::test(start_paused = true)]
async fn deadline_bound_acquire_gives_up_cleanly() {
    let bucket = TokenBucket::new(
        RateLimiterConfig::builder()
            .requests_per_minute(1)
            .name("scarce")
            .build(),
    );
    bucket.acquire().await;

    let err = bucket
        .acquire_before(Instant::now() + Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());

    // A generous deadline still waits the refill out.
    let waited = bucket
        .acquire_before(Instant::now() + Duration::from_secs(120))
        .await
        .unwrap();
    assert!(waited >= Duration::from_secs(55), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn exhaustion_listener_reports_retry_after() {
    let retry_hints = Arc::new(AtomicUsize::new(0));
    let hints = Arc::clone(&retry_hints);

    let bucket = TokenBucket::new(
        RateLimiterConfig::builder()
            .requests_per_minute(1)
            .name("observed")
            .on_exhausted(move |retry_after| {
                if retry_after.is_some() {
                    hints.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build(),
    );

    bucket.acquire().await;
    let _ = bucket
        .acquire_before(Instant::now() + Duration::from_millis(10))
        .await;

    assert_eq!(retry_hints.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_acquires_never_oversubscribe() {
    let bucket = Arc::new(TokenBucket::new(
        RateLimiterConfig::builder()
            .requests_per_minute(3)
            .name("contended")
            .build(),
    ));

    let admitted = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..10 {
        let bucket = Arc::clone(&bucket);
        let admitted = Arc::clone(&admitted);
        handles.push(tokio::spawn(async move {
            if bucket
                .acquire_before(Instant::now() + Duration::from_millis(10))
                .await
                .is_ok()
            {
                admitted.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 3);
}
