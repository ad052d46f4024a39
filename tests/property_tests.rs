//! Property-based invariants for the breaker, the bucket, and the
//! router's audit trail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use model_relay_circuitbreaker::{BreakerConfig, CircuitState};
use model_relay_core::{Completion, FnProvider, Provider, ProviderConfig, QueryRequest, RelayError};
use model_relay_ratelimiter::{RateLimiterConfig, TokenBucket};
use model_relay_router::ProviderRouter;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum BreakerOp {
    Success,
    Failure,
    CanExecute,
}

fn breaker_op() -> impl Strategy<Value = BreakerOp> {
    prop_oneof![
        Just(BreakerOp::Success),
        Just(BreakerOp::Failure),
        Just(BreakerOp::CanExecute),
    ]
}

proptest! {
    /// The consecutive-failure count never reaches the threshold while the
    /// breaker reports Closed: hitting it must have transitioned away.
    #[test]
    fn breaker_failure_count_stays_below_threshold(
        ops in proptest::collection::vec(breaker_op(), 1..200),
        threshold in 1u32..10,
    ) {
        let mut breaker = BreakerConfig::builder()
            .failure_threshold(threshold)
            .recovery_timeout(Duration::from_secs(3600))
            .name("prop")
            .build();

        for op in ops {
            match op {
                BreakerOp::Success => breaker.record_success(),
                BreakerOp::Failure => breaker.record_failure(),
                BreakerOp::CanExecute => {
                    let _ = breaker.can_execute();
                }
            }

            let snapshot = breaker.snapshot();
            prop_assert!(snapshot.failure_count < threshold);
            if snapshot.state == CircuitState::Closed {
                prop_assert!(snapshot.time_until_recovery.is_none());
            }
        }
    }

    /// With an hour-long recovery timeout, a tripped breaker refuses every
    /// check, regardless of what was recorded before the trip.
    #[test]
    fn breaker_open_refuses_until_recovery(
        warmup in proptest::collection::vec(breaker_op(), 0..50),
        threshold in 1u32..5,
    ) {
        let mut breaker = BreakerConfig::builder()
            .failure_threshold(threshold)
            .recovery_timeout(Duration::from_secs(3600))
            .name("prop")
            .build();

        for op in warmup {
            match op {
                BreakerOp::Success => breaker.record_success(),
                BreakerOp::Failure => breaker.record_failure(),
                BreakerOp::CanExecute => {
                    let _ = breaker.can_execute();
                }
            }
        }

        for _ in 0..threshold {
            breaker.record_failure();
        }
        prop_assert_eq!(breaker.state(), CircuitState::Open);
        for _ in 0..10 {
            prop_assert!(!breaker.can_execute());
        }
    }

    /// Tokens never exceed capacity and non-blocking admissions never
    /// exceed what the bucket actually holds.
    #[test]
    fn bucket_never_oversubscribes(
        capacity in 1u32..100,
        attempts in 1usize..300,
    ) {
        let bucket = TokenBucket::new(
            RateLimiterConfig::builder()
                .requests_per_minute(capacity)
                .name("prop")
                .build(),
        );

        let mut admitted = 0usize;
        for _ in 0..attempts {
            prop_assert!(bucket.available_tokens() <= capacity as f64);
            if bucket.try_acquire() {
                admitted += 1;
            }
        }

        // Near-instant run: at most a sliver of refill beyond capacity.
        prop_assert!(admitted <= capacity as usize + 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// However the chain is scripted, the audit trail stays aligned and
    /// consistent with the outcome.
    #[test]
    fn router_audit_trail_is_always_aligned(script in proptest::collection::vec(any::<bool>(), 1..6)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async move {
            let mut builder = ProviderRouter::builder();
            for (i, succeeds) in script.iter().copied().enumerate() {
                let name = format!("provider-{i}");
                builder = builder.provider(
                    ProviderConfig::builder(&name)
                        .timeout(Duration::from_secs(5))
                        .build(),
                    scripted(name.clone(), succeeds),
                );
            }
            let router = builder.build();

            let response = router.query(QueryRequest::new("prop")).await;

            let metadata = &response.metadata;
            assert_eq!(
                metadata.attempted_providers.len(),
                metadata.attempted_errors.len()
            );

            let expect_success = script.iter().any(|s| *s);
            assert_eq!(response.success, expect_success);

            if let Some(first_ok) = script.iter().position(|s| *s) {
                // Everything before the first success failed; the success
                // terminates the chain.
                assert_eq!(metadata.attempted_providers.len(), first_ok + 1);
                assert_eq!(metadata.fallback_used, first_ok > 0);
                assert!(metadata.attempted_errors[first_ok].is_none());
                assert!(metadata.attempted_errors[..first_ok]
                    .iter()
                    .all(Option::is_some));
            } else {
                assert_eq!(metadata.attempted_providers.len(), script.len());
                assert!(metadata.attempted_errors.iter().all(Option::is_some));
            }
        });
    }
}

fn scripted(name: String, succeeds: bool) -> impl Provider + 'static {
    let calls = Arc::new(AtomicUsize::new(0));
    FnProvider::new(name.clone(), move |_req: QueryRequest| {
        calls.fetch_add(1, Ordering::SeqCst);
        let name = name.clone();
        async move {
            if succeeds {
                Ok(Completion::new(format!("{name} reply")))
            } else {
                Err(RelayError::Backend {
                    provider: name,
                    message: "scripted failure".to_string(),
                })
            }
        }
    })
}
