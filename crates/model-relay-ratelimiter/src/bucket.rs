use std::sync::Mutex;
use std::time::Duration;

use model_relay_core::RelayError;
use tokio::time::{sleep, Instant};

use crate::config::RateLimiterConfig;
use crate::events::RateLimiterEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// Internal state for the token bucket.
#[derive(Debug)]
struct BucketState {
    /// Currently available tokens. Fractional between refills.
    tokens: f64,
    /// When tokens were last topped up.
    last_refill: Instant,
}

/// In-memory token bucket gating one provider's request rate.
///
/// Capacity equals the configured requests-per-minute; tokens flow back
/// continuously at `rpm / 60` per second, capped at capacity. State lives
/// only in this process; use
/// [`PersistentRateLimiter`](crate::PersistentRateLimiter) when quota
/// accounting must survive restarts.
pub struct TokenBucket {
    config: RateLimiterConfig,
    state: Mutex<BucketState>,
}

/// Outcome of a non-blocking admission check.
enum Admission {
    Admit,
    Wait(Duration),
}

impl TokenBucket {
    /// Creates a full bucket from the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        let state = BucketState {
            tokens: config.requests_per_minute as f64,
            last_refill: Instant::now(),
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// The provider identity this bucket gates.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn refill_rate_per_sec(&self) -> f64 {
        self.config.requests_per_minute as f64 / 60.0
    }

    fn check(&self) -> Admission {
        let mut state = self.state.lock().unwrap();

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        let capacity = self.config.requests_per_minute as f64;
        state.tokens = (state.tokens + elapsed * self.refill_rate_per_sec()).min(capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Admission::Admit
        } else {
            let deficit = 1.0 - state.tokens;
            Admission::Wait(Duration::from_secs_f64(
                deficit / self.refill_rate_per_sec(),
            ))
        }
    }

    /// Attempts to take a token without waiting.
    pub fn try_acquire(&self) -> bool {
        match self.check() {
            Admission::Admit => {
                self.emit_acquired(Duration::ZERO);
                true
            }
            Admission::Wait(_) => false,
        }
    }

    /// Takes a token, suspending until one is available.
    ///
    /// Returns how long the call waited.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            match self.check() {
                Admission::Admit => {
                    let waited = started.elapsed();
                    self.emit_acquired(waited);
                    return waited;
                }
                Admission::Wait(required) => {
                    self.emit_waiting(required);
                    sleep(required).await;
                }
            }
        }
    }

    /// Takes a token, suspending no later than `deadline`.
    ///
    /// Gives up with [`RelayError::QuotaExhausted`] when the required wait
    /// would overrun the deadline, leaving the bucket untouched.
    pub async fn acquire_before(&self, deadline: Instant) -> Result<Duration, RelayError> {
        let started = Instant::now();
        loop {
            match self.check() {
                Admission::Admit => {
                    let waited = started.elapsed();
                    self.emit_acquired(waited);
                    return Ok(waited);
                }
                Admission::Wait(required) => {
                    if Instant::now() + required > deadline {
                        self.emit_exhausted(Some(required));
                        return Err(RelayError::QuotaExhausted {
                            provider: self.config.name.clone(),
                            retry_after: Some(required),
                        });
                    }
                    self.emit_waiting(required);
                    sleep(required).await;
                }
            }
        }
    }

    /// Currently available tokens, after refill. Fractional between
    /// whole-token arrivals.
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        let capacity = self.config.requests_per_minute as f64;
        state.tokens = (state.tokens + elapsed * self.refill_rate_per_sec()).min(capacity);
        state.last_refill = now;
        state.tokens
    }

    fn emit_acquired(&self, waited: Duration) {
        self.config.event_listeners.emit(&RateLimiterEvent::Acquired {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            waited,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("relay_limiter_admissions_total", "limiter" => self.config.name.clone())
                .increment(1);
            histogram!("relay_limiter_wait_seconds", "limiter" => self.config.name.clone())
                .record(waited.as_secs_f64());
        }
    }

    fn emit_waiting(&self, required: Duration) {
        self.config.event_listeners.emit(&RateLimiterEvent::Waiting {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            required,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            limiter = %self.config.name,
            required_ms = required.as_millis() as u64,
            "rate limit reached, waiting for refill"
        );
    }

    fn emit_exhausted(&self, retry_after: Option<Duration>) {
        self.config.event_listeners.emit(&RateLimiterEvent::Exhausted {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            retry_after,
        });

        #[cfg(feature = "metrics")]
        counter!("relay_limiter_exhaustions_total", "limiter" => self.config.name.clone())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(rpm: u32) -> TokenBucket {
        TokenBucket::new(
            RateLimiterConfig::builder()
                .requests_per_minute(rpm)
                .name("test")
                .build(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn full_bucket_admits_capacity_without_waiting() {
        let limiter = bucket(5);
        for _ in 0..5 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }
        assert!(limiter.available_tokens() < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_bucket_waits_for_refill() {
        let limiter = bucket(5);
        for _ in 0..5 {
            limiter.acquire().await;
        }

        // One token flows back every 12 virtual seconds at rpm=5.
        let waited = limiter.acquire().await;
        assert!(waited >= Duration::from_secs(11), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(13), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_never_waits() {
        let limiter = bucket(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_gives_up_without_consuming() {
        let limiter = bucket(1);
        limiter.acquire().await;

        let deadline = Instant::now() + Duration::from_secs(5);
        let err = limiter.acquire_before(deadline).await.unwrap_err();
        assert!(err.is_unavailable());

        // Waiting out the refill still works afterwards.
        let waited = limiter
            .acquire_before(Instant::now() + Duration::from_secs(120))
            .await
            .unwrap();
        assert!(waited >= Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_cap_at_capacity() {
        let limiter = bucket(3);
        sleep(Duration::from_secs(600)).await;
        assert!(limiter.available_tokens() <= 3.0);
    }
}
