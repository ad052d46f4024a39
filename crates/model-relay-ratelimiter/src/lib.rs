//! Quota gates for one provider in a model-relay fallback chain.
//!
//! Two variants share one configuration:
//!
//! - [`TokenBucket`] keeps everything in memory. Capacity equals the
//!   provider's requests-per-minute allowance and refills continuously, so
//!   short bursts are smoothed rather than cliff-edged.
//! - [`PersistentRateLimiter`] counts requests inside rolling minute and
//!   day windows and writes its counters to a per-provider state file
//!   after every admission, so quota accounting survives process restarts.
//!   Useful for metered backends where a crash must not reset the day's
//!   spend tracking.
//!
//! Both variants gate by suspending: `acquire()` sleeps until the quota
//! admits, and `acquire_before()` gives up with a
//! [`RelayError::QuotaExhausted`](model_relay_core::RelayError) once the
//! wait would blow the caller's deadline. Neither ever panics after
//! construction.
//!
//! # Example
//!
//! ```rust
//! use model_relay_ratelimiter::{RateLimiterConfig, TokenBucket};
//!
//! # async fn example() {
//! let bucket = TokenBucket::new(
//!     RateLimiterConfig::builder()
//!         .requests_per_minute(30)
//!         .name("openai")
//!         .build(),
//! );
//!
//! let waited = bucket.acquire().await;
//! assert!(waited.is_zero());
//! # }
//! ```

mod bucket;
mod config;
mod events;
mod persistent;

pub use bucket::TokenBucket;
pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use events::RateLimiterEvent;
pub use persistent::{PersistentRateLimiter, QuotaState, DAY_WINDOW_SECS, MINUTE_WINDOW_SECS};
