//! Circuit breaker for one provider in a model-relay fallback chain.
//!
//! A breaker guards exactly one backend. After a run of consecutive
//! failures it opens and refuses calls outright, so a dead backend costs
//! the chain nothing while it stays dead. Once a recovery timeout elapses
//! the breaker lets a bounded number of probing calls through (half-open);
//! consecutive probe successes close it again, any probe failure reopens
//! it and restarts the clock.
//!
//! The breaker never raises: callers ask [`Breaker::can_execute`] before a
//! call and report the outcome with [`Breaker::record_success`] /
//! [`Breaker::record_failure`]. Refused calls are skipped, not failed.
//!
//! # Example
//!
//! ```rust
//! use model_relay_circuitbreaker::{Breaker, BreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let mut breaker = BreakerConfig::builder()
//!     .failure_threshold(2)
//!     .recovery_timeout(Duration::from_secs(1))
//!     .name("openai")
//!     .build();
//!
//! assert!(breaker.can_execute());
//! breaker.record_failure();
//! breaker.record_failure();
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(!breaker.can_execute());
//! ```

mod breaker;
mod config;
mod events;

pub use breaker::{Breaker, BreakerSnapshot, CircuitState};
pub use config::{BreakerConfig, BreakerConfigBuilder};
pub use events::BreakerEvent;
