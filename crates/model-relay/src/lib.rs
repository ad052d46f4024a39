//! Resilient provider routing for LLM backends.
//!
//! `model-relay` keeps an AI coding assistant answering when its upstream
//! model backends are unreliable, quota-limited, or unreachable. Each
//! pattern is available as an individual crate and as a feature of this
//! meta-crate:
//!
//! - **Router** (`router` feature): an ordered fallback chain of provider
//!   adapters that reports exactly which backends were tried
//! - **Circuit Breaker** (`circuitbreaker` feature): stops calling a
//!   consistently-failing backend until a cooldown elapses
//! - **Rate Limiter** (`ratelimiter` feature): in-memory token bucket and
//!   persistent rolling-window quota accounting that survives restarts
//! - **Adaptive** (`adaptive` feature): environment probing and
//!   system-wide operational modes (full / degraded / autonomous /
//!   recovery)
//!
//! # Usage
//!
//! Enable the patterns you need:
//!
//! ```toml
//! [dependencies]
//! model-relay = { version = "0.1", features = ["router", "adaptive"] }
//! ```
//!
//! Or everything:
//!
//! ```toml
//! [dependencies]
//! model-relay = { version = "0.1", features = ["full"] }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "router")]
//! # {
//! use model_relay::core::{Completion, FnProvider, ProviderConfig, QueryRequest, RelayError};
//! use model_relay::router::ProviderRouter;
//!
//! # async fn example() {
//! let router = ProviderRouter::builder()
//!     .provider(
//!         ProviderConfig::builder("cloud").requests_per_minute(30).build(),
//!         FnProvider::new("cloud", |req: QueryRequest| async move {
//!             Ok::<_, RelayError>(Completion::new(format!("cloud answer to {}", req.prompt)))
//!         }),
//!     )
//!     .build();
//!
//! let response = router.query(QueryRequest::new("why is the build red?")).await;
//! println!("served by {:?}", response.provider);
//! # }
//! # }
//! ```

/// Shared types: provider contract, errors, events, response audit trail.
pub mod core {
    pub use model_relay_core::*;
}

/// Per-provider circuit breaker.
#[cfg(feature = "circuitbreaker")]
pub mod circuitbreaker {
    pub use model_relay_circuitbreaker::*;
}

/// Per-provider quota gates.
#[cfg(feature = "ratelimiter")]
pub mod ratelimiter {
    pub use model_relay_ratelimiter::*;
}

/// The fallback-chain router.
#[cfg(feature = "router")]
pub mod router {
    pub use model_relay_router::*;
}

/// Environment probing and operational modes.
#[cfg(feature = "adaptive")]
pub mod adaptive {
    pub use model_relay_adaptive::*;
}
