//! Ordered fallback chain over LLM provider adapters.
//!
//! The router is the unit callers actually invoke. It composes N
//! providers — each paired with its own circuit breaker and rate limiter —
//! into a chain whose order is fixed at construction. One
//! [`query`](ProviderRouter::query) tries candidates strictly in sequence:
//! a provider whose breaker refuses is skipped silently, quota admission
//! is awaited up to the provider's own timeout, the call itself gets a
//! bounded number of local attempts, and the first success wins. The
//! returned [`Response`](model_relay_core::Response) reports exactly which
//! providers were invoked and what each one said, so callers and
//! telemetry never have to guess what the chain did.
//!
//! The router never raises after construction. Total failure is an
//! ordinary `Response` with `success == false` and an
//! `AllProvidersExhausted` error.
//!
//! # Example
//!
//! ```rust,no_run
//! use model_relay_core::{Completion, FnProvider, ProviderConfig, QueryRequest, RelayError};
//! use model_relay_router::ProviderRouter;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let router = ProviderRouter::builder()
//!     .provider(
//!         ProviderConfig::builder("primary")
//!             .timeout(Duration::from_secs(30))
//!             .max_retries(2)
//!             .build(),
//!         FnProvider::new("primary", |req: QueryRequest| async move {
//!             Ok::<_, RelayError>(Completion::new(format!("primary: {}", req.prompt)))
//!         }),
//!     )
//!     .provider(
//!         ProviderConfig::builder("local-fallback").build(),
//!         FnProvider::new("local-fallback", |req: QueryRequest| async move {
//!             Ok::<_, RelayError>(Completion::new(format!("local: {}", req.prompt)))
//!         }),
//!     )
//!     .failure_threshold(3)
//!     .build();
//!
//! let response = router.query(QueryRequest::new("hello")).await;
//! assert!(response.success);
//! # }
//! ```

mod config;
mod events;
mod router;
mod status;

pub use config::RouterBuilder;
pub use events::{RouterEvent, SkipReason};
pub use router::{ProviderRouter, QueryOptions};
pub use status::{ProviderStatusReport, QuotaSnapshot, RouterStatus};
