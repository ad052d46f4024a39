//! Core infrastructure for the model-relay provider routing patterns.
//!
//! This crate holds everything the pattern crates share:
//!
//! - [`Provider`]: the capability contract every backend adapter satisfies.
//!   The router only ever sees `dyn Provider`; whether a backend is a metered
//!   cloud API, an OAuth-authenticated CLI wrapper, or a local inference
//!   daemon is an adapter concern.
//! - [`RelayError`]: the shared failure taxonomy. Expected failures travel by
//!   value through [`Response`] and `Result`; nothing in the routing path
//!   panics once construction has succeeded.
//! - [`Response`] / [`ResponseMetadata`]: the per-call audit trail reporting
//!   exactly which providers were invoked and what each returned.
//! - The event system ([`RelayEvent`], [`EventListeners`], [`FnListener`])
//!   used by every pattern crate for observability callbacks.
//!
//! # Example
//!
//! Building a throwaway adapter from a closure:
//!
//! ```rust
//! use model_relay_core::{Completion, FnProvider, Provider, QueryRequest, RelayError};
//!
//! # async fn example() {
//! let echo = FnProvider::new("echo", |req: QueryRequest| async move {
//!     Ok::<_, RelayError>(Completion::new(req.prompt))
//! });
//!
//! let reply = echo.query(&QueryRequest::new("hello")).await.unwrap();
//! assert_eq!(reply.content, "hello");
//! # }
//! ```

pub mod error;
pub mod events;
pub mod provider;
pub mod response;

pub use error::RelayError;
pub use events::{BoxedEventListener, EventListener, EventListeners, FnListener, RelayEvent};
pub use provider::{
    Completion, FnProvider, HealthStatus, Provider, ProviderConfig, ProviderConfigBuilder,
    ProviderKind, QueryRequest,
};
pub use response::{Response, ResponseMetadata};
