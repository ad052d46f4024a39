//! The shared failure taxonomy for provider routing.
//!
//! Every expected failure in the routing path is a [`RelayError`] value. The
//! router, breaker and limiters never raise for any of these classes; they
//! return structured values and the error rides along in
//! [`Response::error`](crate::Response) and
//! [`ResponseMetadata::attempted_errors`](crate::ResponseMetadata).
//!
//! The variants group into four classes:
//!
//! - **Unavailable** ([`CircuitOpen`](RelayError::CircuitOpen),
//!   [`QuotaExhausted`](RelayError::QuotaExhausted)): the provider was never
//!   invoked. Skipped silently, never recorded against a breaker.
//! - **Provider** ([`Timeout`](RelayError::Timeout),
//!   [`Transport`](RelayError::Transport),
//!   [`Backend`](RelayError::Backend)): the call was made and failed.
//!   Recorded against the breaker and in the attempt audit trail.
//! - **Configuration** ([`Configuration`](RelayError::Configuration)): the
//!   adapter cannot work at all (missing credential, malformed settings).
//!   Fails fast without network I/O, short-circuits local retries, and does
//!   not count against the breaker.
//! - **Exhausted** ([`AllProvidersExhausted`](RelayError::AllProvidersExhausted)):
//!   the router's own terminal state when no candidate produced a response.

use std::time::Duration;
use thiserror::Error;

/// Errors produced while routing a query through the provider chain.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelayError {
    /// The provider's circuit breaker is open; the call was not attempted.
    #[error("circuit breaker for provider '{provider}' is open")]
    CircuitOpen {
        /// Identity of the guarded provider.
        provider: String,
    },

    /// The provider's quota is exhausted; the call was not attempted.
    #[error("quota exhausted for provider '{provider}'")]
    QuotaExhausted {
        /// Identity of the rate-limited provider.
        provider: String,
        /// How long until the exhausted window admits again, if known.
        retry_after: Option<Duration>,
    },

    /// The call exceeded the provider's configured timeout.
    #[error("provider '{provider}' timed out after {elapsed:?}")]
    Timeout {
        /// Identity of the provider that timed out.
        provider: String,
        /// The enforced deadline.
        elapsed: Duration,
    },

    /// The call failed before reaching the backend (connection refused,
    /// DNS failure, broken pipe to a CLI subprocess, ...).
    #[error("transport failure for provider '{provider}': {message}")]
    Transport {
        /// Identity of the failing provider.
        provider: String,
        /// Adapter-supplied description of the failure.
        message: String,
    },

    /// The backend answered with an error of its own.
    #[error("provider '{provider}' reported an error: {message}")]
    Backend {
        /// Identity of the failing provider.
        provider: String,
        /// Backend-supplied description of the failure.
        message: String,
    },

    /// The adapter is misconfigured (missing credential, malformed
    /// settings) and cannot make calls at all.
    #[error("provider '{provider}' is misconfigured: {message}")]
    Configuration {
        /// Identity of the misconfigured provider.
        provider: String,
        /// What is wrong with the configuration.
        message: String,
    },

    /// Every candidate in the fallback chain failed or was unavailable.
    #[error("all providers exhausted ({attempted} attempted)")]
    AllProvidersExhausted {
        /// How many providers were actually invoked (skipped ones excluded).
        attempted: usize,
    },
}

impl RelayError {
    /// Returns the provider this error is attributed to, if any.
    ///
    /// [`AllProvidersExhausted`](RelayError::AllProvidersExhausted) belongs
    /// to the chain as a whole and returns `None`.
    pub fn provider(&self) -> Option<&str> {
        match self {
            RelayError::CircuitOpen { provider }
            | RelayError::QuotaExhausted { provider, .. }
            | RelayError::Timeout { provider, .. }
            | RelayError::Transport { provider, .. }
            | RelayError::Backend { provider, .. }
            | RelayError::Configuration { provider, .. } => Some(provider),
            RelayError::AllProvidersExhausted { .. } => None,
        }
    }

    /// Returns `true` for the unavailable class: the call was never made.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            RelayError::CircuitOpen { .. } | RelayError::QuotaExhausted { .. }
        )
    }

    /// Returns `true` if the call was enforced to a deadline and missed it.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RelayError::Timeout { .. })
    }

    /// Returns `true` for configuration-class failures.
    pub fn is_configuration(&self) -> bool {
        matches!(self, RelayError::Configuration { .. })
    }

    /// Returns `true` if this is the router's terminal exhaustion error.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RelayError::AllProvidersExhausted { .. })
    }

    /// Returns `true` if this failure should count toward opening the
    /// provider's circuit breaker.
    ///
    /// Unavailable-class errors were never calls; configuration errors say
    /// nothing about backend health. Only genuine call failures count.
    pub fn counts_as_breaker_failure(&self) -> bool {
        matches!(
            self,
            RelayError::Timeout { .. }
                | RelayError::Transport { .. }
                | RelayError::Backend { .. }
        )
    }
}
