//! Events emitted by the provider router.

use std::time::{Duration, Instant};

use model_relay_core::{RelayError, RelayEvent};

/// Why a candidate was skipped without being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The provider is disabled in its configuration.
    Disabled,
    /// The provider's circuit breaker refused the call.
    CircuitOpen,
    /// The provider's quota could not admit within the call deadline.
    QuotaExhausted,
}

impl SkipReason {
    /// Stable lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Disabled => "disabled",
            SkipReason::CircuitOpen => "circuit_open",
            SkipReason::QuotaExhausted => "quota_exhausted",
        }
    }
}

/// Events emitted by a [`ProviderRouter`](crate::ProviderRouter).
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// A local attempt against a provider is starting.
    AttemptStarted {
        /// The provider being invoked.
        provider: String,
        /// When the event occurred.
        timestamp: Instant,
        /// 1-based local attempt number.
        attempt: u32,
    },

    /// A candidate was skipped without being invoked.
    ProviderSkipped {
        /// The skipped provider.
        provider: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Why it was skipped.
        reason: SkipReason,
    },

    /// A provider's local attempts were exhausted without success.
    AttemptFailed {
        /// The failing provider.
        provider: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The provider's final error.
        error: RelayError,
    },

    /// The chain fell through to a provider other than the first candidate.
    FallbackEngaged {
        /// The provider now being tried.
        provider: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// A query finished with a reply.
    QueryCompleted {
        /// The provider that served the reply.
        provider: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Wall-clock duration of the whole routing pass.
        duration: Duration,
        /// Whether the reply came from a fallback candidate.
        fallback_used: bool,
    },

    /// Every candidate failed or was unavailable.
    ChainExhausted {
        /// Name of the router instance.
        router: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How many providers were actually invoked.
        attempted: usize,
    },
}

impl RelayEvent for RouterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::AttemptStarted { .. } => "attempt_started",
            Self::ProviderSkipped { .. } => "provider_skipped",
            Self::AttemptFailed { .. } => "attempt_failed",
            Self::FallbackEngaged { .. } => "fallback_engaged",
            Self::QueryCompleted { .. } => "query_completed",
            Self::ChainExhausted { .. } => "chain_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::AttemptStarted { timestamp, .. }
            | Self::ProviderSkipped { timestamp, .. }
            | Self::AttemptFailed { timestamp, .. }
            | Self::FallbackEngaged { timestamp, .. }
            | Self::QueryCompleted { timestamp, .. }
            | Self::ChainExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::AttemptStarted { provider, .. }
            | Self::ProviderSkipped { provider, .. }
            | Self::AttemptFailed { provider, .. }
            | Self::FallbackEngaged { provider, .. }
            | Self::QueryCompleted { provider, .. } => provider,
            Self::ChainExhausted { router, .. } => router,
        }
    }
}
