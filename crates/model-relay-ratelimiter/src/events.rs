//! Events emitted by the rate limiters.

use std::time::{Duration, Instant};

use model_relay_core::RelayEvent;

/// Events emitted by [`TokenBucket`](crate::TokenBucket) and
/// [`PersistentRateLimiter`](crate::PersistentRateLimiter).
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A request was admitted.
    Acquired {
        /// Name of the limiter instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How long the request waited for admission.
        waited: Duration,
    },

    /// Quota is exhausted; the request is about to sleep.
    Waiting {
        /// Name of the limiter instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The wait required before the next admission window.
        required: Duration,
    },

    /// Admission was abandoned because the wait would exceed the caller's
    /// deadline.
    Exhausted {
        /// Name of the limiter instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The wait that would have been required, if known.
        retry_after: Option<Duration>,
    },
}

impl RelayEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Acquired { .. } => "acquired",
            Self::Waiting { .. } => "waiting",
            Self::Exhausted { .. } => "exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Acquired { timestamp, .. }
            | Self::Waiting { timestamp, .. }
            | Self::Exhausted { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::Acquired { name, .. }
            | Self::Waiting { name, .. }
            | Self::Exhausted { name, .. } => name,
        }
    }
}
