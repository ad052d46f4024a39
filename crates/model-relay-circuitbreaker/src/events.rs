//! Events emitted by the circuit breaker.

use std::time::Instant;

use model_relay_core::RelayEvent;

use crate::breaker::CircuitState;

/// Events emitted by a [`Breaker`](crate::Breaker).
#[derive(Debug, Clone)]
pub enum BreakerEvent {
    /// The breaker moved between states.
    StateTransition {
        /// Name of the breaker instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state being left.
        from_state: CircuitState,
        /// The state being entered.
        to_state: CircuitState,
    },

    /// A call was allowed through.
    CallPermitted {
        /// Name of the breaker instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state the breaker was in when permitting.
        state: CircuitState,
    },

    /// A call was refused.
    CallRejected {
        /// Name of the breaker instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// A successful call was recorded.
    SuccessRecorded {
        /// Name of the breaker instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state at recording time.
        state: CircuitState,
    },

    /// A failed call was recorded.
    FailureRecorded {
        /// Name of the breaker instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state at recording time.
        state: CircuitState,
    },
}

impl RelayEvent for BreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::StateTransition { .. } => "state_transition",
            Self::CallPermitted { .. } => "call_permitted",
            Self::CallRejected { .. } => "call_rejected",
            Self::SuccessRecorded { .. } => "success_recorded",
            Self::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::StateTransition { timestamp, .. }
            | Self::CallPermitted { timestamp, .. }
            | Self::CallRejected { timestamp, .. }
            | Self::SuccessRecorded { timestamp, .. }
            | Self::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::StateTransition { name, .. }
            | Self::CallPermitted { name, .. }
            | Self::CallRejected { name, .. }
            | Self::SuccessRecorded { name, .. }
            | Self::FailureRecorded { name, .. } => name,
        }
    }
}
