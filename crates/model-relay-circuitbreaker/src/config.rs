use std::time::Duration;

use model_relay_core::{EventListeners, FnListener};

use crate::breaker::{Breaker, CircuitState};
use crate::events::BreakerEvent;

/// Configuration for a provider circuit breaker.
pub struct BreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) recovery_timeout: Duration,
    pub(crate) half_open_max_calls: u32,
    pub(crate) event_listeners: EventListeners<BreakerEvent>,
    pub(crate) name: String,
}

impl BreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }
}

/// Builder for configuring and constructing a [`Breaker`].
pub struct BreakerConfigBuilder {
    failure_threshold: u32,
    recovery_timeout: Duration,
    half_open_max_calls: u32,
    event_listeners: EventListeners<BreakerEvent>,
    name: String,
}

impl BreakerConfigBuilder {
    /// Creates a new builder with default values.
    ///
    /// Defaults:
    /// - failure_threshold: 5
    /// - recovery_timeout: 30 seconds
    /// - half_open_max_calls: 1
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the number of consecutive failures that opens the circuit.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Sets how long the circuit stays open before permitting a probing
    /// call.
    ///
    /// Default: 30 seconds
    pub fn recovery_timeout(mut self, duration: Duration) -> Self {
        self.recovery_timeout = duration;
        self
    }

    /// Sets both the probing-call budget in half-open state and the number
    /// of consecutive probe successes required to close the circuit.
    ///
    /// Default: 1
    pub fn half_open_max_calls(mut self, n: u32) -> Self {
        self.half_open_max_calls = n;
        self
    }

    /// Names this breaker after the provider it guards (used in events,
    /// logs and metrics).
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback for state transitions.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState, CircuitState)` - the state being left and the
    /// state being entered.
    ///
    /// # Example
    /// ```rust
    /// use model_relay_circuitbreaker::{BreakerConfig, CircuitState};
    ///
    /// let breaker = BreakerConfig::builder()
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("provider tripped: {:?} -> {:?}", from, to);
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback for refused calls (circuit open, or half-open
    /// budget spent).
    ///
    /// # Callback Signature
    /// `Fn()` - called with no parameters per rejection.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if matches!(event, BreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for recorded successes.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState)` - the state at the time the success was recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for recorded failures.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState)` - the state at the time the failure was recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Builds the configuration and returns a closed [`Breaker`].
    ///
    /// # Panics
    ///
    /// Panics if `failure_threshold` or `half_open_max_calls` is zero.
    pub fn build(self) -> Breaker {
        if self.failure_threshold == 0 {
            panic!("failure_threshold must be at least 1");
        }
        if self.half_open_max_calls == 0 {
            panic!("half_open_max_calls must be at least 1");
        }

        Breaker::new(BreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: self.recovery_timeout,
            half_open_max_calls: self.half_open_max_calls,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

impl Default for BreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
