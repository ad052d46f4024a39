use std::time::{Duration, Instant};

use crate::config::BreakerConfig;
use crate::events::BreakerEvent;
#[cfg(feature = "metrics")]
use metrics::counter;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls are allowed; consecutive failures are being counted.
    Closed,
    /// Calls are refused until the recovery timeout elapses.
    Open,
    /// A bounded number of probing calls is allowed to test recovery.
    HalfOpen,
}

impl CircuitState {
    /// Stable lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a breaker, for status snapshots.
///
/// Reading a snapshot never mutates the breaker, so repeated status
/// queries are idempotent; in particular an open breaker whose recovery
/// deadline has passed still reports `Open` until the next
/// [`Breaker::can_execute`] flips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures recorded while closed.
    pub failure_count: u32,
    /// Probing calls permitted since entering half-open.
    pub half_open_calls: u32,
    /// Consecutive probe successes since entering half-open.
    pub half_open_successes: u32,
    /// Remaining wait before an open breaker will permit a probe; `None`
    /// unless the breaker is open.
    pub time_until_recovery: Option<Duration>,
}

/// Per-provider failure/recovery state machine.
///
/// One instance guards one provider; its lifecycle matches the adapter's
/// and it is owned exclusively by the router entry that wraps both.
pub struct Breaker {
    config: BreakerConfig,
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    half_open_calls: u32,
    half_open_successes: u32,
    last_state_change: Instant,
}

impl Breaker {
    /// Creates a closed breaker from the given configuration.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            half_open_calls: 0,
            half_open_successes: 0,
            last_state_change: Instant::now(),
        }
    }

    /// The name this breaker was configured with.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Whether a call may be attempted right now.
    ///
    /// An open breaker whose recovery timeout has elapsed flips to
    /// half-open here and permits the probing call; checks before the
    /// deadline are refused without counting as failures. In half-open,
    /// permits are budgeted: once `half_open_max_calls` probes have been
    /// handed out, further checks are refused until an outcome arrives.
    pub fn can_execute(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => {
                self.emit_permitted();
                true
            }
            CircuitState::Open => {
                let recovered = self
                    .last_failure
                    .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout);
                if recovered {
                    self.transition_to(CircuitState::HalfOpen);
                    self.half_open_calls = 1;
                    self.emit_permitted();
                    true
                } else {
                    self.emit_rejected();
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_calls < self.config.half_open_max_calls {
                    self.half_open_calls += 1;
                    self.emit_permitted();
                    true
                } else {
                    self.emit_rejected();
                    false
                }
            }
        }
    }

    /// Records a successful call.
    ///
    /// In closed state this resets the consecutive-failure count. In
    /// half-open, `half_open_max_calls` consecutive successes close the
    /// breaker. A late success arriving while the breaker is open (an
    /// in-flight call finishing after the trip) is ignored.
    pub fn record_success(&mut self) {
        self.config.event_listeners.emit(&BreakerEvent::SuccessRecorded {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("relay_breaker_calls_total", "breaker" => self.config.name.clone(), "outcome" => "success")
            .increment(1);

        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= self.config.half_open_max_calls {
                    self.transition_to(CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call.
    ///
    /// In closed state, reaching `failure_threshold` consecutive failures
    /// opens the breaker. Any failure in half-open reopens it immediately
    /// and resets the recovery deadline.
    pub fn record_failure(&mut self) {
        self.last_failure = Some(Instant::now());

        self.config.event_listeners.emit(&BreakerEvent::FailureRecorded {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("relay_breaker_calls_total", "breaker" => self.config.name.clone(), "outcome" => "failure")
            .increment(1);

        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.config.failure_threshold {
                    self.transition_to(CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    /// Forces the breaker open, refusing calls until the recovery timeout
    /// elapses from now.
    pub fn force_open(&mut self) {
        self.last_failure = Some(Instant::now());
        self.transition_to(CircuitState::Open);
    }

    /// Forces the breaker closed regardless of recent history.
    pub fn force_closed(&mut self) {
        self.transition_to(CircuitState::Closed);
    }

    /// Resets the breaker to its initial closed state.
    pub fn reset(&mut self) {
        self.last_failure = None;
        self.transition_to(CircuitState::Closed);
    }

    /// Returns a read-only snapshot of the breaker.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let time_until_recovery = match self.state {
            CircuitState::Open => self.last_failure.map(|at| {
                self.config
                    .recovery_timeout
                    .saturating_sub(at.elapsed())
            }),
            _ => None,
        };

        BreakerSnapshot {
            state: self.state,
            failure_count: self.failure_count,
            half_open_calls: self.half_open_calls,
            half_open_successes: self.half_open_successes,
            time_until_recovery,
        }
    }

    fn transition_to(&mut self, state: CircuitState) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        self.config.event_listeners.emit(&BreakerEvent::StateTransition {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            from_state,
            to_state: state,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = %self.config.name,
            from = from_state.as_str(),
            to = state.as_str(),
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "relay_breaker_transitions_total",
            "breaker" => self.config.name.clone(),
            "from" => from_state.as_str(),
            "to" => state.as_str()
        )
        .increment(1);

        self.state = state;
        self.last_state_change = Instant::now();
        self.failure_count = 0;
        self.half_open_calls = 0;
        self.half_open_successes = 0;
    }

    fn emit_permitted(&self) {
        self.config.event_listeners.emit(&BreakerEvent::CallPermitted {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });
    }

    fn emit_rejected(&self) {
        self.config.event_listeners.emit(&BreakerEvent::CallRejected {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
        });

        #[cfg(feature = "metrics")]
        counter!("relay_breaker_rejections_total", "breaker" => self.config.name.clone())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn breaker(threshold: u32, recovery: Duration, half_open: u32) -> Breaker {
        BreakerConfig::builder()
            .failure_threshold(threshold)
            .recovery_timeout(recovery)
            .half_open_max_calls(half_open)
            .name("test")
            .build()
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let mut b = breaker(2, Duration::from_secs(60), 1);
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Closed);
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.can_execute());
    }

    #[test]
    fn success_resets_consecutive_count() {
        let mut b = breaker(2, Duration::from_secs(60), 1);
        b.record_failure();
        b.record_success();
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.snapshot().failure_count, 1);
    }

    #[test]
    fn recovery_deadline_gates_half_open() {
        let mut b = breaker(1, Duration::from_millis(40), 1);
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.can_execute());
        assert_eq!(b.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(60));
        assert!(b.can_execute());
        assert_eq!(b.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_permits_exactly_the_budget() {
        let mut b = breaker(1, Duration::from_millis(10), 1);
        b.record_failure();
        std::thread::sleep(Duration::from_millis(20));

        assert!(b.can_execute());
        // Budget spent; next check before an outcome is refused.
        assert!(!b.can_execute());

        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_needs_consecutive_successes_to_close() {
        let mut b = breaker(1, Duration::from_millis(10), 2);
        b.record_failure();
        std::thread::sleep(Duration::from_millis(20));

        assert!(b.can_execute());
        b.record_success();
        assert_eq!(b.state(), CircuitState::HalfOpen);

        assert!(b.can_execute());
        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let mut b = breaker(1, Duration::from_millis(10), 2);
        b.record_failure();
        std::thread::sleep(Duration::from_millis(20));

        assert!(b.can_execute());
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        // Deadline restarted; still refused right away.
        assert!(!b.can_execute());
    }

    #[test]
    fn forced_transitions() {
        let mut b = breaker(5, Duration::from_secs(60), 1);
        b.force_open();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.can_execute());

        b.force_closed();
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.can_execute());

        b.record_failure();
        b.reset();
        assert_eq!(b.snapshot().failure_count, 0);
    }

    #[test]
    fn snapshot_is_read_only() {
        let mut b = breaker(1, Duration::from_millis(5), 1);
        b.record_failure();
        std::thread::sleep(Duration::from_millis(10));

        // The deadline has passed, but snapshots must not flip the state.
        assert_eq!(b.snapshot().state, CircuitState::Open);
        assert_eq!(b.snapshot().state, CircuitState::Open);
        assert!(b.can_execute());
        assert_eq!(b.snapshot().state, CircuitState::HalfOpen);
    }

    #[test]
    fn transition_listener_fires_once_per_transition() {
        let transitions = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&transitions);

        let mut b = BreakerConfig::builder()
            .failure_threshold(1)
            .recovery_timeout(Duration::from_millis(10))
            .name("listener")
            .on_state_transition(move |_, _| {
                t.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        b.record_failure(); // closed -> open
        std::thread::sleep(Duration::from_millis(20));
        assert!(b.can_execute()); // open -> half-open
        b.record_success(); // half-open -> closed

        assert_eq!(transitions.load(Ordering::SeqCst), 3);
    }
}
