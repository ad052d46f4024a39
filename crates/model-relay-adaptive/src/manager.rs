use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::policy::{DefaultModePolicy, ModePolicy};
use crate::probe::NetworkProbe;
#[cfg(feature = "metrics")]
use metrics::counter;

/// System-wide behavioral mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalMode {
    /// Everything reachable: cloud providers, orchestration, authenticated
    /// CLI models.
    Full,
    /// Orchestration is gone but authenticated providers still work.
    Degraded,
    /// No authenticated remote LLM; local/LAN inference only.
    Autonomous,
    /// No internet at all; recover connectivity before anything else.
    Recovery,
}

impl OperationalMode {
    /// Stable lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalMode::Full => "full",
            OperationalMode::Degraded => "degraded",
            OperationalMode::Autonomous => "autonomous",
            OperationalMode::Recovery => "recovery",
        }
    }
}

impl fmt::Display for OperationalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the mode history.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeTransition {
    /// The mode entered.
    pub mode: OperationalMode,
    /// Why the transition happened. Never empty.
    pub reason: String,
    /// When the transition happened.
    pub timestamp: SystemTime,
}

/// Snapshot of the manager: current mode plus the bounded history.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeStatus {
    /// The mode the system is currently in.
    pub mode: OperationalMode,
    /// Transition history, oldest first, capped at the configured limit.
    pub history: Vec<ModeTransition>,
}

struct ManagerState {
    current: OperationalMode,
    history: VecDeque<ModeTransition>,
}

/// Probes the environment and manages the system-wide operational mode.
///
/// Holds no persisted state: construct one per process, probe it, and
/// pass it to whatever needs the mode. An explicit instance rather than a
/// process-wide global, so tests build isolated managers freely. Never
/// raises; a failing probe just lands in a more conservative mode.
pub struct ModeManager {
    probe: NetworkProbe,
    policy: Arc<dyn ModePolicy>,
    history_limit: usize,
    inner: Mutex<ManagerState>,
}

impl ModeManager {
    /// Creates a new manager builder.
    pub fn builder() -> ModeManagerBuilder {
        ModeManagerBuilder::new()
    }

    /// The mode the system is currently in.
    pub fn current_mode(&self) -> OperationalMode {
        self.inner.lock().unwrap().current
    }

    /// Probes the environment, applies the policy, and transitions when
    /// the decided mode differs from the current one.
    ///
    /// Returns the (possibly unchanged) current mode.
    pub async fn evaluate(&self) -> OperationalMode {
        let report = self.probe.probe().await;
        let decision = self.policy.decide(&report);

        if decision.mode != self.current_mode() {
            self.transition_to_mode(decision.mode, decision.reason);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(mode = decision.mode.as_str(), "mode unchanged");
        }

        decision.mode
    }

    /// Switches to `mode`, appending a [`ModeTransition`] to the history.
    pub fn transition_to_mode(&self, mode: OperationalMode, reason: impl Into<String>) {
        let reason = reason.into();
        debug_assert!(!reason.is_empty(), "mode transitions need a reason");

        #[cfg(feature = "tracing")]
        tracing::info!(mode = mode.as_str(), reason = %reason, "operational mode transition");

        #[cfg(feature = "metrics")]
        counter!("relay_mode_transitions_total", "mode" => mode.as_str()).increment(1);

        self.push(mode, reason);
    }

    /// Switches to `mode` bypassing probing entirely, for manual override
    /// and recovery testing.
    pub fn force_mode(&self, mode: OperationalMode, reason: impl Into<String>) {
        let reason = reason.into();
        debug_assert!(!reason.is_empty(), "mode transitions need a reason");

        #[cfg(feature = "tracing")]
        tracing::warn!(mode = mode.as_str(), reason = %reason, "operational mode forced");

        #[cfg(feature = "metrics")]
        counter!("relay_mode_transitions_total", "mode" => mode.as_str()).increment(1);

        self.push(mode, reason);
    }

    /// Snapshot of the current mode and the transition history.
    pub fn get_status(&self) -> ModeStatus {
        let state = self.inner.lock().unwrap();
        ModeStatus {
            mode: state.current,
            history: state.history.iter().cloned().collect(),
        }
    }

    fn push(&self, mode: OperationalMode, reason: String) {
        let mut state = self.inner.lock().unwrap();
        state.history.push_back(ModeTransition {
            mode,
            reason,
            timestamp: SystemTime::now(),
        });
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }
        state.current = mode;
    }
}

/// Builder for [`ModeManager`].
pub struct ModeManagerBuilder {
    probe: NetworkProbe,
    policy: Arc<dyn ModePolicy>,
    initial_mode: OperationalMode,
    history_limit: usize,
}

impl ModeManagerBuilder {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - probe: [`NetworkProbe::builder`] defaults
    /// - policy: [`DefaultModePolicy`]
    /// - initial_mode: [`OperationalMode::Recovery`] (conservative until
    ///   the first probe says otherwise)
    /// - history_limit: 64
    pub fn new() -> Self {
        Self {
            probe: NetworkProbe::builder().build(),
            policy: Arc::new(DefaultModePolicy),
            initial_mode: OperationalMode::Recovery,
            history_limit: 64,
        }
    }

    /// Sets the environment probe.
    pub fn probe(mut self, probe: NetworkProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Sets the probe-to-mode decision policy.
    pub fn policy<P>(mut self, policy: P) -> Self
    where
        P: ModePolicy + 'static,
    {
        self.policy = Arc::new(policy);
        self
    }

    /// Sets the mode the manager starts in, before any probing.
    ///
    /// Default: [`OperationalMode::Recovery`]
    pub fn initial_mode(mut self, mode: OperationalMode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Sets the maximum number of retained history entries.
    ///
    /// Default: 64
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Builds the manager.
    ///
    /// # Panics
    ///
    /// Panics if `history_limit` is zero.
    pub fn build(self) -> ModeManager {
        if self.history_limit == 0 {
            panic!("history_limit must be at least 1");
        }

        ModeManager {
            probe: self.probe,
            policy: self.policy,
            history_limit: self.history_limit,
            inner: Mutex::new(ManagerState {
                current: self.initial_mode,
                history: VecDeque::new(),
            }),
        }
    }
}

impl Default for ModeManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
