//! Pluggable probe-to-mode decision policies.

use crate::manager::OperationalMode;
use crate::probe::ProbeReport;

/// The outcome of a policy decision: the target mode and a human-readable
/// reason that ends up in the transition history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDecision {
    /// The mode the system should run in.
    pub mode: OperationalMode,
    /// Why. Never empty.
    pub reason: String,
}

impl ModeDecision {
    /// Creates a decision.
    pub fn new(mode: OperationalMode, reason: impl Into<String>) -> Self {
        Self {
            mode,
            reason: reason.into(),
        }
    }
}

/// Maps a probe report onto an operational mode.
///
/// The mapping is policy, not law: deployments with different topologies
/// (no orchestrator at all, credential-less local setups) swap in their
/// own. A closure works directly:
///
/// ```rust
/// use model_relay_adaptive::{ModeDecision, ModePolicy, OperationalMode, ProbeReport};
///
/// let always_local = |_report: &ProbeReport| {
///     ModeDecision::new(OperationalMode::Autonomous, "pinned to local inference")
/// };
/// let decision = always_local.decide(&ProbeReport {
///     internet: true,
///     orchestrator: true,
///     credentials: true,
/// });
/// assert_eq!(decision.mode, OperationalMode::Autonomous);
/// ```
pub trait ModePolicy: Send + Sync {
    /// Decides the target mode for the given probe report.
    fn decide(&self, report: &ProbeReport) -> ModeDecision;
}

impl<F> ModePolicy for F
where
    F: Fn(&ProbeReport) -> ModeDecision + Send + Sync,
{
    fn decide(&self, report: &ProbeReport) -> ModeDecision {
        self(report)
    }
}

/// The reference decision table.
///
/// No internet wins over everything (nothing remote can work, recover
/// first); missing credentials mean no authenticated LLM and no
/// coordination regardless of the orchestrator, so the system runs
/// local-only; an unreachable orchestrator alone merely degrades.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModePolicy;

impl ModePolicy for DefaultModePolicy {
    fn decide(&self, report: &ProbeReport) -> ModeDecision {
        if !report.internet {
            ModeDecision::new(
                OperationalMode::Recovery,
                "internet unreachable, entering recovery",
            )
        } else if !report.credentials {
            ModeDecision::new(
                OperationalMode::Autonomous,
                "authenticated-CLI credentials invalid, running local-only",
            )
        } else if !report.orchestrator {
            ModeDecision::new(
                OperationalMode::Degraded,
                "orchestration service unreachable, degrading",
            )
        } else {
            ModeDecision::new(OperationalMode::Full, "all environment checks passed")
        }
    }
}
