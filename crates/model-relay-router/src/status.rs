//! Read-only status snapshots for telemetry and UI consumers.

use model_relay_circuitbreaker::BreakerSnapshot;
use model_relay_core::{HealthStatus, ProviderKind};

/// Point-in-time quota view of one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Requests admissible right now without waiting.
    pub available: u32,
    /// Remaining day allowance, when a day ceiling is configured
    /// (persistent limiters only).
    pub day_remaining: Option<u32>,
    /// Whether the counters survive process restarts.
    pub persistent: bool,
}

/// Point-in-time view of one provider in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatusReport {
    /// Provider identity.
    pub name: String,
    /// The kind of environment the backend lives in.
    pub kind: ProviderKind,
    /// Whether the router will try this provider at all.
    pub enabled: bool,
    /// Health as last observed by the router.
    pub health: HealthStatus,
    /// The provider's breaker, snapshotted without mutation.
    pub breaker: BreakerSnapshot,
    /// Local attempts made against this provider (including retries).
    pub total_requests: u64,
    /// Attempts that produced a reply.
    pub successful_requests: u64,
    /// Candidate visits that ended in failure.
    pub error_count: u64,
    /// Quota headroom.
    pub quota: QuotaSnapshot,
}

/// Snapshot of the whole chain, in configured order.
///
/// Taking a snapshot mutates nothing; two snapshots with no intervening
/// queries are identical.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterStatus {
    /// Per-provider reports, in fallback-chain order.
    pub providers: Vec<ProviderStatusReport>,
}

impl RouterStatus {
    /// Looks up one provider's report by identity.
    pub fn provider(&self, name: &str) -> Option<&ProviderStatusReport> {
        self.providers.iter().find(|p| p.name == name)
    }
}
