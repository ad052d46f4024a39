//! The per-call result and its audit trail.

use std::time::Duration;

use crate::error::RelayError;

/// Audit trail of one routing pass.
///
/// `attempted_providers` and `attempted_errors` are aligned positionally
/// and record only providers that were actually invoked; candidates
/// skipped because their breaker refused or their quota was exhausted do
/// not appear at all.
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Whether the reply came from a provider other than the first one in
    /// the try-list.
    pub fallback_used: bool,
    /// Identities of the providers actually invoked, in invocation order.
    pub attempted_providers: Vec<String>,
    /// The final error of each attempted provider; `None` at the position
    /// of the provider that succeeded.
    pub attempted_errors: Vec<Option<RelayError>>,
}

impl ResponseMetadata {
    /// Records one attempted provider and its outcome.
    pub fn record_attempt(&mut self, provider: impl Into<String>, error: Option<RelayError>) {
        self.attempted_providers.push(provider.into());
        self.attempted_errors.push(error);
    }

    /// Number of providers actually invoked.
    pub fn attempted(&self) -> usize {
        debug_assert!(self.is_aligned());
        self.attempted_providers.len()
    }

    /// Whether the two attempt lists are positionally aligned. Always true
    /// when the trail is built through [`record_attempt`](Self::record_attempt).
    pub fn is_aligned(&self) -> bool {
        self.attempted_providers.len() == self.attempted_errors.len()
    }
}

/// The result of one router query. Created fresh per call and never
/// mutated after being returned.
#[derive(Debug, Clone)]
pub struct Response {
    /// Whether any provider produced a reply.
    pub success: bool,
    /// The reply content; empty on failure.
    pub content: String,
    /// Cost attributed to the call that produced the reply.
    pub cost: f64,
    /// Wall-clock duration of the whole routing pass, including waits and
    /// failed attempts.
    pub duration: Duration,
    /// Identity of the provider that served the reply; `None` when the
    /// chain was exhausted.
    pub provider: Option<String>,
    /// The terminal error; `None` on success.
    pub error: Option<RelayError>,
    /// The attempt audit trail.
    pub metadata: ResponseMetadata,
}

impl Response {
    /// Builds a successful response.
    pub fn success(
        provider: impl Into<String>,
        content: impl Into<String>,
        cost: f64,
        duration: Duration,
        metadata: ResponseMetadata,
    ) -> Self {
        Self {
            success: true,
            content: content.into(),
            cost,
            duration,
            provider: Some(provider.into()),
            error: None,
            metadata,
        }
    }

    /// Builds an aggregate failure response.
    pub fn failure(error: RelayError, duration: Duration, metadata: ResponseMetadata) -> Self {
        Self {
            success: false,
            content: String::new(),
            cost: 0.0,
            duration,
            provider: None,
            error: Some(error),
            metadata,
        }
    }
}
