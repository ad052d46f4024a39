use std::sync::Arc;
use std::time::{Duration, Instant};

use model_relay_circuitbreaker::{Breaker, CircuitState};
use model_relay_core::{
    Completion, EventListeners, HealthStatus, Provider, ProviderConfig, QueryRequest, RelayError,
    Response, ResponseMetadata,
};
use model_relay_ratelimiter::{PersistentRateLimiter, TokenBucket};
use tokio::sync::Mutex;

use crate::config::RouterBuilder;
use crate::events::{RouterEvent, SkipReason};
use crate::status::{ProviderStatusReport, QuotaSnapshot, RouterStatus};
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// Per-call routing options.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Try this provider first, then the rest of the chain in configured
    /// order. Unknown names are ignored.
    pub preferred_provider: Option<String>,
    /// When false, the router stops after the first candidate instead of
    /// falling through the chain.
    pub fallback_enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            preferred_provider: None,
            fallback_enabled: true,
        }
    }
}

impl QueryOptions {
    /// Options preferring the named provider.
    pub fn preferred(provider: impl Into<String>) -> Self {
        Self {
            preferred_provider: Some(provider.into()),
            ..Self::default()
        }
    }

    /// Disables fallback for this call.
    pub fn without_fallback(mut self) -> Self {
        self.fallback_enabled = false;
        self
    }
}

/// Either quota gate, unified for the router.
pub(crate) enum Limiter {
    Bucket(TokenBucket),
    Persistent(PersistentRateLimiter),
}

impl Limiter {
    async fn acquire_before(&self, deadline: tokio::time::Instant) -> Result<Duration, RelayError> {
        match self {
            Limiter::Bucket(bucket) => bucket.acquire_before(deadline).await,
            Limiter::Persistent(limiter) => limiter.acquire_before(deadline).await,
        }
    }

    fn quota(&self) -> QuotaSnapshot {
        match self {
            Limiter::Bucket(bucket) => QuotaSnapshot {
                available: bucket.available_tokens().floor() as u32,
                day_remaining: None,
                persistent: false,
            },
            Limiter::Persistent(limiter) => QuotaSnapshot {
                available: limiter.remaining_minute(),
                day_remaining: limiter.remaining_day(),
                persistent: true,
            },
        }
    }
}

/// Mutable per-provider counters, owned exclusively by the router.
pub(crate) struct ProviderStats {
    pub(crate) total_requests: u64,
    pub(crate) successful_requests: u64,
    pub(crate) error_count: u64,
    pub(crate) health: HealthStatus,
}

/// Breaker, limiter and stats of one provider, locked together so one
/// check-admit-call-record cycle is exclusive per provider.
pub(crate) struct Gate {
    pub(crate) breaker: Breaker,
    pub(crate) limiter: Limiter,
    pub(crate) stats: ProviderStats,
}

pub(crate) struct ChainEntry {
    pub(crate) config: ProviderConfig,
    pub(crate) adapter: Arc<dyn Provider>,
    pub(crate) gate: Mutex<Gate>,
}

/// The fallback chain callers invoke.
///
/// Chain order is fixed at construction and equals configuration order;
/// runtime health only gates whether a provider is tried, never its
/// position. Construct through [`ProviderRouter::builder`].
pub struct ProviderRouter {
    pub(crate) name: String,
    pub(crate) entries: Vec<ChainEntry>,
    pub(crate) listeners: EventListeners<RouterEvent>,
}

impl ProviderRouter {
    /// Creates a new router builder.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Name of this router instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider identities in fallback-chain order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.config.name()).collect()
    }

    /// Routes one request through the chain with default options.
    pub async fn query(&self, request: QueryRequest) -> Response {
        self.query_with(request, QueryOptions::default()).await
    }

    /// Routes one request through the chain.
    ///
    /// Candidates are tried strictly in sequence, never in parallel, so a
    /// single logical request can never spend against two paid backends at
    /// once. The first success wins and later candidates are not touched.
    /// Always returns a [`Response`]; total failure is
    /// `success == false` with an `AllProvidersExhausted` error and the
    /// audit trail of everything that was actually tried.
    pub async fn query_with(&self, request: QueryRequest, options: QueryOptions) -> Response {
        let started = Instant::now();
        let try_list = self.try_list(options.preferred_provider.as_deref());
        let mut metadata = ResponseMetadata::default();

        for (position, idx) in try_list.into_iter().enumerate() {
            let entry = &self.entries[idx];
            let provider = entry.config.name();

            if !entry.config.enabled() {
                self.emit_skipped(provider, SkipReason::Disabled);
                if !options.fallback_enabled {
                    break;
                }
                continue;
            }

            // One lock spans breaker check, quota admission, the call and
            // the outcome recording, so concurrent queries cannot
            // interleave a half-finished cycle on the same provider.
            let mut gate = entry.gate.lock().await;

            if !gate.breaker.can_execute() {
                gate.stats.health = HealthStatus::Unavailable;
                self.emit_skipped(provider, SkipReason::CircuitOpen);
                drop(gate);
                if !options.fallback_enabled {
                    break;
                }
                continue;
            }

            let deadline = tokio::time::Instant::now() + entry.config.timeout();
            if gate.limiter.acquire_before(deadline).await.is_err() {
                self.emit_skipped(provider, SkipReason::QuotaExhausted);
                drop(gate);
                if !options.fallback_enabled {
                    break;
                }
                continue;
            }

            if position > 0 {
                self.listeners.emit(&RouterEvent::FallbackEngaged {
                    provider: provider.to_string(),
                    timestamp: Instant::now(),
                });
                #[cfg(feature = "tracing")]
                tracing::debug!(router = %self.name, provider, "falling back");
            }

            match self.attempt(entry, &mut gate, &request).await {
                Ok(completion) => {
                    gate.breaker.record_success();
                    gate.stats.successful_requests += 1;
                    gate.stats.health = HealthStatus::Healthy;
                    metadata.record_attempt(provider, None);
                    metadata.fallback_used = position > 0;

                    let duration = started.elapsed();
                    self.listeners.emit(&RouterEvent::QueryCompleted {
                        provider: provider.to_string(),
                        timestamp: Instant::now(),
                        duration,
                        fallback_used: metadata.fallback_used,
                    });

                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        router = %self.name,
                        provider,
                        fallback = metadata.fallback_used,
                        elapsed_ms = duration.as_millis() as u64,
                        "query served"
                    );

                    #[cfg(feature = "metrics")]
                    {
                        counter!("relay_router_queries_total", "router" => self.name.clone(), "outcome" => "success")
                            .increment(1);
                        if metadata.fallback_used {
                            counter!("relay_router_fallbacks_total", "router" => self.name.clone())
                                .increment(1);
                        }
                        histogram!("relay_router_query_seconds", "router" => self.name.clone())
                            .record(duration.as_secs_f64());
                    }

                    return Response::success(
                        provider,
                        completion.content,
                        completion.cost,
                        duration,
                        metadata,
                    );
                }
                Err(error) => {
                    if error.counts_as_breaker_failure() {
                        gate.breaker.record_failure();
                    }
                    gate.stats.error_count += 1;
                    gate.stats.health = if gate.breaker.state() == CircuitState::Open {
                        HealthStatus::Unavailable
                    } else {
                        HealthStatus::Degraded
                    };

                    self.listeners.emit(&RouterEvent::AttemptFailed {
                        provider: provider.to_string(),
                        timestamp: Instant::now(),
                        error: error.clone(),
                    });

                    #[cfg(feature = "tracing")]
                    tracing::warn!(router = %self.name, provider, %error, "provider failed");

                    metadata.record_attempt(provider, Some(error));
                    drop(gate);
                    if !options.fallback_enabled {
                        break;
                    }
                }
            }
        }

        let attempted = metadata.attempted();
        self.listeners.emit(&RouterEvent::ChainExhausted {
            router: self.name.clone(),
            timestamp: Instant::now(),
            attempted,
        });

        let duration = started.elapsed();

        #[cfg(feature = "tracing")]
        tracing::warn!(
            router = %self.name,
            attempted,
            elapsed_ms = duration.as_millis() as u64,
            "all providers exhausted"
        );

        #[cfg(feature = "metrics")]
        counter!("relay_router_queries_total", "router" => self.name.clone(), "outcome" => "exhausted")
            .increment(1);

        Response::failure(
            RelayError::AllProvidersExhausted { attempted },
            duration,
            metadata,
        )
    }

    /// Up to `max_retries` local attempts against one provider, each
    /// bounded by the provider's timeout. A configuration-class error
    /// fails the candidate immediately; retrying a missing credential
    /// cannot help.
    async fn attempt(
        &self,
        entry: &ChainEntry,
        gate: &mut Gate,
        request: &QueryRequest,
    ) -> Result<Completion, RelayError> {
        let provider = entry.config.name();
        let timeout = entry.config.timeout();
        let mut last_error: Option<RelayError> = None;

        for attempt in 1..=entry.config.max_retries() {
            gate.stats.total_requests += 1;
            self.listeners.emit(&RouterEvent::AttemptStarted {
                provider: provider.to_string(),
                timestamp: Instant::now(),
                attempt,
            });

            match tokio::time::timeout(timeout, entry.adapter.query(request)).await {
                Ok(Ok(completion)) => return Ok(completion),
                Ok(Err(error)) => {
                    let fail_fast = error.is_configuration();
                    last_error = Some(error);
                    if fail_fast {
                        break;
                    }
                }
                Err(_) => {
                    last_error = Some(RelayError::Timeout {
                        provider: provider.to_string(),
                        elapsed: timeout,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RelayError::Transport {
            provider: provider.to_string(),
            message: "no attempts were made".to_string(),
        }))
    }

    /// Builds the ordered candidate list: the preferred provider first
    /// (when known), then the configured chain with the duplicate removed.
    fn try_list(&self, preferred: Option<&str>) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.entries.len());

        if let Some(name) = preferred {
            match self.entries.iter().position(|e| e.config.name() == name) {
                Some(idx) => order.push(idx),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        router = %self.name,
                        provider = name,
                        "preferred provider not in chain, ignoring"
                    );
                }
            }
        }

        for idx in 0..self.entries.len() {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }
        order
    }

    /// Snapshot of per-provider health, breaker state and counters.
    ///
    /// Mutates nothing; two snapshots with no intervening queries are
    /// identical.
    pub async fn get_status(&self) -> RouterStatus {
        let mut providers = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let gate = entry.gate.lock().await;
            providers.push(ProviderStatusReport {
                name: entry.config.name().to_string(),
                kind: entry.config.kind(),
                enabled: entry.config.enabled(),
                health: gate.stats.health,
                breaker: gate.breaker.snapshot(),
                total_requests: gate.stats.total_requests,
                successful_requests: gate.stats.successful_requests,
                error_count: gate.stats.error_count,
                quota: gate.limiter.quota(),
            });
        }
        RouterStatus { providers }
    }

    /// Runs every enabled adapter's own health check and folds the result
    /// into the router's health view.
    ///
    /// An open breaker is not overwritten by adapter optimism; the breaker
    /// decides when an unavailable provider may be probed again.
    pub async fn health_check_all(&self) -> Vec<(String, HealthStatus)> {
        let mut results = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let name = entry.config.name().to_string();
            if !entry.config.enabled() {
                results.push((name, HealthStatus::Unavailable));
                continue;
            }

            let observed = entry.adapter.health_check().await;
            let mut gate = entry.gate.lock().await;
            if gate.breaker.state() != CircuitState::Open {
                gate.stats.health = observed;
            }
            results.push((name, observed));
        }
        results
    }

    fn emit_skipped(&self, provider: &str, reason: SkipReason) {
        self.listeners.emit(&RouterEvent::ProviderSkipped {
            provider: provider.to_string(),
            timestamp: Instant::now(),
            reason,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            router = %self.name,
            provider,
            reason = reason.as_str(),
            "provider skipped"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "relay_router_skips_total",
            "router" => self.name.clone(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_relay_core::FnProvider;

    fn two_provider_router() -> ProviderRouter {
        ProviderRouter::builder()
            .provider(
                ProviderConfig::builder("first").build(),
                FnProvider::new("first", |_req: QueryRequest| async {
                    Ok::<_, RelayError>(Completion::new("first"))
                }),
            )
            .provider(
                ProviderConfig::builder("second").build(),
                FnProvider::new("second", |_req: QueryRequest| async {
                    Ok::<_, RelayError>(Completion::new("second"))
                }),
            )
            .build()
    }

    #[test]
    fn try_list_keeps_configured_order() {
        let router = two_provider_router();
        assert_eq!(router.try_list(None), vec![0, 1]);
    }

    #[test]
    fn try_list_moves_preferred_to_front_without_duplicating() {
        let router = two_provider_router();
        assert_eq!(router.try_list(Some("second")), vec![1, 0]);
        assert_eq!(router.try_list(Some("first")), vec![0, 1]);
    }

    #[test]
    fn try_list_ignores_unknown_preferred() {
        let router = two_provider_router();
        assert_eq!(router.try_list(Some("missing")), vec![0, 1]);
    }
}
