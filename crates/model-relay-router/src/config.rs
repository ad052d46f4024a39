use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use model_relay_circuitbreaker::BreakerConfig;
use model_relay_core::{EventListeners, FnListener, HealthStatus, Provider, ProviderConfig};
use model_relay_ratelimiter::{PersistentRateLimiter, RateLimiterConfig, TokenBucket};
use tokio::sync::Mutex;

use crate::events::{RouterEvent, SkipReason};
use crate::router::{ChainEntry, Gate, Limiter, ProviderRouter, ProviderStats};

/// Builder for a [`ProviderRouter`].
///
/// Providers are tried in the order they are added; that order is the
/// fallback chain for the router's whole lifetime.
pub struct RouterBuilder {
    name: String,
    providers: Vec<(ProviderConfig, Arc<dyn Provider>)>,
    failure_threshold: u32,
    recovery_timeout: Duration,
    half_open_max_calls: u32,
    quota_dir: Option<PathBuf>,
    event_listeners: EventListeners<RouterEvent>,
}

impl RouterBuilder {
    /// Creates a builder with default values.
    ///
    /// Defaults:
    /// - name: `"relay"`
    /// - failure_threshold: 5
    /// - recovery_timeout: 30 seconds
    /// - half_open_max_calls: 1
    /// - quota state: in-memory token buckets
    pub fn new() -> Self {
        Self {
            name: "relay".to_string(),
            providers: Vec::new(),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
            quota_dir: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Names this router instance (used in events, logs and metrics).
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a provider to the fallback chain.
    pub fn provider<P>(mut self, config: ProviderConfig, adapter: P) -> Self
    where
        P: Provider + 'static,
    {
        self.providers.push((config, Arc::new(adapter)));
        self
    }

    /// Appends an already-shared provider to the fallback chain.
    pub fn provider_arc(mut self, config: ProviderConfig, adapter: Arc<dyn Provider>) -> Self {
        self.providers.push((config, adapter));
        self
    }

    /// Sets the consecutive-failure threshold for every provider's breaker.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Sets how long a tripped breaker refuses calls before probing.
    ///
    /// Default: 30 seconds
    pub fn recovery_timeout(mut self, duration: Duration) -> Self {
        self.recovery_timeout = duration;
        self
    }

    /// Sets the half-open probing budget for every provider's breaker.
    ///
    /// Default: 1
    pub fn half_open_max_calls(mut self, n: u32) -> Self {
        self.half_open_max_calls = n;
        self
    }

    /// Persists quota accounting under this directory, one state file per
    /// provider, so usage survives process restarts. Without it every
    /// provider gets an in-memory token bucket.
    pub fn quota_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quota_dir = Some(dir.into());
        self
    }

    /// Registers a callback when the chain falls through to a provider
    /// other than the first candidate.
    ///
    /// # Callback Signature
    /// `Fn(&str)` - the provider now being tried.
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RouterEvent| {
                if let RouterEvent::FallbackEngaged { provider, .. } = event {
                    f(provider);
                }
            }));
        self
    }

    /// Registers a callback when a candidate is skipped without being
    /// invoked (disabled, breaker open, or quota exhausted).
    ///
    /// # Callback Signature
    /// `Fn(&str, SkipReason)` - the skipped provider and why.
    pub fn on_provider_skipped<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, SkipReason) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RouterEvent| {
                if let RouterEvent::ProviderSkipped {
                    provider, reason, ..
                } = event
                {
                    f(provider, *reason);
                }
            }));
        self
    }

    /// Registers a callback when every candidate failed or was
    /// unavailable.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - how many providers were actually invoked.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RouterEvent| {
                if let RouterEvent::ChainExhausted { attempted, .. } = event {
                    f(*attempted);
                }
            }));
        self
    }

    /// Builds the router, wiring a breaker and a rate limiter to every
    /// provider.
    ///
    /// # Panics
    ///
    /// Panics on malformed construction input: an empty chain, duplicate
    /// provider names, a config whose name differs from its adapter's, or
    /// a quota directory that cannot be prepared. Construction is the only
    /// place this crate raises; `query` never does.
    pub fn build(self) -> ProviderRouter {
        if self.providers.is_empty() {
            panic!("a router needs at least one provider");
        }

        let mut seen = HashSet::new();
        for (config, adapter) in &self.providers {
            if config.name() != adapter.name() {
                panic!(
                    "provider config '{}' does not match adapter '{}'",
                    config.name(),
                    adapter.name()
                );
            }
            if !seen.insert(config.name().to_string()) {
                panic!("duplicate provider '{}' in chain", config.name());
            }
        }

        let entries = self
            .providers
            .into_iter()
            .map(|(config, adapter)| {
                let breaker = BreakerConfig::builder()
                    .failure_threshold(self.failure_threshold)
                    .recovery_timeout(self.recovery_timeout)
                    .half_open_max_calls(self.half_open_max_calls)
                    .name(config.name())
                    .build();

                let mut limiter_config = RateLimiterConfig::builder()
                    .requests_per_minute(config.requests_per_minute())
                    .name(config.name());
                if let Some(rpd) = config.requests_per_day() {
                    limiter_config = limiter_config.requests_per_day(rpd);
                }
                let limiter_config = limiter_config.build();

                let limiter = match &self.quota_dir {
                    Some(dir) => Limiter::Persistent(
                        PersistentRateLimiter::open(limiter_config, dir).unwrap_or_else(|err| {
                            panic!(
                                "cannot prepare quota state for '{}' under {}: {}",
                                config.name(),
                                dir.display(),
                                err
                            )
                        }),
                    ),
                    None => Limiter::Bucket(TokenBucket::new(limiter_config)),
                };

                let health = if config.enabled() {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Unavailable
                };

                ChainEntry {
                    config,
                    adapter,
                    gate: Mutex::new(Gate {
                        breaker,
                        limiter,
                        stats: ProviderStats {
                            total_requests: 0,
                            successful_requests: 0,
                            error_count: 0,
                            health,
                        },
                    }),
                }
            })
            .collect();

        ProviderRouter {
            name: self.name,
            entries,
            listeners: self.event_listeners,
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_relay_core::{Completion, FnProvider, QueryRequest};

    fn echo(name: &str) -> impl Provider + 'static {
        let name = name.to_string();
        FnProvider::new(name, |req: QueryRequest| async move {
            Ok::<_, model_relay_core::RelayError>(Completion::new(req.prompt))
        })
    }

    #[test]
    #[should_panic(expected = "at least one provider")]
    fn empty_chain_rejected() {
        let _ = ProviderRouter::builder().build();
    }

    #[test]
    #[should_panic(expected = "duplicate provider")]
    fn duplicate_names_rejected() {
        let _ = ProviderRouter::builder()
            .provider(ProviderConfig::builder("twin").build(), echo("twin"))
            .provider(ProviderConfig::builder("twin").build(), echo("twin"))
            .build();
    }

    #[test]
    #[should_panic(expected = "does not match adapter")]
    fn mismatched_identity_rejected() {
        let _ = ProviderRouter::builder()
            .provider(ProviderConfig::builder("config-name").build(), echo("other"))
            .build();
    }
}
