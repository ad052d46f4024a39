//! The provider capability contract and its configuration.
//!
//! A [`Provider`] wraps exactly one concrete backend behind a uniform
//! `query`/`health_check` surface. The router composes `dyn Provider`
//! values and is agnostic to what sits behind them; transport details
//! (HTTP clients, CLI subprocesses, LAN sockets) live in adapter crates.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RelayError;

/// The kind of environment a backend lives in.
///
/// Purely descriptive: routing never branches on kind, it only reports it
/// through status snapshots so telemetry can distinguish a metered cloud
/// API from a free local daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Metered cloud API reached over the internet.
    CloudApi,
    /// OAuth-authenticated model wrapped behind a local CLI binary.
    AuthenticatedCli,
    /// Inference daemon on this machine (e.g. an Ollama-style server).
    LocalDaemon,
    /// Phone-tethered or otherwise LAN-reachable inference endpoint.
    LanInference,
    /// Self-hosted inference on a remote machine.
    RemoteInference,
}

impl ProviderKind {
    /// Stable lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::CloudApi => "cloud_api",
            ProviderKind::AuthenticatedCli => "authenticated_cli",
            ProviderKind::LocalDaemon => "local_daemon",
            ProviderKind::LanInference => "lan_inference",
            ProviderKind::RemoteInference => "remote_inference",
        }
    }
}

/// Health of a provider as observed by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Recent calls are succeeding.
    Healthy,
    /// Recent calls have failed but the provider is still being tried.
    Degraded,
    /// The provider is not currently callable (breaker open, disabled).
    Unavailable,
}

/// One logical request flowing through the router.
///
/// The relay does not decide what prompt to send and does not parse what
/// comes back; both fields are opaque here.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The prompt text to submit.
    pub prompt: String,
    /// Optional pre-rendered context to submit alongside the prompt.
    pub context: Option<String>,
}

impl QueryRequest {
    /// Creates a request with no context.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
        }
    }

    /// Attaches context to the request.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A successful reply from one backend.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The model output, unparsed.
    pub content: String,
    /// Cost attributed to this call, in the adapter's currency (zero for
    /// local backends).
    pub cost: f64,
}

impl Completion {
    /// Creates a zero-cost completion.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            cost: 0.0,
        }
    }

    /// Sets the cost attributed to this call.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

/// Capability contract for one concrete backend.
///
/// Implementations must fail fast with
/// [`RelayError::Configuration`] on every call when they cannot
/// authenticate (e.g. a missing credential), rather than attempting
/// network I/O that is doomed anyway.
///
/// # Examples
///
/// ```rust
/// use model_relay_core::{Completion, HealthStatus, Provider, QueryRequest, RelayError};
/// use async_trait::async_trait;
///
/// struct CannedProvider;
///
/// #[async_trait]
/// impl Provider for CannedProvider {
///     fn name(&self) -> &str {
///         "canned"
///     }
///
///     async fn query(&self, _request: &QueryRequest) -> Result<Completion, RelayError> {
///         Ok(Completion::new("canned reply").with_cost(0.0))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identity of this provider; used in audit trails, events and
    /// the persistent quota state filename.
    fn name(&self) -> &str;

    /// Submits one request to the backend.
    async fn query(&self, request: &QueryRequest) -> Result<Completion, RelayError>;

    /// Cheap liveness check, used by status refreshes rather than the hot
    /// routing path. The default assumes a healthy backend.
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

/// A closure-backed [`Provider`], the quickest way to stand up an adapter
/// in tests and demos.
///
/// # Examples
///
/// ```rust
/// use model_relay_core::{Completion, FnProvider, Provider, QueryRequest, RelayError};
///
/// # async fn example() {
/// let flaky = FnProvider::new("flaky", |req: QueryRequest| async move {
///     Ok::<_, RelayError>(Completion::new(format!("echo: {}", req.prompt)))
/// });
/// assert_eq!(flaky.name(), "flaky");
/// # }
/// ```
pub struct FnProvider<F> {
    name: String,
    f: F,
}

impl<F> FnProvider<F> {
    /// Creates a provider that answers queries with `f`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> Provider for FnProvider<F>
where
    F: Fn(QueryRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Completion, RelayError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, request: &QueryRequest) -> Result<Completion, RelayError> {
        (self.f)(request.clone()).await
    }
}

/// Immutable per-provider settings, fixed at router construction.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub(crate) name: String,
    pub(crate) kind: ProviderKind,
    pub(crate) enabled: bool,
    pub(crate) credential_env: Option<String>,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: u32,
    pub(crate) requests_per_minute: u32,
    pub(crate) requests_per_day: Option<u32>,
}

impl ProviderConfig {
    /// Creates a new configuration builder for the named provider.
    pub fn builder(name: impl Into<String>) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(name)
    }

    /// The provider identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of environment this backend lives in.
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Whether the router should try this provider at all.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Environment variable holding this provider's credential, if it
    /// needs one.
    pub fn credential_env(&self) -> Option<&str> {
        self.credential_env.as_deref()
    }

    /// Resolves the credential from the environment.
    ///
    /// Returns `None` when no credential reference is configured or the
    /// variable is unset or empty. Adapters use this to fail fast with a
    /// configuration-class error.
    pub fn credential(&self) -> Option<String> {
        let key = self.credential_env.as_deref()?;
        match std::env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Per-call deadline enforced by the router.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Maximum local attempts per router candidate visit.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Requests-per-minute quota ceiling.
    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    /// Requests-per-day quota ceiling, if the backend has one.
    pub fn requests_per_day(&self) -> Option<u32> {
        self.requests_per_day
    }
}

/// Builder for [`ProviderConfig`].
#[derive(Debug, Clone)]
pub struct ProviderConfigBuilder {
    name: String,
    kind: ProviderKind,
    enabled: bool,
    credential_env: Option<String>,
    timeout: Duration,
    max_retries: u32,
    requests_per_minute: u32,
    requests_per_day: Option<u32>,
}

impl ProviderConfigBuilder {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - kind: [`ProviderKind::CloudApi`]
    /// - enabled: true
    /// - credential_env: none
    /// - timeout: 30 seconds
    /// - max_retries: 1
    /// - requests_per_minute: 60
    /// - requests_per_day: none
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::CloudApi,
            enabled: true,
            credential_env: None,
            timeout: Duration::from_secs(30),
            max_retries: 1,
            requests_per_minute: 60,
            requests_per_day: None,
        }
    }

    /// Sets the kind of environment this backend lives in.
    pub fn kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Enables or disables the provider. Disabled providers stay in the
    /// chain (order is fixed at construction) but are never tried.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Names the environment variable holding this provider's credential.
    pub fn credential_env(mut self, env_key: impl Into<String>) -> Self {
        self.credential_env = Some(env_key.into());
        self
    }

    /// Sets the per-call deadline. A call exceeding it counts as a failed
    /// attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of local attempts the router makes against this
    /// provider before falling through to the next one.
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = attempts;
        self
    }

    /// Sets the requests-per-minute quota ceiling.
    pub fn requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = rpm;
        self
    }

    /// Sets the requests-per-day quota ceiling.
    pub fn requests_per_day(mut self, rpd: u32) -> Self {
        self.requests_per_day = Some(rpd);
        self
    }

    /// Builds the configuration.
    ///
    /// # Panics
    ///
    /// Panics if the provider name is empty, `requests_per_minute` is zero,
    /// or `max_retries` is zero.
    pub fn build(self) -> ProviderConfig {
        if self.name.is_empty() {
            panic!("provider name must not be empty");
        }
        if self.requests_per_minute == 0 {
            panic!("requests_per_minute must be at least 1");
        }
        if self.max_retries == 0 {
            panic!("max_retries must be at least 1");
        }

        ProviderConfig {
            name: self.name,
            kind: self.kind,
            enabled: self.enabled,
            credential_env: self.credential_env,
            timeout: self.timeout,
            max_retries: self.max_retries,
            requests_per_minute: self.requests_per_minute,
            requests_per_day: self.requests_per_day,
        }
    }
}
