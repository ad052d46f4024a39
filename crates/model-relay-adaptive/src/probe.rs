//! Reachability and credential checks.
//!
//! Three independent boolean checks feed the mode policy: general
//! internet reachability, reachability of the coordination/orchestration
//! service, and validity of the local authenticated-CLI credentials. Each
//! check is bounded by a timeout and resolves to `false` on timeout or
//! error; probing never raises.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// One boolean environment check.
///
/// Implementors decide what "reachable" or "valid" means for their
/// resource. Closures returning a boolean future work directly:
///
/// ```rust
/// use model_relay_adaptive::ProbeCheck;
///
/// # async fn example() {
/// let always_up = || async { true };
/// assert!(always_up.check().await);
/// # }
/// ```
#[async_trait]
pub trait ProbeCheck: Send + Sync {
    /// Runs the check. Must not panic; errors resolve to `false`.
    async fn check(&self) -> bool;
}

#[async_trait]
impl<F, Fut> ProbeCheck for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send,
{
    async fn check(&self) -> bool {
        (self)().await
    }
}

/// Checks reachability by opening a TCP connection to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpReachability {
    addr: String,
}

impl TcpReachability {
    /// Creates a check against the given `host:port` address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl ProbeCheck for TcpReachability {
    async fn check(&self) -> bool {
        TcpStream::connect(&self.addr).await.is_ok()
    }
}

/// Checks that a credential file exists and holds a JSON object, the
/// shape authenticated-CLI wrappers keep their tokens in.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    /// Creates a check against the given credential file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProbeCheck for CredentialFile {
    async fn check(&self) -> bool {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str::<serde_json::Value>(&contents)
                .map(|value| value.is_object())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// The result of one probing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    /// General internet reachability.
    pub internet: bool,
    /// Reachability of the coordination/orchestration service.
    pub orchestrator: bool,
    /// Validity of local authenticated-CLI credentials.
    pub credentials: bool,
}

/// Probes the surrounding environment.
///
/// The three checks run concurrently, each bounded by the configured
/// timeout; a check that times out or errors reports `false`.
pub struct NetworkProbe {
    internet: Arc<dyn ProbeCheck>,
    orchestrator: Arc<dyn ProbeCheck>,
    credentials: Arc<dyn ProbeCheck>,
    check_timeout: Duration,
}

impl NetworkProbe {
    /// Creates a new probe builder.
    pub fn builder() -> NetworkProbeBuilder {
        NetworkProbeBuilder::new()
    }

    /// Runs all three checks and returns the report.
    pub async fn probe(&self) -> ProbeReport {
        let (internet, orchestrator, credentials) = futures::join!(
            self.run(self.internet.as_ref()),
            self.run(self.orchestrator.as_ref()),
            self.run(self.credentials.as_ref()),
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(internet, orchestrator, credentials, "environment probed");

        ProbeReport {
            internet,
            orchestrator,
            credentials,
        }
    }

    async fn run(&self, check: &dyn ProbeCheck) -> bool {
        timeout(self.check_timeout, check.check())
            .await
            .unwrap_or(false)
    }
}

/// Builder for [`NetworkProbe`].
pub struct NetworkProbeBuilder {
    internet: Arc<dyn ProbeCheck>,
    orchestrator: Arc<dyn ProbeCheck>,
    credentials: Arc<dyn ProbeCheck>,
    check_timeout: Duration,
}

impl NetworkProbeBuilder {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - internet: TCP connect to `1.1.1.1:443`
    /// - orchestrator: TCP connect to `127.0.0.1:8700`
    /// - credentials: JSON object at `$HOME/.model-relay/auth.json`
    /// - check_timeout: 3 seconds
    pub fn new() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            internet: Arc::new(TcpReachability::new("1.1.1.1:443")),
            orchestrator: Arc::new(TcpReachability::new("127.0.0.1:8700")),
            credentials: Arc::new(CredentialFile::new(home.join(".model-relay/auth.json"))),
            check_timeout: Duration::from_secs(3),
        }
    }

    /// Replaces the internet reachability check.
    pub fn internet_check<C>(mut self, check: C) -> Self
    where
        C: ProbeCheck + 'static,
    {
        self.internet = Arc::new(check);
        self
    }

    /// Points the internet check at a different `host:port`.
    pub fn internet_addr(self, addr: impl Into<String>) -> Self {
        self.internet_check(TcpReachability::new(addr))
    }

    /// Replaces the orchestrator reachability check.
    pub fn orchestrator_check<C>(mut self, check: C) -> Self
    where
        C: ProbeCheck + 'static,
    {
        self.orchestrator = Arc::new(check);
        self
    }

    /// Points the orchestrator check at a different `host:port`.
    pub fn orchestrator_addr(self, addr: impl Into<String>) -> Self {
        self.orchestrator_check(TcpReachability::new(addr))
    }

    /// Replaces the credential validity check.
    pub fn credential_check<C>(mut self, check: C) -> Self
    where
        C: ProbeCheck + 'static,
    {
        self.credentials = Arc::new(check);
        self
    }

    /// Points the credential check at a different file.
    pub fn credential_path(self, path: impl Into<PathBuf>) -> Self {
        self.credential_check(CredentialFile::new(path))
    }

    /// Sets the per-check timeout. A check exceeding it reports `false`.
    ///
    /// Default: 3 seconds
    pub fn check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Builds the probe.
    pub fn build(self) -> NetworkProbe {
        NetworkProbe {
            internet: self.internet,
            orchestrator: self.orchestrator,
            credentials: self.credentials,
            check_timeout: self.check_timeout,
        }
    }
}

impl Default for NetworkProbeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
