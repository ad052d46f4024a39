//! Environment probing and operational-mode management.
//!
//! An AI coding assistant spans very different environments: sometimes the
//! full stack is reachable (cloud APIs, an orchestration service,
//! authenticated CLI models), sometimes only parts of it, sometimes
//! nothing but local inference. Rather than letting every caller
//! rediscover that per request, a [`ModeManager`] probes the environment
//! once, maps the result onto a system-wide [`OperationalMode`], and keeps
//! a bounded history of every transition and why it happened.
//!
//! The probe-to-mode mapping is a pluggable [`ModePolicy`];
//! [`DefaultModePolicy`] implements the reference table:
//!
//! | internet | orchestrator | credentials | mode |
//! |----------|--------------|-------------|------|
//! | false    | *            | *           | [`Recovery`](OperationalMode::Recovery) |
//! | true     | *            | false       | [`Autonomous`](OperationalMode::Autonomous) |
//! | true     | false        | true        | [`Degraded`](OperationalMode::Degraded) |
//! | true     | true         | true        | [`Full`](OperationalMode::Full) |
//!
//! The manager holds no persisted state: it is constructed at process
//! start, probed, and passed to whatever needs to know the mode. It never
//! raises; probe failures simply resolve to a more conservative mode.
//!
//! # Example
//!
//! ```rust,no_run
//! use model_relay_adaptive::{ModeManager, NetworkProbe, OperationalMode};
//!
//! # async fn example() {
//! let manager = ModeManager::builder()
//!     .probe(
//!         NetworkProbe::builder()
//!             .orchestrator_addr("10.0.0.7:8700")
//!             .credential_path("/home/dev/.assistant/auth.json")
//!             .build(),
//!     )
//!     .build();
//!
//! let mode = manager.evaluate().await;
//! if mode == OperationalMode::Recovery {
//!     eprintln!("offline: {:?}", manager.get_status().history.last());
//! }
//! # }
//! ```

mod manager;
mod policy;
mod probe;

pub use manager::{ModeManager, ModeManagerBuilder, ModeStatus, ModeTransition, OperationalMode};
pub use policy::{DefaultModePolicy, ModeDecision, ModePolicy};
pub use probe::{
    CredentialFile, NetworkProbe, NetworkProbeBuilder, ProbeCheck, ProbeReport, TcpReachability,
};
