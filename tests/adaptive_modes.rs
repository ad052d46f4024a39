//! Probe-driven operational-mode selection.

use std::time::Duration;

use model_relay_adaptive::{
    CredentialFile, ModeDecision, ModeManager, NetworkProbe, OperationalMode, ProbeReport,
    TcpReachability,
};
use tempfile::TempDir;
use tokio::net::TcpListener;

fn manager_with(internet: bool, orchestrator: bool, credentials: bool) -> ModeManager {
    ModeManager::builder()
        .probe(
            NetworkProbe::builder()
                .internet_check(move || async move { internet })
                .orchestrator_check(move || async move { orchestrator })
                .credential_check(move || async move { credentials })
                .build(),
        )
        .build()
}

#[tokio::test]
async fn decision_table_reference_cases() {
    let cases = [
        ((false, true, true), OperationalMode::Recovery),
        ((false, false, false), OperationalMode::Recovery),
        ((true, false, true), OperationalMode::Degraded),
        ((true, false, false), OperationalMode::Autonomous),
        ((true, true, false), OperationalMode::Autonomous),
        ((true, true, true), OperationalMode::Full),
    ];

    for ((internet, orchestrator, credentials), expected) in cases {
        let manager = manager_with(internet, orchestrator, credentials);
        let mode = manager.evaluate().await;
        assert_eq!(
            mode, expected,
            "probes ({internet}, {orchestrator}, {credentials})"
        );
    }
}

#[tokio::test]
async fn every_transition_appends_exactly_one_entry_with_a_reason() {
    let manager = manager_with(true, true, true);

    assert_eq!(manager.get_status().history.len(), 0);
    manager.evaluate().await; // recovery -> full
    assert_eq!(manager.get_status().history.len(), 1);
    manager.evaluate().await; // unchanged, nothing appended
    assert_eq!(manager.get_status().history.len(), 1);

    manager.transition_to_mode(OperationalMode::Degraded, "operator drained the orchestrator");
    let status = manager.get_status();
    assert_eq!(status.history.len(), 2);
    assert!(status.history.iter().all(|t| !t.reason.is_empty()));
    assert_eq!(status.mode, OperationalMode::Degraded);
}

#[tokio::test]
async fn force_mode_overrides_without_probing() {
    // Probes would say Full; the override wins and no probe runs.
    let manager = manager_with(true, true, true);
    manager.force_mode(OperationalMode::Recovery, "chaos drill");

    assert_eq!(manager.current_mode(), OperationalMode::Recovery);
    let status = manager.get_status();
    assert_eq!(status.history.len(), 1);
    assert_eq!(status.history[0].reason, "chaos drill");
    assert_eq!(status.history[0].mode, OperationalMode::Recovery);
}

#[tokio::test]
async fn tcp_probe_tracks_a_real_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let probe = NetworkProbe::builder()
        .internet_check(|| async { true })
        .orchestrator_check(TcpReachability::new(addr.to_string()))
        .credential_check(|| async { true })
        .check_timeout(Duration::from_secs(1))
        .build();

    assert!(probe.probe().await.orchestrator);

    drop(listener);
    assert!(!probe.probe().await.orchestrator);
}

#[tokio::test]
async fn credential_probe_reads_the_auth_file() {
    let dir = TempDir::new().unwrap();
    let auth_path = dir.path().join("auth.json");

    let probe = NetworkProbe::builder()
        .internet_check(|| async { true })
        .orchestrator_check(|| async { true })
        .credential_check(CredentialFile::new(&auth_path))
        .build();

    assert!(!probe.probe().await.credentials);

    std::fs::write(&auth_path, r#"{"access_token":"tok","account_id":"a-1"}"#).unwrap();
    assert!(probe.probe().await.credentials);
}

#[tokio::test]
async fn custom_policy_replaces_the_reference_table() {
    // A deployment with no orchestrator at all: its absence must not
    // degrade anything.
    let manager = ModeManager::builder()
        .probe(
            NetworkProbe::builder()
                .internet_check(|| async { true })
                .orchestrator_check(|| async { false })
                .credential_check(|| async { true })
                .build(),
        )
        .policy(|report: &ProbeReport| {
            if report.internet && report.credentials {
                ModeDecision::new(OperationalMode::Full, "standalone deployment, no orchestrator")
            } else {
                ModeDecision::new(OperationalMode::Recovery, "standalone deployment offline")
            }
        })
        .build();

    assert_eq!(manager.evaluate().await, OperationalMode::Full);
}

#[tokio::test]
async fn repeated_evaluations_converge_and_history_stays_bounded() {
    let manager = ModeManager::builder()
        .probe(
            NetworkProbe::builder()
                .internet_check(|| async { true })
                .orchestrator_check(|| async { true })
                .credential_check(|| async { true })
                .build(),
        )
        .history_limit(4)
        .build();

    for i in 0..20 {
        manager.evaluate().await;
        manager.force_mode(OperationalMode::Degraded, format!("wobble {i}"));
    }

    let status = manager.get_status();
    assert!(status.history.len() <= 4);
}
