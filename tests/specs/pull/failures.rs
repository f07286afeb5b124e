//! Failed run specs
//!
//! Verify each failure class ends the run, records it as failed, and leaves
//! the next run free to succeed.

use crate::prelude::*;

async fn failed_with(puller: &Puller) -> ErrorKind {
    let (mut coordinator, state) = puller.coordinator();
    let outcome = coordinator.run_once().await;
    assert!(!state.snapshot().last_run_success);
    assert!(!state.is_running());
    match outcome {
        RunOutcome::Failed(kind) => kind,
        other => panic!("expected a failed run, got {other:?}"),
    }
}

#[tokio::test]
#[serial(path_env)]
async fn nothing_published_is_a_transport_failure() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    assert_eq!(failed_with(&puller).await, ErrorKind::Transport);
    assert!(puller.state("pip").is_none());
}

#[tokio::test]
#[serial(path_env)]
async fn checksum_mismatch_is_an_integrity_failure() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish_raw(&Bundle::new(&[("hosts", "node-1\n")]).tgz(), Some("0123456789abcdef0123456789abcdef"));

    assert_eq!(failed_with(&puller).await, ErrorKind::Integrity);
    assert!(puller.runs().is_empty());
}

#[tokio::test]
#[serial(path_env)]
async fn garbled_checksum_is_a_format_failure() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish_raw(&Bundle::new(&[("hosts", "node-1\n")]).tgz(), Some("not-a-digest"));

    assert_eq!(failed_with(&puller).await, ErrorKind::Format);
}

#[tokio::test]
#[serial(path_env)]
async fn truncated_bundle_is_an_extraction_failure() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    let body = Bundle::new(&[("hosts", "node-1\n")]).tgz();
    let truncated = &body[..body.len() / 2];
    puller.publish_raw(truncated, Some(&Checksum::of_bytes(truncated).to_string()));

    assert_eq!(failed_with(&puller).await, ErrorKind::Extraction);
    assert!(puller.runs().is_empty());
}

#[tokio::test]
#[serial(path_env)]
async fn host_missing_from_every_inventory_is_a_resolution_failure() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-2\nnode-10\n")]));

    assert_eq!(failed_with(&puller).await, ErrorKind::Resolution);
    assert!(puller.runs().is_empty());
}

#[tokio::test]
#[serial(path_env)]
async fn missing_inventory_file_is_a_resolution_failure() {
    let mut puller = Puller::new(CLEAN_RECAP, 0);
    puller.config.inventories = vec!["absent".into()];
    puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));

    assert_eq!(failed_with(&puller).await, ErrorKind::Resolution);
}

#[tokio::test]
#[serial(path_env)]
async fn failing_play_is_an_execution_failure_with_logs() {
    let recap = r#"{"stats": {"node-1": {"failures": 2, "ok": 4}}}"#;
    let puller = Puller::new(recap, 2);
    puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));

    assert_eq!(failed_with(&puller).await, ErrorKind::Execution);
    assert_eq!(puller.log(OUTPUT_LOG).unwrap().trim(), recap);
    assert!(puller.telemetry.events().iter().any(|e| matches!(
        e,
        TelemetryEvent::Summary { stats: HostStats { failures: 2, ok: 4, .. }, .. }
    )));
    assert_eq!(puller.telemetry.finished(), vec![false]);
}

#[tokio::test]
#[serial(path_env)]
async fn fixed_publication_recovers_on_the_next_run() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-2\n")]));
    let (mut coordinator, state) = puller.coordinator();

    assert_eq!(coordinator.run_once().await, RunOutcome::Failed(ErrorKind::Resolution));
    assert!(!state.snapshot().last_run_success);

    puller.publish(&Bundle::new(&[("hosts", "node-2\nnode-1\n")]));
    assert_eq!(coordinator.run_once().await, RunOutcome::Succeeded);
    assert!(state.snapshot().last_run_success);
}
