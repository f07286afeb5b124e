//! Applying a published bundle
//!
//! Verify a run fetches the bundle, prepares the environment, finds this
//! host in an inventory, and applies the playbook to it.

use crate::prelude::*;
use std::os::unix::fs::PermissionsExt;

#[tokio::test]
#[serial(path_env)]
async fn published_bundle_is_applied_to_this_host() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-1\nnode-2\n")]));
    let (mut coordinator, state) = puller.coordinator();

    let outcome = coordinator.run_once().await;

    assert_eq!(outcome, RunOutcome::Succeeded);
    assert_eq!(puller.runs(), vec!["site.yml -i hosts -l node-1 -c local"]);
    let pip = puller.state("pip").unwrap();
    assert!(pip.trim().starts_with("install -r ") && pip.trim().ends_with("requirements.txt"), "{pip}");
    let snapshot = state.snapshot();
    assert!(snapshot.last_run_success);
    assert!(!snapshot.running);
}

#[tokio::test]
#[serial(path_env)]
async fn play_summary_is_reported_for_the_resolved_target() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));
    let (mut coordinator, _) = puller.coordinator();

    coordinator.run_once().await;

    similar_asserts::assert_eq!(
        puller.telemetry.events(),
        vec![
            TelemetryEvent::Started,
            TelemetryEvent::Summary {
                target: HOST.to_string(),
                stats: HostStats { changed: 2, ok: 7, skipped: 1, ..Default::default() },
            },
            TelemetryEvent::Finished { success: true },
        ]
    );
}

#[tokio::test]
#[serial(path_env)]
async fn later_inventory_is_used_when_earlier_ones_do_not_list_the_host() {
    let mut puller = Puller::new(CLEAN_RECAP, 0);
    puller.config.inventories = vec!["staging".into(), "production".into()];
    puller.publish(&Bundle::new(&[("staging", "node-10\nnode-1.staging\n"), ("production", "192.0.2.10\n")]));
    let (mut coordinator, _) = puller.coordinator();

    assert_eq!(coordinator.run_once().await, RunOutcome::Succeeded);
    assert_eq!(puller.runs(), vec!["site.yml -i production -l 192.0.2.10 -c local"]);
}

#[tokio::test]
#[serial(path_env)]
async fn run_output_is_kept_in_owner_only_logs() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));
    let (mut coordinator, _) = puller.coordinator();

    coordinator.run_once().await;

    assert_eq!(puller.log(OUTPUT_LOG).unwrap().trim(), CLEAN_RECAP);
    assert_eq!(puller.log(ERROR_LOG).unwrap(), "TASK [apply]\n");
    let mode = std::fs::metadata(puller.config.log_dir.join(OUTPUT_LOG)).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
#[serial(path_env)]
async fn bundle_without_a_published_checksum_is_still_applied() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish_raw(&Bundle::new(&[("hosts", "node-1\n")]).tgz(), None);
    let (mut coordinator, _) = puller.coordinator();

    assert_eq!(coordinator.run_once().await, RunOutcome::Succeeded);
    assert!(puller.config.cache_file.exists());
}
