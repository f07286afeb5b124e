//! Bundle refresh specs
//!
//! Verify the cached bundle is reused while the published checksum matches
//! and replaced when a new bundle is published.

use crate::prelude::*;

#[tokio::test]
#[serial(path_env)]
async fn matching_cache_is_reused() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    let checksum = puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));
    let (mut coordinator, _) = puller.coordinator();
    coordinator.run_once().await;

    // Replace the bundle body but keep the old checksum: a run that
    // downloaded would now fail the integrity check.
    puller.publish_raw(b"not a bundle", Some(checksum.as_str()));
    let outcome = coordinator.run_once().await;

    assert_eq!(outcome, RunOutcome::Succeeded);
    assert_eq!(Checksum::of_file(&puller.config.cache_file).unwrap(), Some(checksum));
    assert_eq!(puller.runs().len(), 2);
}

#[tokio::test]
#[serial(path_env)]
async fn new_publication_replaces_the_cache() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));
    let (mut coordinator, _) = puller.coordinator();
    coordinator.run_once().await;
    assert_eq!(puller.state("playbook").unwrap(), "- hosts: all\n");

    let updated = Bundle::new(&[("hosts", "node-1\n")]).with_file("ansible/site.yml", "- hosts: web\n");
    let checksum = puller.publish(&updated);
    assert_eq!(coordinator.run_once().await, RunOutcome::Succeeded);

    assert_eq!(Checksum::of_file(&puller.config.cache_file).unwrap(), Some(checksum));
    assert_eq!(puller.state("playbook").unwrap(), "- hosts: web\n");
}

#[tokio::test]
#[serial(path_env)]
async fn explicit_checksum_locator_overrides_the_companion() {
    let mut puller = Puller::new(CLEAN_RECAP, 0);
    let body = Bundle::new(&[("hosts", "node-1\n")]).tgz();
    puller.publish_raw(&body, Some("00000000000000000000000000000000"));
    let sums = puller.repo("SUMS");
    std::fs::write(&sums, Checksum::of_bytes(&body).to_string()).unwrap();
    puller.config.checksum_locator = Some(format!("file://{}", sums.display()));
    let (mut coordinator, _) = puller.coordinator();

    assert_eq!(coordinator.run_once().await, RunOutcome::Succeeded);
}
