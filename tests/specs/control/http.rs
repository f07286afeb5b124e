//! Control surface specs
//!
//! Verify the HTTP endpoints drive a live scheduler: ad-hoc runs apply the
//! current publication, and disabling stops runs until re-enabled.

use crate::prelude::*;
use ap_daemon::{router, ListenCtx, PullerMetrics, StatusBody};
use ap_engine::{Schedule, Scheduler};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const WAIT: Duration = Duration::from_secs(10);

struct Live {
    puller: Puller,
    ctx: ListenCtx,
    scheduler: Scheduler,
}

impl Live {
    fn start(puller: Puller) -> Self {
        let (coordinator, state) = puller.coordinator();
        let scheduler = Scheduler::start(coordinator, Schedule::new(Duration::from_secs(3600), Duration::ZERO).unwrap());
        let ctx = ListenCtx {
            state,
            trigger: scheduler.trigger(),
            metrics: Arc::new(PullerMetrics::new("0.3.0", false).unwrap()),
            hostname: Arc::from(HOST),
        };
        Self { puller, ctx, scheduler }
    }

    async fn post(&self, path: &str, form: &str) -> StatusCode {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        let response = router(self.ctx.clone()).oneshot(request).await.unwrap();
        response.status()
    }

    async fn status(&self) -> StatusBody {
        let request = Request::get("/ansible/status").body(Body::empty()).unwrap();
        let response = router(self.ctx.clone()).oneshot(request).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn settle(&self) {
        assert!(eventually(WAIT, || !self.ctx.state.is_running()).await);
    }
}

#[tokio::test]
#[serial(path_env)]
async fn adhoc_run_applies_the_latest_publication() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));
    let live = Live::start(puller);
    assert!(eventually(WAIT, || live.puller.runs().len() == 1).await);
    live.settle().await;

    live.puller.publish(&Bundle::new(&[("hosts", "node-1\n")]).with_file("ansible/site.yml", "- hosts: db\n"));
    assert_eq!(live.post("/ansible/adhoc-run", "").await, StatusCode::FOUND);

    assert!(eventually(WAIT, || live.puller.runs().len() == 2).await);
    live.settle().await;
    assert_eq!(live.puller.state("playbook").unwrap(), "- hosts: db\n");
    assert!(live.status().await.ansible_last_run_success);
    live.scheduler.shutdown().await;
}

#[tokio::test]
#[serial(path_env)]
async fn disabled_puller_ignores_adhoc_runs_until_enabled() {
    let puller = Puller::new(CLEAN_RECAP, 0);
    puller.publish(&Bundle::new(&[("hosts", "node-1\n")]));
    let live = Live::start(puller);
    assert!(eventually(WAIT, || live.puller.runs().len() == 1).await);
    live.settle().await;

    assert_eq!(live.post("/ansible/disable", "disable-reason=freeze").await, StatusCode::FOUND);
    assert_eq!(live.post("/ansible/adhoc-run", "").await, StatusCode::FOUND);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let status = live.status().await;
    assert!(status.ansible_disabled);
    assert!(status.ansible_last_run_success);
    assert_eq!(live.ctx.state.snapshot().disable_reason, "freeze");
    assert_eq!(live.puller.runs().len(), 1);

    assert_eq!(live.post("/ansible/enable", "").await, StatusCode::FOUND);
    assert_eq!(live.post("/ansible/adhoc-run", "").await, StatusCode::FOUND);
    assert!(eventually(WAIT, || live.puller.runs().len() == 2).await);
    live.scheduler.shutdown().await;
}
