// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP control and status surface.
//!
//! Handlers only read the shared run state, flip `disabled`, or enqueue a
//! trigger; none of them wait on a run.

mod pages;

use std::io;
use std::sync::Arc;

use ap_core::RunStateHandle;
use ap_engine::{Trigger, TriggerSource};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::env::{APP_NAME, VERSION};
use crate::metrics::PullerMetrics;

const CONTROL_PATH: &str = "/ansible/control";

/// Shared context for all handlers.
#[derive(Clone)]
pub struct ListenCtx {
    pub state: RunStateHandle,
    pub trigger: Trigger,
    pub metrics: Arc<PullerMetrics>,
    pub hostname: Arc<str>,
}

/// `/ansible/status` body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusBody {
    pub app_name: String,
    pub hostname: String,
    pub ansible_disabled: bool,
    pub ansible_running: bool,
    pub ansible_last_run_success: bool,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
struct DisableForm {
    #[serde(rename = "disable-reason", default)]
    reason: String,
}

pub fn router(ctx: ListenCtx) -> Router {
    Router::new()
        .route("/", get(index))
        .route(CONTROL_PATH, get(control))
        .route("/ansible/status", get(status))
        .route("/ansible/adhoc-run", post(adhoc_run))
        .route("/ansible/disable", post(disable))
        .route("/ansible/enable", post(enable))
        .route("/metrics", get(metrics))
        .with_state(ctx)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(listener: TcpListener, ctx: ListenCtx, shutdown: CancellationToken) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "control surface listening");
    }
    axum::serve(listener, router(ctx)).with_graceful_shutdown(async move { shutdown.cancelled().await }).await
}

async fn index() -> Html<String> {
    Html(pages::index())
}

async fn control(State(ctx): State<ListenCtx>) -> Html<String> {
    Html(pages::control(&ctx.hostname, &ctx.state.snapshot()))
}

async fn status(State(ctx): State<ListenCtx>) -> Json<StatusBody> {
    let snapshot = ctx.state.snapshot();
    Json(StatusBody {
        app_name: APP_NAME.to_string(),
        hostname: ctx.hostname.to_string(),
        ansible_disabled: snapshot.disabled,
        ansible_running: snapshot.running,
        ansible_last_run_success: snapshot.last_run_success,
        version: VERSION.to_string(),
    })
}

async fn adhoc_run(State(ctx): State<ListenCtx>) -> Response {
    let queued = ctx.trigger.request(TriggerSource::Manual);
    info!(queued, "ad-hoc run requested");
    back_to_control()
}

/// The reason is optional; a bodiless POST disables with no reason.
async fn disable(State(ctx): State<ListenCtx>, form: Option<Form<DisableForm>>) -> Response {
    let reason = form.map(|Form(f)| f.reason.trim().to_string()).unwrap_or_default();
    info!(%reason, "runs disabled");
    ctx.state.disable(reason);
    ctx.metrics.set_disabled(true);
    back_to_control()
}

async fn enable(State(ctx): State<ListenCtx>) -> Response {
    info!("runs enabled");
    ctx.state.enable();
    ctx.metrics.set_disabled(false);
    back_to_control()
}

async fn metrics(State(ctx): State<ListenCtx>) -> Response {
    ctx.metrics.set_disabled(ctx.state.is_disabled());
    match ctx.metrics.encode_text() {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => {
            error!(error = %e, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn back_to_control() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, CONTROL_PATH)]).into_response()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
