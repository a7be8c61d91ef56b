// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface. Routes split into public (health check) and protected
//! (everything that touches runs, the catalog, or secrets), the protected
//! half gated behind the bearer-token middleware.

pub mod auth;
pub mod error;
pub mod invoke;
pub mod runs;
pub mod secrets;
pub mod subscribe;

use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    let public = Router::new().route("/v1/health", get(health));

    let protected = Router::new()
        .route("/v1/actions/:package/:action/invoke", post(invoke::invoke))
        .route("/v1/runs", get(runs::list_runs))
        .route("/v1/runs/:id", get(runs::get_run))
        .route("/v1/runs/:id/cancel", post(runs::cancel_run))
        .route(
            "/v1/runs/by-request-id/:package/:action/:request_id",
            get(runs::get_run_by_request_id),
        )
        .route("/v1/subscribe", get(subscribe::subscribe))
        .route("/v1/packages/:package/secrets", put(secrets::set_package_secrets))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_token));

    public.merge(protected).layer(TraceLayer::new_for_http()).with_state(state)
}
