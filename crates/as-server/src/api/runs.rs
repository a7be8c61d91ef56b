// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run inspection and control:
//! - `GET /v1/runs`                      — cursored list with filters
//! - `GET /v1/runs/:id`                  — a single run
//! - `GET /v1/runs/by-request-id/:pkg/:action/:request_id` — idempotency lookup
//! - `POST /v1/runs/:id/cancel`          — request cancellation

use as_core::{RunId, RunStatus};
use as_storage::RunFilter;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::state::AppState;

fn default_page_size() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub package_slug: Option<String>,
    #[serde(default)]
    pub action_slug: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub page_after: Option<String>,
}

fn parse_status(s: &str) -> Option<RunStatus> {
    match s.to_ascii_uppercase().as_str() {
        "NOT_RUN" => Some(RunStatus::NotRun),
        "RUNNING" => Some(RunStatus::Running),
        "PASS" => Some(RunStatus::Pass),
        "FAIL" => Some(RunStatus::Fail),
        "CANCELLED" => Some(RunStatus::Cancelled),
        _ => None,
    }
}

pub async fn list_runs(State(state): State<AppState>, Query(q): Query<ListRunsQuery>) -> Result<Response, ApiError> {
    let filter = RunFilter {
        status: q.status.as_deref().and_then(parse_status),
        package_slug: q.package_slug,
        action_slug: q.action_slug,
    };
    let page_size = q.page_size.clamp(1, 200);
    let page = state.manager.list_runs(&filter, page_size, q.page_after.as_deref())?;
    Ok(Json(serde_json::json!({
        "runs": page.runs,
        "next_page_cursor": page.next_cursor,
    }))
    .into_response())
}

pub async fn get_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Result<Response, ApiError> {
    let run_id = RunId::from_string(run_id);
    match state.manager.get_run(&run_id)? {
        Some(run) => Ok(Json(run).into_response()),
        None => Ok((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "run not found" }))).into_response()),
    }
}

pub async fn get_run_by_request_id(
    State(state): State<AppState>,
    Path((package_slug, action_slug, request_id)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    match state.manager.find_run_by_request_id(&package_slug, &action_slug, &request_id)? {
        Some(run) => Ok(Json(run).into_response()),
        None => Ok((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "run not found" }))).into_response()),
    }
}

pub async fn cancel_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Result<Response, ApiError> {
    let run_id = RunId::from_string(run_id);
    if state.manager.get_run(&run_id)?.is_none() {
        return Ok((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "run not found" }))).into_response());
    }
    state.manager.cancel(run_id).await;
    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "run_id": run_id }))).into_response())
}
