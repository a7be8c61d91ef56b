// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /v1/actions/:package/:action/invoke` — decode the envelope,
//! validate the input against the action's schema, and hand off to the
//! lifecycle manager. A thin translation layer only: every rule beyond
//! HTTP framing lives in `as-engine`/`as-envelope`.

use std::collections::HashMap;
use std::time::Duration;

use as_core::{ErrorKind, RunStatus};
use as_engine::{InvokeMode, InvokeOutcome, Invocation};
use as_envelope::{decode_envelope, RequestParts};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use crate::api::error::ApiError;
use crate::state::AppState;

pub const RUN_ID_HEADER: &str = "x-action-server-run-id";
pub const RUN_STATUS_HEADER: &str = "x-action-run-status";
pub const ASYNC_COMPLETION_HEADER: &str = "x-action-async-completion";
pub const COMPOSITE_BODY_HEADER: &str = "x-action-composite-body";

fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string())))
        .collect()
}

pub async fn invoke(
    State(state): State<AppState>,
    Path((package_slug, action_slug)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let header_map = lowercase_headers(&headers);
    let composite_body = header_map.contains_key(COMPOSITE_BODY_HEADER);

    let raw_body: serde_json::Value = if body.is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| ErrorKind::BadEnvelope(format!("invalid JSON body: {e}")))?
    };

    let parts = RequestParts { composite_body, body: raw_body, headers: header_map.clone() };
    let (input_payload, envelope) = decode_envelope(&parts, &state.decrypt_keys)?;

    let snapshot = state.catalog.current();
    let (_package, action) = snapshot
        .find_action(&package_slug, &action_slug)
        .ok_or_else(|| ErrorKind::UnknownAction(format!("{package_slug}.{action_slug}")))?;

    if !jsonschema::is_valid(&action.input_schema, &input_payload) {
        return Err(ErrorKind::SchemaViolation(format!(
            "input does not conform to {package_slug}.{action_slug}'s input schema"
        ))
        .into());
    }

    let mode = match envelope.async_timeout_secs {
        Some(secs) => InvokeMode::Deferred { timeout: Duration::from_secs(secs) },
        None => InvokeMode::Sync,
    };
    let callback_url = envelope.async_callback_url.clone();

    let invocation = Invocation {
        package_slug,
        action_slug,
        input_payload,
        envelope,
        headers: header_map,
        mode,
        callback_url,
    };

    match state.manager.invoke(invocation).await? {
        InvokeOutcome::Completed(run) => {
            let run_id_header = run.id.to_string();
            let status_header = run.status.to_string();
            let mut response = match run.status {
                RunStatus::Pass => {
                    Json(run.result_payload.unwrap_or(serde_json::Value::Null)).into_response()
                }
                _ => (
                    StatusCode::OK,
                    Json(serde_json::json!({
                        "error": run.error_message.unwrap_or_default(),
                        "status": status_header,
                    })),
                )
                    .into_response(),
            };
            let headers = response.headers_mut();
            headers.insert(RUN_ID_HEADER, run_id_header.parse().map_err(bad_header)?);
            headers.insert(RUN_STATUS_HEADER, status_header.parse().map_err(bad_header)?);
            Ok(response)
        }
        InvokeOutcome::Pending(run_id) => {
            let run_id_header = run_id.to_string();
            let mut response = (StatusCode::ACCEPTED, Json(serde_json::json!({ "run_id": run_id }))).into_response();
            let headers = response.headers_mut();
            headers.insert(RUN_ID_HEADER, run_id_header.parse().map_err(bad_header)?);
            headers.insert(ASYNC_COMPLETION_HEADER, "1".parse().map_err(bad_header)?);
            Ok(response)
        }
    }
}

fn bad_header<E: std::fmt::Display>(e: E) -> ApiError {
    ErrorKind::BadEnvelope(format!("could not build response header: {e}")).into()
}
