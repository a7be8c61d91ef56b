// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PUT /v1/packages/:package/secrets` — stage secrets for a package in
//! memory, for delivery to future invocations that don't carry them in
//! the envelope. Never written to disk; cleared on restart.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};

use crate::api::error::ApiError;
use crate::state::AppState;

pub async fn set_package_secrets(
    State(state): State<AppState>,
    Path(package_slug): Path<String>,
    Json(secrets): Json<HashMap<String, serde_json::Value>>,
) -> Result<Response, ApiError> {
    if state.catalog.current().package(&package_slug).is_none() {
        return Err(as_core::ErrorKind::UnknownAction(package_slug).into());
    }
    let count = secrets.len();
    state.manager.set_package_secrets(&package_slug, secrets);
    Ok(Json(serde_json::json!({ "package_slug": package_slug, "secrets_staged": count })).into_response())
}
