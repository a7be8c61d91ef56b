// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token authentication middleware.
//!
//! `ACTION_SERVER_API_TOKEN`'s SHA-256 digest is cached once at startup in
//! `AppState.api_token_hash`. Unset or empty disables auth entirely (dev
//! mode); otherwise every protected request must carry
//! `Authorization: Bearer <token>`, compared in constant time so the
//! response timing never leaks how many leading bytes matched.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub async fn require_api_token(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let expected_hash = match &state.api_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    let provided_hash = Sha256::digest(provided.as_bytes());
    if !bool::from(provided_hash.ct_eq(expected_hash.as_ref())) {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": "invalid or missing API token" })))
            .into_response();
    }

    next.run(req).await
}
