// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps the stable `ErrorKind` taxonomy onto HTTP status codes. Status
//! codes: 4xx on envelope/schema/auth failures, 5xx only on internal
//! faults, per the public surface's documented contract.

use as_core::ErrorKind;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

pub struct ApiError(pub ErrorKind);

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        Self(kind)
    }
}

impl From<as_engine::EngineError> for ApiError {
    fn from(e: as_engine::EngineError) -> Self {
        Self(e.as_wire_kind())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = Json(serde_json::json!({
            "error": self.0.as_wire_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

fn status_for(kind: &ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadEnvelope(_) | ErrorKind::SchemaViolation(_) | ErrorKind::DecryptFailed => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::UnknownAction(_) => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InvalidStateTransition { .. }
        | ErrorKind::DbFromFuture { .. }
        | ErrorKind::DataDirLocked
        | ErrorKind::WorkerCrash(_)
        | ErrorKind::CancellationAcknowledged
        | ErrorKind::HookFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
