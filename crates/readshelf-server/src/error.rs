//! HTTP mapping of the core error taxonomy.
//!
//! Status mapping: `NotConfigured` 501, `Validation` 400, `Upstream` passes
//! the upstream status through when it is an error status (otherwise 502),
//! `Network` and `UnexpectedPayload` 502, `Serialization` 500. Upstream
//! failures attach the truncated body snippet under `"upstream"`.

use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use readshelf_core::Error;

/// A request-terminating error, ready to render as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn new(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::NotConfigured(_) => Self::new(
                StatusCode::NOT_IMPLEMENTED,
                json!({ "error": err.to_string() }),
            ),
            Error::Validation(message) => {
                Self::new(StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            Error::Upstream {
                status,
                message,
                body_snippet,
            } => {
                let code = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|c| c.is_client_error() || c.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                let body = if body_snippet.is_empty() {
                    json!({ "error": message })
                } else {
                    json!({ "error": message, "upstream": body_snippet })
                };
                Self::new(code, body)
            }
            Error::Network(_) | Error::UnexpectedPayload(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                json!({ "error": err.to_string() }),
            ),
            Error::Serialization(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::from_error(&err)
    }
}

impl From<Arc<Error>> for ApiError {
    fn from(err: Arc<Error>) -> Self {
        Self::from_error(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
