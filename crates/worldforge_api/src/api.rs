//! Response envelope and error-to-status mapping.
//!
//! # Responsibility
//! - Wrap every success as `{ok:true, <key>: <value>}`.
//! - Wrap every failure as `{ok:false, error: <CODE>}` with the matching
//!   HTTP status.
//!
//! # Invariants
//! - Error bodies carry only the stable machine code, never internal detail.
//! - Each `ServiceError` kind maps to exactly one status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use serde_json::{json, Map, Value};
use worldforge_core::ServiceError;

/// Handler result: both arms render as JSON envelopes.
pub type ApiResult = Result<ApiReply, ApiReply>;

/// A rendered JSON envelope plus its HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    status: StatusCode,
    body: Value,
}

impl ApiReply {
    /// `200 {ok:true, key: value}`.
    pub fn ok(key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                let mut body = Map::new();
                body.insert("ok".to_string(), Value::Bool(true));
                body.insert(key.to_string(), value);
                Self {
                    status: StatusCode::OK,
                    body: Value::Object(body),
                }
            }
            Err(err) => {
                error!("event=http_reply module=api status=error key={key} error={err}");
                Self::failure(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    /// `200 {ok:true}` for operations without a payload.
    pub fn done() -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "ok": true }),
        }
    }

    /// `{ok:false, error: code}` with an explicit status.
    pub fn failure(status: StatusCode, code: &str) -> Self {
        Self {
            status,
            body: json!({ "ok": false, "error": code }),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// HTTP status for one service failure.
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ServiceError> for ApiReply {
    fn from(err: ServiceError) -> Self {
        Self::failure(status_for(&err), err.code())
    }
}

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{status_for, ApiReply};
    use axum::http::StatusCode;
    use serde_json::json;
    use worldforge_core::ServiceError;

    #[test]
    fn success_envelope_keys_payload_by_name() {
        let reply = ApiReply::ok("skills", vec![json!({"name": "Stealth"})]);
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(
            reply.body(),
            &json!({"ok": true, "skills": [{"name": "Stealth"}]})
        );
        assert_eq!(ApiReply::done().body(), &json!({"ok": true}));
    }

    #[test]
    fn service_errors_map_to_stable_statuses_and_codes() {
        let cases = [
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (
                ServiceError::BadRequest("name".to_string()),
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
            ),
            (
                ServiceError::NotFound("x".to_string()),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                ServiceError::Forbidden("x".to_string()),
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
            (
                ServiceError::Internal("disk full".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(status_for(&err), status);
            let reply = ApiReply::from(err);
            assert_eq!(reply.status(), status);
            assert_eq!(reply.body(), &json!({"ok": false, "error": code}));
        }
    }
}
