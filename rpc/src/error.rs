//! RPC error types and their HTTP mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use civitas_registration::RegistrationError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("server error: {0}")]
    Server(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable reason code, e.g. `identity_already_registered`.
    pub error: &'static str,
    pub reason: String,
    pub retryable: bool,
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        RpcError::InvalidRequest(rejection.body_text())
    }
}

impl RpcError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            RpcError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_request",
                    reason: msg.clone(),
                    retryable: false,
                },
            ),
            RpcError::Registration(e) => {
                let status = match e {
                    RegistrationError::Validation(_) => StatusCode::BAD_REQUEST,
                    RegistrationError::ProofRejected(_)
                    | RegistrationError::InsufficientBalance { .. } => StatusCode::FORBIDDEN,
                    RegistrationError::SybilConflict | RegistrationError::WalletTaken => {
                        StatusCode::CONFLICT
                    }
                    RegistrationError::Busy => StatusCode::TOO_MANY_REQUESTS,
                    RegistrationError::Upstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    RegistrationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let reason = match e {
                    RegistrationError::Internal(_) => "internal error".to_string(),
                    RegistrationError::Upstream { dependency, .. } => {
                        format!("{dependency} unavailable, try again later")
                    }
                    other => other.to_string(),
                };
                (
                    status,
                    ErrorBody {
                        error: e.code(),
                        reason,
                        retryable: e.is_retryable(),
                    },
                )
            }
            RpcError::Server(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "internal_error",
                    reason: "internal error".into(),
                    retryable: false,
                },
            ),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        if let RpcError::Server(msg) = &self {
            error!(error = %msg, "request failed");
        }
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civitas_registration::Dependency;

    fn status_of(e: RegistrationError) -> StatusCode {
        RpcError::from(e).parts().0
    }

    #[test]
    fn registration_errors_map_to_statuses() {
        assert_eq!(status_of(RegistrationError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(RegistrationError::ProofRejected("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(RegistrationError::InsufficientBalance {
                balance: 0,
                required: 1
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(RegistrationError::SybilConflict), StatusCode::CONFLICT);
        assert_eq!(status_of(RegistrationError::WalletTaken), StatusCode::CONFLICT);
        assert_eq!(status_of(RegistrationError::Busy), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(RegistrationError::upstream(Dependency::Verifier, "x")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(RegistrationError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let (_, body) =
            RpcError::from(RegistrationError::Internal("lmdb page 42 corrupt".into())).parts();
        assert_eq!(body.error, "internal_error");
        assert!(!body.reason.contains("lmdb"));

        let (_, body) = RpcError::from(RegistrationError::upstream(
            Dependency::Store,
            "connection refused at 10.0.0.3",
        ))
        .parts();
        assert!(!body.reason.contains("10.0.0.3"));
        assert!(body.retryable);
    }
}
