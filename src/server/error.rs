//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, ApiError>`; classified provider errors
//! surface as structured JSON rather than raw transport failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{ErrorCode, ErrorRecord};

pub enum ApiError {
    /// No enabled provider with this instance name.
    UnknownProvider(String),
    /// A classified upstream failure.
    Provider(ErrorRecord),
}

impl From<ErrorRecord> for ApiError {
    fn from(record: ErrorRecord) -> Self {
        ApiError::Provider(record)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::UnknownProvider(name) => (
                StatusCode::NOT_FOUND,
                axum::Json(json!({ "error": format!("unknown provider '{name}'") })),
            )
                .into_response(),
            ApiError::Provider(record) => {
                let status = match record.code {
                    ErrorCode::NotFound => StatusCode::NOT_FOUND,
                    ErrorCode::AggregationFailure => StatusCode::INTERNAL_SERVER_ERROR,
                    // Everything else is an upstream failure.
                    _ => StatusCode::BAD_GATEWAY,
                };

                if status.is_server_error() {
                    tracing::error!(
                        status = %status,
                        code = %record.code,
                        error = %record,
                        "Provider error in API handler"
                    );
                }

                let body = json!({
                    "code": record.code,
                    "message": record.message,
                    "http_status": record.http_status,
                });

                (status, axum::Json(body)).into_response()
            }
        }
    }
}
