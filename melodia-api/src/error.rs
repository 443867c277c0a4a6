//! API error type
//!
//! Every failure leaves the API as `{"error": {"code", "message", "field"?}}`
//! with the matching status. Internal failures are logged and answered with a
//! generic message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use melodia_common::auth::TokenError;
use melodia_import::ImportError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed JSON, query string or path (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request with invalid field values (422)
    #[error("Validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// Missing, invalid or expired credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// External catalog not configured (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// External catalog or audio source failed (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message, field) = match self {
            ApiError::BadRequest(msg) => ("BAD_REQUEST", msg, None),
            ApiError::Validation { field, message } => ("VALIDATION_ERROR", message, field),
            ApiError::Unauthorized(msg) => ("UNAUTHORIZED", msg, None),
            ApiError::Forbidden(msg) => ("FORBIDDEN", msg, None),
            ApiError::NotFound(msg) => ("NOT_FOUND", msg, None),
            ApiError::Conflict(msg) => ("CONFLICT", msg, None),
            ApiError::ServiceUnavailable(msg) => ("SERVICE_UNAVAILABLE", msg, None),
            ApiError::BadGateway(msg) => ("BAD_GATEWAY", msg, None),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                ("INTERNAL_ERROR", "Internal server error".to_string(), None)
            }
        };

        let mut detail = json!({
            "code": code,
            "message": message,
        });
        if let Some(field) = field {
            detail["field"] = json!(field);
        }

        let body = Json(json!({ "error": detail }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl From<melodia_common::Error> for ApiError {
    fn from(err: melodia_common::Error) -> Self {
        use melodia_common::Error;

        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::InvalidInput(msg) => ApiError::Validation {
                field: None,
                message: msg,
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(msg) => ApiError::Internal(format!("Token encoding failed: {}", msg)),
            TokenError::Expired => ApiError::Unauthorized("Token has expired".to_string()),
            TokenError::Invalid | TokenError::WrongKind { .. } => {
                ApiError::Unauthorized("Could not validate credentials".to_string())
            }
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingCredentials => ApiError::ServiceUnavailable(err.to_string()),
            ImportError::Catalog(_) | ImportError::Http(_) => {
                warn!("Catalog request failed: {}", err);
                ApiError::BadGateway(err.to_string())
            }
            ImportError::InvalidInput(msg) => ApiError::Validation {
                field: None,
                message: msg,
            },
            ImportError::Database(inner) => inner.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Valid JSON that does not fit the payload type (missing field, wrong type)
            JsonRejection::JsonDataError(e) => ApiError::Validation {
                field: None,
                message: e.body_text(),
            },
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
