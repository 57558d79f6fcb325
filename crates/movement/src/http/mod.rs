//! Response envelope and error classification shared by every router.
//!
//! Handlers answer with `{ success, data, message }` on success and
//! `{ success: false, error, message }` on failure. Workflow error enums implement
//! [`Classify`] so the status code is decided in one place.

pub mod de;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Coarse error taxonomy mapped onto HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Upstream,
    Internal,
}

impl ErrorClass {
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorClass::Validation => StatusCode::BAD_REQUEST,
            ErrorClass::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorClass::Forbidden => StatusCode::FORBIDDEN,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Conflict => StatusCode::CONFLICT,
            ErrorClass::Upstream => StatusCode::BAD_GATEWAY,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation_error",
            ErrorClass::Unauthorized => "unauthorized",
            ErrorClass::Forbidden => "forbidden",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Conflict => "conflict",
            ErrorClass::Upstream => "upstream_error",
            ErrorClass::Internal => "internal_error",
        }
    }
}

/// Implemented by workflow errors so routers can render them uniformly.
pub trait Classify {
    fn class(&self) -> ErrorClass;

    /// Structured detail attached to the error body, if any.
    fn details(&self) -> Option<Value> {
        None
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
}

pub fn success<T: Serialize>(status: StatusCode, data: T, message: impl Into<String>) -> Response {
    let body = Envelope {
        success: true,
        data,
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

pub fn failure(class: ErrorClass, message: impl Into<String>, details: Option<Value>) -> Response {
    let mut body = json!({
        "success": false,
        "error": class.label(),
        "message": message.into(),
    });
    if let (Some(details), Some(map)) = (details, body.as_object_mut()) {
        map.insert("details".to_string(), details);
    }
    (class.status(), Json(body)).into_response()
}

/// Render any classified error as the failure envelope.
///
/// Internal errors are logged in full but answered with a generic message.
pub fn error_response<E>(error: &E) -> Response
where
    E: Classify + std::fmt::Display,
{
    let class = error.class();
    if class == ErrorClass::Internal {
        tracing::error!(error = %error, "request failed");
        return failure(class, "internal server error", None);
    }
    failure(class, error.to_string(), error.details())
}

/// Malformed JSON bodies and query strings answer with the validation envelope.
pub fn rejection_response(rejection: impl std::fmt::Display) -> Response {
    failure(ErrorClass::Validation, rejection.to_string(), None)
}
