//! Request-time error handling.
//!
//! Every error is rendered as a JSON body of the form `{"detail": ...}`.
//! The rendered response also carries a [`RaisedError`] extension so that
//! application-level exception handlers can replace it.

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// An HTTP error with an explicit status code and a JSON detail payload.
#[derive(Debug, Clone)]
pub struct HttpException {
    pub status: StatusCode,
    pub detail: Value,
    pub headers: HeaderMap,
}

impl HttpException {
    pub fn new(status: StatusCode, detail: impl Into<Value>) -> Self {
        Self {
            status,
            detail: detail.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Uses the canonical reason phrase of `status` as the detail.
    pub fn from_status(status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown Error");
        Self::new(status, reason)
    }

    /// Attach a response header. Invalid header names or values are dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "dropping invalid exception header"),
        }
        self
    }
}

impl std::fmt::Display for HttpException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Value::String(detail) => write!(f, "{}: {}", self.status.as_u16(), detail),
            other => write!(f, "{}: {}", self.status.as_u16(), other),
        }
    }
}

/// One entry of a request validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `["body", "email"]`
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    pub fn new(loc: Vec<String>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

/// Broad classification used to pick an exception handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    HttpException,
    RequestValidation,
    Internal,
}

/// Response extension describing the error a response was rendered from.
#[derive(Debug, Clone)]
pub struct RaisedError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub detail: Value,
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Http(HttpException),

    #[error("Request validation failed")]
    RequestValidation(Vec<ValidationIssue>),

    #[error("Not Found")]
    NotFound,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Get error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Http(_) => "HTTP_EXCEPTION",
            AppError::RequestValidation(_) => "VALIDATION_ERROR",
            AppError::NotFound => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Http(exc) => exc.status,
            AppError::RequestValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::RequestValidation(_) => ErrorKind::RequestValidation,
            AppError::Internal(_) => ErrorKind::Internal,
            _ => ErrorKind::HttpException,
        }
    }

    /// Get the client-facing detail (hides internal details)
    pub fn detail(&self) -> Value {
        match self {
            AppError::Http(exc) => exc.detail.clone(),
            AppError::RequestValidation(issues) => json!(issues),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Value::String("Internal Server Error".to_string())
            }
            other => Value::String(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let detail = self.detail();
        let headers = match &self {
            AppError::Http(exc) => exc.headers.clone(),
            AppError::Unauthorized => {
                let mut headers = HeaderMap::new();
                headers.insert("WWW-Authenticate", HeaderValue::from_static("Bearer"));
                headers
            }
            _ => HeaderMap::new(),
        };

        let mut response = (
            status,
            headers,
            Json(ErrorResponse {
                detail: detail.clone(),
            }),
        )
            .into_response();
        response.extensions_mut().insert(RaisedError {
            kind,
            status,
            detail,
        });
        response
    }
}

impl From<HttpException> for AppError {
    fn from(exc: HttpException) -> Self {
        AppError::Http(exc)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut issues: Vec<ValidationIssue> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    let msg = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    ValidationIssue::new(
                        vec!["body".to_string(), field.to_string()],
                        msg,
                        format!("value_error.{}", err.code),
                    )
                })
            })
            .collect();
        // field_errors() is backed by a HashMap
        issues.sort_by(|a, b| a.loc.cmp(&b.loc));
        AppError::RequestValidation(issues)
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn http(status: StatusCode, detail: impl Into<Value>) -> Self {
        AppError::Http(HttpException::new(status, detail))
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
