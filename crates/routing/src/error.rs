//! Route registration errors.
//!
//! These are raised while an application is being assembled, never while
//! it serves requests.

use axum::http::Method;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("A path prefix must start with '/' and must not end with '/', got {0:?}")]
    InvalidPrefix(String),

    #[error("Prefix and path cannot be both empty (path operation: {0})")]
    EmptyPath(String),

    #[error("Unknown path converter {converter:?} in {path:?}")]
    UnknownConverter { path: String, converter: String },

    #[error("The 'path' converter must be the last segment of {0:?}")]
    MisplacedPathConverter(String),

    #[error("Method {0} cannot be routed")]
    UnsupportedMethod(Method),

    #[error("Route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("Route {path:?} conflicts with {existing:?}")]
    ConflictingRoute { path: String, existing: String },

    #[error("No route named {name:?} matches the given path parameters")]
    NoMatchFound { name: String },

    #[error("Invalid middleware: {0}")]
    InvalidMiddleware(String),
}

impl RouterError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        RouterError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type RouterResult<T> = Result<T, RouterError>;
