//! Application-level exception handlers.
//!
//! Error responses rendered from [`AppError`](common::AppError) carry a
//! [`RaisedError`] extension. The dispatch middleware looks for a handler
//! registered for the exact status code first, then for the error kind,
//! and lets the handler build the replacement response.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use common::{ErrorKind, RaisedError};

/// What an exception handler is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKey {
    /// Any error response with this status code
    Status(u16),
    /// Errors raised as `HttpException` (including `NotFound` and friends)
    HttpException,
    /// Request body or parameter validation failures
    RequestValidation,
    /// Internal errors
    Internal,
}

impl From<ErrorKind> for ExceptionKey {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::HttpException => ExceptionKey::HttpException,
            ErrorKind::RequestValidation => ExceptionKey::RequestValidation,
            ErrorKind::Internal => ExceptionKey::Internal,
        }
    }
}

impl From<StatusCode> for ExceptionKey {
    fn from(status: StatusCode) -> Self {
        ExceptionKey::Status(status.as_u16())
    }
}

/// The failed request and the error it produced.
#[derive(Debug, Clone)]
pub struct ExceptionContext {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    /// `None` when the response did not come from an `AppError`
    pub detail: Option<Value>,
}

/// Builds the response for a failed request.
#[derive(Clone)]
pub struct ExceptionHandler(Arc<dyn Fn(ExceptionContext) -> Response + Send + Sync>);

impl ExceptionHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ExceptionContext) -> Response + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    pub fn handle(&self, context: ExceptionContext) -> Response {
        (self.0)(context)
    }
}

impl std::fmt::Debug for ExceptionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExceptionHandler(..)")
    }
}

pub(crate) type ExceptionHandlers = Arc<HashMap<ExceptionKey, ExceptionHandler>>;

fn select<'a>(
    handlers: &'a HashMap<ExceptionKey, ExceptionHandler>,
    status: StatusCode,
    raised: Option<&RaisedError>,
) -> Option<&'a ExceptionHandler> {
    handlers
        .get(&ExceptionKey::from(status))
        .or_else(|| raised.and_then(|r| handlers.get(&ExceptionKey::from(r.kind))))
}

pub(crate) async fn dispatch(handlers: ExceptionHandlers, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let raised = response.extensions().get::<RaisedError>();
    let Some(handler) = select(&handlers, status, raised) else {
        return response;
    };

    tracing::debug!(%method, path = %path, status = status.as_u16(), "exception handler invoked");
    let context = ExceptionContext {
        method,
        path,
        status,
        detail: raised.map(|r| r.detail.clone()),
    };
    handler.handle(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use serde_json::json;

    fn handler(tag: &'static str) -> ExceptionHandler {
        ExceptionHandler::new(move |_| tag.into_response())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_status_wins_over_kind() {
        let mut handlers = HashMap::new();
        handlers.insert(ExceptionKey::Status(404), handler("status"));
        handlers.insert(ExceptionKey::HttpException, handler("kind"));

        let raised = RaisedError {
            kind: ErrorKind::HttpException,
            status: StatusCode::NOT_FOUND,
            detail: json!("Not Found"),
        };
        let selected = select(&handlers, StatusCode::NOT_FOUND, Some(&raised)).unwrap();
        let response = selected.handle(ExceptionContext {
            method: Method::GET,
            path: "/".into(),
            status: StatusCode::NOT_FOUND,
            detail: None,
        });
        assert_eq!(body_text(response).await, "status");

        let selected = select(&handlers, StatusCode::CONFLICT, Some(&raised)).unwrap();
        let response = selected.handle(ExceptionContext {
            method: Method::GET,
            path: "/".into(),
            status: StatusCode::CONFLICT,
            detail: None,
        });
        assert_eq!(body_text(response).await, "kind");
    }

    #[test]
    fn test_kind_needs_raised_error() {
        let mut handlers = HashMap::new();
        handlers.insert(ExceptionKey::HttpException, handler("kind"));
        assert!(select(&handlers, StatusCode::METHOD_NOT_ALLOWED, None).is_none());
    }
}
