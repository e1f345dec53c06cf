//! Request dependencies.
//!
//! A dependency runs before the handler with mutable access to the request
//! head. It can reject the request or leave data in the request extensions
//! for extractors further down.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use common::AppResult;

type Guard = dyn Fn(&mut Parts) -> AppResult<()> + Send + Sync;

#[derive(Clone)]
pub struct Dependency {
    name: String,
    guard: Arc<Guard>,
}

impl Dependency {
    pub fn new<F>(name: impl Into<String>, guard: F) -> Self
    where
        F: Fn(&mut Parts) -> AppResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            guard: Arc::new(guard),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, parts: &mut Parts) -> AppResult<()> {
        (self.guard)(parts)
    }
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Dependency").field(&self.name).finish()
    }
}

/// Run `dependencies` in order; the first failure becomes the response.
pub(crate) async fn run_dependencies(
    dependencies: Arc<Vec<Dependency>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    for dependency in dependencies.iter() {
        if let Err(err) = dependency.check(&mut parts) {
            tracing::debug!(
                dependency = dependency.name(),
                path = %parts.uri.path(),
                error = %err,
                "dependency rejected request"
            );
            return err.into_response();
        }
    }

    next.run(Request::from_parts(parts, body)).await
}
