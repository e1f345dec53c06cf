//! Type-erased request handlers.

use std::sync::Arc;

use axum::{
    handler::Handler,
    routing::{on, MethodFilter, MethodRouter},
};

type MethodRouterFactory = dyn Fn(MethodFilter) -> MethodRouter + Send + Sync;

/// An axum handler stored without its extractor type parameters.
///
/// The same endpoint can be mounted for any set of methods, which lets
/// routers re-register it under a prefix when they are included elsewhere.
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    factory: Arc<MethodRouterFactory>,
}

impl Endpoint {
    pub fn new<H, T>(handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self {
            name: handler_name::<H>(),
            factory: Arc::new(move |filter| on(filter, handler.clone())),
        }
    }

    /// Override the name derived from the handler's type.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn method_router(&self, filter: MethodFilter) -> MethodRouter {
        (self.factory)(filter)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint").field("name", &self.name).finish()
    }
}

/// Last path segment of the handler's type name, e.g. `list_items`.
fn handler_name<H>() -> String {
    let full = std::any::type_name::<H>();
    let full = full.split('<').next().unwrap_or(full);
    match full.rsplit("::").next() {
        Some(segment) if !segment.is_empty() && !segment.starts_with('{') => segment.to_string(),
        _ => "endpoint".to_string(),
    }
}
