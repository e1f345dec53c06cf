//! Route definitions.

use std::sync::Arc;

use axum::{
    extract::Request,
    handler::Handler,
    http::Method,
    middleware::{from_fn, Next},
    routing::{MethodFilter, MethodRouter},
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::endpoint::Endpoint;
use crate::error::{RouterError, RouterResult};
use crate::middleware::{apply_to_method_router, run_dependencies, Middleware, ResponseShaper};
use crate::options::RouteOptions;
use crate::path::PathTemplate;

static NON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\W").expect("non-word pattern is valid"));

/// A path operation: methods and a path template bound to an endpoint,
/// plus the metadata used for documentation and response shaping.
#[derive(Debug, Clone)]
pub struct ApiRoute {
    path: PathTemplate,
    methods: Vec<Method>,
    filter: MethodFilter,
    endpoint: Endpoint,
    options: RouteOptions,
    middleware: Vec<Middleware>,
    name: String,
    unique_id: String,
}

impl ApiRoute {
    /// Build a route. An empty method list means `GET`.
    pub fn new(
        path: &str,
        methods: impl IntoIterator<Item = Method>,
        endpoint: Endpoint,
        options: RouteOptions,
    ) -> RouterResult<Self> {
        let path = PathTemplate::parse(path)?;

        let mut unique: Vec<Method> = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }
        if unique.is_empty() {
            unique.push(Method::GET);
        }

        let mut filter: Option<MethodFilter> = None;
        for method in &unique {
            let next = MethodFilter::try_from(method.clone())
                .map_err(|_| RouterError::UnsupportedMethod(method.clone()))?;
            filter = Some(match filter {
                Some(current) => current.or(next),
                None => next,
            });
        }
        let filter = filter.unwrap_or(MethodFilter::GET);

        let name = options
            .name
            .clone()
            .unwrap_or_else(|| endpoint.name().to_string());

        let mut route = Self {
            path,
            methods: unique,
            filter,
            endpoint,
            options,
            middleware: Vec::new(),
            name,
            unique_id: String::new(),
        };
        route.unique_id = match &route.options.generate_unique_id_function {
            Some(generator) => generator.generate(&route),
            None => generate_unique_id(&route),
        };
        Ok(route)
    }

    /// A `GET` route with default options.
    pub fn get<H, T>(path: &str, handler: H) -> RouterResult<Self>
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(path, [Method::GET], Endpoint::new(handler), RouteOptions::default())
    }

    /// A `POST` route with default options.
    pub fn post<H, T>(path: &str, handler: H) -> RouterResult<Self>
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(path, [Method::POST], Endpoint::new(handler), RouteOptions::default())
    }

    pub(crate) fn with_middleware(mut self, middleware: Vec<Middleware>) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    pub fn template(&self) -> &PathTemplate {
        &self.path
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Middleware that wraps only this route, innermost first.
    pub fn middleware(&self) -> &[Middleware] {
        &self.middleware
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Operation id used in the OpenAPI document.
    pub fn operation_id(&self) -> &str {
        self.options.operation_id.as_deref().unwrap_or(&self.unique_id)
    }

    /// Compile into an axum method router.
    ///
    /// Layers, inner to outer: response shaping, dependencies, route-scoped
    /// middleware.
    pub fn method_router(&self) -> MethodRouter {
        let mut method_router = self.endpoint.method_router(self.filter);

        if let Some(shaper) = ResponseShaper::from_options(&self.options) {
            method_router = method_router.layer(from_fn(move |request: Request, next: Next| {
                let shaper = shaper.clone();
                async move {
                    let response = next.run(request).await;
                    shaper.apply(response).await
                }
            }));
        }

        if !self.options.dependencies.is_empty() {
            let dependencies = Arc::new(self.options.dependencies.clone());
            method_router = method_router.layer(from_fn(move |request: Request, next: Next| {
                run_dependencies(dependencies.clone(), request, next)
            }));
        }

        for middleware in &self.middleware {
            method_router = apply_to_method_router(method_router, middleware);
        }

        method_router
    }
}

/// Default operation id: `{name}{path}` with non-word characters replaced
/// by `_`, followed by `_{method}`.
pub fn generate_unique_id(route: &ApiRoute) -> String {
    let raw = format!("{}{}", route.name(), route.template().openapi_path());
    let mut id = NON_WORD_RE.replace_all(&raw, "_").into_owned();
    if let Some(method) = route.methods().first() {
        id.push('_');
        id.push_str(&method.as_str().to_lowercase());
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::UniqueIdGenerator;

    async fn read_items() -> &'static str {
        "items"
    }

    #[test]
    fn test_default_method_and_unique_id() {
        let route = ApiRoute::new(
            "/items/{item_id}",
            [],
            Endpoint::new(read_items),
            RouteOptions::default(),
        )
        .unwrap();

        assert_eq!(route.methods(), &[Method::GET]);
        assert_eq!(route.name(), "read_items");
        assert_eq!(route.unique_id(), "read_items_items__item_id__get");
        assert_eq!(route.operation_id(), "read_items_items__item_id__get");
    }

    #[test]
    fn test_methods_are_deduplicated_in_order() {
        let route = ApiRoute::new(
            "/items",
            [Method::POST, Method::PUT, Method::POST],
            Endpoint::new(read_items),
            RouteOptions::default(),
        )
        .unwrap();
        assert_eq!(route.methods(), &[Method::POST, Method::PUT]);
        assert!(route.unique_id().ends_with("_post"));
    }

    #[test]
    fn test_explicit_name_and_generator() {
        let route = ApiRoute::new(
            "/items",
            [Method::GET],
            Endpoint::new(read_items),
            RouteOptions::new()
                .name("list")
                .unique_id_with(UniqueIdGenerator::new(|r| format!("custom-{}", r.name()))),
        )
        .unwrap();
        assert_eq!(route.name(), "list");
        assert_eq!(route.unique_id(), "custom-list");
    }

    #[test]
    fn test_operation_id_overrides_unique_id() {
        let route = ApiRoute::new(
            "/items",
            [Method::GET],
            Endpoint::new(read_items),
            RouteOptions::new().operation_id("listItems"),
        )
        .unwrap();
        assert_eq!(route.operation_id(), "listItems");
    }

    #[test]
    fn test_unsupported_method() {
        let purge = Method::from_bytes(b"PURGE").unwrap();
        let err = ApiRoute::new(
            "/cache",
            [purge.clone()],
            Endpoint::new(read_items),
            RouteOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, RouterError::UnsupportedMethod(purge));
    }
}
