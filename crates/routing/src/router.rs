//! The router collaborator behind an application.

use std::collections::{BTreeMap, HashMap};

use axum::{http::Method, routing::MethodRouter, Router};

use crate::endpoint::Endpoint;
use crate::error::{RouterError, RouterResult};
use crate::middleware::{apply_to_router, Middleware};
use crate::options::{merge_deprecated, IncludeOptions, RouteOptions, RouterOptions};
use crate::route::ApiRoute;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Registration surface an application forwards to.
///
/// Implementations own the route list; callers only append to it.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait RouteRegistry: Send {
    /// Registered routes in insertion order.
    fn routes(&self) -> Vec<ApiRoute>;

    /// Router-wide middleware in registration order.
    fn middleware(&self) -> Vec<Middleware>;

    /// Append `route` as-is.
    fn add_route(&mut self, path: &str, route: ApiRoute, include_in_schema: bool);

    fn add_middleware(&mut self, middleware: Middleware);

    /// Re-register every route of `router` under `options`.
    fn include_router(&mut self, router: ApiRouter, options: IncludeOptions) -> RouterResult<()>;

    fn add_api_route(
        &mut self,
        path: &str,
        methods: Vec<Method>,
        endpoint: Endpoint,
        options: RouteOptions,
    ) -> RouterResult<()>;

    fn get(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> RouterResult<()> {
        self.add_api_route(path, vec![Method::GET], endpoint, options)
    }

    fn post(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> RouterResult<()> {
        self.add_api_route(path, vec![Method::POST], endpoint, options)
    }

    fn put(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> RouterResult<()> {
        self.add_api_route(path, vec![Method::PUT], endpoint, options)
    }

    fn patch(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> RouterResult<()> {
        self.add_api_route(path, vec![Method::PATCH], endpoint, options)
    }

    fn delete(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> RouterResult<()> {
        self.add_api_route(path, vec![Method::DELETE], endpoint, options)
    }

    /// Build the URL of the route called `name`.
    fn url_path_for(&self, name: &str, params: &BTreeMap<String, String>) -> RouterResult<String>;
}

/// Route table with router-level defaults.
#[derive(Debug, Clone, Default)]
pub struct ApiRouter {
    options: RouterOptions,
    routes: Vec<ApiRoute>,
    middleware: Vec<Middleware>,
}

impl ApiRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RouterOptions) -> RouterResult<Self> {
        validate_prefix(&options.prefix)?;
        Ok(Self {
            options,
            ..Self::default()
        })
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn register(
        &mut self,
        path: &str,
        methods: Vec<Method>,
        endpoint: Endpoint,
        mut options: RouteOptions,
        middleware: Vec<Middleware>,
    ) -> RouterResult<()> {
        let full_path = format!("{}{}", self.options.prefix, path);
        if full_path.is_empty() {
            return Err(RouterError::EmptyPath(endpoint.name().to_string()));
        }

        let defaults = &self.options;
        options.tags = defaults.tags.iter().cloned().chain(options.tags).collect();
        options.dependencies = defaults
            .dependencies
            .iter()
            .cloned()
            .chain(options.dependencies)
            .collect();
        options.callbacks = defaults
            .callbacks
            .iter()
            .cloned()
            .chain(options.callbacks)
            .collect();
        let mut responses = defaults.responses.clone();
        responses.extend(options.responses);
        options.responses = responses;
        options.deprecated = merge_deprecated(options.deprecated, defaults.deprecated);
        options.include_in_schema = options.include_in_schema && defaults.include_in_schema;
        options.response_class = options.response_class.or(defaults.default_response_class);
        if options.generate_unique_id_function.is_none() {
            options.generate_unique_id_function = defaults.generate_unique_id_function.clone();
        }

        let route = ApiRoute::new(&full_path, methods, endpoint, options)?.with_middleware(middleware);
        self.check_conflicts(&route)?;

        tracing::debug!(
            path = route.path(),
            methods = ?route.methods(),
            name = route.name(),
            "route registered"
        );
        self.routes.push(route);
        Ok(())
    }

    fn check_conflicts(&self, route: &ApiRoute) -> RouterResult<()> {
        for existing in &self.routes {
            check_pair(existing, route)?;
        }
        Ok(())
    }

    /// Compile into an axum router.
    ///
    /// Routes sharing a path are merged into one method router. Fails if
    /// two routes claim the same method and path, or their paths clash
    /// (see [`PathTemplate::clashes_with`]); this can only happen with
    /// routes appended through [`RouteRegistry::add_route`].
    ///
    /// [`PathTemplate::clashes_with`]: crate::path::PathTemplate::clashes_with
    pub fn into_axum(self) -> RouterResult<Router> {
        let mut order: Vec<&ApiRoute> = Vec::new();
        let mut merged: HashMap<String, (MethodRouter, Vec<Method>)> = HashMap::new();

        for route in &self.routes {
            let axum_path = route.template().axum_path().to_string();

            match merged.remove(&axum_path) {
                Some((method_router, mut methods)) => {
                    if let Some(method) = route.methods().iter().find(|m| methods.contains(m)) {
                        return Err(RouterError::DuplicateRoute {
                            method: method.clone(),
                            path: route.path().to_string(),
                        });
                    }
                    methods.extend(route.methods().iter().cloned());
                    merged.insert(
                        axum_path,
                        (method_router.merge(route.method_router()), methods),
                    );
                }
                None => {
                    for known in &order {
                        check_pair(known, route)?;
                    }
                    order.push(route);
                    merged.insert(axum_path, (route.method_router(), route.methods().to_vec()));
                }
            }
        }

        let mut router = Router::new();
        for route in order {
            let path = route.template().axum_path();
            if let Some((method_router, _)) = merged.remove(path) {
                router = router.route(path, method_router);
            }
        }
        for middleware in &self.middleware {
            router = apply_to_router(router, middleware);
        }
        Ok(router)
    }
}

/// Reject `route` if it cannot be served next to `existing`.
fn check_pair(existing: &ApiRoute, route: &ApiRoute) -> RouterResult<()> {
    if existing.template().clashes_with(route.template()) {
        return Err(RouterError::ConflictingRoute {
            path: route.path().to_string(),
            existing: existing.path().to_string(),
        });
    }
    if existing.template().axum_path() != route.template().axum_path() {
        return Ok(());
    }
    match route
        .methods()
        .iter()
        .find(|m| existing.methods().contains(m))
    {
        Some(method) => Err(RouterError::DuplicateRoute {
            method: method.clone(),
            path: route.path().to_string(),
        }),
        None => Ok(()),
    }
}

impl RouteRegistry for ApiRouter {
    fn routes(&self) -> Vec<ApiRoute> {
        self.routes.clone()
    }

    fn middleware(&self) -> Vec<Middleware> {
        self.middleware.clone()
    }

    fn add_route(&mut self, path: &str, route: ApiRoute, include_in_schema: bool) {
        tracing::debug!(
            path,
            route_path = route.path(),
            include_in_schema,
            "route appended"
        );
        self.routes.push(route);
    }

    fn add_middleware(&mut self, middleware: Middleware) {
        tracing::debug!(middleware = middleware.name(), "middleware added");
        self.middleware.push(middleware);
    }

    fn include_router(&mut self, router: ApiRouter, options: IncludeOptions) -> RouterResult<()> {
        if !options.prefix.is_empty() {
            validate_prefix(&options.prefix)?;
        }

        let ApiRouter {
            options: included,
            routes,
            middleware,
        } = router;

        for route in routes {
            let mut merged = route.options().clone();

            merged.tags = options.tags.iter().cloned().chain(merged.tags).collect();
            merged.dependencies = options
                .dependencies
                .iter()
                .cloned()
                .chain(merged.dependencies)
                .collect();
            merged.callbacks = options
                .callbacks
                .iter()
                .cloned()
                .chain(merged.callbacks)
                .collect();
            let mut responses = options.responses.clone();
            responses.extend(merged.responses);
            merged.responses = responses;
            merged.deprecated = merge_deprecated(merged.deprecated, options.deprecated);
            merged.include_in_schema = merged.include_in_schema && options.include_in_schema;
            merged.response_class = merged
                .response_class
                .or(included.default_response_class)
                .or(options.default_response_class);
            if merged.generate_unique_id_function.is_none() {
                merged.generate_unique_id_function = included
                    .generate_unique_id_function
                    .clone()
                    .or_else(|| options.generate_unique_id_function.clone());
            }
            merged.name = Some(route.name().to_string());

            let route_middleware: Vec<Middleware> = route
                .middleware()
                .iter()
                .chain(middleware.iter())
                .cloned()
                .collect();

            self.register(
                &format!("{}{}", options.prefix, route.path()),
                route.methods().to_vec(),
                route.endpoint().clone(),
                merged,
                route_middleware,
            )?;
        }
        Ok(())
    }

    fn add_api_route(
        &mut self,
        path: &str,
        methods: Vec<Method>,
        endpoint: Endpoint,
        options: RouteOptions,
    ) -> RouterResult<()> {
        self.register(path, methods, endpoint, options, Vec::new())
    }

    fn url_path_for(&self, name: &str, params: &BTreeMap<String, String>) -> RouterResult<String> {
        self.routes
            .iter()
            .filter(|route| route.name() == name)
            .find_map(|route| route.template().render(params))
            .ok_or_else(|| RouterError::NoMatchFound {
                name: name.to_string(),
            })
    }
}

fn validate_prefix(prefix: &str) -> RouterResult<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    if !prefix.starts_with('/') || prefix.ends_with('/') {
        return Err(RouterError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}
