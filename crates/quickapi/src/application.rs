//! The application facade.

use std::collections::BTreeMap;

use axum::{handler::Handler, http::Method};
use once_cell::sync::OnceCell;
use serde_json::Value;

use routing::{
    ApiRoute, ApiRouter, Endpoint, IncludeOptions, Middleware, RouteOptions, RouteRegistry,
    RouterResult,
};

use crate::config::AppConfig;
use crate::exceptions::{ExceptionHandler, ExceptionKey};
use crate::lifespan::{LifespanEvent, LifespanHook};
use crate::openapi;

/// An application: stored configuration plus the router every
/// registration is forwarded to.
///
/// The router is created once, at construction, and is the only owner of
/// the route list afterwards. Registration methods return whatever the
/// router returns.
///
/// ```ignore
/// let mut app = QuickApi::new(AppConfig::new("Shop", "1.0.0"));
/// app.get("/items/{item_id:int}", RouteOptions::new().tag("items"), read_item)?;
/// app.include_router(users::router()?, IncludeOptions::new().prefix("/v1"))?;
/// let router = app.build()?;
/// ```
pub struct QuickApi<R: RouteRegistry = ApiRouter> {
    config: AppConfig,
    router: R,
    openapi_schema: OnceCell<Value>,
}

impl QuickApi<ApiRouter> {
    pub fn new(config: AppConfig) -> Self {
        Self::with_router(config, ApiRouter::new())
    }
}

impl Default for QuickApi<ApiRouter> {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl<R: RouteRegistry> QuickApi<R> {
    /// Use `router` instead of a fresh [`ApiRouter`].
    pub fn with_router(config: AppConfig, router: R) -> Self {
        tracing::debug!(
            title = %config.title,
            version = %config.version,
            debug = config.debug,
            "application configured"
        );
        if config.uses_openapi_prefix() {
            tracing::warn!(
                openapi_prefix = %config.openapi_prefix,
                "openapi_prefix is deprecated, use root_path instead"
            );
        }
        Self {
            config,
            router,
            openapi_schema: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The seed routes given at construction.
    pub fn routes(&self) -> &[ApiRoute] {
        &self.config.routes
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// The application handle. This is the router created at construction.
    pub fn app(&self) -> &R {
        &self.router
    }

    pub fn add_route(&mut self, path: &str, route: ApiRoute, include_in_schema: bool) {
        self.router.add_route(path, route, include_in_schema)
    }

    pub fn add_middleware(&mut self, middleware: Middleware) {
        self.router.add_middleware(middleware)
    }

    pub fn include_router(&mut self, router: ApiRouter, options: IncludeOptions) -> RouterResult<()> {
        self.router.include_router(router, options)
    }

    pub fn get<H, T>(&mut self, path: &str, options: RouteOptions, handler: H) -> RouterResult<()>
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        self.router.get(path, Endpoint::new(handler), options)
    }

    pub fn post<H, T>(&mut self, path: &str, options: RouteOptions, handler: H) -> RouterResult<()>
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        self.router.post(path, Endpoint::new(handler), options)
    }

    pub fn put<H, T>(&mut self, path: &str, options: RouteOptions, handler: H) -> RouterResult<()>
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        self.router.put(path, Endpoint::new(handler), options)
    }

    pub fn patch<H, T>(&mut self, path: &str, options: RouteOptions, handler: H) -> RouterResult<()>
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        self.router.patch(path, Endpoint::new(handler), options)
    }

    pub fn delete<H, T>(&mut self, path: &str, options: RouteOptions, handler: H) -> RouterResult<()>
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        self.router.delete(path, Endpoint::new(handler), options)
    }

    /// Register `endpoint` for several methods at once.
    pub fn api_route(
        &mut self,
        path: &str,
        methods: Vec<Method>,
        endpoint: Endpoint,
        options: RouteOptions,
    ) -> RouterResult<()> {
        self.router.add_api_route(path, methods, endpoint, options)
    }

    pub fn add_exception_handler(&mut self, key: impl Into<ExceptionKey>, handler: ExceptionHandler) {
        self.config
            .exception_handlers
            .get_or_insert_with(Default::default)
            .insert(key.into(), handler);
    }

    pub fn add_event_handler(&mut self, event: LifespanEvent, hook: LifespanHook) {
        let hooks = match event {
            LifespanEvent::Startup => &mut self.config.on_startup,
            LifespanEvent::Shutdown => &mut self.config.on_shutdown,
        };
        hooks.get_or_insert_with(Vec::new).push(hook);
    }

    pub fn url_path_for(&self, name: &str, params: &BTreeMap<String, String>) -> RouterResult<String> {
        self.router.url_path_for(name, params)
    }

    /// The OpenAPI document. Generated on first use and cached, so routes
    /// registered afterwards are not reflected.
    pub fn openapi(&self) -> &Value {
        self.openapi_schema
            .get_or_init(|| openapi::generate(&self.config, &self.router.routes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    async fn root() -> &'static str {
        "root"
    }

    #[test]
    fn test_config_is_stored_verbatim() {
        let config = AppConfig {
            debug: true,
            description: "Demo".into(),
            docs_url: None,
            root_path: "/api".into(),
            ..AppConfig::new("Shop", "1.2.3")
        };
        let app = QuickApi::new(config);

        assert!(app.config().debug);
        assert_eq!(app.config().title, "Shop");
        assert_eq!(app.config().version, "1.2.3");
        assert_eq!(app.config().description, "Demo");
        assert!(app.config().docs_url.is_none());
        assert_eq!(app.config().redoc_url.as_deref(), Some("/redoc"));
        assert_eq!(app.config().root_path, "/api");
    }

    #[test]
    fn test_seed_routes_are_not_registered() {
        let seed = ApiRoute::get("/seed", root).unwrap();
        let app = QuickApi::new(AppConfig {
            routes: vec![seed],
            ..Default::default()
        });

        assert_eq!(app.routes().len(), 1);
        assert_eq!(app.routes()[0].path(), "/seed");
        assert!(app.router().is_empty());
    }

    #[test]
    fn test_app_is_the_router() {
        let mut app = QuickApi::default();
        let before: *const ApiRouter = app.app();
        app.get("/", RouteOptions::default(), root).unwrap();

        assert!(std::ptr::eq(before, app.app()));
        assert!(std::ptr::eq(app.app(), app.router()));
        assert_eq!(app.app().len(), 1);
    }

    #[test]
    fn test_add_route_appends_in_order() {
        let mut app = QuickApi::default();
        let first = ApiRoute::get("/first", root).unwrap();
        let second = ApiRoute::post("/second", root).unwrap();
        app.add_route("/first", first, true);
        app.add_route("/second", second, false);

        let paths: Vec<String> = app.router().routes().iter().map(|r| r.path().to_string()).collect();
        assert_eq!(paths, vec!["/first", "/second"]);
    }

    #[test]
    fn test_event_and_exception_handlers_are_stored() {
        let mut app = QuickApi::default();
        app.add_event_handler(LifespanEvent::Startup, LifespanHook::new("warm", || async { Ok(()) }));
        app.add_event_handler(LifespanEvent::Shutdown, LifespanHook::new("flush", || async { Ok(()) }));
        app.add_exception_handler(
            StatusCode::NOT_FOUND,
            ExceptionHandler::new(|_| StatusCode::GONE.into_response()),
        );

        let config = app.config();
        assert_eq!(config.on_startup.as_ref().unwrap()[0].name(), "warm");
        assert_eq!(config.on_shutdown.as_ref().unwrap()[0].name(), "flush");
        assert!(config
            .exception_handlers
            .as_ref()
            .unwrap()
            .contains_key(&ExceptionKey::Status(404)));
    }

    #[test]
    fn test_openapi_is_cached() {
        let mut app = QuickApi::default();
        app.get("/", RouteOptions::default(), root).unwrap();
        assert!(app.openapi()["paths"].get("/").is_some());

        app.get("/late", RouteOptions::default(), root).unwrap();
        assert!(app.openapi()["paths"].get("/late").is_none());
    }
}
