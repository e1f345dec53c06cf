//! QuickAPI: a declarative application facade over axum.
//!
//! [`QuickApi`] stores an [`AppConfig`] and forwards route, router and
//! middleware registrations to a [`RouteRegistry`]. [`QuickApi::build`]
//! turns the result into an [`axum::Router`] with the OpenAPI document,
//! Swagger UI and ReDoc mounted next to the registered routes.

pub mod application;
pub mod config;
pub mod docs;
pub mod errors;
pub mod exceptions;
pub mod lifespan;
pub mod openapi;
mod server;

pub use application::QuickApi;
pub use config::{
    AppConfig, ContactInfo, LicenseInfo, ServerInfo, SwaggerInitOAuth, SwaggerUiParameters,
    TagInfo,
};
pub use errors::ServeError;
pub use exceptions::{ExceptionContext, ExceptionHandler, ExceptionKey};
pub use lifespan::{LifespanEvent, LifespanHook};

pub use routing::{
    ApiRoute, ApiRouter, CorsOptions, Dependency, Endpoint, IncludeOptions, Middleware,
    ResponseClass, RouteOptions, RouteRegistry, RouterError, RouterOptions, RouterResult,
    ValidatedJson,
};
