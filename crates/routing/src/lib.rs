//! Route registration and compilation for QuickAPI applications.
//!
//! An [`ApiRouter`] collects route definitions together with their
//! documentation metadata, merges router-level defaults into them and
//! compiles the result into an [`axum::Router`].
//!
//! # Path templates
//!
//! Paths use `{name}` placeholders with optional converters:
//! `{id:int}`, `{ratio:float}`, `{key:uuid}`, `{rest:path}`.

pub mod endpoint;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod options;
pub mod path;
pub mod route;
pub mod router;

pub use endpoint::Endpoint;
pub use error::{RouterError, RouterResult};
pub use extractors::ValidatedJson;
pub use middleware::{CorsOptions, Dependency, Middleware};
pub use options::{
    Callback, IncludeOptions, ResponseClass, ResponseModel, Responses, RouteOptions,
    RouterOptions, UniqueIdGenerator,
};
pub use path::{Converter, PathParam, PathTemplate};
pub use route::{generate_unique_id, ApiRoute};
pub use router::{ApiRouter, RouteRegistry};

#[cfg(any(test, feature = "test-utils"))]
pub use router::MockRouteRegistry;
