//! Middleware declarations, request dependencies and response shaping.

mod dependency;
mod response;

use std::time::Duration;

use axum::{
    http::{HeaderName, HeaderValue, Method},
    routing::MethodRouter,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::error::{RouterError, RouterResult};

pub use dependency::Dependency;
pub(crate) use dependency::run_dependencies;
pub(crate) use response::ResponseShaper;

/// A middleware declaration.
///
/// Declarations are applied in registration order, so the last one added
/// sees requests first.
#[derive(Debug, Clone)]
pub enum Middleware {
    Cors(CorsOptions),
    /// Request/response spans via `tower_http::trace`
    Trace,
    /// Generate `x-request-id` when missing and echo it on the response
    RequestId,
    /// Answer `408 Request Timeout` when the inner service is slower
    Timeout(Duration),
    /// Reject request bodies larger than this many bytes with `413`
    BodyLimit(usize),
    SetHeader { name: HeaderName, value: HeaderValue },
    /// Turn panics into `500` responses
    CatchPanic,
}

impl Middleware {
    /// A response header set on every response, replacing existing values.
    pub fn set_header(name: &str, value: &str) -> RouterResult<Self> {
        let name = HeaderName::try_from(name)
            .map_err(|e| RouterError::InvalidMiddleware(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| RouterError::InvalidMiddleware(format!("header value {:?}: {}", value, e)))?;
        Ok(Middleware::SetHeader { name, value })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Middleware::Cors(_) => "cors",
            Middleware::Trace => "trace",
            Middleware::RequestId => "request_id",
            Middleware::Timeout(_) => "timeout",
            Middleware::BodyLimit(_) => "body_limit",
            Middleware::SetHeader { .. } => "set_header",
            Middleware::CatchPanic => "catch_panic",
        }
    }
}

/// Cross-origin resource sharing settings.
///
/// `"*"` in any list means "allow all". When credentials are allowed the
/// wildcard is answered by mirroring the request instead, since browsers
/// reject a literal `*` together with credentials.
#[derive(Debug, Clone)]
pub struct CorsOptions {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub expose_headers: Vec<String>,
    pub max_age: Option<Duration>,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            allow_methods: vec!["GET".to_string()],
            allow_headers: Vec::new(),
            allow_credentials: false,
            expose_headers: Vec::new(),
            max_age: Some(Duration::from_secs(600)),
        }
    }
}

impl CorsOptions {
    pub fn layer(&self) -> CorsLayer {
        let wildcard = |list: &[String]| list.iter().any(|v| v == "*");

        let origins = if wildcard(&self.allow_origins) {
            if self.allow_credentials {
                AllowOrigin::mirror_request()
            } else {
                AllowOrigin::any()
            }
        } else {
            AllowOrigin::list(parse_all::<HeaderValue>(&self.allow_origins, "origin"))
        };

        let methods = if wildcard(&self.allow_methods) {
            if self.allow_credentials {
                AllowMethods::mirror_request()
            } else {
                AllowMethods::any()
            }
        } else {
            AllowMethods::list(parse_all::<Method>(&self.allow_methods, "method"))
        };

        let headers = if wildcard(&self.allow_headers) {
            if self.allow_credentials {
                AllowHeaders::mirror_request()
            } else {
                AllowHeaders::any()
            }
        } else {
            AllowHeaders::list(parse_all::<HeaderName>(&self.allow_headers, "header"))
        };

        let mut layer = CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(self.allow_credentials)
            .expose_headers(ExposeHeaders::list(parse_all::<HeaderName>(
                &self.expose_headers,
                "header",
            )));
        if let Some(max_age) = self.max_age {
            layer = layer.max_age(max_age);
        }
        layer
    }
}

fn parse_all<T>(values: &[String], what: &str) -> Vec<T>
where
    T: for<'a> TryFrom<&'a str>,
{
    values
        .iter()
        .filter_map(|value| match T::try_from(value.as_str()) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!(value = %value, "ignoring invalid CORS {}", what);
                None
            }
        })
        .collect()
}

macro_rules! apply_middleware {
    ($target:expr, $middleware:expr) => {
        match $middleware {
            Middleware::Cors(options) => $target.layer(options.layer()),
            Middleware::Trace => $target.layer(TraceLayer::new_for_http()),
            Middleware::RequestId => $target.layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            ),
            Middleware::Timeout(duration) => $target.layer(TimeoutLayer::new(*duration)),
            Middleware::BodyLimit(limit) => $target.layer(RequestBodyLimitLayer::new(*limit)),
            Middleware::SetHeader { name, value } => $target.layer(
                SetResponseHeaderLayer::overriding(name.clone(), value.clone()),
            ),
            Middleware::CatchPanic => $target.layer(CatchPanicLayer::new()),
        }
    };
}

/// Wrap a whole router in `middleware`.
pub fn apply_to_router(router: Router, middleware: &Middleware) -> Router {
    apply_middleware!(router, middleware)
}

/// Wrap a single route in `middleware`.
pub fn apply_to_method_router(method_router: MethodRouter, middleware: &Middleware) -> MethodRouter {
    apply_middleware!(method_router, middleware)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_header_validates() {
        assert!(Middleware::set_header("x-frame-options", "DENY").is_ok());
        assert!(matches!(
            Middleware::set_header("bad header", "DENY"),
            Err(RouterError::InvalidMiddleware(_))
        ));
    }

    #[test]
    fn test_cors_wildcard_with_credentials_builds() {
        let options = CorsOptions {
            allow_origins: vec!["*".into()],
            allow_methods: vec!["*".into()],
            allow_headers: vec!["*".into()],
            allow_credentials: true,
            ..Default::default()
        };
        // Building must not reject the credentials + wildcard combination
        let _layer = options.layer();
    }
}
