//! Compiling and serving an application.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use common::AppError;
use routing::{
    middleware::apply_to_router, ApiRoute, ApiRouter, PathTemplate, RouteRegistry, RouterError,
};

use crate::application::QuickApi;
use crate::docs;
use crate::errors::ServeError;
use crate::exceptions::{self, ExceptionHandlers};
use crate::lifespan::{run_shutdown, run_startup};

impl<R: RouteRegistry> QuickApi<R> {
    /// Compile into an axum router.
    ///
    /// Layers, inner to outer: registered routes and the docs endpoints,
    /// exception handlers, middleware added with `add_middleware`,
    /// middleware from the config, panic catching.
    pub fn build(&self) -> Result<Router, ServeError> {
        let routes = self.router().routes();
        check_reserved(self, &routes)?;

        let mut table = ApiRouter::new();
        for route in routes {
            let path = route.path().to_string();
            table.add_route(&path, route, true);
        }
        let document = Arc::new(self.openapi().clone());
        let mut app = table
            .into_axum()?
            .merge(docs::routes(self.config(), document))
            .fallback(|| async { AppError::NotFound });

        if let Some(handlers) = self
            .config()
            .exception_handlers
            .as_ref()
            .filter(|handlers| !handlers.is_empty())
        {
            let handlers: ExceptionHandlers = Arc::new(handlers.clone());
            app = app.layer(from_fn(move |request: Request, next: Next| {
                exceptions::dispatch(handlers.clone(), request, next)
            }));
        }

        for middleware in self.router().middleware() {
            app = apply_to_router(app, &middleware);
        }
        for middleware in self.config().middleware.iter().flatten() {
            app = apply_to_router(app, middleware);
        }

        let debug = self.config().debug;
        app = app.layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| panic_response(debug, panic),
        ));

        Ok(app)
    }

    /// Serve on `addr` until Ctrl+C (or SIGTERM on Unix).
    pub async fn serve(self, addr: &str) -> Result<(), ServeError> {
        self.serve_with_shutdown(addr, shutdown_signal()).await
    }

    /// Serve on `addr` until `signal` resolves.
    ///
    /// Startup hooks run before the listener is bound; shutdown hooks run
    /// once in-flight requests have completed.
    pub async fn serve_with_shutdown<F>(self, addr: &str, signal: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.build()?;
        let startup = self.config().on_startup.clone().unwrap_or_default();
        let shutdown = self.config().on_shutdown.clone().unwrap_or_default();

        run_startup(&startup).await?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!("{} listening on http://{}", self.config().title, addr);

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await;

        tracing::info!("Server stopped, running shutdown hooks");
        run_shutdown(&shutdown).await;
        result.map_err(ServeError::from)
    }
}

/// Registered routes may not shadow or clash with the schema and docs
/// endpoints. Swagger UI serves everything below `docs_url`.
fn check_reserved<R: RouteRegistry>(
    app: &QuickApi<R>,
    routes: &[ApiRoute],
) -> Result<(), RouterError> {
    let config = app.config();
    let Some(openapi_url) = config.openapi_url.as_deref() else {
        return Ok(());
    };

    let mut urls = vec![openapi_url.to_string()];
    if let Some(docs_url) = config.docs_url.as_deref() {
        let docs_url = docs_url.trim_end_matches('/');
        urls.push(docs_url.to_string());
        urls.push(format!("{}/", docs_url));
        urls.push(format!("{}/{{rest:path}}", docs_url));
        urls.extend(config.swagger_ui_oauth2_redirect_url.clone());
    }
    urls.extend(config.redoc_url.clone());
    let reserved: Vec<PathTemplate> = urls
        .iter()
        .filter_map(|url| PathTemplate::parse(url).ok())
        .collect();

    for route in routes {
        for docs in &reserved {
            if route.template().clashes_with(docs) {
                return Err(RouterError::ConflictingRoute {
                    path: route.path().to_string(),
                    existing: docs.as_str().to_string(),
                });
            }
            if route.template().axum_path() == docs.axum_path()
                && route.methods().contains(&Method::GET)
            {
                return Err(RouterError::DuplicateRoute {
                    method: Method::GET,
                    path: route.path().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn panic_response(debug: bool, panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = message, "handler panicked");

    let body = if debug {
        format!("Internal Server Error\n\n{}", message)
    } else {
        "Internal Server Error".to_string()
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from(body),
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_panic_message_only_in_debug() {
        let response = panic_response(true, Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("kaboom"));

        let response = panic_response(false, Box::new("kaboom".to_string()));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Internal Server Error");
    }
}
