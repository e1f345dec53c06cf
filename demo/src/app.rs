//! Assembles the demo application.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use quickapi::{
    AppConfig, ContactInfo, CorsOptions, ExceptionHandler, ExceptionKey, IncludeOptions,
    LicenseInfo, LifespanEvent, LifespanHook, Middleware, QuickApi, RouteOptions, RouterResult,
    TagInfo,
};

use crate::items::{self, CreateItem, ItemStore};
use crate::users;

pub const API_PREFIX: &str = "/api/v1";

pub fn app_config() -> AppConfig {
    AppConfig {
        description: "Sample catalogue service built on QuickAPI".to_string(),
        openapi_tags: Some(vec![
            TagInfo::new("items", "Catalogue items"),
            TagInfo::new("users", "User profiles, requires the `x-token` header"),
        ]),
        contact: Some(ContactInfo {
            name: Some("API Support".to_string()),
            email: Some("support@example.com".to_string()),
            url: None,
        }),
        license_info: Some(LicenseInfo {
            name: "MIT".to_string(),
            url: Some("https://opensource.org/licenses/MIT".to_string()),
        }),
        ..AppConfig::new("QuickAPI Demo", env!("CARGO_PKG_VERSION"))
    }
}

/// Build the application with its routers, middleware and hooks.
pub fn create_app(config: AppConfig) -> RouterResult<QuickApi> {
    let store = ItemStore::default();
    let mut app = QuickApi::new(config);

    app.add_middleware(Middleware::Cors(CorsOptions {
        allow_origins: vec!["*".to_string()],
        allow_methods: vec!["*".to_string()],
        allow_headers: vec!["*".to_string()],
        ..Default::default()
    }));
    app.add_middleware(Middleware::RequestId);
    app.add_middleware(Middleware::Trace);

    app.get(
        "/health",
        RouteOptions::new().summary("Health check").tag("ops"),
        health,
    )?;
    app.include_router(
        items::router(store.clone())?,
        IncludeOptions::new().prefix(API_PREFIX),
    )?;
    app.include_router(
        users::router()?,
        IncludeOptions::new()
            .prefix(API_PREFIX)
            .response("401", json!({"description": "Missing x-token header"})),
    )?;

    app.add_exception_handler(
        ExceptionKey::Status(404),
        ExceptionHandler::new(|ctx| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "detail": ctx.detail.unwrap_or_else(|| json!("Not Found")),
                    "path": ctx.path,
                })),
            )
                .into_response()
        }),
    );

    app.add_event_handler(
        LifespanEvent::Startup,
        LifespanHook::new("seed-items", move || {
            let store = store.clone();
            async move {
                store
                    .insert(CreateItem {
                        name: "Hammer".to_string(),
                        description: Some("Claw hammer".to_string()),
                        price: 12.5,
                        tags: vec!["tools".to_string()],
                    })
                    .await;
                tracing::info!("Seeded item catalogue");
                Ok(())
            }
        }),
    );
    app.add_event_handler(
        LifespanEvent::Shutdown,
        LifespanHook::new("goodbye", || async {
            tracing::info!("Demo application shut down");
            Ok(())
        }),
    );

    Ok(app)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::users::DEMO_TOKEN;

    async fn call(app: axum::Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn router() -> axum::Router {
        create_app(app_config()).unwrap().build().unwrap()
    }

    #[tokio::test]
    async fn test_item_lifecycle() {
        let app = router();

        let created = call(
            app.clone(),
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/items")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name": "Saw", "price": 20.0}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let item = body_json(created).await;
        assert_eq!(item["name"], "Saw");
        assert!(item.get("description").is_none());

        let uri = format!("/api/v1/items/{}", item["id"].as_str().unwrap());
        let read = call(app.clone(), Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(read.status(), StatusCode::OK);

        let deleted = call(
            app.clone(),
            Request::delete(&uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let missing = call(app, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(missing).await["path"], uri.as_str());
    }

    #[tokio::test]
    async fn test_invalid_item_is_rejected() {
        let response = call(
            router(),
            Request::post("/api/v1/items")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name": "", "price": -1.0}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["detail"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_users_require_token() {
        let app = router();

        let anonymous = call(
            app.clone(),
            Request::get("/api/v1/users/me").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let me = call(
            app,
            Request::get("/api/v1/users/me")
                .header("x-token", DEMO_TOKEN)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(me.status(), StatusCode::OK);
        let body = body_json(me).await;
        assert_eq!(body["username"], "johndoe");
        assert!(body.get("disabled").is_none());
    }

    #[test]
    fn test_openapi_lists_included_routes() {
        let app = create_app(app_config()).unwrap();
        let doc = app.openapi();

        assert_eq!(doc["info"]["title"], "QuickAPI Demo");
        let read = &doc["paths"]["/api/v1/items/{item_id}"]["get"];
        assert_eq!(read["tags"], json!(["items"]));
        assert_eq!(read["parameters"][0]["schema"]["format"], "uuid");
        assert!(doc["components"]["schemas"]["Item"].is_object());

        let me = &doc["paths"]["/api/v1/users/me"]["get"];
        assert_eq!(me["responses"]["401"]["description"], "Missing x-token header");
    }
}
