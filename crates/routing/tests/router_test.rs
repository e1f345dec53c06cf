//! Integration tests for compiled routers.
//!
//! Requests are driven in-process through `tower::ServiceExt::oneshot`.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Path,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use validator::Validate;

use common::AppError;
use routing::{
    ApiRoute, ApiRouter, CorsOptions, Dependency, Endpoint, IncludeOptions, Middleware,
    RouteOptions, RouteRegistry, RouterError, RouterOptions, ValidatedJson,
};

// =============================================================================
// Helpers
// =============================================================================

async fn send(router: axum::Router, method: Method, uri: &str) -> Response {
    router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn read_item(Path(item_id): Path<u32>) -> Json<Value> {
    Json(json!({"id": item_id, "name": "hammer", "owner": null}))
}

async fn create_item() -> Json<Value> {
    Json(json!({"id": 1}))
}

fn items_router() -> ApiRouter {
    let mut router = ApiRouter::with_options(RouterOptions::default().prefix("/items")).unwrap();
    router
        .get("/{item_id:int}", Endpoint::new(read_item), RouteOptions::new().exclude_none())
        .unwrap();
    router
        .post(
            "",
            Endpoint::new(create_item),
            RouteOptions::new().status_code(StatusCode::CREATED),
        )
        .unwrap();
    router
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_get_and_post_share_a_prefix() {
    let app = items_router().into_axum().unwrap();

    let response = send(app.clone(), Method::GET, "/items/3").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"id": 3, "name": "hammer"}));

    let response = send(app, Method::POST, "/items").await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_unregistered_method_is_405() {
    let app = items_router().into_axum().unwrap();
    let response = send(app, Method::DELETE, "/items/3").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_included_routes_keep_their_middleware_and_dependencies() {
    let mut items = items_router();
    items.add_middleware(Middleware::set_header("x-scope", "items").unwrap());

    let mut app = ApiRouter::new();
    app.include_router(
        items,
        IncludeOptions::new().prefix("/v1").dependency(Dependency::new(
            "api-key",
            |parts| match parts.headers.get("x-api-key") {
                Some(key) if key == "secret" => Ok(()),
                _ => Err(AppError::Unauthorized),
            },
        )),
    )
    .unwrap();
    app.get(
        "/health",
        Endpoint::new(|| async { "ok" }),
        RouteOptions::default(),
    )
    .unwrap();
    let app = app.into_axum().unwrap();

    let denied = send(app.clone(), Method::GET, "/v1/items/1").await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(denied).await, json!({"detail": "Not authenticated"}));

    let allowed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/items/1")
                .header("x-api-key", "secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    assert_eq!(allowed.headers()["x-scope"], "items");

    let health = send(app, Method::GET, "/health").await;
    assert_eq!(health.status(), StatusCode::OK);
    assert!(health.headers().get("x-scope").is_none());
}

#[tokio::test]
async fn test_router_middleware_wraps_everything() {
    let mut app = items_router();
    app.add_middleware(Middleware::set_header("x-inner", "1").unwrap());
    app.add_middleware(Middleware::RequestId);
    let app = app.into_axum().unwrap();

    let response = send(app, Method::GET, "/items/9").await;
    assert_eq!(response.headers()["x-inner"], "1");
    assert!(response.headers().contains_key("x-request-id"));
}

#[test]
fn test_url_path_for_included_route() {
    let mut app = ApiRouter::new();
    app.include_router(items_router(), IncludeOptions::new().prefix("/v1"))
        .unwrap();

    let mut params = BTreeMap::new();
    params.insert("item_id".to_string(), "12".to_string());
    assert_eq!(app.url_path_for("read_item", &params).unwrap(), "/v1/items/12");
}

#[test]
fn test_catch_all_next_to_parameter_is_rejected() {
    let mut app = ApiRouter::new();
    app.get("/files/{id}", Endpoint::new(|| async { "one" }), RouteOptions::default())
        .unwrap();
    let err = app
        .get(
            "/files/{rest:path}",
            Endpoint::new(|| async { "many" }),
            RouteOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, RouterError::ConflictingRoute { .. }));

    let mut appended = ApiRouter::new();
    appended.add_route(
        "/files/{id}",
        ApiRoute::get("/files/{id}", || async { "one" }).unwrap(),
        true,
    );
    appended.add_route(
        "/files/{rest:path}",
        ApiRoute::get("/files/{rest:path}", || async { "many" }).unwrap(),
        true,
    );
    assert!(matches!(
        appended.into_axum(),
        Err(RouterError::ConflictingRoute { .. })
    ));
}

// =============================================================================
// Middleware over requests
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
struct NewItem {
    #[validate(length(min = 1))]
    name: String,
}

async fn store_item(ValidatedJson(item): ValidatedJson<NewItem>) -> Json<Value> {
    Json(json!({"name": item.name}))
}

fn limited_router(limit: usize) -> axum::Router {
    let mut app = ApiRouter::new();
    app.post("/items", Endpoint::new(store_item), RouteOptions::default())
        .unwrap();
    app.add_middleware(Middleware::BodyLimit(limit));
    app.into_axum().unwrap()
}

fn post_json(body: &'static str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/items")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_slow_handler_times_out_with_408() {
    let mut app = ApiRouter::new();
    app.get(
        "/slow",
        Endpoint::new(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "late"
        }),
        RouteOptions::default(),
    )
    .unwrap();
    app.add_middleware(Middleware::Timeout(Duration::from_millis(20)));
    let app = app.into_axum().unwrap();

    let response = send(app, Method::GET, "/slow").await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_oversized_body_with_content_length_is_413() {
    let body = r#"{"name": "a rather long item name"}"#;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/items")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let response = limited_router(8).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_oversized_body_without_content_length_is_413() {
    let response = limited_router(8)
        .oneshot(post_json(r#"{"name": "a rather long item name"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = limited_router(1024)
        .oneshot(post_json(r#"{"name": "hammer"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/items/1")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_preflight_for_listed_origin() {
    let mut app = items_router();
    app.add_middleware(Middleware::Cors(CorsOptions {
        allow_origins: vec!["https://shop.example".to_string()],
        allow_methods: vec!["GET".to_string(), "POST".to_string()],
        ..Default::default()
    }));
    let app = app.into_axum().unwrap();

    let response = app
        .clone()
        .oneshot(preflight("https://shop.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example"
    );
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("GET") && methods.contains("POST"));

    let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_cors_wildcard_with_credentials_mirrors_origin() {
    let mut app = items_router();
    app.add_middleware(Middleware::Cors(CorsOptions {
        allow_origins: vec!["*".to_string()],
        allow_methods: vec!["*".to_string()],
        allow_headers: vec!["*".to_string()],
        allow_credentials: true,
        ..Default::default()
    }));
    let app = app.into_axum().unwrap();

    let response = app.oneshot(preflight("https://shop.example")).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}
