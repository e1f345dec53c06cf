//! Token-protected user profile routes.

use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use common::{AppError, AppResult, HttpException};
use quickapi::{
    ApiRouter, Dependency, Endpoint, RouteOptions, RouteRegistry, RouterOptions, RouterResult,
};

/// Token accepted by the `x-token` header.
pub const DEMO_TOKEN: &str = "fake-super-secret-token";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    #[schema(example = "johndoe")]
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub disabled: bool,
}

fn known_users() -> Vec<User> {
    vec![
        User {
            username: "johndoe".to_string(),
            full_name: Some("John Doe".to_string()),
            email: Some("johndoe@example.com".to_string()),
            disabled: false,
        },
        User {
            username: "alice".to_string(),
            full_name: None,
            email: None,
            disabled: true,
        },
    ]
}

/// Rejects requests without a valid `x-token` and stores the caller in
/// the request extensions.
fn require_token() -> Dependency {
    Dependency::new("x-token", |parts| {
        let token = parts
            .headers
            .get("x-token")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        if token != DEMO_TOKEN {
            return Err(HttpException::new(StatusCode::BAD_REQUEST, "X-Token header invalid").into());
        }
        let caller = known_users()
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("no demo users configured"))?;
        parts.extensions.insert(caller);
        Ok(())
    })
}

/// Routes under `/users`.
pub fn router() -> RouterResult<ApiRouter> {
    let mut router = ApiRouter::with_options(
        RouterOptions::default()
            .prefix("/users")
            .tag("users")
            .dependency(require_token()),
    )?;

    router.get(
        "/me",
        Endpoint::new(read_me),
        RouteOptions::new()
            .response_model::<User>()
            .exclude_fields(["disabled"])
            .description("The profile of the calling user."),
    )?;
    router.get(
        "/{username}",
        Endpoint::new(read_user),
        RouteOptions::new()
            .response_model::<User>()
            .exclude_none()
            .response("404", serde_json::json!({"description": "User not found"})),
    )?;

    Ok(router)
}

async fn read_me(Extension(caller): Extension<User>) -> Json<User> {
    Json(caller)
}

async fn read_user(Path(username): Path<String>) -> AppResult<Json<User>> {
    known_users()
        .into_iter()
        .find(|user| user.username == username)
        .map(Json)
        .ok_or_else(|| HttpException::new(StatusCode::NOT_FOUND, "User not found").into())
}
