//! Item catalogue backed by an in-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::{AppError, AppResult, OptionExt};
use quickapi::{
    ApiRouter, Dependency, Endpoint, RouteOptions, RouteRegistry, RouterOptions, RouterResult,
    ValidatedJson,
};

/// A catalogue item.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Item {
    pub id: Uuid,
    #[schema(example = "Hammer")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 12.5)]
    pub price: f64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Item creation request with validation
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Shared item storage.
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Arc<RwLock<HashMap<Uuid, Item>>>,
}

impl ItemStore {
    pub async fn insert(&self, new: CreateItem) -> Item {
        let item = Item {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            tags: new.tags,
            created_at: Utc::now(),
        };
        self.items.write().await.insert(item.id, item.clone());
        item
    }

    pub async fn get(&self, id: Uuid) -> Option<Item> {
        self.items.read().await.get(&id).cloned()
    }

    /// Items ordered by creation time.
    pub async fn list(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.read().await.values().cloned().collect();
        items.sort_by_key(|item| item.created_at);
        items
    }

    pub async fn remove(&self, id: Uuid) -> Option<Item> {
        self.items.write().await.remove(&id)
    }
}

/// Makes `store` available to handlers as an `Extension`.
fn provide_store(store: ItemStore) -> Dependency {
    Dependency::new("item-store", move |parts| {
        parts.extensions.insert(store.clone());
        Ok(())
    })
}

/// Routes under `/items`.
pub fn router(store: ItemStore) -> RouterResult<ApiRouter> {
    let mut router = ApiRouter::with_options(
        RouterOptions::default()
            .prefix("/items")
            .tag("items")
            .dependency(provide_store(store)),
    )?;

    router.get(
        "",
        Endpoint::new(list_items),
        RouteOptions::new()
            .response_list::<Item>()
            .summary("List items")
            .exclude_none(),
    )?;
    router.post(
        "",
        Endpoint::new(create_item),
        RouteOptions::new()
            .response_model::<Item>()
            .status_code(StatusCode::CREATED)
            .exclude_none(),
    )?;
    router.get(
        "/{item_id:uuid}",
        Endpoint::new(read_item),
        RouteOptions::new()
            .response_model::<Item>()
            .response("404", serde_json::json!({"description": "Item not found"}))
            .exclude_none(),
    )?;
    router.delete(
        "/{item_id:uuid}",
        Endpoint::new(delete_item),
        RouteOptions::new()
            .status_code(StatusCode::NO_CONTENT)
            .response_description("Item deleted"),
    )?;

    Ok(router)
}

async fn list_items(Extension(store): Extension<ItemStore>) -> Json<Vec<Item>> {
    Json(store.list().await)
}

async fn create_item(
    Extension(store): Extension<ItemStore>,
    ValidatedJson(body): ValidatedJson<CreateItem>,
) -> Json<Item> {
    let item = store.insert(body).await;
    tracing::info!(item_id = %item.id, name = %item.name, "item created");
    Json(item)
}

async fn read_item(
    Extension(store): Extension<ItemStore>,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    let item = store.get(item_id).await.ok_or_not_found()?;
    Ok(Json(item))
}

async fn delete_item(
    Extension(store): Extension<ItemStore>,
    Path(item_id): Path<Uuid>,
) -> AppResult<()> {
    store
        .remove(item_id)
        .await
        .ok_or_else(|| AppError::http(StatusCode::NOT_FOUND, "Item not found"))?;
    tracing::info!(item_id = %item_id, "item deleted");
    Ok(())
}
