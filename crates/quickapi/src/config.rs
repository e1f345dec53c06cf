//! Application configuration.
//!
//! [`AppConfig`] is a flat bag of settings stored verbatim by
//! [`QuickApi`](crate::QuickApi). Documentation metadata types mirror the
//! corresponding OpenAPI objects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use routing::{ApiRoute, ApiRouter, Callback, Middleware, Responses};

use crate::exceptions::{ExceptionHandler, ExceptionKey};
use crate::lifespan::LifespanHook;

/// Contact information for the exposed API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

/// License information for the exposed API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub name: String,
    pub url: Option<String>,
}

/// An entry of the OpenAPI `servers` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub url: String,
    pub description: Option<String>,
}

impl ServerInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }
}

/// Metadata for a tag used to group operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub description: Option<String>,
}

impl TagInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
        }
    }
}

/// OAuth2 settings passed to Swagger UI's `initOAuth`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwaggerInitOAuth {
    pub client_id: Option<String>,
    pub app_name: Option<String>,
    pub realm: Option<String>,
    pub scopes: Vec<String>,
    pub use_pkce_with_authorization_code_grant: bool,
}

/// Swagger UI display parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwaggerUiParameters {
    pub deep_linking: Option<bool>,
    pub display_operation_id: Option<bool>,
    pub default_models_expand_depth: Option<isize>,
    pub doc_expansion: Option<String>,
    pub filter: Option<bool>,
    pub persist_authorization: Option<bool>,
    pub try_it_out_enabled: Option<bool>,
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub debug: bool,
    /// Seed routes. Kept as supplied; the router does not receive them.
    pub routes: Vec<ApiRoute>,
    pub title: String,
    pub description: String,
    pub version: String,
    pub openapi_url: Option<String>,
    pub openapi_tags: Option<Vec<TagInfo>>,
    pub servers: Option<Vec<ServerInfo>>,
    pub docs_url: Option<String>,
    pub redoc_url: Option<String>,
    pub swagger_ui_oauth2_redirect_url: Option<String>,
    pub swagger_ui_init_oauth: Option<SwaggerInitOAuth>,
    /// Outermost middleware, applied after everything added through
    /// `add_middleware`
    pub middleware: Option<Vec<Middleware>>,
    pub exception_handlers: Option<HashMap<ExceptionKey, ExceptionHandler>>,
    pub on_startup: Option<Vec<LifespanHook>>,
    pub on_shutdown: Option<Vec<LifespanHook>>,
    pub terms_of_service: Option<String>,
    pub contact: Option<ContactInfo>,
    pub license_info: Option<LicenseInfo>,
    /// Deprecated alias of `root_path`
    pub openapi_prefix: String,
    pub root_path: String,
    pub root_path_in_servers: bool,
    pub responses: Option<Responses>,
    pub callbacks: Option<Vec<Callback>>,
    pub webhooks: Option<ApiRouter>,
    pub deprecated: Option<bool>,
    pub include_in_schema: bool,
    pub swagger_ui_parameters: Option<SwaggerUiParameters>,
    /// Stored for compatibility; every handler is async.
    pub asynchronous: bool,
    /// Merged into the top level of the generated document
    pub docs_schema: Option<Map<String, Value>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            routes: Vec::new(),
            title: "QuickAPI".to_string(),
            description: String::new(),
            version: "0.1.0".to_string(),
            openapi_url: Some("/openapi.json".to_string()),
            openapi_tags: None,
            servers: None,
            docs_url: Some("/docs".to_string()),
            redoc_url: Some("/redoc".to_string()),
            swagger_ui_oauth2_redirect_url: Some("/docs/oauth2-redirect".to_string()),
            swagger_ui_init_oauth: None,
            middleware: None,
            exception_handlers: None,
            on_startup: None,
            on_shutdown: None,
            terms_of_service: None,
            contact: None,
            license_info: None,
            openapi_prefix: String::new(),
            root_path: String::new(),
            root_path_in_servers: true,
            responses: None,
            callbacks: None,
            webhooks: None,
            deprecated: None,
            include_in_schema: true,
            swagger_ui_parameters: None,
            asynchronous: true,
            docs_schema: None,
        }
    }
}

impl AppConfig {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Whether the deprecated `openapi_prefix` stands in for `root_path`.
    pub fn uses_openapi_prefix(&self) -> bool {
        self.root_path.is_empty() && !self.openapi_prefix.is_empty()
    }

    /// The effective root path. `openapi_prefix` is only consulted when
    /// `root_path` is empty.
    pub fn effective_root_path(&self) -> &str {
        if self.uses_openapi_prefix() {
            &self.openapi_prefix
        } else {
            &self.root_path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(!config.debug);
        assert!(config.routes.is_empty());
        assert_eq!(config.title, "QuickAPI");
        assert_eq!(config.description, "");
        assert_eq!(config.version, "0.1.0");
        assert_eq!(config.openapi_url.as_deref(), Some("/openapi.json"));
        assert_eq!(config.docs_url.as_deref(), Some("/docs"));
        assert_eq!(config.redoc_url.as_deref(), Some("/redoc"));
        assert_eq!(
            config.swagger_ui_oauth2_redirect_url.as_deref(),
            Some("/docs/oauth2-redirect")
        );
        assert!(config.openapi_tags.is_none());
        assert!(config.servers.is_none());
        assert!(config.middleware.is_none());
        assert!(config.exception_handlers.is_none());
        assert!(config.on_startup.is_none());
        assert!(config.on_shutdown.is_none());
        assert_eq!(config.openapi_prefix, "");
        assert_eq!(config.root_path, "");
        assert!(config.root_path_in_servers);
        assert!(config.deprecated.is_none());
        assert!(config.include_in_schema);
        assert!(config.asynchronous);
        assert!(config.webhooks.is_none());
        assert!(config.docs_schema.is_none());
    }

    #[test]
    fn test_root_path_prefers_root_path() {
        let config = AppConfig {
            root_path: "/api".into(),
            openapi_prefix: "/legacy".into(),
            ..Default::default()
        };
        assert_eq!(config.effective_root_path(), "/api");
        assert!(!config.uses_openapi_prefix());

        let legacy = AppConfig {
            openapi_prefix: "/legacy".into(),
            ..Default::default()
        };
        assert_eq!(legacy.effective_root_path(), "/legacy");
        assert!(legacy.uses_openapi_prefix());
        assert!(!AppConfig::default().uses_openapi_prefix());
    }
}
