//! Schema and interactive documentation endpoints.

use std::sync::Arc;

use axum::{
    response::{Html, Redirect},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use utoipa_swagger_ui::{oauth, Config, SwaggerUi};

use crate::config::{AppConfig, SwaggerInitOAuth, SwaggerUiParameters};

const REDOC_JS_URL: &str = "https://cdn.jsdelivr.net/npm/redoc@next/bundles/redoc.standalone.js";

/// Routes serving the document and its UIs. Empty when `openapi_url` is
/// unset.
pub(crate) fn routes(config: &AppConfig, document: Arc<Value>) -> Router {
    let Some(openapi_url) = config.openapi_url.as_deref() else {
        return Router::new();
    };
    let root_path = config.effective_root_path();
    let schema_url = format!("{}{}", root_path, openapi_url);

    let mut router = Router::new().route(
        openapi_url,
        get(move || {
            let document = document.clone();
            async move { Json(Value::clone(&document)) }
        }),
    );

    if let Some(docs_url) = config.docs_url.as_deref() {
        let redirect_url = config
            .swagger_ui_oauth2_redirect_url
            .as_deref()
            .map(|url| format!("{}{}", root_path, url));
        router = router.merge(swagger_ui(
            docs_url,
            &schema_url,
            redirect_url,
            config.swagger_ui_init_oauth.as_ref(),
            config.swagger_ui_parameters.as_ref(),
        ));

        if let Some(redirect) = config.swagger_ui_oauth2_redirect_url.as_deref() {
            let target = format!("{}{}/oauth2-redirect.html", root_path, docs_url);
            router = router.route(
                redirect,
                get(move || {
                    let target = target.clone();
                    async move { Redirect::temporary(&target) }
                }),
            );
        }
    }

    if let Some(redoc_url) = config.redoc_url.as_deref() {
        let page = redoc_html(&format!("{} - ReDoc", config.title), &schema_url);
        router = router.route(
            redoc_url,
            get(move || {
                let page = page.clone();
                async move { Html(page) }
            }),
        );
    }

    router
}

fn swagger_ui(
    docs_url: &str,
    schema_url: &str,
    oauth2_redirect_url: Option<String>,
    init_oauth: Option<&SwaggerInitOAuth>,
    parameters: Option<&SwaggerUiParameters>,
) -> SwaggerUi {
    let mut config = Config::new([schema_url.to_string()]);
    if let Some(url) = oauth2_redirect_url {
        config = config.oauth2_redirect_url(url);
    }
    if let Some(parameters) = parameters {
        config = apply_parameters(config, parameters);
    }

    let ui = SwaggerUi::new(docs_url.trim_end_matches('/').to_string()).config(config);
    match init_oauth {
        Some(init) => ui.oauth(oauth_config(init)),
        None => ui,
    }
}

fn apply_parameters(mut config: Config<'static>, parameters: &SwaggerUiParameters) -> Config<'static> {
    if let Some(value) = parameters.deep_linking {
        config = config.deep_linking(value);
    }
    if let Some(value) = parameters.display_operation_id {
        config = config.display_operation_id(value);
    }
    if let Some(value) = parameters.default_models_expand_depth {
        config = config.default_models_expand_depth(value);
    }
    if let Some(value) = parameters.doc_expansion.as_deref() {
        config = config.doc_expansion(value);
    }
    if let Some(value) = parameters.filter {
        config = config.filter(value);
    }
    if let Some(value) = parameters.persist_authorization {
        config = config.persist_authorization(value);
    }
    if let Some(value) = parameters.try_it_out_enabled {
        config = config.try_it_out_enabled(value);
    }
    config
}

fn oauth_config(init: &SwaggerInitOAuth) -> oauth::Config {
    let mut config = oauth::Config::new()
        .scopes(init.scopes.clone())
        .use_pkce_with_authorization_code_grant(init.use_pkce_with_authorization_code_grant);
    if let Some(client_id) = init.client_id.as_deref() {
        config = config.client_id(client_id);
    }
    if let Some(app_name) = init.app_name.as_deref() {
        config = config.app_name(app_name);
    }
    if let Some(realm) = init.realm.as_deref() {
        config = config.realm(realm);
    }
    config
}

/// A standalone ReDoc page for the document at `openapi_url`.
pub fn redoc_html(title: &str, openapi_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>{title}</title>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1">
<link href="https://fonts.googleapis.com/css?family=Montserrat:300,400,700|Roboto:300,400,700" rel="stylesheet">
<style>
  body {{
    margin: 0;
    padding: 0;
  }}
</style>
</head>
<body>
<noscript>
  ReDoc requires Javascript to function. Please enable it to browse the documentation.
</noscript>
<redoc spec-url="{spec_url}"></redoc>
<script src="{script}"> </script>
</body>
</html>
"#,
        title = escape_html(title),
        spec_url = escape_html(openapi_url),
        script = REDOC_JS_URL,
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
