//! OpenAPI document generation.
//!
//! The typed document is assembled with `utoipa` builders, serialized, and
//! then patched as JSON for the parts `utoipa` has no model for (version
//! 3.1, webhooks, callbacks, free-form extras).

use std::collections::BTreeMap;

use axum::http::{Method, StatusCode};
use serde_json::{json, Map, Value};
use utoipa::openapi::{
    path::{Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder},
    schema::{ArrayBuilder, ObjectBuilder, Schema, SchemaType},
    tag::TagBuilder,
    ComponentsBuilder, ContactBuilder, Content, Deprecated, InfoBuilder, LicenseBuilder,
    OpenApiBuilder, PathItemType, PathsBuilder, Ref, RefOr, Required, ResponseBuilder,
    ServerBuilder,
};

use routing::{ApiRoute, ResponseClass, RouteRegistry};

use crate::config::{AppConfig, ServerInfo};

const OPENAPI_VERSION: &str = "3.1.0";
const VALIDATION_ERROR: &str = "ValidationError";
const HTTP_VALIDATION_ERROR: &str = "HTTPValidationError";

/// Generate the OpenAPI document for `routes` under `config`.
pub fn generate(config: &AppConfig, routes: &[ApiRoute]) -> Value {
    let root_path = config.effective_root_path();
    let documented: Vec<&ApiRoute> = if config.include_in_schema {
        routes.iter().filter(|r| r.options().include_in_schema).collect()
    } else {
        Vec::new()
    };

    let mut schemas: BTreeMap<String, RefOr<Schema>> = BTreeMap::new();
    let mut items: BTreeMap<String, PathItemBuilder> = BTreeMap::new();
    for route in &documented {
        for (index, method) in route.methods().iter().enumerate() {
            let Some(item_type) = path_item_type(method) else {
                continue;
            };
            let operation = build_operation(config, route, method, index, &mut schemas);
            let path = route.template().openapi_path().to_string();
            let item = items.remove(&path).unwrap_or_default();
            items.insert(path, item.operation(item_type, operation));
        }
    }

    let mut paths = PathsBuilder::new();
    for (path, item) in items {
        paths = paths.path(path, item.build());
    }

    let mut components = ComponentsBuilder::new();
    for (name, schema) in schemas {
        components = components.schema(name, schema);
    }

    let mut servers = config.servers.clone().unwrap_or_default();
    if config.root_path_in_servers
        && !root_path.is_empty()
        && !servers.iter().any(|s| s.url == root_path)
    {
        servers.insert(0, ServerInfo::new(root_path));
    }

    let tags = config.openapi_tags.as_ref().map(|tags| {
        tags.iter()
            .map(|tag| {
                TagBuilder::new()
                    .name(tag.name.clone())
                    .description(tag.description.clone())
                    .build()
            })
            .collect::<Vec<_>>()
    });

    let document = OpenApiBuilder::new()
        .info(info(config))
        .servers((!servers.is_empty()).then(|| {
            servers
                .iter()
                .map(|s| {
                    ServerBuilder::new()
                        .url(s.url.clone())
                        .description(s.description.clone())
                        .build()
                })
                .collect::<Vec<_>>()
        }))
        .paths(paths.build())
        .components(Some(components.build()))
        .tags(tags)
        .build();

    let mut doc = match serde_json::to_value(&document) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize OpenAPI document");
            json!({"info": {"title": config.title, "version": config.version}, "paths": {}})
        }
    };

    doc["openapi"] = json!(OPENAPI_VERSION);
    for route in &documented {
        for method in route.methods() {
            if let Some(operation) = operation_mut(&mut doc, route, method) {
                patch_operation(operation, config, route);
            }
        }
    }
    if let Some(webhooks) = &config.webhooks {
        let rendered = render_webhooks(config, &webhooks.routes(), &mut doc);
        if !rendered.is_empty() {
            doc["webhooks"] = Value::Object(rendered);
        }
    }
    if let Some(extra) = &config.docs_schema {
        deep_merge(&mut doc, Value::Object(extra.clone()));
    }
    doc
}

fn info(config: &AppConfig) -> utoipa::openapi::Info {
    let contact = config.contact.as_ref().map(|c| {
        ContactBuilder::new()
            .name(c.name.clone())
            .url(c.url.clone())
            .email(c.email.clone())
            .build()
    });
    let license = config.license_info.as_ref().map(|l| {
        LicenseBuilder::new()
            .name(l.name.clone())
            .url(l.url.clone())
            .build()
    });

    InfoBuilder::new()
        .title(config.title.clone())
        .version(config.version.clone())
        .description((!config.description.is_empty()).then(|| config.description.clone()))
        .terms_of_service(config.terms_of_service.clone())
        .contact(contact)
        .license(license)
        .build()
}

fn build_operation(
    config: &AppConfig,
    route: &ApiRoute,
    method: &Method,
    index: usize,
    schemas: &mut BTreeMap<String, RefOr<Schema>>,
) -> Operation {
    let options = route.options();

    let mut builder = OperationBuilder::new()
        .tags((!options.tags.is_empty()).then(|| options.tags.clone()))
        .summary(Some(
            options
                .summary
                .clone()
                .unwrap_or_else(|| default_summary(route.name())),
        ))
        .description(options.description.clone())
        .operation_id(Some(operation_id(route, method, index)));

    if options.deprecated == Some(true) || config.deprecated == Some(true) {
        builder = builder.deprecated(Some(Deprecated::True));
    }

    for param in route.template().params() {
        builder = builder.parameter(
            ParameterBuilder::new()
                .name(param.name.clone())
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(RefOr::T(param.converter.schema()))),
        );
    }

    let status = options.status_code;
    let mut response = ResponseBuilder::new().description(options.response_description.clone());
    if status != StatusCode::NO_CONTENT && status != StatusCode::NOT_MODIFIED {
        let class = options.response_class.unwrap_or_default();
        match (&options.response_model, class) {
            (Some(model), _) => {
                schemas.insert(model.name.clone(), model.schema.clone());
                response = response.content(class.media_type(), Content::new(model.reference()));
            }
            (None, ResponseClass::Json) => {}
            (None, other) => {
                let text = ObjectBuilder::new().schema_type(SchemaType::String).build();
                response = response.content(other.media_type(), Content::new(RefOr::T(Schema::Object(text))));
            }
        }
    }
    builder = builder.response(status.as_str(), RefOr::T(response.build()));

    if !route.template().params().is_empty() {
        register_validation_schemas(schemas);
        let reference: RefOr<Schema> = RefOr::Ref(Ref::from_schema_name(HTTP_VALIDATION_ERROR));
        builder = builder.response(
            "422",
            RefOr::T(
                ResponseBuilder::new()
                    .description("Validation Error")
                    .content("application/json", Content::new(reference))
                    .build(),
            ),
        );
    }

    builder.build()
}

/// `read_items` becomes `Read Items`.
fn default_summary(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The route's id for its first method. Further methods swap the method
/// suffix, or append one when the id has none.
fn operation_id(route: &ApiRoute, method: &Method, index: usize) -> String {
    let base = route.operation_id();
    if index == 0 || route.options().operation_id.is_some() {
        return base.to_string();
    }
    let method = method.as_str().to_lowercase();
    let stem = route
        .methods()
        .first()
        .map(|first| format!("_{}", first.as_str().to_lowercase()))
        .and_then(|suffix| base.strip_suffix(suffix.as_str()))
        .unwrap_or(base);
    format!("{}_{}", stem, method)
}

fn path_item_type(method: &Method) -> Option<PathItemType> {
    match *method {
        Method::GET => Some(PathItemType::Get),
        Method::POST => Some(PathItemType::Post),
        Method::PUT => Some(PathItemType::Put),
        Method::PATCH => Some(PathItemType::Patch),
        Method::DELETE => Some(PathItemType::Delete),
        Method::HEAD => Some(PathItemType::Head),
        Method::OPTIONS => Some(PathItemType::Options),
        Method::TRACE => Some(PathItemType::Trace),
        _ => None,
    }
}

fn register_validation_schemas(schemas: &mut BTreeMap<String, RefOr<Schema>>) {
    if schemas.contains_key(HTTP_VALIDATION_ERROR) {
        return;
    }
    let string = || ObjectBuilder::new().schema_type(SchemaType::String).build();

    let validation_error = ObjectBuilder::new()
        .title(Some(VALIDATION_ERROR))
        .property(
            "loc",
            RefOr::T(Schema::Array(
                ArrayBuilder::new()
                    .items(RefOr::T(Schema::Object(string())))
                    .build(),
            )),
        )
        .required("loc")
        .property("msg", RefOr::T(Schema::Object(string())))
        .required("msg")
        .property("type", RefOr::T(Schema::Object(string())))
        .required("type")
        .build();

    let item: RefOr<Schema> = RefOr::Ref(Ref::from_schema_name(VALIDATION_ERROR));
    let http_validation_error = ObjectBuilder::new()
        .title(Some(HTTP_VALIDATION_ERROR))
        .property(
            "detail",
            RefOr::T(Schema::Array(ArrayBuilder::new().items(item).build())),
        )
        .build();

    schemas.insert(
        VALIDATION_ERROR.to_string(),
        RefOr::T(Schema::Object(validation_error)),
    );
    schemas.insert(
        HTTP_VALIDATION_ERROR.to_string(),
        RefOr::T(Schema::Object(http_validation_error)),
    );
}

fn operation_mut<'a>(
    doc: &'a mut Value,
    route: &ApiRoute,
    method: &Method,
) -> Option<&'a mut Map<String, Value>> {
    doc.get_mut("paths")?
        .get_mut(route.template().openapi_path())?
        .get_mut(method.as_str().to_lowercase())?
        .as_object_mut()
}

/// Additional responses, callbacks and free-form extras.
fn patch_operation(operation: &mut Map<String, Value>, config: &AppConfig, route: &ApiRoute) {
    let options = route.options();

    let mut additional: Map<String, Value> = Map::new();
    for (code, fragment) in config.responses.iter().flatten().chain(&options.responses) {
        deep_merge(
            additional.entry(code.clone()).or_insert(Value::Null),
            fragment.clone(),
        );
    }
    if !additional.is_empty() {
        let responses = operation
            .entry("responses")
            .or_insert_with(|| json!({}));
        for (code, fragment) in additional {
            if let Some(responses) = responses.as_object_mut() {
                let entry = responses.entry(code).or_insert_with(|| json!({}));
                deep_merge(entry, fragment);
                if entry.get("description").is_none() {
                    entry["description"] = json!("Additional Response");
                }
            }
        }
    }

    let callbacks = config.callbacks.iter().flatten().chain(&options.callbacks);
    for callback in callbacks {
        deep_merge(
            operation.entry("callbacks").or_insert_with(|| json!({})),
            Value::Object(callback.clone()),
        );
    }

    if let Some(extra) = &options.openapi_extra {
        for (key, value) in extra {
            deep_merge(operation.entry(key.clone()).or_insert(Value::Null), value.clone());
        }
    }
}

/// Webhooks are keyed by their path without the leading slash.
fn render_webhooks(config: &AppConfig, routes: &[ApiRoute], doc: &mut Value) -> Map<String, Value> {
    let mut schemas = BTreeMap::new();
    let mut webhooks = Map::new();

    for route in routes.iter().filter(|r| r.options().include_in_schema) {
        let name = route.path().trim_start_matches('/').to_string();
        for (index, method) in route.methods().iter().enumerate() {
            let operation = build_operation(config, route, method, index, &mut schemas);
            let mut operation = match serde_json::to_value(&operation) {
                Ok(Value::Object(operation)) => operation,
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(webhook = %name, error = %e, "failed to serialize webhook");
                    continue;
                }
            };
            patch_operation(&mut operation, config, route);
            deep_merge(
                webhooks.entry(name.clone()).or_insert_with(|| json!({})),
                json!({ method.as_str().to_lowercase(): operation }),
            );
        }
    }

    for (name, schema) in schemas {
        match serde_json::to_value(&schema) {
            Ok(schema) => deep_merge(doc, json!({"components": {"schemas": {name: schema}}})),
            Err(e) => tracing::error!(schema = %name, error = %e, "failed to serialize schema"),
        }
    }
    webhooks
}

/// Objects merge key by key; anything else replaces the target.
fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                deep_merge(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}
