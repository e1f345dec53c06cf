//! Route, include and router options.
//!
//! Options are plain structs with public fields and a `Default`, plus a few
//! chainable setters for the fields that are set most often.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{Map, Value};
use utoipa::openapi::schema::{ArrayBuilder, Schema};
use utoipa::openapi::{Ref, RefOr};
use utoipa::ToSchema;

use crate::middleware::Dependency;
use crate::route::ApiRoute;

/// Additional documented responses keyed by status code (or `"default"`).
///
/// Each value is an OpenAPI response object fragment, e.g.
/// `{"description": "Item not found"}`.
pub type Responses = BTreeMap<String, Value>;

/// An OpenAPI callback object fragment merged into the operation.
pub type Callback = Map<String, Value>;

/// Function computing the operation id of a route.
#[derive(Clone)]
pub struct UniqueIdGenerator(Arc<dyn Fn(&ApiRoute) -> String + Send + Sync>);

impl UniqueIdGenerator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ApiRoute) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn generate(&self, route: &ApiRoute) -> String {
        (self.0)(route)
    }
}

impl std::fmt::Debug for UniqueIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UniqueIdGenerator(..)")
    }
}

/// Kind of response a route produces, used for the documented media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseClass {
    #[default]
    Json,
    Html,
    PlainText,
}

impl ResponseClass {
    pub fn media_type(&self) -> &'static str {
        match self {
            ResponseClass::Json => "application/json",
            ResponseClass::Html => "text/html",
            ResponseClass::PlainText => "text/plain",
        }
    }
}

/// Schema of a route's successful response body.
#[derive(Clone)]
pub struct ResponseModel {
    /// Component name the schema is registered under
    pub name: String,
    pub schema: RefOr<Schema>,
    /// The body is a list of `name`
    pub list: bool,
}

impl std::fmt::Debug for ResponseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseModel")
            .field("name", &self.name)
            .field("list", &self.list)
            .finish_non_exhaustive()
    }
}

impl ResponseModel {
    pub fn of<'s, T: ToSchema<'s>>() -> Self {
        let (name, schema) = T::schema();
        Self {
            name: name.to_string(),
            schema,
            list: false,
        }
    }

    pub fn list_of<'s, T: ToSchema<'s>>() -> Self {
        Self {
            list: true,
            ..Self::of::<T>()
        }
    }

    /// Reference to the registered component, wrapped in an array for lists.
    pub fn reference(&self) -> RefOr<Schema> {
        let reference = RefOr::Ref(Ref::from_schema_name(self.name.clone()));
        if self.list {
            RefOr::T(Schema::Array(ArrayBuilder::new().items(reference).build()))
        } else {
            reference
        }
    }
}

/// Per-route options accepted by `get`, `post` and friends.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub response_model: Option<ResponseModel>,
    /// Status used for successful responses that did not pick one
    pub status_code: StatusCode,
    pub tags: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub response_description: String,
    pub responses: Responses,
    pub deprecated: Option<bool>,
    pub operation_id: Option<String>,
    pub response_model_include: Option<BTreeSet<String>>,
    pub response_model_exclude: Option<BTreeSet<String>>,
    pub response_model_by_alias: bool,
    pub response_model_exclude_unset: bool,
    pub response_model_exclude_defaults: bool,
    pub response_model_exclude_none: bool,
    pub include_in_schema: bool,
    pub response_class: Option<ResponseClass>,
    pub name: Option<String>,
    pub callbacks: Vec<Callback>,
    pub openapi_extra: Option<Map<String, Value>>,
    pub generate_unique_id_function: Option<UniqueIdGenerator>,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            response_model: None,
            status_code: StatusCode::OK,
            tags: Vec::new(),
            dependencies: Vec::new(),
            summary: None,
            description: None,
            response_description: "Successful Response".to_string(),
            responses: Responses::new(),
            deprecated: None,
            operation_id: None,
            response_model_include: None,
            response_model_exclude: None,
            response_model_by_alias: true,
            response_model_exclude_unset: false,
            response_model_exclude_defaults: false,
            response_model_exclude_none: false,
            include_in_schema: true,
            response_class: None,
            name: None,
            callbacks: Vec::new(),
            openapi_extra: None,
            generate_unique_id_function: None,
        }
    }
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response_model<'s, T: ToSchema<'s>>(mut self) -> Self {
        self.response_model = Some(ResponseModel::of::<T>());
        self
    }

    pub fn response_list<'s, T: ToSchema<'s>>(mut self) -> Self {
        self.response_model = Some(ResponseModel::list_of::<T>());
        self
    }

    pub fn status_code(mut self, status: StatusCode) -> Self {
        self.status_code = status;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn response_description(mut self, description: impl Into<String>) -> Self {
        self.response_description = description.into();
        self
    }

    pub fn response(mut self, status: impl Into<String>, response: Value) -> Self {
        self.responses.insert(status.into(), response);
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = Some(deprecated);
        self
    }

    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Keep only these top-level fields of the JSON response body.
    pub fn include_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_model_include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Drop these top-level fields from the JSON response body.
    pub fn exclude_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_model_exclude = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude_none(mut self) -> Self {
        self.response_model_exclude_none = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.include_in_schema = false;
        self
    }

    pub fn response_class(mut self, class: ResponseClass) -> Self {
        self.response_class = Some(class);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn openapi_extra(mut self, extra: Map<String, Value>) -> Self {
        self.openapi_extra = Some(extra);
        self
    }

    pub fn unique_id_with(mut self, generator: UniqueIdGenerator) -> Self {
        self.generate_unique_id_function = Some(generator);
        self
    }
}

/// Options for mounting one router inside another.
#[derive(Debug, Clone)]
pub struct IncludeOptions {
    pub prefix: String,
    pub tags: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub responses: Responses,
    pub deprecated: Option<bool>,
    pub include_in_schema: bool,
    pub default_response_class: Option<ResponseClass>,
    pub callbacks: Vec<Callback>,
    pub generate_unique_id_function: Option<UniqueIdGenerator>,
}

impl Default for IncludeOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            tags: Vec::new(),
            dependencies: Vec::new(),
            responses: Responses::new(),
            deprecated: None,
            include_in_schema: true,
            default_response_class: None,
            callbacks: Vec::new(),
            generate_unique_id_function: None,
        }
    }
}

impl IncludeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn response(mut self, status: impl Into<String>, response: Value) -> Self {
        self.responses.insert(status.into(), response);
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = Some(deprecated);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.include_in_schema = false;
        self
    }
}

/// Defaults an [`ApiRouter`](crate::ApiRouter) applies to every route it
/// registers.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub prefix: String,
    pub tags: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub responses: Responses,
    pub deprecated: Option<bool>,
    pub include_in_schema: bool,
    pub default_response_class: Option<ResponseClass>,
    pub callbacks: Vec<Callback>,
    pub generate_unique_id_function: Option<UniqueIdGenerator>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            tags: Vec::new(),
            dependencies: Vec::new(),
            responses: Responses::new(),
            deprecated: None,
            include_in_schema: true,
            default_response_class: None,
            callbacks: Vec::new(),
            generate_unique_id_function: None,
        }
    }
}

impl RouterOptions {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

/// `Some(true)` if either side deprecates, otherwise the first explicit value.
pub(crate) fn merge_deprecated(first: Option<bool>, second: Option<bool>) -> Option<bool> {
    match (first, second) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), _) | (_, Some(false)) => Some(false),
        (None, None) => None,
    }
}
