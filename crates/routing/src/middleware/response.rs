//! Route-level response shaping: default status code and JSON field
//! filtering.

use std::collections::BTreeSet;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use common::{AppError, RaisedError};

use crate::options::RouteOptions;

#[derive(Debug, Clone)]
pub(crate) struct ResponseShaper {
    status_code: StatusCode,
    include: Option<BTreeSet<String>>,
    exclude: Option<BTreeSet<String>>,
    exclude_none: bool,
}

impl ResponseShaper {
    /// `None` when the route's responses pass through untouched.
    pub fn from_options(options: &RouteOptions) -> Option<Self> {
        let shaper = Self {
            status_code: options.status_code,
            include: options.response_model_include.clone(),
            exclude: options.response_model_exclude.clone(),
            exclude_none: options.response_model_exclude_none,
        };
        if shaper.status_code == StatusCode::OK && !shaper.filters() {
            None
        } else {
            Some(shaper)
        }
    }

    fn filters(&self) -> bool {
        self.include.is_some() || self.exclude.is_some() || self.exclude_none
    }

    pub async fn apply(&self, response: Response) -> Response {
        // Errors keep the status and body they were raised with
        if response.extensions().get::<RaisedError>().is_some() {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        if parts.status == StatusCode::OK {
            parts.status = self.status_code;
        }

        if matches!(
            parts.status,
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED
        ) {
            parts.headers.remove(header::CONTENT_LENGTH);
            parts.headers.remove(header::CONTENT_TYPE);
            return Response::from_parts(parts, Body::empty());
        }

        let is_json = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if !self.filters() || !is_json || !parts.status.is_success() {
            return Response::from_parts(parts, body);
        }

        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return AppError::internal(format!("failed to buffer response: {}", e))
                    .into_response()
            }
        };
        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(_) => return Response::from_parts(parts, Body::from(bytes)),
        };

        let shaped = self.shape(value);
        let bytes = match serde_json::to_vec(&shaped) {
            Ok(bytes) => bytes,
            Err(e) => {
                return AppError::internal(format!("failed to encode response: {}", e))
                    .into_response()
            }
        };
        parts.headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from(bytes.len()),
        );
        Response::from_parts(parts, Body::from(bytes))
    }

    /// Field filters apply to the top-level object, or to each element of a
    /// top-level array. `exclude_none` applies at every depth.
    fn shape(&self, value: Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.shape_one(v)).collect()),
            other => self.shape_one(other),
        }
    }

    fn shape_one(&self, value: Value) -> Value {
        let value = match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(key, _)| {
                        self.include.as_ref().map_or(true, |keep| keep.contains(key))
                            && self.exclude.as_ref().map_or(true, |drop| !drop.contains(key))
                    })
                    .collect(),
            ),
            other => other,
        };
        if self.exclude_none {
            strip_nulls(value)
        } else {
            value
        }
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
