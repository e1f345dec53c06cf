//! Path templates.
//!
//! A template such as `/items/{item_id:int}/files/{rest:path}` is compiled
//! once into the two spellings the rest of the crate needs: the axum
//! route (`/items/:item_id/files/*rest`) and the OpenAPI path
//! (`/items/{item_id}/files/{rest}`).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use utoipa::openapi::schema::{KnownFormat, ObjectBuilder, Schema, SchemaFormat, SchemaType};

use crate::error::{RouterError, RouterResult};

static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]*)\}").expect("param pattern is valid"));

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern is valid"));

/// Value converter attached to a path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Str,
    Int,
    Float,
    Uuid,
    /// Matches the remainder of the path, slashes included
    Path,
}

impl Converter {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "str" => Some(Converter::Str),
            "int" => Some(Converter::Int),
            "float" => Some(Converter::Float),
            "uuid" => Some(Converter::Uuid),
            "path" => Some(Converter::Path),
            _ => None,
        }
    }

    /// Schema advertised for the parameter in the OpenAPI document.
    pub fn schema(&self) -> Schema {
        let builder = ObjectBuilder::new();
        let builder = match self {
            Converter::Str | Converter::Path => builder.schema_type(SchemaType::String),
            Converter::Int => builder.schema_type(SchemaType::Integer),
            Converter::Float => builder.schema_type(SchemaType::Number),
            Converter::Uuid => builder
                .schema_type(SchemaType::String)
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::Uuid))),
        };
        Schema::Object(builder.build())
    }
}

/// A named placeholder within a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParam {
    pub name: String,
    pub converter: Converter,
}

/// A parsed and validated route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    axum: String,
    openapi: String,
    params: Vec<PathParam>,
}

impl PathTemplate {
    pub fn parse(path: &str) -> RouterResult<Self> {
        if !path.starts_with('/') {
            return Err(RouterError::invalid_path(path, "must start with '/'"));
        }

        let mut axum = String::with_capacity(path.len());
        let mut openapi = String::with_capacity(path.len());
        let mut params: Vec<PathParam> = Vec::new();
        let mut last = 0;

        for caps in PARAM_RE.captures_iter(path) {
            let Some(whole) = caps.get(0) else { continue };
            let inner = caps.get(1).map_or("", |m| m.as_str());
            let (start, end) = (whole.start(), whole.end());

            let (name, converter) = match inner.split_once(':') {
                Some((name, converter)) => {
                    let converter = Converter::parse(converter.trim()).ok_or_else(|| {
                        RouterError::UnknownConverter {
                            path: path.to_string(),
                            converter: converter.trim().to_string(),
                        }
                    })?;
                    (name.trim(), converter)
                }
                None => (inner.trim(), Converter::Str),
            };

            if !NAME_RE.is_match(name) {
                return Err(RouterError::invalid_path(
                    path,
                    format!("{:?} is not a valid parameter name", name),
                ));
            }
            if params.iter().any(|p| p.name == name) {
                return Err(RouterError::invalid_path(
                    path,
                    format!("parameter {:?} appears twice", name),
                ));
            }
            if !path[..start].ends_with('/') || !(end == path.len() || path[end..].starts_with('/'))
            {
                return Err(RouterError::invalid_path(
                    path,
                    "a parameter must span a whole path segment",
                ));
            }
            if converter == Converter::Path && end != path.len() {
                return Err(RouterError::MisplacedPathConverter(path.to_string()));
            }

            let literal = check_literal(path, &path[last..start])?;
            axum.push_str(literal);
            openapi.push_str(literal);

            axum.push(if converter == Converter::Path { '*' } else { ':' });
            axum.push_str(name);
            openapi.push('{');
            openapi.push_str(name);
            openapi.push('}');

            params.push(PathParam {
                name: name.to_string(),
                converter,
            });
            last = end;
        }

        let tail = check_literal(path, &path[last..])?;
        axum.push_str(tail);
        openapi.push_str(tail);

        Ok(Self {
            raw: path.to_string(),
            axum,
            openapi,
            params,
        })
    }

    /// The template as written at registration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn axum_path(&self) -> &str {
        &self.axum
    }

    pub fn openapi_path(&self) -> &str {
        &self.openapi
    }

    pub fn params(&self) -> &[PathParam] {
        &self.params
    }

    /// Whether `self` and `other` cannot live in the same axum router.
    ///
    /// After a shared literal prefix, two templates clash when they put
    /// differently named parameters, or a parameter and a catch-all, at
    /// the same segment. Identical templates never clash; registering the
    /// same method twice is a duplicate instead.
    pub fn clashes_with(&self, other: &PathTemplate) -> bool {
        if self.axum == other.axum {
            return false;
        }
        for (mine, theirs) in self.axum.split('/').zip(other.axum.split('/')) {
            match (dynamic_segment(mine), dynamic_segment(theirs)) {
                (None, None) if mine == theirs => continue,
                (Some(_), Some(_)) if mine == theirs => continue,
                (Some(_), Some(_)) => return true,
                _ => return false,
            }
        }
        false
    }

    /// Substitute `values` into the template.
    ///
    /// Returns `None` unless `values` names exactly the template's
    /// parameters. Values are inserted whole, never re-scanned.
    pub fn render(&self, values: &BTreeMap<String, String>) -> Option<String> {
        if values.len() != self.params.len() {
            return None;
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in self.axum.split('/') {
            match dynamic_segment(segment) {
                Some((name, catch_all)) => {
                    let value = values.get(name)?;
                    if !catch_all && value.contains('/') {
                        return None;
                    }
                    segments.push(value.as_str());
                }
                None => segments.push(segment),
            }
        }
        Some(segments.join("/"))
    }
}

/// Parameter name of an axum path segment, and whether it is a catch-all.
fn dynamic_segment(segment: &str) -> Option<(&str, bool)> {
    if let Some(name) = segment.strip_prefix(':') {
        Some((name, false))
    } else {
        segment.strip_prefix('*').map(|name| (name, true))
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn check_literal<'a>(path: &str, literal: &'a str) -> RouterResult<&'a str> {
    if literal.contains('{') || literal.contains('}') {
        return Err(RouterError::invalid_path(path, "unbalanced braces"));
    }
    if literal
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(RouterError::invalid_path(
            path,
            "segments may not start with ':' or '*'",
        ));
    }
    Ok(literal)
}
