//! Typed configuration specs and their compiled runtime forms.
//!
//! Field names follow the TOML convention; aliases accept the cluster
//! API's camelCase spelling so both sources deserialize into the same
//! types.

use std::collections::{BTreeMap, HashSet};

use axum::http::{Method, StatusCode};
use serde::Deserialize;

use crate::config::ConfigError;

/// Payload encoding applied before a request is written to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Request body forwarded verbatim.
    #[serde(alias = "raw")]
    RawBody,
    /// Request wrapped in a protobuf envelope (method, path, headers, body).
    #[default]
    #[serde(alias = "proto")]
    Protobuf,
}

/// The full verb set, used when a route does not restrict methods.
pub fn default_verbs() -> HashSet<Method> {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
    ]
    .into_iter()
    .collect()
}

/// Raw route record as it arrives from a config source.
///
/// `path` and `topic` are mandatory; everything else has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    pub topic: String,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub verify: bool,
    /// Allowed methods; `None` means the full verb set.
    #[serde(default)]
    pub methods: Option<Vec<String>>,
    /// CORS allowed origins; empty disables CORS, `"*"` allows any.
    #[serde(default)]
    pub cors: Vec<String>,
    /// Response status for an accepted request; default 204.
    #[serde(default)]
    pub response: Option<u16>,
    /// Sink name; the default sink when unset.
    #[serde(default)]
    pub sink: Option<String>,
    /// Names of auth methods that may authorize this route.
    #[serde(default, alias = "authenticateUsing")]
    pub authenticate_using: Vec<String>,
    #[serde(default, alias = "validateJson")]
    pub validate_json: bool,
    /// Inline JSON-schema document, applied when `validate_json` is set.
    #[serde(default, alias = "jsonSchema")]
    pub json_schema: Option<String>,
}

/// Compiled CORS policy for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    Disabled,
    Any,
    Origins(HashSet<String>),
}

impl CorsPolicy {
    pub fn enabled(&self) -> bool {
        !matches!(self, CorsPolicy::Disabled)
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            CorsPolicy::Disabled => false,
            CorsPolicy::Any => true,
            CorsPolicy::Origins(set) => set.contains(origin),
        }
    }
}

/// Compiled JSON validation policy for a route.
pub enum SchemaPolicy {
    /// Syntactic JSON check only (or none at all).
    None,
    /// Body must satisfy the compiled schema.
    Compiled(jsonschema::Validator),
    /// The route declared a schema that does not compile; every request
    /// requiring validation reports it.
    Invalid,
}

/// A route compiled into its runtime form.
pub struct Route {
    pub path: String,
    pub topic: String,
    pub format: Format,
    pub verify: bool,
    pub allowed_methods: HashSet<Method>,
    pub cors: CorsPolicy,
    pub response: StatusCode,
    pub sink: Option<String>,
    pub authenticate_using: Vec<String>,
    pub validate_json: bool,
    pub schema: SchemaPolicy,
}

impl Route {
    /// Compile a raw spec. Invalid methods or status codes are hard
    /// errors; an uncompilable schema is carried as `SchemaPolicy::Invalid`.
    pub fn compile(spec: RouteSpec) -> Result<Route, ConfigError> {
        let allowed_methods = match spec.methods {
            None => default_verbs(),
            Some(names) => {
                let verbs = default_verbs();
                let mut set = HashSet::new();
                for name in names {
                    let method = Method::from_bytes(name.to_uppercase().as_bytes())
                        .ok()
                        .filter(|m| verbs.contains(m))
                        .ok_or_else(|| ConfigError::InvalidMethod(name.clone()))?;
                    set.insert(method);
                }
                set
            }
        };

        let response = match spec.response {
            None => StatusCode::NO_CONTENT,
            Some(code) => {
                StatusCode::from_u16(code).map_err(|_| ConfigError::InvalidStatus(code))?
            }
        };

        let cors = if spec.cors.is_empty() {
            CorsPolicy::Disabled
        } else if spec.cors.iter().any(|o| o == "*") {
            CorsPolicy::Any
        } else {
            CorsPolicy::Origins(spec.cors.into_iter().collect())
        };

        let schema = match (&spec.json_schema, spec.validate_json) {
            (Some(text), true) => match serde_json::from_str::<serde_json::Value>(text) {
                Ok(doc) => match jsonschema::validator_for(&doc) {
                    Ok(validator) => SchemaPolicy::Compiled(validator),
                    Err(_) => SchemaPolicy::Invalid,
                },
                Err(_) => SchemaPolicy::Invalid,
            },
            _ => SchemaPolicy::None,
        };

        Ok(Route {
            path: spec.path,
            topic: spec.topic,
            format: spec.format,
            verify: spec.verify,
            allowed_methods,
            cors,
            response,
            sink: spec.sink,
            authenticate_using: spec.authenticate_using,
            validate_json: spec.validate_json,
            schema,
        })
    }
}

/// Named auth provider spec: mandatory `type` plus free-form options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthProviderSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Named sink provider spec: mandatory `type` plus free-form options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SinkProviderSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Marks the sink used by routes that do not name one.
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(toml: &str) -> RouteSpec {
        toml::from_str(toml).expect("route should parse")
    }

    #[test]
    fn mandatory_fields_enforced() {
        assert!(toml::from_str::<RouteSpec>("topic = 'test'").is_err());
        assert!(toml::from_str::<RouteSpec>("path = '/test'").is_err());
    }

    #[test]
    fn defaults_applied() {
        let spec = route("path = '/test'\ntopic = 'test'");
        assert_eq!(spec.format, Format::Protobuf);
        assert!(!spec.verify);
        assert!(spec.methods.is_none());
        assert!(spec.cors.is_empty());
        assert!(!spec.validate_json);

        let compiled = Route::compile(spec).unwrap();
        assert_eq!(compiled.allowed_methods, default_verbs());
        assert_eq!(compiled.response, StatusCode::NO_CONTENT);
        assert_eq!(compiled.cors, CorsPolicy::Disabled);
        assert!(compiled.sink.is_none());
    }

    #[test]
    fn methods_parse_case_insensitively() {
        let spec = route(
            "path = '/status/mail'\ntopic = 'mail-status'\nmethods = ['post', 'PUT', 'head', 'get']",
        );
        let compiled = Route::compile(spec).unwrap();
        let expected: HashSet<Method> =
            [Method::POST, Method::PUT, Method::HEAD, Method::GET].into_iter().collect();
        assert_eq!(compiled.allowed_methods, expected);
    }

    #[test]
    fn unknown_method_is_hard_error() {
        let spec = route("path = '/x'\ntopic = 'x'\nmethods = ['yodel']");
        assert!(matches!(
            Route::compile(spec),
            Err(ConfigError::InvalidMethod(_))
        ));
    }

    #[test]
    fn response_codes() {
        let explicit = route("path = '/a'\ntopic = 'a'\nresponse = 200");
        assert_eq!(Route::compile(explicit).unwrap().response, StatusCode::OK);

        let implicit = route("path = '/b'\ntopic = 'b'");
        assert_eq!(
            Route::compile(implicit).unwrap().response,
            StatusCode::NO_CONTENT
        );

        let bad = route("path = '/c'\ntopic = 'c'\nresponse = 42");
        assert!(matches!(
            Route::compile(bad),
            Err(ConfigError::InvalidStatus(42))
        ));
    }

    #[test]
    fn cors_policies() {
        let wildcard = Route::compile(route("path = '/a'\ntopic = 'a'\ncors = ['*']")).unwrap();
        assert_eq!(wildcard.cors, CorsPolicy::Any);
        assert!(wildcard.cors.allows("http://anything.example"));

        let list = Route::compile(route(
            "path = '/b'\ntopic = 'b'\ncors = ['http://example.com']",
        ))
        .unwrap();
        assert!(list.cors.allows("http://example.com"));
        assert!(!list.cors.allows("http://invalid.example.com"));

        let off = Route::compile(route("path = '/c'\ntopic = 'c'")).unwrap();
        assert!(!off.cors.enabled());
    }

    #[test]
    fn camel_case_aliases_accepted() {
        let value = serde_json::json!({
            "path": "/hook",
            "topic": "hooks",
            "authenticateUsing": ["basic"],
            "validateJson": true,
            "jsonSchema": "{\"type\": \"object\"}"
        });
        let spec: RouteSpec = serde_json::from_value(value).unwrap();
        assert_eq!(spec.authenticate_using, vec!["basic"]);
        assert!(spec.validate_json);
        assert!(spec.json_schema.is_some());
    }

    #[test]
    fn broken_schema_compiles_to_invalid() {
        let spec = route(
            "path = '/j'\ntopic = 'j'\nvalidate_json = true\njson_schema = 'not json at all'",
        );
        let compiled = Route::compile(spec).unwrap();
        assert!(matches!(compiled.schema, SchemaPolicy::Invalid));
    }

    #[test]
    fn schema_ignored_without_validate_flag() {
        let spec = route("path = '/j'\ntopic = 'j'\njson_schema = '{}'");
        let compiled = Route::compile(spec).unwrap();
        assert!(matches!(compiled.schema, SchemaPolicy::None));
    }

    #[test]
    fn provider_specs_require_type() {
        assert!(toml::from_str::<AuthProviderSpec>("name = 'x'").is_err());
        let spec: SinkProviderSpec =
            toml::from_str("name = 'kafka'\ntype = 'http'\ndefault = true").unwrap();
        assert!(spec.default);
        assert_eq!(spec.kind, "http");
    }
}
