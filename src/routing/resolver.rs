//! The dispatch engine.
//!
//! # Responsibilities
//! - Exact path lookup over the compiled route table
//! - Method / CORS / auth / JSON policy, short-circuiting at the first
//!   decisive step
//! - Produce exactly one `Resolution` per request
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, no shared-state mutation; all I/O
//!   happened earlier, at config compile time
//! - Holds the auth provider *atom*, not a pinned auth snapshot: route
//!   table and auth set update independently and may be one config
//!   generation apart
//! - OPTIONS on a route without CORS is an ordinary request, not a
//!   preflight; the two CORS rejections stay distinct (`CorsNotAllowed`
//!   for an actual request, `Forbidden` for a failed preflight)

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::atom::Atom;
use crate::auth::{AuthProvider, AuthResult, ComposedAuthProvider};
use crate::config::{ConfigError, Route, RouteSpec, SchemaPolicy};
use crate::routing::envelope::encode_payload;
use crate::routing::resolution::{ErrorMatch, LogAppend, Receipt, Resolution, SinkDescription};
use crate::routing::IncomingRequest;

/// Immutable dispatch snapshot: path → route, plus the auth provider
/// reference. Replaced whole on config change, never mutated.
pub struct RouteResolver {
    routes: HashMap<String, Route>,
    auth: Arc<Atom<ComposedAuthProvider>>,
}

impl RouteResolver {
    /// Empty resolver; every request is `NoMatch` until config arrives.
    pub fn empty(auth: Arc<Atom<ComposedAuthProvider>>) -> Self {
        Self {
            routes: HashMap::new(),
            auth,
        }
    }

    /// Compile a spec list into a dispatch snapshot. Later specs win on
    /// a duplicate path, matching source merge order.
    pub fn compile(
        auth: Arc<Atom<ComposedAuthProvider>>,
        specs: Vec<RouteSpec>,
    ) -> Result<Self, ConfigError> {
        let mut routes = HashMap::with_capacity(specs.len());
        for spec in specs {
            let route = Route::compile(spec)?;
            routes.insert(route.path.clone(), route);
        }
        Ok(Self { routes, auth })
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Decide what happens to one request.
    pub fn resolve(&self, req: &IncomingRequest) -> Resolution {
        let Some(route) = self.routes.get(req.path()) else {
            return Resolution::NoMatch;
        };

        let preflight = req.method() == Method::OPTIONS && route.cors.enabled();

        if !preflight && !route.allowed_methods.contains(req.method()) {
            return Resolution::Error(ErrorMatch::MethodNotAllowed);
        }

        if preflight {
            return match req.origin() {
                Some(origin) if route.cors.allows(origin) => {
                    Resolution::Error(ErrorMatch::CorsPreflightAllowed)
                }
                _ => Resolution::Error(ErrorMatch::Forbidden),
            };
        }

        if route.cors.enabled() {
            if let Some(origin) = req.origin() {
                if !route.cors.allows(origin) {
                    return Resolution::Error(ErrorMatch::CorsNotAllowed);
                }
            }
        }

        if !route.authenticate_using.is_empty() {
            let verdict = self.auth.load().verify(&route.authenticate_using, req);
            if let AuthResult::Failure { tried } = verdict {
                return Resolution::Error(ErrorMatch::NotAuthorized { tried });
            }
        }

        if route.validate_json {
            let body: serde_json::Value = match serde_json::from_slice(req.body()) {
                Ok(value) => value,
                Err(_) => return Resolution::Error(ErrorMatch::JsonValidationFailed),
            };
            match &route.schema {
                SchemaPolicy::None => {}
                SchemaPolicy::Invalid => {
                    return Resolution::Error(ErrorMatch::JsonSchemaInvalid)
                }
                SchemaPolicy::Compiled(validator) => {
                    if !validator.is_valid(&body) {
                        return Resolution::Error(ErrorMatch::JsonValidationFailed);
                    }
                }
            }
        }

        Resolution::LogAppend(LogAppend {
            sink: SinkDescription {
                name: route.sink.clone(),
                topic: route.topic.clone(),
            },
            payload: encode_payload(route, req),
            receipt: Receipt {
                status: route.response,
                body: String::new(),
            },
        })
    }
}
