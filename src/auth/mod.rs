//! Authentication providers.
//!
//! # Data Flow
//! ```text
//! AuthProviderSpec[] (from the registry)
//!     → factory.rs (closed type tag → provider; unknown tag = error)
//!     → ComposedAuthProvider (named set, compiled snapshot)
//!     → verify(matching_names, request) per accepted route
//! ```
//!
//! # Design Decisions
//! - A route names the auth methods that may authorize it; the composed
//!   set evaluates only those, short-circuiting on the first success
//! - Failure reports every method actually attempted (the front-end uses
//!   this to pick response headers)
//! - The boot-time JWK overlay is just one more named provider, appended
//!   under a reserved name on every recompile

pub mod basic;
pub mod factory;
pub mod jwk;

pub use basic::BasicAuth;
pub use factory::create_provider;
pub use jwk::JwkAuth;

use std::sync::Arc;

use crate::config::{AuthProviderSpec, ConfigError};
use crate::routing::IncomingRequest;

/// Reserved name for the provider injected from `JWK_URL` / `JWK_ISSUER`.
pub const DEFAULT_JWK_PROVIDER: &str = "$default_jwk_provider";

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Success,
    /// Denied; `tried` names every method that was attempted.
    Failure { tried: Vec<String> },
}

impl AuthResult {
    /// OR-compose two results: success wins, double failure unions the
    /// attempted methods.
    pub fn combine(self, other: AuthResult) -> AuthResult {
        match (self, other) {
            (AuthResult::Success, _) | (_, AuthResult::Success) => AuthResult::Success,
            (AuthResult::Failure { mut tried }, AuthResult::Failure { tried: more }) => {
                for name in more {
                    if !tried.contains(&name) {
                        tried.push(name);
                    }
                }
                AuthResult::Failure { tried }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success)
    }
}

/// Decides whether a request satisfies an auth method.
pub trait AuthProvider: Send + Sync {
    /// `matching` is the route's declared method-name list; composite
    /// providers filter on it, leaf providers ignore it.
    fn verify(&self, matching: &[String], req: &IncomingRequest) -> AuthResult;
}

/// Provider that accepts every request (`type = "no_auth"`).
pub struct NoCheck;

impl AuthProvider for NoCheck {
    fn verify(&self, _matching: &[String], _req: &IncomingRequest) -> AuthResult {
        AuthResult::Success
    }
}

/// Compiled set of named providers; one snapshot per config generation.
pub struct ComposedAuthProvider {
    providers: Vec<(String, Arc<dyn AuthProvider>)>,
}

impl ComposedAuthProvider {
    pub fn new(providers: Vec<(String, Arc<dyn AuthProvider>)>) -> Self {
        Self { providers }
    }

    /// Set with no providers: every route that requires auth denies.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Build the set from specs, appending `overlay` (the env-injected
    /// JWK provider) when present. Unknown provider types are hard errors.
    pub fn from_specs(
        specs: Vec<AuthProviderSpec>,
        overlay: Option<(String, Arc<dyn AuthProvider>)>,
    ) -> Result<Self, ConfigError> {
        let mut providers = Vec::with_capacity(specs.len() + 1);
        for spec in &specs {
            providers.push((spec.name.clone(), create_provider(spec)?));
        }
        providers.extend(overlay);
        Ok(Self::new(providers))
    }
}

impl AuthProvider for ComposedAuthProvider {
    fn verify(&self, matching: &[String], req: &IncomingRequest) -> AuthResult {
        let mut tried = Vec::new();
        for (name, provider) in &self.providers {
            if !matching.contains(name) {
                continue;
            }
            tried.push(name.clone());
            if provider.verify(matching, req).is_success() {
                return AuthResult::Success;
            }
        }
        AuthResult::Failure { tried }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::request::fixtures::request;
    use axum::http::Method;

    struct Deny;
    impl AuthProvider for Deny {
        fn verify(&self, _: &[String], _: &IncomingRequest) -> AuthResult {
            AuthResult::Failure { tried: vec![] }
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn combine_prefers_success() {
        let failure = AuthResult::Failure { tried: names(&["a"]) };
        assert!(failure.clone().combine(AuthResult::Success).is_success());
        assert!(AuthResult::Success.combine(failure).is_success());
    }

    #[test]
    fn combine_unions_tried_methods() {
        let a = AuthResult::Failure { tried: names(&["a", "b"]) };
        let b = AuthResult::Failure { tried: names(&["b", "c"]) };
        assert_eq!(a.combine(b), AuthResult::Failure { tried: names(&["a", "b", "c"]) });
    }

    #[test]
    fn composed_succeeds_when_any_matching_provider_does() {
        let set = ComposedAuthProvider::new(vec![
            ("a".to_string(), Arc::new(Deny) as Arc<dyn AuthProvider>),
            ("b".to_string(), Arc::new(NoCheck) as Arc<dyn AuthProvider>),
        ]);
        let req = request(Method::GET, "/");
        assert!(set.verify(&names(&["a", "b"]), &req).is_success());
        assert!(set.verify(&names(&["b"]), &req).is_success());
    }

    #[test]
    fn composed_failure_lists_exactly_the_attempted_providers() {
        let set = ComposedAuthProvider::new(vec![
            ("a".to_string(), Arc::new(Deny) as Arc<dyn AuthProvider>),
            ("b".to_string(), Arc::new(Deny) as Arc<dyn AuthProvider>),
            ("c".to_string(), Arc::new(NoCheck) as Arc<dyn AuthProvider>),
        ]);
        let req = request(Method::GET, "/");
        assert_eq!(
            set.verify(&names(&["a", "b"]), &req),
            AuthResult::Failure { tried: names(&["a", "b"]) }
        );
    }

    #[test]
    fn composed_skips_non_matching_providers() {
        let set = ComposedAuthProvider::new(vec![(
            "a".to_string(),
            Arc::new(NoCheck) as Arc<dyn AuthProvider>,
        )]);
        let req = request(Method::GET, "/");
        assert_eq!(
            set.verify(&names(&["other"]), &req),
            AuthResult::Failure { tried: vec![] }
        );
    }

    #[test]
    fn overlay_is_appended_under_its_reserved_name() {
        let set = ComposedAuthProvider::from_specs(
            vec![],
            Some((
                DEFAULT_JWK_PROVIDER.to_string(),
                Arc::new(NoCheck) as Arc<dyn AuthProvider>,
            )),
        )
        .unwrap();
        let req = request(Method::GET, "/");
        assert!(set
            .verify(&names(&[DEFAULT_JWK_PROVIDER]), &req)
            .is_success());
        assert!(!set.verify(&names(&["basic"]), &req).is_success());
    }
}
