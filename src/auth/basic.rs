//! HTTP Basic authentication (`type = "basic_auth"`).

use std::collections::BTreeMap;

use base64::prelude::{Engine, BASE64_STANDARD};

use crate::auth::{AuthProvider, AuthResult};
use crate::config::{AuthProviderSpec, ConfigError};
use crate::routing::IncomingRequest;

/// Checks `Authorization: Basic` credentials against a configured user
/// table (options key `users`: name → password).
pub struct BasicAuth {
    users: BTreeMap<String, String>,
}

impl BasicAuth {
    pub fn from_spec(spec: &AuthProviderSpec) -> Result<Self, ConfigError> {
        let users = spec
            .options
            .get("users")
            .ok_or(ConfigError::MissingOption("users"))?;
        let users: BTreeMap<String, String> =
            serde_json::from_value(users.clone()).map_err(|e| ConfigError::InvalidOption {
                name: "users",
                reason: e.to_string(),
            })?;
        Ok(Self { users })
    }

    fn credentials(req: &IncomingRequest) -> Option<(String, String)> {
        let header = req.headers().get("authorization")?.to_str().ok()?;
        let encoded = header.strip_prefix("Basic ")?;
        let decoded = BASE64_STANDARD.decode(encoded).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }
}

impl AuthProvider for BasicAuth {
    fn verify(&self, _matching: &[String], req: &IncomingRequest) -> AuthResult {
        match Self::credentials(req) {
            Some((user, password)) if self.users.get(&user) == Some(&password) => {
                AuthResult::Success
            }
            _ => AuthResult::Failure { tried: vec![] },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::request::fixtures::{request, with_header};
    use axum::http::Method;

    fn provider() -> BasicAuth {
        let spec: AuthProviderSpec = serde_json::from_value(serde_json::json!({
            "name": "basic",
            "type": "basic_auth",
            "options": {"users": {"admin": "hunter2"}}
        }))
        .unwrap();
        BasicAuth::from_spec(&spec).unwrap()
    }

    fn authorization(user: &str, password: &str) -> String {
        format!(
            "Basic {}",
            BASE64_STANDARD.encode(format!("{user}:{password}"))
        )
    }

    #[test]
    fn accepts_configured_credentials() {
        let req = with_header(
            request(Method::GET, "/"),
            "authorization",
            &authorization("admin", "hunter2"),
        );
        assert!(provider().verify(&[], &req).is_success());
    }

    #[test]
    fn rejects_wrong_password() {
        let req = with_header(
            request(Method::GET, "/"),
            "authorization",
            &authorization("admin", "wrong"),
        );
        assert!(!provider().verify(&[], &req).is_success());
    }

    #[test]
    fn rejects_missing_header() {
        assert!(!provider().verify(&[], &request(Method::GET, "/")).is_success());
    }

    #[test]
    fn missing_users_option_is_config_error() {
        let spec: AuthProviderSpec =
            serde_json::from_value(serde_json::json!({"name": "b", "type": "basic_auth"}))
                .unwrap();
        assert!(matches!(
            BasicAuth::from_spec(&spec),
            Err(ConfigError::MissingOption("users"))
        ));
    }
}
