//! Bearer-token authentication against a JWK set (`type = "jwk"`).
//!
//! The key set is fetched once when the provider is compiled; a fetch
//! failure fails the compile and the previous auth snapshot stays live.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};

use crate::auth::{AuthProvider, AuthResult};
use crate::config::{AuthProviderSpec, ConfigError};
use crate::routing::IncomingRequest;

/// Validates `Authorization: Bearer` JWTs: signature against the fetched
/// key set, issuer pinned to the configured value.
pub struct JwkAuth {
    issuer: String,
    keys: JwkSet,
}

impl JwkAuth {
    pub fn new(issuer: impl Into<String>, keys: JwkSet) -> Self {
        Self {
            issuer: issuer.into(),
            keys,
        }
    }

    pub fn from_spec(spec: &AuthProviderSpec) -> Result<Self, ConfigError> {
        let url = spec
            .options
            .get("jwk_url")
            .and_then(|v| v.as_str())
            .ok_or(ConfigError::MissingOption("jwk_url"))?;
        let issuer = spec
            .options
            .get("issuer")
            .and_then(|v| v.as_str())
            .ok_or(ConfigError::MissingOption("issuer"))?;
        Self::fetch(url, issuer)
    }

    /// Fetch the key set. Blocking; only called from config compilation.
    pub fn fetch(url: &str, issuer: &str) -> Result<Self, ConfigError> {
        let keys = reqwest::blocking::get(url)
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(|response| response.json::<JwkSet>())
            .map_err(|e| ConfigError::InvalidOption {
                name: "jwk_url",
                reason: e.to_string(),
            })?;
        Ok(Self::new(issuer, keys))
    }

    fn validate(&self, req: &IncomingRequest) -> Option<()> {
        let header = req.headers().get("authorization")?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?;
        let jwt_header = decode_header(token).ok()?;
        let jwk = self.keys.find(jwt_header.kid.as_deref()?)?;
        let key = DecodingKey::from_jwk(jwk).ok()?;
        let mut validation = Validation::new(jwt_header.alg);
        validation.set_issuer(&[&self.issuer]);
        decode::<serde_json::Value>(token, &key, &validation).ok()?;
        Some(())
    }
}

impl AuthProvider for JwkAuth {
    fn verify(&self, _matching: &[String], req: &IncomingRequest) -> AuthResult {
        match self.validate(req) {
            Some(()) => AuthResult::Success,
            None => AuthResult::Failure { tried: vec![] },
        }
    }
}
