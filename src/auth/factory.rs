//! Closed mapping from provider `type` tags to implementations.

use std::sync::Arc;

use crate::auth::{AuthProvider, BasicAuth, JwkAuth, NoCheck};
use crate::config::{AuthProviderSpec, ConfigError};

/// Build a provider from its spec. An unknown `type` is a hard error:
/// silently dropping an auth method would loosen a route's policy.
pub fn create_provider(spec: &AuthProviderSpec) -> Result<Arc<dyn AuthProvider>, ConfigError> {
    match spec.kind.to_lowercase().as_str() {
        "no_auth" => Ok(Arc::new(NoCheck)),
        "basic_auth" => Ok(Arc::new(BasicAuth::from_spec(spec)?)),
        "jwk" => Ok(Arc::new(JwkAuth::from_spec(spec)?)),
        _ => Err(ConfigError::UnknownAuthType(spec.kind.clone())),
    }
}
