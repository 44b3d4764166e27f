//! Startup orchestration.
//!
//! # Responsibilities
//! - Read boot-time environment overrides
//! - Assemble the registry from the enabled sources
//! - Register the three table watchers, each feeding its own atom
//! - Prime everything with one synchronous force_update, then serve
//!
//! # Design Decisions
//! - Atoms are created empty and passed to their consumers by reference;
//!   there is no ambient global config
//! - The boot force_update runs under spawn_blocking: it may perform
//!   file and network I/O and must not stall the runtime
//! - A missing or failing optional JWK environment provider disables
//!   that provider only, never the boot

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::atom::Atom;
use crate::auth::{AuthProvider, ComposedAuthProvider, JwkAuth, DEFAULT_JWK_PROVIDER};
use crate::config::{AuthProviderSpec, RouteSpec, SinkProviderSpec};
use crate::http::{app, AppState};
use crate::registry::{ClusterSource, ConfigSource, FileSource, Registry, Table};
use crate::routing::RouteResolver;
use crate::sink::{CachedSinkFactory, DefaultSinkFactory, SpecSinkProvider};

const DEFAULT_CONFIG_DIRECTORY: &str = "/etc/config";

/// Environment lookup with a default; empty values count as unset.
pub fn get_env(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Wire the whole gateway and serve until shutdown.
pub async fn bootstrap() -> Result<(), Box<dyn Error>> {
    let mut sources = Vec::new();
    if get_env("KUBERNETES_ENABLE", "true") == "true" {
        let host = get_env("KUBERNETES_SERVICE_HOST", "localhost");
        let port_value = get_env("KUBERNETES_SERVICE_PORT", "8080");
        let port = port_value.parse().unwrap_or_else(|_| {
            tracing::error!(port = %port_value, "invalid cluster api port, using default 8080");
            8080
        });
        sources.push(ConfigSource::Cluster(ClusterSource::new(&host, port)));
    }
    sources.push(ConfigSource::File(FileSource::new(get_env(
        "CONFIG_DIRECTORY",
        DEFAULT_CONFIG_DIRECTORY,
    ))));
    let registry = Registry::new(sources);

    let jwk_overlay = tokio::task::spawn_blocking(env_jwk_provider).await?;

    let auth = setup_auth_provider(&registry, jwk_overlay);
    let resolver = setup_resolver(&registry, auth);
    let sinks = setup_sink_provider(&registry);

    {
        // Prime every atom before accepting traffic.
        let registry = Arc::clone(&registry);
        tokio::task::spawn_blocking(move || registry.force_update()).await?;
    }
    registry.start()?;
    tracing::info!(
        routes = resolver.load().route_count(),
        "configuration primed"
    );

    let state = AppState { resolver, sinks };
    let address = format!("{}:{}", get_env("HOST", "0.0.0.0"), get_env("PORT", "80"));
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(address = %listener.local_addr()?, "gateway listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Subscribe the auth atom: specs → composed provider set, with the
/// optional env-injected JWK provider appended on every recompile.
pub fn setup_auth_provider(
    registry: &Arc<Registry>,
    overlay: Option<Arc<dyn AuthProvider>>,
) -> Arc<Atom<ComposedAuthProvider>> {
    let atom = Arc::new(Atom::new(ComposedAuthProvider::empty()));
    let overlay = overlay.map(|provider| (DEFAULT_JWK_PROVIDER.to_string(), provider));
    registry.watch(
        Table::AuthProviders,
        |record| Ok(serde_json::from_value::<AuthProviderSpec>(record.clone())?),
        move |specs| ComposedAuthProvider::from_specs(specs, overlay.clone()),
        Arc::clone(&atom),
    );
    atom
}

/// Subscribe the resolver atom: route specs → dispatch snapshot.
pub fn setup_resolver(
    registry: &Arc<Registry>,
    auth: Arc<Atom<ComposedAuthProvider>>,
) -> Arc<Atom<RouteResolver>> {
    let atom = Arc::new(Atom::new(RouteResolver::empty(Arc::clone(&auth))));
    registry.watch(
        Table::Routes,
        |record| Ok(serde_json::from_value::<RouteSpec>(record.clone())?),
        move |specs| RouteResolver::compile(Arc::clone(&auth), specs),
        Arc::clone(&atom),
    );
    atom
}

/// Subscribe the sink atom: specs → provider set via the caching
/// factory, retiring cache entries for dropped specs.
pub fn setup_sink_provider(registry: &Arc<Registry>) -> Arc<Atom<SpecSinkProvider>> {
    let atom = Arc::new(Atom::new(SpecSinkProvider::empty()));
    let factory = Arc::new(CachedSinkFactory::new(DefaultSinkFactory::new()));
    registry.watch(
        Table::SinkProviders,
        |record| Ok(serde_json::from_value::<SinkProviderSpec>(record.clone())?),
        move |specs| {
            let provider = SpecSinkProvider::from_specs(&*factory, &specs)?;
            factory.retain(&specs);
            Ok(provider)
        },
        Arc::clone(&atom),
    );
    atom
}

/// The optional boot-time JWK provider: enabled only when both
/// `JWK_URL` and `JWK_ISSUER` are present.
fn env_jwk_provider() -> Option<Arc<dyn AuthProvider>> {
    let url = std::env::var("JWK_URL").ok().filter(|v| !v.is_empty())?;
    let issuer = std::env::var("JWK_ISSUER").ok().filter(|v| !v.is_empty())?;
    match JwkAuth::fetch(&url, &issuer) {
        Ok(provider) => {
            tracing::info!(issuer, "jwk provider enabled from environment");
            Some(Arc::new(provider))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize jwk provider from environment");
            None
        }
    }
}
