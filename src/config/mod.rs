//! Configuration model.
//!
//! # Data Flow
//! ```text
//! raw record (serde_json::Value, from a registry source)
//!     → spec.rs (serde into a typed spec; missing mandatory field = error)
//!     → compile (methods/status/CORS/schema into runtime form)
//!     → consumed by the resolver / auth / sink combiners
//! ```
//!
//! # Design Decisions
//! - Raw maps become exhaustive typed specs at ingestion time, never
//!   carried around as dynamic maps
//! - Unknown provider `type` or an invalid method/status is a hard
//!   compile error; the previous snapshot stays in place
//! - An uncompilable JSON schema is NOT a compile error: it is carried
//!   and reported per request (schema text is route-local data)

pub mod spec;

pub use spec::{
    AuthProviderSpec, CorsPolicy, Format, Route, RouteSpec, SchemaPolicy, SinkProviderSpec,
};

use thiserror::Error;

/// Error raised while reading or compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid record: {0}")]
    Record(#[from] serde_json::Error),

    #[error("invalid http method {0:?}")]
    InvalidMethod(String),

    #[error("invalid response status {0}")]
    InvalidStatus(u16),

    #[error("no auth provider matching type {0:?}")]
    UnknownAuthType(String),

    #[error("no sink matching type {0:?}")]
    UnknownSinkType(String),

    #[error("missing required option {0:?}")]
    MissingOption(&'static str),

    #[error("invalid option {name:?}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}
