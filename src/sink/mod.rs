//! Sinks: where accepted requests go.
//!
//! # Data Flow
//! ```text
//! SinkProviderSpec[] (from the registry)
//!     → CachedSinkFactory (memoized by spec equality)
//!     → SpecSinkProvider (name → sink, plus the default sink)
//!     → handle(SinkDescription, payload) per accepted request
//! ```
//!
//! # Design Decisions
//! - The queue client proper is behind the `Sink` trait; this crate only
//!   defines the write contract and maps failures to `WritingFailed`
//! - Sink construction may open connections, so recompiling an unchanged
//!   spec must return the same instance (the caching factory's job)
//! - A route naming an unknown sink is a per-request write failure, not
//!   a config error: route and sink tables change independently

pub mod cache;
pub mod providers;

pub use cache::CachedSinkFactory;
pub use providers::DefaultSinkFactory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::{ConfigError, SinkProviderSpec};
use crate::routing::SinkDescription;

/// Why a sink write failed.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no sink named {0:?}")]
    UnknownSink(String),

    #[error("no default sink configured")]
    NoDefaultSink,

    #[error("sink transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sink rejected write: {0}")]
    Rejected(String),
}

/// Outcome of one sink write.
#[derive(Debug)]
pub enum SinkResult {
    SuccessfullyWritten,
    WritingFailed(SinkError),
}

impl SinkResult {
    pub fn is_written(&self) -> bool {
        matches!(self, SinkResult::SuccessfullyWritten)
    }
}

/// A live destination for accepted payloads.
///
/// Writes may block or time out internally; the outcome always comes
/// back as a `SinkResult`, never a panic or error across the boundary.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, topic: &str, payload: Bytes) -> SinkResult;
}

/// Builds a sink from its spec.
pub trait SinkFactory: Send + Sync {
    fn create(&self, spec: &SinkProviderSpec) -> Result<Arc<dyn Sink>, ConfigError>;
}

/// Compiled sink set for one config generation.
pub struct SpecSinkProvider {
    sinks: HashMap<String, Arc<dyn Sink>>,
    default: Option<Arc<dyn Sink>>,
}

impl SpecSinkProvider {
    /// Provider with no sinks; every write fails until config arrives.
    pub fn empty() -> Self {
        Self {
            sinks: HashMap::new(),
            default: None,
        }
    }

    /// Compile the spec list. The default sink is the spec flagged
    /// `default = true`, else the spec literally named `default`.
    pub fn from_specs(
        factory: &dyn SinkFactory,
        specs: &[SinkProviderSpec],
    ) -> Result<Self, ConfigError> {
        let mut sinks = HashMap::with_capacity(specs.len());
        let mut default = None;
        for spec in specs {
            let sink = factory.create(spec)?;
            if spec.default {
                default = Some(sink.clone());
            }
            sinks.insert(spec.name.clone(), sink);
        }
        let default = default.or_else(|| sinks.get("default").cloned());
        Ok(Self { sinks, default })
    }

    /// Resolve the sink for `desc` and delegate the write.
    pub async fn handle(&self, desc: &SinkDescription, payload: Bytes) -> SinkResult {
        let sink = match &desc.name {
            Some(name) => match self.sinks.get(name) {
                Some(sink) => sink,
                None => {
                    return SinkResult::WritingFailed(SinkError::UnknownSink(name.clone()))
                }
            },
            None => match &self.default {
                Some(sink) => sink,
                None => return SinkResult::WritingFailed(SinkError::NoDefaultSink),
            },
        };
        sink.write(&desc.topic, payload).await
    }
}
