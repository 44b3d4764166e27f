//! Built-in sink implementations and their factory.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{ConfigError, SinkProviderSpec};
use crate::sink::{Sink, SinkError, SinkFactory, SinkResult};

/// Discards every payload (`type = "null"`). Useful for drain paths and
/// tests.
pub struct NullSink;

#[async_trait]
impl Sink for NullSink {
    async fn write(&self, topic: &str, payload: Bytes) -> SinkResult {
        tracing::debug!(topic, bytes = payload.len(), "null sink discarded payload");
        SinkResult::SuccessfullyWritten
    }
}

/// Fails every write with a configured message (`type = "always_error"`).
pub struct AlwaysErrorSink {
    message: String,
}

#[async_trait]
impl Sink for AlwaysErrorSink {
    async fn write(&self, _topic: &str, _payload: Bytes) -> SinkResult {
        SinkResult::WritingFailed(SinkError::Rejected(self.message.clone()))
    }
}

/// Posts payloads to `{base_url}/{topic}` (`type = "http"`), e.g. a
/// queue REST gateway. The queue protocol itself stays outside this
/// crate; any transport or non-2xx outcome maps to `WritingFailed`.
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
}

#[async_trait]
impl Sink for HttpSink {
    async fn write(&self, topic: &str, payload: Bytes) -> SinkResult {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), topic);
        let outcome = self
            .client
            .post(&url)
            .header("content-type", "application/octet-stream")
            .body(payload)
            .send()
            .await;
        match outcome {
            Ok(response) if response.status().is_success() => SinkResult::SuccessfullyWritten,
            Ok(response) => SinkResult::WritingFailed(SinkError::Rejected(format!(
                "{} returned {}",
                url,
                response.status()
            ))),
            Err(e) => SinkResult::WritingFailed(SinkError::Transport(e)),
        }
    }
}

/// The closed `type` tag → sink mapping.
pub struct DefaultSinkFactory {
    client: reqwest::Client,
}

impl DefaultSinkFactory {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for DefaultSinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkFactory for DefaultSinkFactory {
    fn create(&self, spec: &SinkProviderSpec) -> Result<Arc<dyn Sink>, ConfigError> {
        match spec.kind.to_lowercase().as_str() {
            "null" => Ok(Arc::new(NullSink)),
            "always_error" => {
                let message = spec
                    .options
                    .get("message")
                    .and_then(|v| v.as_str())
                    .ok_or(ConfigError::MissingOption("message"))?;
                Ok(Arc::new(AlwaysErrorSink {
                    message: message.to_string(),
                }))
            }
            "http" => {
                let base_url = spec
                    .options
                    .get("base_url")
                    .and_then(|v| v.as_str())
                    .ok_or(ConfigError::MissingOption("base_url"))?;
                Ok(Arc::new(HttpSink {
                    client: self.client.clone(),
                    base_url: base_url.to_string(),
                }))
            }
            _ => Err(ConfigError::UnknownSinkType(spec.kind.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(doc: serde_json::Value) -> SinkProviderSpec {
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn unknown_type_is_fatal() {
        let result = DefaultSinkFactory::new().create(&spec(serde_json::json!(
            {"name": "x", "type": "carrier_pigeon"}
        )));
        assert!(matches!(result, Err(ConfigError::UnknownSinkType(_))));
    }

    #[test]
    fn always_error_requires_message() {
        let result = DefaultSinkFactory::new()
            .create(&spec(serde_json::json!({"name": "x", "type": "always_error"})));
        assert!(matches!(result, Err(ConfigError::MissingOption("message"))));
    }

    #[tokio::test]
    async fn null_sink_accepts_everything() {
        let sink = DefaultSinkFactory::new()
            .create(&spec(serde_json::json!({"name": "x", "type": "null"})))
            .unwrap();
        assert!(sink.write("topic", Bytes::from_static(b"payload")).await.is_written());
    }
}
