//! Protobuf envelope for routes with `format = "protobuf"`.
//!
//! The envelope carries the full request so queue consumers can replay
//! it without the gateway in the loop. Wire layout is hand-declared with
//! prost field tags; there is no .proto build step.

use std::collections::HashMap;

use bytes::Bytes;
use prost::Message;

use crate::config::{Format, Route};
use crate::routing::IncomingRequest;

/// Serialized request as written to a sink.
#[derive(Clone, PartialEq, Message)]
pub struct RequestEnvelope {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(string, tag = "2")]
    pub path: String,
    #[prost(string, tag = "3")]
    pub query: String,
    #[prost(string, tag = "4")]
    pub host: String,
    #[prost(map = "string, string", tag = "5")]
    pub headers: HashMap<String, String>,
    #[prost(bytes = "vec", tag = "6")]
    pub body: Vec<u8>,
    /// The route's `verify` flag, for downstream consumers.
    #[prost(bool, tag = "7")]
    pub verified: bool,
}

/// Build the sink payload for an accepted request per the route's format.
pub fn encode_payload(route: &Route, req: &IncomingRequest) -> Bytes {
    match route.format {
        Format::RawBody => req.body().clone(),
        Format::Protobuf => {
            let headers = req
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let envelope = RequestEnvelope {
                method: req.method().to_string(),
                path: req.path().to_string(),
                query: req.query().to_string(),
                host: req.host().to_string(),
                headers,
                body: req.body().to_vec(),
                verified: route.verify,
            };
            Bytes::from(envelope.encode_to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteSpec;
    use crate::routing::request::fixtures;
    use axum::http::Method;

    fn compiled(format: &str) -> Route {
        Route::compile(RouteSpec {
            format: match format {
                "raw_body" => Format::RawBody,
                _ => Format::Protobuf,
            },
            ..toml::from_str("path = '/t'\ntopic = 't'").unwrap()
        })
        .unwrap()
    }

    #[test]
    fn raw_body_passes_bytes_through() {
        let req = fixtures::with_body(Method::POST, "/t", "hello");
        let payload = encode_payload(&compiled("raw_body"), &req);
        assert_eq!(&payload[..], b"hello");
    }

    #[test]
    fn protobuf_roundtrips_request() {
        let req = fixtures::with_body(Method::POST, "/t", "hello");
        let payload = encode_payload(&compiled("protobuf"), &req);
        let decoded = RequestEnvelope::decode(&payload[..]).unwrap();
        assert_eq!(decoded.method, "POST");
        assert_eq!(decoded.path, "/t");
        assert_eq!(decoded.body, b"hello");
        assert!(!decoded.verified);
    }
}
