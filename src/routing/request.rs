//! The immutable per-request value consumed by the resolver.

use axum::http::{HeaderMap, Method};
use bytes::Bytes;

/// One inbound HTTP request, detached from the transport.
///
/// The transport reads the body at most once before dispatch (an empty
/// buffer when `Content-Length` is 0); everything here is read-only.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    method: Method,
    origin: Option<String>,
    path: String,
    headers: HeaderMap,
    query: String,
    host: String,
    body: Bytes,
}

impl IncomingRequest {
    pub fn new(
        method: Method,
        origin: Option<String>,
        path: impl Into<String>,
        headers: HeaderMap,
        query: impl Into<String>,
        host: impl Into<String>,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            origin,
            path: path.into(),
            headers,
            query: query.into(),
            host: host.into(),
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Bare request for resolver tests.
    pub fn request(method: Method, path: &str) -> IncomingRequest {
        IncomingRequest::new(
            method,
            None,
            path,
            HeaderMap::new(),
            "",
            "localhost",
            Bytes::new(),
        )
    }

    pub fn with_origin(method: Method, path: &str, origin: &str) -> IncomingRequest {
        let mut req = request(method, path);
        req.origin = Some(origin.to_string());
        req
    }

    pub fn with_body(method: Method, path: &str, body: &str) -> IncomingRequest {
        let mut req = request(method, path);
        req.body = Bytes::copy_from_slice(body.as_bytes());
        req
    }

    pub fn with_header(mut req: IncomingRequest, name: &'static str, value: &str) -> IncomingRequest {
        req.headers
            .insert(name, value.parse().expect("header value"));
        req
    }
}
