//! Dispatch outcomes.
//!
//! Every request resolves to exactly one `Resolution`. Policy failures
//! (CORS, method, auth, JSON) are first-class variants rendered by the
//! front-end, never errors thrown across the resolver boundary.

use axum::http::StatusCode;
use bytes::Bytes;

/// Response template declared by the matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub status: StatusCode,
    pub body: String,
}

/// Which sink an accepted request is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkDescription {
    /// Sink name; `None` selects the default sink.
    pub name: Option<String>,
    pub topic: String,
}

/// An accepted request: payload ready for the sink plus the receipt to
/// render once the write succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct LogAppend {
    pub sink: SinkDescription,
    pub payload: Bytes,
    pub receipt: Receipt,
}

/// Why a matched route rejected the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMatch {
    NotAuthorized { tried: Vec<String> },
    Forbidden,
    CorsNotAllowed,
    /// Terminal preflight approval; rendered specially by the front-end.
    CorsPreflightAllowed,
    JsonValidationFailed,
    JsonSchemaInvalid,
    MethodNotAllowed,
}

/// The dispatch decision for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    LogAppend(LogAppend),
    Error(ErrorMatch),
    NoMatch,
}
