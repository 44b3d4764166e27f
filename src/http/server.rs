//! axum server front-end.
//!
//! # Responsibilities
//! - Catch-all route: every path and method goes through the resolver
//! - Build the immutable `IncomingRequest` from the transport
//! - Render each `Resolution` exactly as declared by the route table
//! - One structured log line per request
//!
//! # Design Decisions
//! - Handlers only load atoms; nothing on this path takes a lock or
//!   does config I/O
//! - The body is read before dispatch, at most once, and skipped
//!   entirely when `Content-Length` is 0
//! - Sink failures render 500 and never escape the request task

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode, Uri},
    response::Response,
    routing::any,
    Router,
};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::atom::Atom;
use crate::routing::{ErrorMatch, IncomingRequest, Receipt, Resolution, RouteResolver};
use crate::sink::{SinkResult, SpecSinkProvider};

/// Shared handles to the current compiled snapshots.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Atom<RouteResolver>>,
    pub sinks: Arc<Atom<SpecSinkProvider>>,
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", any(dispatch))
        .route("/{*path}", any(dispatch))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let req = match read_request(request).await {
        Ok(req) => req,
        Err(response) => return response,
    };

    let resolution = state.resolver.load().resolve(&req);
    let response = render(&state, &req, &resolution).await;
    log_request(&req, &response, &resolution);
    response
}

/// Detach the request from the transport. The body is read here, at
/// most once; a declared `Content-Length: 0` skips the read entirely.
async fn read_request(request: Request<Body>) -> Result<IncomingRequest, Response> {
    let (parts, body) = request.into_parts();

    let content_length = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body = if content_length == 0 {
        Bytes::new()
    } else {
        axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to read request body");
            text(StatusCode::BAD_REQUEST, "could not read request body")
        })?
    };

    let origin = header_string(&parts.headers, header::ORIGIN);
    let host = header_string(&parts.headers, header::HOST)
        .or_else(|| authority(&parts.uri))
        .unwrap_or_default();

    Ok(IncomingRequest::new(
        parts.method,
        origin,
        parts.uri.path(),
        parts.headers,
        parts.uri.query().unwrap_or(""),
        host,
        body,
    ))
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn authority(uri: &Uri) -> Option<String> {
    uri.authority().map(|a| a.to_string())
}

async fn render(state: &AppState, req: &IncomingRequest, resolution: &Resolution) -> Response {
    match resolution {
        Resolution::NoMatch => text(StatusCode::NOT_FOUND, "404 - Not found!"),
        Resolution::Error(ErrorMatch::CorsPreflightAllowed) => preflight_response(req),
        Resolution::Error(error) => error_response(error),
        Resolution::LogAppend(append) => {
            let result = state
                .sinks
                .load()
                .handle(&append.sink, append.payload.clone())
                .await;
            append_response(req, &result, &append.receipt)
        }
    }
}

fn error_response(error: &ErrorMatch) -> Response {
    match error {
        ErrorMatch::NotAuthorized { tried } => {
            let mut response = text(StatusCode::UNAUTHORIZED, "unauthorized");
            if tried.iter().any(|name| name == "basic_auth") {
                if let Ok(value) = "Basic".parse() {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, value);
                }
            }
            response
        }
        ErrorMatch::Forbidden => text(StatusCode::FORBIDDEN, "forbidden"),
        ErrorMatch::CorsNotAllowed => text(StatusCode::FORBIDDEN, "cors not allowed"),
        ErrorMatch::JsonValidationFailed => {
            text(StatusCode::BAD_REQUEST, "Body is not valid JSON")
        }
        ErrorMatch::JsonSchemaInvalid => text(StatusCode::BAD_REQUEST, "JSON schema is invalid"),
        ErrorMatch::MethodNotAllowed => {
            text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
        ErrorMatch::CorsPreflightAllowed => {
            unreachable!("preflight approval is rendered before generic errors")
        }
    }
}

fn preflight_response(req: &IncomingRequest) -> Response {
    let mut response = text(StatusCode::OK, "Allowed!");
    if let Some(origin) = req.origin() {
        let headers = response.headers_mut();
        if let Ok(value) = origin.parse() {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if let Ok(value) = "Content-Type".parse() {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
    }
    response
}

fn append_response(req: &IncomingRequest, result: &SinkResult, receipt: &Receipt) -> Response {
    let mut response = match result {
        SinkResult::WritingFailed(cause) => {
            tracing::error!(error = %cause, "writing to sink failed");
            text(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
        }
        SinkResult::SuccessfullyWritten => text(receipt.status, receipt.body.clone()),
    };
    // A disallowed origin never reaches this point, so echoing is safe.
    if let Some(origin) = req.origin() {
        if let Ok(value) = origin.parse() {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
    }
    response
}

fn text(status: StatusCode, body: impl Into<String>) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body.into()))
        .unwrap_or_else(|_| {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = status;
            response
        })
}

fn log_request(req: &IncomingRequest, response: &Response, resolution: &Resolution) {
    let sink = match resolution {
        Resolution::LogAppend(append) => append.sink.name.as_deref().unwrap_or("default"),
        _ => "",
    };
    tracing::info!(
        host = req.host(),
        method = %req.method(),
        path = req.path(),
        status = response.status().as_u16(),
        sink,
        "request handled"
    );
}
