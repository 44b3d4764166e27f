//! webhook-relay: HTTP-to-message-queue ingestion gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!  config directory ──┐                         ┌──────────────┐
//!  (notify events)    ├─▶ registry ─▶ combiners ├─▶ Atom<RouteResolver>
//!  cluster API ───────┘   (merge +   (compile)  ├─▶ Atom<ComposedAuthProvider>
//!  (60s poll)             notify)               └─▶ Atom<SpecSinkProvider>
//!
//!  HTTP request ─▶ http front-end ─▶ resolve() ─▶ sink write ─▶ response
//!                       (loads the current atom snapshots, lock-free)
//! ```
//!
//! The registry merges declarative specs from every source and drives
//! recompiles on change; request handling only ever reads atomically
//! published snapshots, so config updates never stall traffic.

// Request path
pub mod http;
pub mod routing;
pub mod sink;

// Configuration plane
pub mod atom;
pub mod config;
pub mod registry;

// Cross-cutting
pub mod auth;
pub mod bootstrap;

pub use atom::Atom;
pub use bootstrap::bootstrap;
pub use config::{AuthProviderSpec, Route, RouteSpec, SinkProviderSpec};
pub use http::{app, AppState};
pub use registry::{Registry, Table};
pub use routing::{IncomingRequest, Resolution, RouteResolver};
