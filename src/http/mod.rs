//! HTTP front-end.
//!
//! # Data Flow
//! ```text
//! axum request
//!     → server.rs (build IncomingRequest; body read at most once)
//!     → resolver snapshot (dispatch decision)
//!     → sink snapshot (write, for accepted requests)
//!     → render Resolution as status/body/headers
//! ```

pub mod server;

pub use server::{app, AppState};
