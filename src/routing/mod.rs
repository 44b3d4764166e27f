//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! IncomingRequest (built by the http front-end)
//!     → resolver.rs (path → route, method/CORS/auth/JSON policy)
//!     → Resolution: LogAppend | Error(ErrorMatch) | NoMatch
//!
//! Route compilation happens in the registry combiners, never here:
//! resolve() is a pure function over the current snapshot.
//! ```
//!
//! # Design Decisions
//! - Exact-match path table; first decisive policy step wins
//! - Decision errors are Resolution variants, not Err values
//! - Resolver snapshots are immutable and replaced whole via an Atom

pub mod envelope;
pub mod request;
pub mod resolution;
pub mod resolver;

pub use request::IncomingRequest;
pub use resolution::{ErrorMatch, LogAppend, Receipt, Resolution, SinkDescription};
pub use resolver::RouteResolver;
