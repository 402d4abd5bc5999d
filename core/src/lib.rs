//! Habitica REST endpoints as validated, envelope-returning tool operations.
//!
//! # Overview
//! A host agent framework calls an operation by name with JSON arguments and
//! always receives `{success, data|error}`. Arguments are checked before any
//! I/O; transport and upstream failures become envelope errors, never panics.
//!
//! # Design
//! - `HabiticaClient` is sans-IO: `build` produces an `HttpRequest`, `parse`
//!   consumes an `HttpResponse`. Hosts that own the network use it directly.
//! - `HabiticaTools` adds a `Transport` (blocking `ureq` by default) and the
//!   envelope/logging policy.
//! - Every operation is one row in the call-site table (`operations`), so
//!   endpoint declarations stay data and validation stays uniform.
//! - Credentials live in an immutable `HabiticaConfig`; construction fails
//!   fast when they are missing.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod logging;
pub mod operations;
pub mod tools;
pub mod validate;

pub use client::HabiticaClient;
pub use config::HabiticaConfig;
pub use envelope::Envelope;
pub use error::{ApiError, ConfigError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use operations::{CallSite, Operation, DEFAULT_TAG_ID};
pub use tools::HabiticaTools;
