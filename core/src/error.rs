//! Error types for the Habitica adapter.
//!
//! # Design
//! Three layers, matching where a failure is detected:
//! - `ConfigError` is raised once, at construction, and is fatal.
//! - `ValidationError` is detected before any I/O.
//! - `ApiError` covers everything a call can produce. Its `Display` output is
//!   exactly the `error` string placed in the envelope, so the generic
//!   "Request failed: " prefix lives here and nowhere else.
//!
//! `NotFound` gets a dedicated variant because callers distinguish "does not
//! exist" from "request malformed".

use thiserror::Error;

/// Fatal configuration problems found while building `HabiticaConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required credential: {0} must be set and non-empty")]
    MissingCredential(&'static str),

    #[error("Invalid timeout: {0}s. Must be at least 1 second")]
    InvalidTimeout(u64),

    #[error("Invalid base URL '{0}'. Must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
}

/// Caller-supplied arguments that violate an operation's declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Arguments must be a JSON object.")]
    NotAnObject,

    #[error("Missing required field '{field}'.")]
    Missing { field: String },

    #[error("Field '{field}' must not be empty.")]
    Empty { field: String },

    #[error("Field '{field}' must be {expected}.")]
    WrongType { field: String, expected: &'static str },

    #[error("Invalid value '{value}' for '{field}'. Allowed values: {}.", .allowed.join(", "))]
    NotAllowed {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("{0}")]
    Constraint(String),

    #[error("Unknown operation '{0}'.")]
    UnknownOperation(String),
}

impl ValidationError {
    pub(crate) fn missing(field: &str) -> Self {
        ValidationError::Missing { field: field.to_string() }
    }

    pub(crate) fn empty(field: &str) -> Self {
        ValidationError::Empty { field: field.to_string() }
    }

    pub(crate) fn wrong_type(field: &str, expected: &'static str) -> Self {
        ValidationError::WrongType {
            field: field.to_string(),
            expected,
        }
    }

    pub(crate) fn not_allowed(field: &str, value: &str, allowed: &'static [&'static str]) -> Self {
        ValidationError::NotAllowed {
            field: field.to_string(),
            value: value.to_string(),
            allowed,
        }
    }
}

/// Every failure a tool call can report.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Upstream answered 404 for a call site that declares a not-found message.
    #[error("{0}")]
    NotFound(String),

    /// Any other non-2xx status.
    #[error("Request failed: HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No response was obtained.
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request failed: could not encode request body: {0}")]
    Serialization(String),

    #[error("Request failed: invalid JSON in response: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Log level classification: validation problems are the caller's fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }
}
