//! Error types for the bondkit core.
//!
//! Only [`RegistryError`] and [`RouteConfigurationError`] are allowed to escape
//! a handler or the bootstrap phase. Everything else is request-time and is
//! converted into a structured response at the handler boundary.

use http::Method;
use serde::Serialize;
use thiserror::Error;

use crate::bond::BondType;

/// Root error type for bondkit operations.
#[derive(Error, Debug)]
pub enum KitError {
    /// Registry-related errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Route table could not be assembled
    #[error("Route configuration error: {0}")]
    Route(#[from] RouteConfigurationError),

    /// Provider-related errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration rejected by `Config::validate`
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the bond registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Nothing is bonded under the requested type
    #[error("No provider bonded for `{bond_type}`")]
    NotBonded { bond_type: BondType },

    /// The multi entry exists but has no provider under the requested name
    #[error("No `{provider}` provider bonded for `{bond_type}`")]
    ProviderNotBonded { bond_type: BondType, provider: String },

    /// A value is bonded but it is not of the type the accessor expects
    #[error("Value bonded for `{bond_type}` is not a `{expected}`")]
    TypeMismatch {
        bond_type: BondType,
        expected: &'static str,
    },
}

/// Errors that can occur in provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Provider does not support the given input
    #[error("Provider does not support: {0}")]
    NotSupported(String),

    /// Input was rejected by the provider (constraint, malformed value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write conflicts with existing data
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Provider execution failed
    #[error("Provider execution failed: {0}")]
    ExecutionFailed(String),

    /// Provider configuration error
    #[error("Provider configuration error: {0}")]
    ConfigurationError(String),

    /// IO error during provider operation
    #[error("IO error: {0}")]
    IoError(String),

    /// Timeout during provider operation
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Provider was cancelled
    #[error("Operation was cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether the failure was caused by the caller's input rather than the provider.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Conflict(_))
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidInput(err.to_string())
    }
}

impl From<String> for ProviderError {
    fn from(msg: String) -> Self {
        ProviderError::ExecutionFailed(msg)
    }
}

impl From<&str> for ProviderError {
    fn from(msg: &str) -> Self {
        ProviderError::ExecutionFailed(msg.to_string())
    }
}

/// A single violated field reported by a validation schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Input rejected by a resource's schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{resource}: {}", summarize(.fields))]
pub struct ValidationError {
    pub resource: String,
    pub fields: Vec<FieldError>,
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Request-time failures of a resource operation.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{resource} `{id}` not found")]
    NotFound { resource: String, id: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Route table assembly failures. Always fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteConfigurationError {
    #[error("{method} {path}: unknown handler `{name}`")]
    UnknownHandler {
        method: Method,
        path: String,
        name: String,
    },

    #[error("{method} {path}: unknown middleware `{name}`")]
    UnknownMiddleware {
        method: Method,
        path: String,
        name: String,
    },
}

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for general bondkit operations.
pub type KitResult<T> = Result<T, KitError>;
