//! Error types for the SONiC reconciler.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration loading, schema validation, device I/O and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the SONiC reconciler.
#[derive(Debug, Error)]
pub enum SonicError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schema validation errors.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Device (REST) errors.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation of a configuration file failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Duplicate resource definition in the registry.
    #[error("Duplicate resource name: {name}")]
    DuplicateResource {
        /// The duplicated name.
        name: String,
    },

    /// The requested resource is not in the registry.
    #[error("Unknown resource: {name}")]
    UnknownResource {
        /// The requested name.
        name: String,
    },

    /// A key specification names a field that no element carries.
    #[error("Key field(s) [{keys}] missing from every element of list '{path}'")]
    MalformedKeySpec {
        /// Schema path of the list.
        path: String,
        /// Declared key fields.
        keys: String,
    },
}

/// Schema validation errors raised before diffing.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A value has the wrong shape for its schema node.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Tree path of the offending value.
        path: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        found: String,
    },

    /// A field is not declared in the schema.
    #[error("{path}: unknown field '{field}'")]
    UnknownField {
        /// Tree path of the containing mapping.
        path: String,
        /// The undeclared field.
        field: String,
    },

    /// A scalar is not one of the declared choices.
    #[error("{path}: value {value} is not one of [{choices}]")]
    InvalidChoice {
        /// Tree path of the value.
        path: String,
        /// The rejected value.
        value: String,
        /// Allowed values.
        choices: String,
    },
}

/// Errors talking to the device REST interface.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Authentication failed.
    #[error("Device authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// Request returned a non-success status.
    #[error("Device request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Rate limited by the device.
    #[error("Device rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with device: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response body.
    #[error("Invalid response from device: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The resource has no REST binding in its descriptor.
    #[error("Resource '{resource}' has no REST binding")]
    Unbound {
        /// Resource name.
        resource: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The device configuration changed between planning and applying.
    #[error("Facts for '{resource}' changed since planning (expected {expected}, found {found})")]
    StaleSnapshot {
        /// Resource name.
        resource: String,
        /// Fingerprint the plan was computed against.
        expected: String,
        /// Fingerprint read just before applying.
        found: String,
    },

    /// A device request failed while applying operations.
    #[error("Applying '{resource}' failed at request {index}: {reason}")]
    ApplyFailed {
        /// Resource name.
        resource: String,
        /// Index of the failed request.
        index: usize,
        /// Reason for failure.
        reason: String,
    },

    /// An operation path could not be resolved inside a tree.
    #[error("Cannot resolve path {path}: {reason}")]
    UnresolvedPath {
        /// Rendered path.
        path: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, SonicError>;

impl SonicError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Device(DeviceError::RateLimited { .. } | DeviceError::NetworkError { .. })
        ) || matches!(self, Self::Device(DeviceError::RequestFailed { status, .. }) if *status >= 500)
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Device(DeviceError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Device(DeviceError::NetworkError { .. }) => Some(2),
            Self::Device(DeviceError::RequestFailed { status, .. }) if *status >= 500 => Some(1),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl DeviceError {
    /// Creates a request error.
    #[must_use]
    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}
