//! Error types for provisioning.
//!
//! [`ServiceError`] is what a collaborator call returns; [`ProvisionError`]
//! is what an operation fails with. The orchestrator boundary turns the
//! latter into a `reason` string and an [`ErrorKind`] tag.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Classification of a collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceErrorKind {
    /// Network-class failure; worth retrying.
    Transient,
    /// The service asked us to slow down; worth retrying.
    Throttled,
    /// Retrying will not help (validation, conflict, not found).
    Permanent,
}

/// A failed call to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    /// Failure class.
    pub kind: ServiceErrorKind,
    /// Message reported by the service.
    pub message: String,
}

impl ServiceError {
    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Transient,
            message: message.into(),
        }
    }

    /// Creates a throttling error.
    pub fn throttled(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Throttled,
            message: message.into(),
        }
    }

    /// Creates a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Permanent,
            message: message.into(),
        }
    }

    /// Returns true if the call may succeed when repeated.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ServiceErrorKind::Transient | ServiceErrorKind::Throttled
        )
    }
}

/// Endpoint resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The lookup returned nothing.
    #[error("No Client VPN endpoints found")]
    NoEndpoints,

    /// The first endpoint is not in the available state.
    #[error(
        "Client VPN endpoint is not available. Current status: {}",
        .status.as_deref().unwrap_or("undefined")
    )]
    Unavailable {
        /// Reported status code, if any.
        status: Option<String>,
    },

    /// The first endpoint has no usable DNS name.
    #[error("Client VPN endpoint does not have a DNS name")]
    MissingDns,

    /// The directory call itself failed.
    #[error(transparent)]
    Lookup(ServiceError),
}

/// Tag identifying a [`ProvisionError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Config,
    /// Key generation or signing failed.
    Crypto,
    /// Certificate import failed.
    Import,
    /// Secret write failed.
    SecretWrite,
    /// Secret read failed.
    SecretRead,
    /// Endpoint resolution failed.
    Endpoint,
    /// Anything without further structure.
    Unknown,
}

/// Provisioning failures. `Display` is the message reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// Missing or invalid configuration.
    #[error("{0}")]
    Config(String),

    /// Key generation or certificate signing failed.
    #[error("{0}")]
    Crypto(String),

    /// A certificate import exhausted its retries.
    #[error(transparent)]
    Import(ServiceError),

    /// A secret write exhausted its retries.
    #[error(transparent)]
    SecretWrite(ServiceError),

    /// A secret read exhausted its retries.
    #[error(transparent)]
    SecretRead(ServiceError),

    /// Endpoint resolution failed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A fault with no usable structure, such as a panic.
    #[error("Unknown error")]
    Unknown,
}

impl ProvisionError {
    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Import(_) => ErrorKind::Import,
            Self::SecretWrite(_) => ErrorKind::SecretWrite,
            Self::SecretRead(_) => ErrorKind::SecretRead,
            Self::Endpoint(_) => ErrorKind::Endpoint,
            Self::Unknown => ErrorKind::Unknown,
        }
    }

    /// Builds the error raised when a required properties object is absent.
    pub fn missing_config(object: &str, first_field: &str) -> Self {
        Self::Config(format!(
            "missing {object} in resource properties (cannot read '{first_field}' of undefined)"
        ))
    }
}

impl From<cvpn_pki::Error> for ProvisionError {
    fn from(err: cvpn_pki::Error) -> Self {
        match err {
            cvpn_pki::Error::InvalidConfig(message) => Self::Config(message),
            other => Self::Crypto(other.to_string()),
        }
    }
}
