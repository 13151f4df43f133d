//! Error types for the parameter store.

use thiserror::Error;

/// Errors that can occur in the parameter store.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameter name format.
    #[error("invalid parameter name: {reason}")]
    InvalidName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// Parameter not found in the store.
    #[error("parameter not found: {name}")]
    NotFound {
        /// The name of the parameter that was not found.
        name: String,
    },

    /// A parameter with this name was already written.
    #[error("parameter already exists: {name}")]
    AlreadyExists {
        /// The name of the existing parameter.
        name: String,
    },

    /// Encryption or decryption failed.
    #[error("encryption error: {reason}")]
    EncryptionError {
        /// The reason encryption failed.
        reason: String,
    },
}

/// Result type alias for parameter store operations.
pub type Result<T> = std::result::Result<T, Error>;
