//! Core types for the parameter store.
//!
//! - [`ParameterName`]: A validated hierarchical parameter name
//! - [`SecretValue`]: Plaintext bytes that zeroize on drop
//! - [`ParameterMetadata`]: When and how a parameter was written

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// A validated hierarchical parameter name such as `/vpn/<resource>/ca-certificate`.
///
/// Parameter names must:
/// - Start with `/`
/// - Be at most 1011 characters long
/// - Have between 1 and 15 non-empty path segments
/// - Contain only ASCII alphanumerics, hyphens, underscores and periods in each segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParameterName(String);

impl ParameterName {
    /// Maximum length of a parameter name.
    pub const MAX_LENGTH: usize = 1011;

    /// Maximum number of path segments.
    pub const MAX_DEPTH: usize = 15;

    /// Creates a new `ParameterName` after validating the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Builds `<namespace>/<segment>/<segment>...` and validates the result.
    ///
    /// Trailing slashes on the namespace are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined name is invalid.
    pub fn join(namespace: &str, segments: &[&str]) -> Result<Self> {
        let mut name = namespace.trim_end_matches('/').to_string();
        for segment in segments {
            name.push('/');
            name.push_str(segment);
        }
        Self::new(name)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this name lives under the given path prefix.
    #[must_use]
    pub fn is_under(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    fn validate(name: &str) -> Result<()> {
        let Some(path) = name.strip_prefix('/') else {
            return Err(Error::InvalidName {
                reason: "name must start with '/'".to_string(),
            });
        };

        if name.len() > Self::MAX_LENGTH {
            return Err(Error::InvalidName {
                reason: format!(
                    "name exceeds maximum length of {} characters",
                    Self::MAX_LENGTH
                ),
            });
        }

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() > Self::MAX_DEPTH {
            return Err(Error::InvalidName {
                reason: format!("name exceeds maximum depth of {}", Self::MAX_DEPTH),
            });
        }

        for segment in segments {
            if segment.is_empty() {
                return Err(Error::InvalidName {
                    reason: "name cannot contain empty segments".to_string(),
                });
            }
            if let Some(c) = segment
                .chars()
                .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
            {
                return Err(Error::InvalidName {
                    reason: format!(
                        "name contains invalid character '{c}'; only alphanumeric, hyphens, underscores, and periods are allowed"
                    ),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ParameterName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ParameterName> for String {
    fn from(name: ParameterName) -> Self {
        name.0
    }
}

impl AsRef<str> for ParameterName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plaintext parameter bytes that securely zeroize memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue {
    data: Vec<u8>,
}

impl SecretValue {
    /// Creates a new `SecretValue` from raw bytes.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the data as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the data as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Returns the length of the data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("len", &self.data.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.data.ct_eq(&other.data).into()
    }
}

impl Eq for SecretValue {}

/// How a parameter value is held at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKind {
    /// Stored as given.
    Plain,
    /// Encrypted with a key derived from the parameter name.
    Sensitive,
}

impl ParameterKind {
    /// Maps a sensitivity flag onto a kind.
    #[must_use]
    pub const fn from_sensitive(sensitive: bool) -> Self {
        if sensitive { Self::Sensitive } else { Self::Plain }
    }

    /// Returns true for [`ParameterKind::Sensitive`].
    #[must_use]
    pub const fn is_sensitive(self) -> bool {
        matches!(self, Self::Sensitive)
    }
}

/// Metadata about a stored parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    /// The parameter name.
    pub name: ParameterName,
    /// Whether the value is encrypted at rest.
    pub kind: ParameterKind,
    /// Free-form description supplied on write.
    pub description: Option<String>,
    /// When the parameter was written.
    pub created_at: DateTime<Utc>,
}
