//! Write-once parameter storage with encryption at rest.

use std::collections::BTreeMap;
use std::sync::RwLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use tracing::{debug, info};

use crate::encryption::{decrypt, encrypt, SecretKey};
use crate::error::{Error, Result};
use crate::types::{ParameterKind, ParameterMetadata, ParameterName, SecretValue};

struct StoredParameter {
    /// Plain bytes, or `nonce || ciphertext || tag` for sensitive values.
    value: Vec<u8>,
    metadata: ParameterMetadata,
}

/// An in-memory hierarchical parameter store.
///
/// Each name can be written exactly once. Sensitive values are encrypted
/// with a key derived from the master key and the parameter name; reading
/// one without decryption yields the base64 ciphertext.
pub struct ParameterStore {
    master_key: SecretKey,
    parameters: RwLock<BTreeMap<ParameterName, StoredParameter>>,
}

impl ParameterStore {
    /// Creates a new store with the given master key.
    #[must_use]
    pub fn new(master_key: SecretKey) -> Self {
        Self {
            master_key,
            parameters: RwLock::new(BTreeMap::new()),
        }
    }

    /// Writes a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the name was written before, or an
    /// encryption error for sensitive values.
    pub fn put(
        &self,
        name: &ParameterName,
        value: &[u8],
        kind: ParameterKind,
        description: Option<String>,
    ) -> Result<ParameterMetadata> {
        let stored_value = match kind {
            ParameterKind::Plain => value.to_vec(),
            ParameterKind::Sensitive => {
                encrypt(&self.master_key.derive_for_parameter(name), value)?
            }
        };

        let metadata = ParameterMetadata {
            name: name.clone(),
            kind,
            description,
            created_at: Utc::now(),
        };

        let mut parameters = self
            .parameters
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if parameters.contains_key(name) {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }

        parameters.insert(
            name.clone(),
            StoredParameter {
                value: stored_value,
                metadata: metadata.clone(),
            },
        );
        drop(parameters);

        info!(parameter = %name, ?kind, "parameter stored");
        Ok(metadata)
    }

    /// Reads a parameter.
    ///
    /// Plain values are returned as written regardless of `decrypt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown names, or an encryption error
    /// if decryption fails.
    pub fn get(&self, name: &ParameterName, decrypt_value: bool) -> Result<SecretValue> {
        let parameters = self
            .parameters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let stored = parameters.get(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;

        debug!(parameter = %name, decrypt = decrypt_value, "parameter read");

        let value = match (stored.metadata.kind, decrypt_value) {
            (ParameterKind::Plain, _) => stored.value.clone(),
            (ParameterKind::Sensitive, true) => {
                decrypt(&self.master_key.derive_for_parameter(name), &stored.value)?
            }
            (ParameterKind::Sensitive, false) => STANDARD.encode(&stored.value).into_bytes(),
        };

        Ok(SecretValue::new(value))
    }

    /// Lists metadata for every parameter under `prefix`, ordered by name.
    #[must_use]
    pub fn list(&self, prefix: &str) -> Vec<ParameterMetadata> {
        self.parameters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .filter(|stored| stored.metadata.name.is_under(prefix))
            .map(|stored| stored.metadata.clone())
            .collect()
    }

    /// Returns the number of stored parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(SecretKey::generate())
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("master_key", &self.master_key)
            .field("count", &self.len())
            .finish()
    }
}
