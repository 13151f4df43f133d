//! In-memory certificate store.
//!
//! Accepts PEM certificate and key pairs the way a certificate-management
//! service does: both blocks must parse and the key must belong to the
//! certificate.

// We intentionally hold RwLock guards while accessing the stored data.
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::RwLock;

use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use tracing::{debug, info};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::{Error, Result};
use crate::types::{Certificate, CertificateId, CertifiedKey, PrivateKey};

/// In-memory certificate store.
pub struct CertStore {
    /// Storage for certificates and keys.
    store: RwLock<HashMap<CertificateId, CertifiedKey>>,
}

impl CertStore {
    /// Creates a new empty certificate store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Imports a PEM certificate and its PEM (PKCS#8) private key.
    ///
    /// # Errors
    ///
    /// Returns an error if either PEM block fails to parse, the key does not
    /// match the certificate, or the store cannot be locked.
    pub fn import_pem(&self, certificate_pem: &str, private_key_pem: &str) -> Result<CertificateId> {
        let certificate = Certificate::from_pem(certificate_pem)?;
        let private_key = PrivateKey::from_pem(private_key_pem)?;
        ensure_key_matches(&certificate, &private_key)?;

        let id = CertificateId::new();
        info!("Importing certificate: {} (subject: {})", id, certificate.subject());

        let mut store = self
            .store
            .write()
            .map_err(|e| Error::Storage(format!("failed to acquire write lock: {e}")))?;

        store.insert(
            id.clone(),
            CertifiedKey {
                certificate,
                private_key,
            },
        );

        debug!("Certificate imported successfully: {}", id);

        Ok(id)
    }

    /// Returns the number of certificates in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CertStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("CertStore")
            .field("count", &count)
            .finish()
    }
}

/// Compares the key's RSA modulus with the certificate's subject public key.
fn ensure_key_matches(certificate: &Certificate, private_key: &PrivateKey) -> Result<()> {
    let rsa_key = rsa::RsaPrivateKey::from_pkcs8_der(private_key.der())
        .map_err(|e| Error::Parse(format!("failed to parse private key: {e}")))?;

    let (_, parsed) = X509Certificate::from_der(certificate.der())
        .map_err(|e| Error::Parse(format!("failed to parse certificate: {e}")))?;

    let modulus = match parsed.public_key().parsed() {
        Ok(PublicKey::RSA(public)) => trim_leading_zeros(public.modulus).to_vec(),
        Ok(_) => return Err(Error::KeyMismatch(certificate.subject().to_string())),
        Err(e) => return Err(Error::Parse(format!("failed to parse public key: {e}"))),
    };

    if modulus != rsa_key.n().to_bytes_be() {
        return Err(Error::KeyMismatch(certificate.subject().to_string()));
    }
    Ok(())
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
