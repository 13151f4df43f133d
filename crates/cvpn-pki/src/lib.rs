//! Certificate authority and mTLS leaf issuance for client VPN provisioning.
#![forbid(unsafe_code)]
//!
//! # Overview
//!
//! One generation batch yields:
//! - a self-signed RSA authority (`CN=VPN-CA`, serial `01`, `cA = true`)
//! - a `server` leaf (serial `02`, `serverAuth`)
//! - a `client` leaf (serial `03`, `clientAuth`)
//!
//! Subject fields other than the common name, the key size and the validity
//! window come from a [`CertificateConfig`]. Only key generation is random.
//!
//! # Example
//!
//! ```no_run
//! use cvpn_pki::{generate_batch, CertificateConfig};
//!
//! let config = CertificateConfig {
//!     organization_name: "VPN Organization".into(),
//!     organizational_unit: "IT Department".into(),
//!     country: "US".into(),
//!     state: "California".into(),
//!     city: "San Francisco".into(),
//!     key_size: 2048,
//!     validity_period_days: 365,
//! };
//!
//! let batch = generate_batch(&config).unwrap();
//! assert_eq!(batch.client.material.certificate.subject(), "client");
//! ```
//!
//! # Modules
//!
//! - [`ca`] - Authority generation and leaf issuance
//! - [`store`] - In-memory PEM certificate store
//! - [`validation`] - Signature, chain and batch validation
//! - [`types`] - Core types (`Certificate`, `PrivateKey`, config)
//! - [`error`] - Error types

pub mod ca;
pub mod error;
pub mod store;
pub mod types;
pub mod validation;

pub use ca::{generate_batch, CertificateAuthority};
pub use error::{Error, Result};
pub use store::CertStore;
pub use types::{
    AUTHORITY_COMMON_NAME, Certificate, CertificateBatch, CertificateConfig, CertificateId,
    CertifiedKey, ExtendedKeyUsage, KeySize, KeyUsage, LeafCertificate, LeafRole, PrivateKey,
};
pub use validation::{validate_batch, validate_certificate, validate_chain};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_workflow_test() {
        let config = CertificateConfig {
            organization_name: "Test Organization".into(),
            organizational_unit: "IT Department".into(),
            country: "US".into(),
            state: "California".into(),
            city: "San Francisco".into(),
            key_size: 2048,
            validity_period_days: 365,
        };

        // 1. Generate the batch
        let batch = generate_batch(&config).unwrap();
        validate_batch(&batch).unwrap();
        assert_eq!(batch.authority.certificate.subject(), AUTHORITY_COMMON_NAME);
        assert_eq!(batch.client.material.certificate.subject(), "client");

        // 2. Import every pair into a store
        let store = CertStore::new();
        for pair in [&batch.authority, &batch.server.material, &batch.client.material] {
            store
                .import_pem(&pair.certificate_pem(), &pair.private_key_pem())
                .unwrap();
        }
        assert_eq!(store.len(), 3);

        // 3. PEM round trip preserves the chain
        let client = Certificate::from_pem(&batch.client.material.certificate_pem()).unwrap();
        let ca = Certificate::from_pem(&batch.authority.certificate_pem()).unwrap();
        validate_chain(&[client, ca]).unwrap();
    }
}
