//! Certificate validation utilities.

use chrono::Utc;
use tracing::debug;
use x509_parser::prelude::*;

use crate::error::{Error, Result};
use crate::types::{Certificate, CertificateBatch, LeafCertificate};

/// Validates a certificate against its issuing CA certificate.
///
/// This performs the following checks:
/// - The certificate is not expired
/// - The certificate is not yet valid (`not_before` check)
/// - The issuer matches the CA's subject
/// - The certificate was signed by the CA
///
/// # Errors
///
/// Returns an error if validation fails.
pub fn validate_certificate(cert: &Certificate, ca_cert: &Certificate) -> Result<()> {
    debug!("Validating certificate: {}", cert.subject());

    if is_expired(cert) {
        return Err(Error::Expired);
    }

    if is_not_yet_valid(cert) {
        return Err(Error::NotYetValid);
    }

    if cert.issuer_dn() != ca_cert.subject_dn() {
        return Err(Error::Validation(format!(
            "issuer '{}' does not match CA subject '{}'",
            cert.issuer_dn(),
            ca_cert.subject_dn()
        )));
    }

    verify_signature(cert, ca_cert)?;

    Ok(())
}

/// Validates a certificate chain.
///
/// The chain should be ordered from end-entity to root CA.
/// Each certificate should be signed by the next certificate in the chain.
///
/// # Errors
///
/// Returns an error if the chain is invalid.
pub fn validate_chain(chain: &[Certificate]) -> Result<()> {
    let Some(root) = chain.last() else {
        return Err(Error::InvalidChain("empty certificate chain".into()));
    };

    for pair in chain.windows(2) {
        validate_certificate(&pair[0], &pair[1])?;
    }

    validate_self_signed(root)
}

/// Checks the structural invariants of a generated batch: a self-signed
/// authority, two leaves with the expected roles chained to it, and
/// distinct serial numbers.
///
/// # Errors
///
/// Returns the first violated invariant.
pub fn validate_batch(batch: &CertificateBatch) -> Result<()> {
    let ca = &batch.authority.certificate;
    if ca.is_ca() != Some(true) {
        return Err(Error::Validation("authority lacks basicConstraints cA".into()));
    }

    for leaf in [&batch.server, &batch.client] {
        validate_leaf(leaf, ca)?;
    }

    let serials = [
        ca.serial(),
        batch.server.material.certificate.serial(),
        batch.client.material.certificate.serial(),
    ];
    if serials[0] == serials[1] || serials[0] == serials[2] || serials[1] == serials[2] {
        return Err(Error::Validation(format!(
            "serial numbers are not unique: {serials:?}"
        )));
    }

    Ok(())
}

fn validate_leaf(leaf: &LeafCertificate, ca: &Certificate) -> Result<()> {
    let cert = &leaf.material.certificate;
    if cert.subject() != leaf.role.common_name() {
        return Err(Error::Validation(format!(
            "{} leaf has subject '{}'",
            leaf.role,
            cert.subject()
        )));
    }
    if cert.extended_key_usage() != [leaf.role.extended_key_usage()] {
        return Err(Error::Validation(format!(
            "{} leaf has extended key usage {:?}",
            leaf.role,
            cert.extended_key_usage()
        )));
    }
    validate_chain(&[cert.clone(), ca.clone()])
}

/// Checks if a certificate is expired.
#[must_use]
pub fn is_expired(cert: &Certificate) -> bool {
    cert.not_after() < Utc::now()
}

/// Checks if a certificate is not yet valid.
#[must_use]
pub fn is_not_yet_valid(cert: &Certificate) -> bool {
    cert.not_before() > Utc::now()
}

/// Validates a self-signed certificate.
///
/// # Errors
///
/// Returns an error if issuer and subject differ or the signature does not
/// verify against the certificate's own key.
pub fn validate_self_signed(cert: &Certificate) -> Result<()> {
    if cert.issuer_dn() != cert.subject_dn() {
        return Err(Error::Validation("certificate is not self-signed".into()));
    }

    verify_signature(cert, cert)
}

/// Verifies that a certificate was signed by the given issuer.
fn verify_signature(cert: &Certificate, issuer: &Certificate) -> Result<()> {
    let (_, parsed_cert) = X509Certificate::from_der(cert.der())
        .map_err(|e| Error::Parse(format!("failed to parse certificate: {e}")))?;

    let (_, parsed_issuer) = X509Certificate::from_der(issuer.der())
        .map_err(|e| Error::Parse(format!("failed to parse issuer certificate: {e}")))?;

    parsed_cert
        .verify_signature(Some(parsed_issuer.public_key()))
        .map_err(|e| {
            Error::SignatureVerification(format!(
                "signature verification failed for '{}': {e:?}",
                cert.subject()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::generate_batch;
    use crate::types::{CertificateConfig, LeafRole};
    use chrono::Duration;

    fn config() -> CertificateConfig {
        CertificateConfig {
            organization_name: "Validation Org".into(),
            organizational_unit: "QA".into(),
            country: "DE".into(),
            state: "Berlin".into(),
            city: "Berlin".into(),
            key_size: 2048,
            validity_period_days: 30,
        }
    }

    fn fake_cert(not_before: chrono::DateTime<Utc>, not_after: chrono::DateTime<Utc>) -> Certificate {
        Certificate::new(vec![1, 2, 3], not_before, not_after, "fake".into(), "Test CA".into())
    }

    #[test]
    fn expiry_checks() {
        let now = Utc::now();
        let expired = fake_cert(now - Duration::days(60), now - Duration::days(30));
        let future = fake_cert(now + Duration::days(30), now + Duration::days(60));
        let current = fake_cert(now - Duration::hours(1), now + Duration::days(30));

        assert!(is_expired(&expired));
        assert!(!is_expired(&current));
        assert!(is_not_yet_valid(&future));
        assert!(!is_not_yet_valid(&current));
    }

    #[test]
    fn validate_certificate_rejects_expired() {
        let now = Utc::now();
        let expired = fake_cert(now - Duration::days(60), now - Duration::days(30));
        let ca = fake_cert(now - Duration::days(60), now + Duration::days(60));
        assert!(matches!(validate_certificate(&expired, &ca), Err(Error::Expired)));
    }

    #[test]
    fn validate_chain_empty() {
        let result = validate_chain(&[]);
        assert!(matches!(result.unwrap_err(), Error::InvalidChain(_)));
    }

    #[test]
    fn generated_batch_passes_all_checks() {
        let batch = generate_batch(&config()).unwrap();
        validate_batch(&batch).unwrap();
        validate_chain(&[batch.authority.certificate.clone()]).unwrap();
        validate_chain(&[
            batch.client.material.certificate.clone(),
            batch.authority.certificate.clone(),
        ])
        .unwrap();

        // A leaf is not self-signed.
        assert!(validate_self_signed(&batch.server.material.certificate).is_err());

        // Swapped roles break the batch invariants.
        let mut swapped = batch.clone();
        swapped.server.role = LeafRole::Client;
        swapped.client.role = LeafRole::Server;
        assert!(matches!(validate_batch(&swapped), Err(Error::Validation(_))));
    }
}
