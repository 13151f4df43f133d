//! Core PKI types for certificate management.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Common name of the self-signed authority.
pub const AUTHORITY_COMMON_NAME: &str = "VPN-CA";

/// Serial number of the authority certificate.
pub const AUTHORITY_SERIAL: u8 = 1;

/// Unix time of `9999-12-31T23:59:59Z`, the last instant X.509 can encode.
pub const MAX_NOT_AFTER_TIMESTAMP: i64 = 253_402_300_799;

/// Returns the end of a `days` long validity window starting at `not_before`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the window ends after
/// `9999-12-31T23:59:59Z`.
pub fn validity_end(not_before: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    Duration::try_days(i64::from(days))
        .and_then(|window| not_before.checked_add_signed(window))
        .filter(|end| end.timestamp() <= MAX_NOT_AFTER_TIMESTAMP)
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "validityPeriodDays {days} ends after 9999-12-31"
            ))
        })
}

/// Unique identifier for a stored certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertificateId(Uuid);

impl CertificateId {
    /// Creates a new random certificate ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CertificateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RSA modulus sizes accepted for generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySize {
    /// 2048-bit RSA.
    Rsa2048,
    /// 4096-bit RSA.
    Rsa4096,
}

impl KeySize {
    /// Returns the modulus size in bits.
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa4096 => 4096,
        }
    }
}

impl TryFrom<u32> for KeySize {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            4096 => Ok(Self::Rsa4096),
            other => Err(Error::InvalidConfig(format!(
                "keySize must be 2048 or 4096, got {other}"
            ))),
        }
    }
}

/// Role of a leaf certificate within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafRole {
    /// The VPN endpoint's certificate.
    Server,
    /// The connecting peer's certificate.
    Client,
}

impl LeafRole {
    /// Subject common name for this role.
    #[must_use]
    pub const fn common_name(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }

    /// Serial number assigned to this role within a batch.
    #[must_use]
    pub const fn serial(self) -> u8 {
        match self {
            Self::Server => 2,
            Self::Client => 3,
        }
    }

    /// Extended key usage granted to this role.
    #[must_use]
    pub const fn extended_key_usage(self) -> ExtendedKeyUsage {
        match self {
            Self::Server => ExtendedKeyUsage::ServerAuth,
            Self::Client => ExtendedKeyUsage::ClientAuth,
        }
    }
}

impl fmt::Display for LeafRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.common_name())
    }
}

/// Extended key usage purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedKeyUsage {
    /// TLS server authentication.
    ServerAuth,
    /// TLS client authentication.
    ClientAuth,
}

/// Basic key usage bits read back from a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUsage {
    /// digitalSignature
    DigitalSignature,
    /// keyEncipherment
    KeyEncipherment,
    /// keyCertSign
    KeyCertSign,
    /// cRLSign
    CrlSign,
}

/// Subject fields and policy shared by every certificate of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateConfig {
    /// Subject organization (O).
    pub organization_name: String,
    /// Subject organizational unit (OU).
    pub organizational_unit: String,
    /// Subject country (C).
    pub country: String,
    /// Subject state or province (ST).
    pub state: String,
    /// Subject locality (L).
    pub city: String,
    /// RSA modulus size in bits; 2048 or 4096.
    pub key_size: u32,
    /// Validity window length in days.
    pub validity_period_days: u32,
}

impl CertificateConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an unsupported key size, an
    /// empty validity window, or one that would end after year 9999.
    pub fn validate(&self) -> Result<()> {
        KeySize::try_from(self.key_size)?;
        if self.validity_period_days == 0 {
            return Err(Error::InvalidConfig(
                "validityPeriodDays must be greater than 0".into(),
            ));
        }
        validity_end(Utc::now(), self.validity_period_days)?;
        Ok(())
    }

    /// Returns the validated key size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the size is not 2048 or 4096.
    pub fn key_size(&self) -> Result<KeySize> {
        KeySize::try_from(self.key_size)
    }
}

/// A DER-encoded X.509 certificate with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    /// DER-encoded certificate bytes.
    der: Vec<u8>,
    /// Hex serial number, colon separated.
    serial: String,
    /// Certificate validity start time.
    not_before: DateTime<Utc>,
    /// Certificate validity end time.
    not_after: DateTime<Utc>,
    /// Subject common name.
    subject: String,
    /// Issuer common name.
    issuer: String,
    /// Full subject distinguished name.
    subject_dn: String,
    /// Full issuer distinguished name.
    issuer_dn: String,
    /// `basicConstraints.cA`, if the extension is present.
    is_ca: Option<bool>,
    /// Basic key usage bits.
    key_usage: Vec<KeyUsage>,
    /// Extended key usage purposes.
    extended_key_usage: Vec<ExtendedKeyUsage>,
}

impl Certificate {
    /// Creates a certificate from raw DER bytes and minimal metadata.
    #[must_use]
    pub fn new(
        der: Vec<u8>,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
        subject: String,
        issuer: String,
    ) -> Self {
        Self {
            der,
            serial: String::new(),
            not_before,
            not_after,
            subject_dn: format!("CN={subject}"),
            issuer_dn: format!("CN={issuer}"),
            subject,
            issuer,
            is_ca: None,
            key_usage: Vec::new(),
            extended_key_usage: Vec::new(),
        }
    }

    /// Parses a certificate from DER-encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        use x509_parser::prelude::{FromDer, X509Certificate};

        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::Parse(format!("failed to parse certificate: {e}")))?;

        let not_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or_else(|| Error::Parse("invalid not_before timestamp".into()))?;
        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| Error::Parse("invalid not_after timestamp".into()))?;

        let is_ca = cert
            .basic_constraints()
            .map_err(|e| Error::Parse(format!("invalid basicConstraints: {e}")))?
            .map(|ext| ext.value.ca);

        let mut key_usage = Vec::new();
        if let Some(ext) = cert
            .key_usage()
            .map_err(|e| Error::Parse(format!("invalid keyUsage: {e}")))?
        {
            let ku = ext.value;
            for (set, usage) in [
                (ku.digital_signature(), KeyUsage::DigitalSignature),
                (ku.key_encipherment(), KeyUsage::KeyEncipherment),
                (ku.key_cert_sign(), KeyUsage::KeyCertSign),
                (ku.crl_sign(), KeyUsage::CrlSign),
            ] {
                if set {
                    key_usage.push(usage);
                }
            }
        }

        let mut extended_key_usage = Vec::new();
        if let Some(ext) = cert
            .extended_key_usage()
            .map_err(|e| Error::Parse(format!("invalid extKeyUsage: {e}")))?
        {
            if ext.value.server_auth {
                extended_key_usage.push(ExtendedKeyUsage::ServerAuth);
            }
            if ext.value.client_auth {
                extended_key_usage.push(ExtendedKeyUsage::ClientAuth);
            }
        }

        Ok(Self {
            der: der.to_vec(),
            serial: cert.raw_serial_as_string(),
            not_before,
            not_after,
            subject: extract_common_name(cert.subject())?,
            issuer: extract_common_name(cert.issuer())?,
            subject_dn: cert.subject().to_string(),
            issuer_dn: cert.issuer().to_string(),
            is_ca,
            key_usage,
            extended_key_usage,
        })
    }

    /// Parses a certificate from a `CERTIFICATE` PEM block.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM block is malformed or is not a certificate.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = decode_pem(pem, CERTIFICATE_LABEL)?;
        Self::from_der(&der)
    }

    /// Returns the DER-encoded certificate bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the PEM-encoded certificate.
    #[must_use]
    pub fn pem(&self) -> String {
        encode_pem(CERTIFICATE_LABEL, &self.der)
    }

    /// Returns the serial number as colon separated hex (`01`, `02`, ...).
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Returns the certificate validity start time.
    #[must_use]
    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// Returns the certificate validity end time.
    #[must_use]
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Returns the subject common name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the issuer common name.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the full subject distinguished name.
    #[must_use]
    pub fn subject_dn(&self) -> &str {
        &self.subject_dn
    }

    /// Returns the full issuer distinguished name.
    #[must_use]
    pub fn issuer_dn(&self) -> &str {
        &self.issuer_dn
    }

    /// Returns `basicConstraints.cA`, or `None` when the extension is absent.
    #[must_use]
    pub const fn is_ca(&self) -> Option<bool> {
        self.is_ca
    }

    /// Returns the basic key usage bits.
    #[must_use]
    pub fn key_usage(&self) -> &[KeyUsage] {
        &self.key_usage
    }

    /// Returns the extended key usage purposes.
    #[must_use]
    pub fn extended_key_usage(&self) -> &[ExtendedKeyUsage] {
        &self.extended_key_usage
    }
}

/// Extracts the common name from an X.509 name.
fn extract_common_name(name: &x509_parser::x509::X509Name) -> Result<String> {
    for rdn in name.iter() {
        for attr in rdn.iter() {
            if attr.attr_type() == &x509_parser::oid_registry::OID_X509_COMMON_NAME {
                return attr
                    .as_str()
                    .map(String::from)
                    .map_err(|e| Error::Parse(format!("failed to parse CN: {e}")));
            }
        }
    }
    Err(Error::Parse("common name not found".into()))
}

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Wraps DER bytes in a PEM block with 64-column base64 lines.
fn encode_pem(label: &str, der: &[u8]) -> String {
    use base64::Engine;
    let b64 = base64::engine::general_purpose::STANDARD.encode(der);
    let body = b64
        .as_bytes()
        .chunks(64)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
}

/// Decodes the first PEM block of `pem`, requiring the given label.
fn decode_pem(pem: &str, label: &str) -> Result<Vec<u8>> {
    let (_, block) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| Error::Parse(format!("invalid PEM: {e}")))?;
    if block.label != label {
        return Err(Error::Parse(format!(
            "expected PEM label '{label}', found '{}'",
            block.label
        )));
    }
    Ok(block.contents)
}

/// A PKCS#8 private key with secure memory handling.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    /// DER-encoded PKCS#8 private key bytes.
    der: Vec<u8>,
}

impl PrivateKey {
    /// Creates a new private key from PKCS#8 DER bytes.
    #[must_use]
    pub const fn new(der: Vec<u8>) -> Self {
        Self { der }
    }

    /// Parses a `PRIVATE KEY` PEM block.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM block is malformed or is not a PKCS#8 key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        decode_pem(pem, PRIVATE_KEY_LABEL).map(Self::new)
    }

    /// Returns the DER-encoded private key bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the PEM-encoded private key.
    #[must_use]
    pub fn pem(&self) -> String {
        encode_pem(PRIVATE_KEY_LABEL, &self.der)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("der", &"[REDACTED]")
            .finish()
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self {
            der: self.der.clone(),
        }
    }
}

/// A certificate together with its private key.
#[derive(Debug, Clone)]
pub struct CertifiedKey {
    /// The signed certificate.
    pub certificate: Certificate,
    /// The certificate's private key.
    pub private_key: PrivateKey,
}

impl CertifiedKey {
    /// PEM of the certificate.
    #[must_use]
    pub fn certificate_pem(&self) -> String {
        self.certificate.pem()
    }

    /// PEM of the private key.
    #[must_use]
    pub fn private_key_pem(&self) -> String {
        self.private_key.pem()
    }
}

/// A server or client certificate signed by the batch authority.
#[derive(Debug, Clone)]
pub struct LeafCertificate {
    /// Role the certificate was issued for.
    pub role: LeafRole,
    /// Certificate and key.
    pub material: CertifiedKey,
}

/// The output of one generation batch: an authority and its two leaves.
#[derive(Debug, Clone)]
pub struct CertificateBatch {
    /// The self-signed authority certificate and key.
    pub authority: CertifiedKey,
    /// Leaf with [`LeafRole::Server`].
    pub server: LeafCertificate,
    /// Leaf with [`LeafRole::Client`].
    pub client: LeafCertificate,
}
