//! Certificate import with retry.

use cvpn_pki::{CertificateBatch, CertifiedKey};
use tracing::{debug, info};

use crate::clients::CertificateImporter;
use crate::error::{ProvisionError, Result};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// References returned for the three certificates of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedBatch {
    /// Reference of the authority certificate.
    pub authority: String,
    /// Reference of the server leaf.
    pub server: String,
    /// Reference of the client leaf.
    pub client: String,
}

/// Imports certificates into the certificate-management service.
#[derive(Debug)]
pub struct CertificateGateway<I> {
    importer: I,
    policy: RetryPolicy,
}

impl<I: CertificateImporter> CertificateGateway<I> {
    /// Creates a gateway over the given importer.
    pub fn new(importer: I, policy: RetryPolicy) -> Self {
        Self { importer, policy }
    }

    /// Imports one PEM certificate and key.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Import`] with the last service error once
    /// retries are exhausted or a permanent failure occurs.
    pub async fn import(&self, certificate_pem: &str, private_key_pem: &str) -> Result<String> {
        let reference = retry_with_backoff(&self.policy, "import_certificate", || {
            self.importer
                .import_certificate(certificate_pem, private_key_pem)
        })
        .await
        .map_err(ProvisionError::Import)?;

        debug!(reference = %reference, "certificate imported");
        Ok(reference)
    }

    /// Imports the authority and both leaves concurrently.
    ///
    /// Fails as soon as any import fails; imports that already completed
    /// are left in place.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProvisionError::Import`] observed.
    pub async fn import_batch(&self, batch: &CertificateBatch) -> Result<ImportedBatch> {
        let (authority, server, client) = tokio::try_join!(
            self.import_pair(&batch.authority),
            self.import_pair(&batch.server.material),
            self.import_pair(&batch.client.material),
        )?;

        info!(
            authority = %authority,
            server = %server,
            client = %client,
            "certificate batch imported"
        );
        Ok(ImportedBatch {
            authority,
            server,
            client,
        })
    }

    async fn import_pair(&self, pair: &CertifiedKey) -> Result<String> {
        self.import(&pair.certificate_pem(), &pair.private_key_pem())
            .await
    }
}
