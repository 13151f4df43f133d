//! Secret parameter storage with retry.
//!
//! Names follow `<namespace>/<resourceId>/<artifact>`, so material written
//! during authority issuance can be read back later by resource id alone.

use std::fmt;

use cvpn_pki::CertificateBatch;
use cvpn_secrets::ParameterName;
use tracing::{debug, info};

use crate::clients::ParameterStoreClient;
use crate::error::{ProvisionError, Result};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// The pieces of certificate material kept per resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Authority certificate PEM.
    CaCertificate,
    /// Authority private key PEM.
    CaPrivateKey,
    /// Client leaf certificate PEM.
    ClientCertificate,
    /// Client leaf private key PEM.
    ClientPrivateKey,
}

impl Artifact {
    /// All artifacts, in write order.
    pub const ALL: [Self; 4] = [
        Self::CaCertificate,
        Self::CaPrivateKey,
        Self::ClientCertificate,
        Self::ClientPrivateKey,
    ];

    /// Final path segment of the parameter name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CaCertificate => "ca-certificate",
            Self::CaPrivateKey => "ca-private-key",
            Self::ClientCertificate => "client-certificate",
            Self::ClientPrivateKey => "client-private-key",
        }
    }

    /// Private keys are stored encrypted.
    #[must_use]
    pub const fn is_sensitive(self) -> bool {
        matches!(self, Self::CaPrivateKey | Self::ClientPrivateKey)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What profile assembly needs from the stored material.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientMaterial {
    /// Authority certificate PEM.
    pub ca_certificate: String,
    /// Client certificate PEM.
    pub client_certificate: String,
    /// Decrypted client private key PEM.
    pub client_private_key: String,
}

impl fmt::Debug for ClientMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientMaterial")
            .field("ca_certificate", &self.ca_certificate.len())
            .field("client_certificate", &self.client_certificate.len())
            .field("client_private_key", &"[REDACTED]")
            .finish()
    }
}

/// Reads and writes parameters under a fixed namespace.
#[derive(Debug)]
pub struct SecretGateway<S> {
    store: S,
    namespace: String,
    policy: RetryPolicy,
}

impl<S: ParameterStoreClient> SecretGateway<S> {
    /// Creates a gateway writing under `namespace` (for example `/vpn`).
    pub fn new(store: S, namespace: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            policy,
        }
    }

    /// Returns the parameter name of an artifact for a resource id.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Config`] if the resource id cannot form a
    /// valid name.
    pub fn name_for(&self, resource_id: &str, artifact: Artifact) -> Result<ParameterName> {
        ParameterName::join(&self.namespace, &[resource_id, artifact.as_str()])
            .map_err(|e| ProvisionError::Config(e.to_string()))
    }

    /// Writes one parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::SecretWrite`] once retries are exhausted.
    pub async fn put_secret(&self, name: &ParameterName, value: &str, sensitive: bool) -> Result<()> {
        retry_with_backoff(&self.policy, "put_parameter", || {
            self.store.put_parameter(name, value, sensitive)
        })
        .await
        .map_err(ProvisionError::SecretWrite)?;

        debug!(parameter = %name, sensitive, "parameter written");
        Ok(())
    }

    /// Reads one parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::SecretRead`] once retries are exhausted.
    pub async fn get_secret(&self, name: &ParameterName, decrypt: bool) -> Result<String> {
        let value = retry_with_backoff(&self.policy, "get_parameter", || {
            self.store.get_parameter(name, decrypt)
        })
        .await
        .map_err(ProvisionError::SecretRead)?;

        debug!(parameter = %name, decrypt, "parameter read");
        Ok(value)
    }

    /// Writes the authority certificate and key and the client certificate
    /// and key concurrently.
    ///
    /// Members already written stay written if another member fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure observed.
    pub async fn store_authority_material(
        &self,
        resource_id: &str,
        batch: &CertificateBatch,
    ) -> Result<()> {
        let ca_certificate = batch.authority.certificate_pem();
        let ca_private_key = batch.authority.private_key_pem();
        let client_certificate = batch.client.material.certificate_pem();
        let client_private_key = batch.client.material.private_key_pem();

        let names = Artifact::ALL
            .iter()
            .map(|artifact| self.name_for(resource_id, *artifact))
            .collect::<Result<Vec<_>>>()?;

        let values = [
            &ca_certificate,
            &ca_private_key,
            &client_certificate,
            &client_private_key,
        ];

        let writes = Artifact::ALL
            .iter()
            .zip(&names)
            .zip(values)
            .map(|((artifact, name), value)| self.put_secret(name, value, artifact.is_sensitive()));

        futures::future::try_join_all(writes).await?;

        info!(resource_id, namespace = %self.namespace, "authority material stored");
        Ok(())
    }

    /// Reads the material profile assembly needs, concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failure observed.
    pub async fn fetch_client_material(&self, resource_id: &str) -> Result<ClientMaterial> {
        let ca = self.name_for(resource_id, Artifact::CaCertificate)?;
        let cert = self.name_for(resource_id, Artifact::ClientCertificate)?;
        let key = self.name_for(resource_id, Artifact::ClientPrivateKey)?;

        let (ca_certificate, client_certificate, client_private_key) = tokio::try_join!(
            self.get_secret(&ca, false),
            self.get_secret(&cert, false),
            self.get_secret(&key, true),
        )?;

        debug!(resource_id, "client material fetched");
        Ok(ClientMaterial {
            ca_certificate,
            client_certificate,
            client_private_key,
        })
    }
}
