//! Certificate authority issuance.
//!
//! Generates a CA with server and client leaves, imports all three into the
//! certificate service, then stores the CA and client material as
//! parameters scoped by the minted resource id.

use std::fmt;

use cvpn_pki::{generate_batch, validate_batch, CertificateConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{parse_properties, LifecycleOperation, ResourceId};
use crate::clients::{CertificateImporter, ParameterStoreClient};
use crate::error::{ProvisionError, Result};
use crate::gateway::{CertificateGateway, SecretGateway};

/// Prefix of physical ids minted by [`AuthorityIssuance`].
pub const AUTHORITY_PREFIX: &str = "certificate-generator";

/// Input of the authority operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityProperties {
    /// Subject fields and key policy of the batch.
    #[serde(default, alias = "Config")]
    pub config: Option<CertificateConfig>,
}

/// PEM material and import references of a batch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityData {
    /// Authority certificate.
    pub ca_cert_pem: String,
    /// Authority private key.
    pub ca_key_pem: String,
    /// Import reference of the authority.
    pub ca_ref: String,
    /// Server certificate.
    pub server_cert_pem: String,
    /// Server private key.
    pub server_key_pem: String,
    /// Import reference of the server leaf.
    pub server_ref: String,
    /// Client certificate.
    pub client_cert_pem: String,
    /// Client private key.
    pub client_key_pem: String,
    /// Import reference of the client leaf.
    pub client_ref: String,
}

impl fmt::Debug for AuthorityData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityData")
            .field("ca_ref", &self.ca_ref)
            .field("server_ref", &self.server_ref)
            .field("client_ref", &self.client_ref)
            .field("keys", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// The authority-issuance operation.
#[derive(Debug)]
pub struct AuthorityIssuance<I, S> {
    certificates: CertificateGateway<I>,
    secrets: SecretGateway<S>,
}

impl<I: CertificateImporter, S: ParameterStoreClient> AuthorityIssuance<I, S> {
    /// Creates the operation over its two gateways.
    pub fn new(certificates: CertificateGateway<I>, secrets: SecretGateway<S>) -> Self {
        Self {
            certificates,
            secrets,
        }
    }

    async fn issue(&self, properties: serde_json::Value, resource_id: &ResourceId) -> Result<AuthorityData> {
        let properties: AuthorityProperties = parse_properties(properties)?;
        let config = properties
            .config
            .ok_or_else(|| ProvisionError::missing_config("config", "keySize"))?;
        config.validate()?;

        info!(
            resource_id = %resource_id,
            organization = %config.organization_name,
            key_size = config.key_size,
            validity_days = config.validity_period_days,
            "generating certificate batch"
        );

        // RSA generation is CPU bound; keep it off the async workers.
        let batch = match tokio::task::spawn_blocking(move || generate_batch(&config)).await {
            Ok(generated) => generated?,
            Err(e) if e.is_panic() => return Err(ProvisionError::Unknown),
            Err(e) => return Err(ProvisionError::Crypto(format!("key generation aborted: {e}"))),
        };
        validate_batch(&batch)?;

        let refs = self.certificates.import_batch(&batch).await?;
        self.secrets
            .store_authority_material(resource_id.as_str(), &batch)
            .await?;

        Ok(AuthorityData {
            ca_cert_pem: batch.authority.certificate_pem(),
            ca_key_pem: batch.authority.private_key_pem(),
            ca_ref: refs.authority,
            server_cert_pem: batch.server.material.certificate_pem(),
            server_key_pem: batch.server.material.private_key_pem(),
            server_ref: refs.server,
            client_cert_pem: batch.client.material.certificate_pem(),
            client_key_pem: batch.client.material.private_key_pem(),
            client_ref: refs.client,
        })
    }
}

impl<I: CertificateImporter, S: ParameterStoreClient> LifecycleOperation for AuthorityIssuance<I, S> {
    type Data = AuthorityData;

    fn prefix(&self) -> &'static str {
        AUTHORITY_PREFIX
    }

    async fn execute(&self, properties: serde_json::Value, resource_id: &ResourceId) -> Result<AuthorityData> {
        self.issue(properties, resource_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ServiceError};
    use crate::lifecycle::{LifecycleEvent, LifecycleKind, LifecycleStatus, Orchestrator};
    use crate::retry::RetryPolicy;
    use crate::testing::{FakeImporter, FakeParameterStore};
    use cvpn_pki::Certificate;
    use serde_json::json;

    fn orchestrator(
        importer: &FakeImporter,
        store: &FakeParameterStore,
    ) -> Orchestrator<AuthorityIssuance<FakeImporter, FakeParameterStore>> {
        Orchestrator::new(AuthorityIssuance::new(
            CertificateGateway::new(importer.clone(), RetryPolicy::default()),
            SecretGateway::new(store.clone(), "/vpn", RetryPolicy::default()),
        ))
    }

    fn create(config: serde_json::Value) -> LifecycleEvent {
        LifecycleEvent::new(LifecycleKind::Create, json!({ "config": config }))
    }

    fn test_config() -> serde_json::Value {
        json!({
            "organizationName": "Test Organization",
            "organizationalUnit": "IT Department",
            "country": "US",
            "state": "California",
            "city": "San Francisco",
            "keySize": 2048,
            "validityPeriodDays": 365
        })
    }

    #[tokio::test]
    async fn create_issues_imports_and_stores() {
        let importer = FakeImporter::new();
        let store = FakeParameterStore::new();

        let result = orchestrator(&importer, &store).handle(create(test_config())).await;

        assert_eq!(result.status, LifecycleStatus::Succeeded, "{:?}", result.reason);
        assert!(result.physical_id.starts_with("certificate-generator-"));
        let data = result.data.unwrap();

        let ca = Certificate::from_pem(&data.ca_cert_pem).unwrap();
        assert_eq!(ca.subject(), "VPN-CA");
        assert_eq!(ca.issuer(), "VPN-CA");
        assert_eq!(ca.is_ca(), Some(true));
        let client = Certificate::from_pem(&data.client_cert_pem).unwrap();
        assert_eq!(client.subject(), "client");
        assert_eq!(client.issuer(), "VPN-CA");

        assert_eq!(importer.imported_subjects().len(), 3);
        let written: Vec<String> = store.written().into_iter().map(|(name, _)| name).collect();
        assert_eq!(written.len(), 4);
        for name in written {
            assert!(name.starts_with(&format!("/vpn/{}/", result.physical_id)));
        }
        assert!(!format!("{data:?}").contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn null_config_fails_with_undefined_access() {
        let importer = FakeImporter::new();
        let store = FakeParameterStore::new();

        let result = orchestrator(&importer, &store)
            .handle(LifecycleEvent::new(LifecycleKind::Create, json!({ "config": null })))
            .await;

        assert_eq!(result.status, LifecycleStatus::Failed);
        assert_eq!(result.physical_id, "certificate-generator-failed");
        assert_eq!(result.error_kind, Some(ErrorKind::Config));
        assert!(result.reason.unwrap().contains("of undefined"));
        assert_eq!(importer.calls(), 0);
    }

    #[tokio::test]
    async fn unsupported_key_size_is_a_config_error() {
        let importer = FakeImporter::new();
        let store = FakeParameterStore::new();
        let mut config = test_config();
        config["keySize"] = json!(1024);

        let result = orchestrator(&importer, &store).handle(create(config)).await;

        assert_eq!(result.error_kind, Some(ErrorKind::Config));
        assert!(store.written().is_empty());
    }

    #[tokio::test]
    async fn oversized_validity_is_a_config_error() {
        let importer = FakeImporter::new();
        let store = FakeParameterStore::new();
        let mut config = test_config();
        config["validityPeriodDays"] = json!(u32::MAX);

        let result = orchestrator(&importer, &store).handle(create(config)).await;

        assert_eq!(result.status, LifecycleStatus::Failed);
        assert_eq!(result.error_kind, Some(ErrorKind::Config));
        assert!(result.reason.unwrap().contains("9999-12-31"));
        assert_eq!(importer.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn import_failure_skips_secret_storage() {
        let importer = FakeImporter::new().fail_times(u32::MAX, ServiceError::permanent("LimitExceeded"));
        let store = FakeParameterStore::new();

        let result = orchestrator(&importer, &store)
            .handle(create(test_config()).with_physical_id("certificate-generator-prior"))
            .await;

        assert_eq!(result.status, LifecycleStatus::Failed);
        assert_eq!(result.physical_id, "certificate-generator-prior");
        assert_eq!(result.reason.as_deref(), Some("LimitExceeded"));
        assert_eq!(result.error_kind, Some(ErrorKind::Import));
        assert!(store.written().is_empty());
    }

    #[test]
    fn properties_accept_pascal_case() {
        let properties: AuthorityProperties =
            serde_json::from_value(json!({ "Config": test_config() })).unwrap();
        assert_eq!(properties.config.unwrap().key_size, 2048);
    }
}
