//! In-memory collaborators.
//!
//! Back the CLI and integration tests with the local certificate store and
//! parameter store instead of remote services.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use cvpn_pki::CertStore;
use cvpn_secrets::{ParameterKind, ParameterName, ParameterStore};
use tracing::debug;

use crate::clients::{
    CertificateImporter, EndpointDescriptor, EndpointDirectory, ParameterStoreClient,
    SecretBundleStore,
};
use crate::config::ProvisionerConfig;
use crate::endpoint::EndpointResolver;
use crate::error::ServiceError;
use crate::gateway::{BundleGateway, CertificateGateway, SecretGateway};
use crate::lifecycle::{AuthorityIssuance, Orchestrator, ProfileAssembly};

/// Certificate importer backed by a [`CertStore`].
#[derive(Debug, Default)]
pub struct InMemoryCertificateImporter {
    store: CertStore,
}

impl InMemoryCertificateImporter {
    /// Creates an empty importer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &CertStore {
        &self.store
    }
}

impl CertificateImporter for InMemoryCertificateImporter {
    async fn import_certificate(
        &self,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<String, ServiceError> {
        let id = self
            .store
            .import_pem(certificate_pem, private_key_pem)
            .map_err(|e| ServiceError::permanent(e.to_string()))?;
        Ok(format!("arn:cvpn:acm:certificate/{id}"))
    }
}

/// Parameter store client backed by a [`ParameterStore`].
#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
    store: ParameterStore,
}

impl InMemoryParameterStore {
    /// Creates an empty store with a fresh master key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &ParameterStore {
        &self.store
    }
}

impl ParameterStoreClient for InMemoryParameterStore {
    async fn put_parameter(
        &self,
        name: &ParameterName,
        value: &str,
        sensitive: bool,
    ) -> Result<(), ServiceError> {
        self.store
            .put(
                name,
                value.as_bytes(),
                ParameterKind::from_sensitive(sensitive),
                None,
            )
            .map(|_| ())
            .map_err(|e| ServiceError::permanent(e.to_string()))
    }

    async fn get_parameter(&self, name: &ParameterName, decrypt: bool) -> Result<String, ServiceError> {
        let value = self
            .store
            .get(name, decrypt)
            .map_err(|e| ServiceError::permanent(e.to_string()))?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::permanent(format!("parameter {name} is not valid UTF-8")))
    }
}

/// Endpoint directory over registered descriptors.
#[derive(Debug, Default)]
pub struct InMemoryEndpointDirectory {
    endpoints: RwLock<HashMap<String, EndpointDescriptor>>,
}

impl InMemoryEndpointDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an endpoint.
    pub fn register(&self, endpoint: EndpointDescriptor) {
        debug!(endpoint_id = %endpoint.endpoint_id, "endpoint registered");
        self.endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(endpoint.endpoint_id.clone(), endpoint);
    }
}

impl EndpointDirectory for InMemoryEndpointDirectory {
    async fn describe_endpoints(&self, endpoint_id: &str) -> Result<Vec<EndpointDescriptor>, ServiceError> {
        Ok(self
            .endpoints
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(endpoint_id)
            .cloned()
            .into_iter()
            .collect())
    }
}

/// A stored text secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Secret contents.
    pub contents: String,
    /// Description given on creation.
    pub description: String,
}

/// Secret-bundle store kept in a map. Names are write-once.
#[derive(Debug, Default)]
pub struct InMemorySecretBundleStore {
    secrets: RwLock<BTreeMap<String, BundleEntry>>,
}

impl InMemorySecretBundleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored secret by name.
    pub fn get(&self, name: &str) -> Option<BundleEntry> {
        self.secrets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns the stored secret a reference points to.
    pub fn resolve(&self, reference: &str) -> Option<BundleEntry> {
        reference
            .strip_prefix(BUNDLE_REFERENCE_PREFIX)
            .and_then(|name| self.get(name))
    }
}

const BUNDLE_REFERENCE_PREFIX: &str = "arn:cvpn:secretsmanager:secret/";

impl SecretBundleStore for InMemorySecretBundleStore {
    async fn create_secret(
        &self,
        name: &str,
        contents: &str,
        description: &str,
    ) -> Result<String, ServiceError> {
        let mut secrets = self
            .secrets
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if secrets.contains_key(name) {
            return Err(ServiceError::permanent(format!(
                "secret {name} already exists"
            )));
        }
        secrets.insert(
            name.to_string(),
            BundleEntry {
                contents: contents.to_string(),
                description: description.to_string(),
            },
        );
        Ok(format!("{BUNDLE_REFERENCE_PREFIX}{name}"))
    }
}

/// Authority orchestrator over in-memory collaborators.
pub type InMemoryAuthority =
    Orchestrator<AuthorityIssuance<Arc<InMemoryCertificateImporter>, Arc<InMemoryParameterStore>>>;

/// Profile orchestrator over in-memory collaborators.
pub type InMemoryProfile = Orchestrator<
    ProfileAssembly<
        Arc<InMemoryEndpointDirectory>,
        Arc<InMemoryParameterStore>,
        Arc<InMemorySecretBundleStore>,
    >,
>;

/// One set of in-memory collaborators shared by both orchestrators.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackends {
    /// Certificate import service.
    pub certificates: Arc<InMemoryCertificateImporter>,
    /// Hierarchical parameter store.
    pub parameters: Arc<InMemoryParameterStore>,
    /// Endpoint directory.
    pub endpoints: Arc<InMemoryEndpointDirectory>,
    /// Secret-bundle store.
    pub bundles: Arc<InMemorySecretBundleStore>,
}

impl InMemoryBackends {
    /// Creates empty backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the authority orchestrator.
    pub fn authority(&self, config: &ProvisionerConfig) -> InMemoryAuthority {
        let policy = config.retry_policy();
        Orchestrator::new(AuthorityIssuance::new(
            CertificateGateway::new(Arc::clone(&self.certificates), policy.clone()),
            SecretGateway::new(Arc::clone(&self.parameters), config.namespace.clone(), policy),
        ))
    }

    /// Builds the profile orchestrator.
    pub fn profile(&self, config: &ProvisionerConfig) -> InMemoryProfile {
        let policy = config.retry_policy();
        Orchestrator::new(ProfileAssembly::new(
            EndpointResolver::with_available_status(
                Arc::clone(&self.endpoints),
                config.available_status.clone(),
            ),
            SecretGateway::new(
                Arc::clone(&self.parameters),
                config.namespace.clone(),
                policy.clone(),
            ),
            BundleGateway::new(Arc::clone(&self.bundles), policy),
        ))
    }
}
