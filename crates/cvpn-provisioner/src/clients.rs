//! Interfaces of the external services the provisioner talks to.
//!
//! Each trait is injected into the gateway that wraps it. Implementations
//! report failures as [`ServiceError`] so the gateways can decide what to
//! retry.

use std::future::Future;
use std::sync::Arc;

use cvpn_secrets::ParameterName;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// A certificate-management service that accepts PEM certificate/key pairs.
pub trait CertificateImporter: Send + Sync {
    /// Imports a certificate and its private key, returning an opaque reference.
    fn import_certificate(
        &self,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// A hierarchical parameter store.
pub trait ParameterStoreClient: Send + Sync {
    /// Writes a value. Sensitive values are encrypted at rest.
    fn put_parameter(
        &self,
        name: &ParameterName,
        value: &str,
        sensitive: bool,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Reads a value, decrypting sensitive values only when asked to.
    fn get_parameter(
        &self,
        name: &ParameterName,
        decrypt: bool,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// Status reported for an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    /// Status code such as `available` or `pending-associate`.
    pub code: Option<String>,
    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One entry of an endpoint lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    /// Endpoint identifier.
    pub endpoint_id: String,
    /// DNS name clients connect to.
    #[serde(default)]
    pub dns_name: Option<String>,
    /// Current status.
    #[serde(default)]
    pub status: Option<EndpointStatus>,
}

impl EndpointDescriptor {
    /// Creates a descriptor with a DNS name and status code.
    pub fn new(
        endpoint_id: impl Into<String>,
        dns_name: impl Into<String>,
        status_code: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            dns_name: Some(dns_name.into()),
            status: Some(EndpointStatus {
                code: Some(status_code.into()),
                message: None,
            }),
        }
    }

    /// Returns the status code, if one was reported.
    #[must_use]
    pub fn status_code(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.code.as_deref())
    }
}

/// A service that describes network endpoints by id.
pub trait EndpointDirectory: Send + Sync {
    /// Looks up endpoints matching the id.
    fn describe_endpoints(
        &self,
        endpoint_id: &str,
    ) -> impl Future<Output = Result<Vec<EndpointDescriptor>, ServiceError>> + Send;
}

/// A store for named text secrets.
pub trait SecretBundleStore: Send + Sync {
    /// Creates a new secret, returning an opaque reference.
    fn create_secret(
        &self,
        name: &str,
        contents: &str,
        description: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

impl<T: CertificateImporter> CertificateImporter for Arc<T> {
    async fn import_certificate(
        &self,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<String, ServiceError> {
        (**self)
            .import_certificate(certificate_pem, private_key_pem)
            .await
    }
}

impl<T: ParameterStoreClient> ParameterStoreClient for Arc<T> {
    async fn put_parameter(
        &self,
        name: &ParameterName,
        value: &str,
        sensitive: bool,
    ) -> Result<(), ServiceError> {
        (**self).put_parameter(name, value, sensitive).await
    }

    async fn get_parameter(&self, name: &ParameterName, decrypt: bool) -> Result<String, ServiceError> {
        (**self).get_parameter(name, decrypt).await
    }
}

impl<T: EndpointDirectory> EndpointDirectory for Arc<T> {
    async fn describe_endpoints(
        &self,
        endpoint_id: &str,
    ) -> Result<Vec<EndpointDescriptor>, ServiceError> {
        (**self).describe_endpoints(endpoint_id).await
    }
}

impl<T: SecretBundleStore> SecretBundleStore for Arc<T> {
    async fn create_secret(
        &self,
        name: &str,
        contents: &str,
        description: &str,
    ) -> Result<String, ServiceError> {
        (**self).create_secret(name, contents, description).await
    }
}
