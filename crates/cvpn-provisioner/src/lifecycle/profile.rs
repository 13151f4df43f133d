//! Client profile assembly.
//!
//! Resolves the endpoint DNS name, reads the material stored by an earlier
//! authority issuance, renders the profile and stores it as a secret.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{parse_properties, LifecycleOperation, ResourceId};
use crate::clients::{EndpointDirectory, ParameterStoreClient, SecretBundleStore};
use crate::endpoint::EndpointResolver;
use crate::error::{ProvisionError, Result};
use crate::gateway::{BundleGateway, SecretGateway};
use crate::profile::{assemble, ProfileConfig};

/// Prefix of physical ids minted by [`ProfileAssembly`].
pub const PROFILE_PREFIX: &str = "ovpn-generator";

/// Input of the profile operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileProperties {
    /// Endpoint the profile connects to.
    #[serde(default, alias = "ClientVpnEndpointId")]
    pub endpoint_id: Option<String>,
    /// Physical id returned by the authority operation.
    #[serde(default, alias = "CertificateResourceId")]
    pub authority_resource_id: Option<String>,
    /// Transport settings.
    #[serde(default, alias = "Config")]
    pub config: Option<ProfileConfig>,
}

/// Output of the profile operation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    /// The rendered profile, including the client private key.
    pub profile_text: String,
    /// Reference of the stored profile secret.
    pub profile_secret_ref: String,
}

impl std::fmt::Debug for ProfileData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileData")
            .field("profile_text", &format_args!("<{} bytes>", self.profile_text.len()))
            .field("profile_secret_ref", &self.profile_secret_ref)
            .finish()
    }
}

/// The profile-assembly operation.
#[derive(Debug)]
pub struct ProfileAssembly<D, S, B> {
    resolver: EndpointResolver<D>,
    secrets: SecretGateway<S>,
    bundles: BundleGateway<B>,
}

impl<D, S, B> ProfileAssembly<D, S, B>
where
    D: EndpointDirectory,
    S: ParameterStoreClient,
    B: SecretBundleStore,
{
    /// Creates the operation from its collaborators.
    pub fn new(resolver: EndpointResolver<D>, secrets: SecretGateway<S>, bundles: BundleGateway<B>) -> Self {
        Self {
            resolver,
            secrets,
            bundles,
        }
    }

    async fn assemble_profile(&self, properties: serde_json::Value) -> Result<ProfileData> {
        let properties: ProfileProperties = parse_properties(properties)?;
        let config = properties
            .config
            .ok_or_else(|| ProvisionError::missing_config("config", "protocol"))?;
        let endpoint_id = properties
            .endpoint_id
            .ok_or_else(|| ProvisionError::Config("missing endpointId in resource properties".into()))?;
        let authority_id = properties.authority_resource_id.ok_or_else(|| {
            ProvisionError::Config("missing authorityResourceId in resource properties".into())
        })?;

        let dns = self.resolver.resolve_dns(&endpoint_id).await?;
        let material = self.secrets.fetch_client_material(&authority_id).await?;

        let profile_text = assemble(
            &dns,
            &config,
            &material.ca_certificate,
            &material.client_certificate,
            &material.client_private_key,
        );
        info!(
            endpoint_id = %endpoint_id,
            authority_id = %authority_id,
            protocol = %config.protocol,
            split_tunnel = config.split_tunnel,
            "client profile assembled"
        );

        let stored = self.bundles.store_profile(&endpoint_id, &profile_text).await?;

        Ok(ProfileData {
            profile_text,
            profile_secret_ref: stored.reference,
        })
    }
}

impl<D, S, B> LifecycleOperation for ProfileAssembly<D, S, B>
where
    D: EndpointDirectory,
    S: ParameterStoreClient,
    B: SecretBundleStore,
{
    type Data = ProfileData;

    fn prefix(&self) -> &'static str {
        PROFILE_PREFIX
    }

    async fn execute(&self, properties: serde_json::Value, _resource_id: &ResourceId) -> Result<ProfileData> {
        self.assemble_profile(properties).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::EndpointDescriptor;
    use crate::error::ErrorKind;
    use crate::lifecycle::{LifecycleEvent, LifecycleKind, LifecycleStatus, Orchestrator};
    use crate::retry::RetryPolicy;
    use crate::testing::{sample_batch, FakeBundleStore, FakeDirectory, FakeParameterStore};
    use serde_json::json;

    type Assembly = ProfileAssembly<FakeDirectory, FakeParameterStore, FakeBundleStore>;

    struct Fixture {
        directory: FakeDirectory,
        store: FakeParameterStore,
        bundles: FakeBundleStore,
    }

    impl Fixture {
        async fn new(status: &str) -> Self {
            let store = FakeParameterStore::new();
            SecretGateway::new(store.clone(), "/vpn", RetryPolicy::default())
                .store_authority_material("certificate-generator-1", sample_batch())
                .await
                .unwrap();
            Self {
                directory: FakeDirectory::new().with_endpoint(EndpointDescriptor::new(
                    "cvpn-endpoint-1",
                    "cvpn-endpoint-1.prod.clientvpn.example.com",
                    status,
                )),
                store,
                bundles: FakeBundleStore::new(),
            }
        }

        fn orchestrator(&self) -> Orchestrator<Assembly> {
            Orchestrator::new(ProfileAssembly::new(
                EndpointResolver::new(self.directory.clone()),
                SecretGateway::new(self.store.clone(), "/vpn", RetryPolicy::default()),
                BundleGateway::new(self.bundles.clone(), RetryPolicy::default()),
            ))
        }
    }

    fn create(split_tunnel: bool) -> LifecycleEvent {
        LifecycleEvent::new(
            LifecycleKind::Create,
            json!({
                "endpointId": "cvpn-endpoint-1",
                "authorityResourceId": "certificate-generator-1",
                "config": {
                    "clientCidr": "10.100.0.0/16",
                    "serverPort": 443,
                    "protocol": "udp",
                    "splitTunnel": split_tunnel
                }
            }),
        )
    }

    #[tokio::test]
    async fn create_renders_and_stores_profile() {
        let fixture = Fixture::new("available").await;

        let result = fixture.orchestrator().handle(create(false)).await;

        assert_eq!(result.status, LifecycleStatus::Succeeded, "{:?}", result.reason);
        assert!(result.physical_id.starts_with("ovpn-generator-"));
        let data = result.data.unwrap();
        let batch = sample_batch();
        assert!(data.profile_text.contains("remote cvpn-endpoint-1.prod.clientvpn.example.com 443"));
        assert!(data.profile_text.contains("redirect-gateway def1"));
        assert!(data.profile_text.contains(&batch.client.material.private_key_pem()));
        assert!(data.profile_text.contains(&batch.authority.certificate_pem()));

        let name = data.profile_secret_ref.trim_start_matches("fake:secret/");
        let (stored, _) = fixture.bundles.get(name).unwrap();
        assert_eq!(stored, data.profile_text);
    }

    #[tokio::test]
    async fn split_tunnel_omits_redirect() {
        let fixture = Fixture::new("available").await;
        let result = fixture.orchestrator().handle(create(true)).await;
        assert!(!result.data.unwrap().profile_text.contains("redirect-gateway"));
    }

    #[tokio::test]
    async fn pending_endpoint_fails_with_status_text() {
        let fixture = Fixture::new("pending-associate").await;

        let result = fixture.orchestrator().handle(create(true)).await;

        assert_eq!(result.status, LifecycleStatus::Failed);
        assert_eq!(result.physical_id, "ovpn-generator-failed");
        assert_eq!(
            result.reason.as_deref(),
            Some("Client VPN endpoint is not available. Current status: pending-associate")
        );
        assert_eq!(result.error_kind, Some(ErrorKind::Endpoint));
        assert_eq!(fixture.bundles.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_authority_is_a_read_error() {
        let fixture = Fixture::new("available").await;
        let mut event = create(true);
        event.properties["authorityResourceId"] = json!("certificate-generator-2");

        let result = fixture.orchestrator().handle(event).await;

        assert_eq!(result.error_kind, Some(ErrorKind::SecretRead));
        assert_eq!(fixture.bundles.calls(), 0);
    }

    #[tokio::test]
    async fn missing_properties_are_config_errors() {
        let fixture = Fixture::new("available").await;

        let result = fixture
            .orchestrator()
            .handle(LifecycleEvent::new(LifecycleKind::Create, serde_json::Value::Null))
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Config));
        assert_eq!(fixture.directory.calls(), 0);
    }

    #[tokio::test]
    async fn delete_touches_nothing() {
        let fixture = Fixture::new("available").await;

        let result = fixture
            .orchestrator()
            .handle(LifecycleEvent::new(LifecycleKind::Delete, json!({})).with_physical_id("ovpn-generator-7"))
            .await;

        assert!(result.is_success());
        assert_eq!(result.physical_id, "ovpn-generator-7");
        assert_eq!(fixture.directory.calls(), 0);
        assert_eq!(fixture.bundles.calls(), 0);
    }

    #[test]
    fn properties_accept_pascal_case_keys() {
        let properties: ProfileProperties = serde_json::from_value(json!({
            "ClientVpnEndpointId": "cvpn-endpoint-1",
            "CertificateResourceId": "certificate-generator-1",
            "Config": {"clientCidr": "10.0.0.0/16", "serverPort": 443, "protocol": "tcp", "splitTunnel": false}
        }))
        .unwrap();
        assert_eq!(properties.endpoint_id.as_deref(), Some("cvpn-endpoint-1"));
        assert_eq!(properties.authority_resource_id.as_deref(), Some("certificate-generator-1"));
    }
}
