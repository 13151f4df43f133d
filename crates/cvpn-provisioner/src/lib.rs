//! Lifecycle orchestration for client VPN provisioning.
#![forbid(unsafe_code)]
//!
//! Two independently triggered operations share this crate:
//!
//! - **Authority issuance** generates a CA with server and client leaves,
//!   imports all three certificates and stores the CA and client material
//!   under `<namespace>/<resourceId>/<artifact>`.
//! - **Profile assembly** resolves an endpoint's DNS name, reads that
//!   material back by resource id, renders a client profile and stores it.
//!
//! Both run behind an [`Orchestrator`] that turns Create/Update/Delete
//! events into a [`LifecycleResult`] and never lets a fault escape.
//!
//! # Example
//!
//! ```no_run
//! use cvpn_provisioner::{
//!     EndpointDescriptor, InMemoryBackends, LifecycleEvent, LifecycleKind, ProvisionerConfig,
//! };
//! use serde_json::json;
//!
//! # async fn run() {
//! let config = ProvisionerConfig::default();
//! let backends = InMemoryBackends::new();
//! backends
//!     .endpoints
//!     .register(EndpointDescriptor::new("cvpn-endpoint-1", "vpn.example.com", "available"));
//!
//! let issued = backends
//!     .authority(&config)
//!     .handle(LifecycleEvent::new(
//!         LifecycleKind::Create,
//!         json!({ "config": {
//!             "organizationName": "VPN Organization", "organizationalUnit": "IT",
//!             "country": "US", "state": "California", "city": "San Francisco",
//!             "keySize": 2048, "validityPeriodDays": 365
//!         }}),
//!     ))
//!     .await;
//!
//! let profile = backends
//!     .profile(&config)
//!     .handle(LifecycleEvent::new(
//!         LifecycleKind::Create,
//!         json!({
//!             "endpointId": "cvpn-endpoint-1",
//!             "authorityResourceId": issued.physical_id,
//!             "config": { "clientCidr": "10.100.0.0/16", "serverPort": 443,
//!                         "protocol": "udp", "splitTunnel": true }
//!         }),
//!     ))
//!     .await;
//! assert!(profile.is_success());
//! # }
//! ```

pub mod clients;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod memory;
pub mod profile;
pub mod retry;

#[cfg(test)]
mod testing;

pub use clients::{
    CertificateImporter, EndpointDescriptor, EndpointDirectory, EndpointStatus,
    ParameterStoreClient, SecretBundleStore,
};
pub use config::{ProvisionerConfig, RetrySettings};
pub use endpoint::{extract_dns, EndpointResolver};
pub use error::{EndpointError, ErrorKind, ProvisionError, Result, ServiceError, ServiceErrorKind};
pub use gateway::{Artifact, BundleGateway, CertificateGateway, ClientMaterial, SecretGateway};
pub use lifecycle::{
    AuthorityData, AuthorityIssuance, LifecycleEvent, LifecycleKind, LifecycleOperation,
    LifecycleResult, LifecycleState, LifecycleStatus, Orchestrator, ProfileAssembly, ProfileData,
    ResourceId,
};
pub use memory::InMemoryBackends;
pub use profile::{assemble, ProfileConfig, Protocol};
pub use retry::{retry_with_backoff, RetryPolicy};
