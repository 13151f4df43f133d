//! Storage of rendered client profiles.

use tracing::info;

use crate::clients::SecretBundleStore;
use crate::error::{ProvisionError, Result};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Name and reference of a stored profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBundle {
    /// Secret name the profile was stored under.
    pub name: String,
    /// Opaque reference returned by the store.
    pub reference: String,
}

/// Writes finished profiles to the secret-bundle store.
#[derive(Debug)]
pub struct BundleGateway<B> {
    store: B,
    policy: RetryPolicy,
}

impl<B: SecretBundleStore> BundleGateway<B> {
    /// Creates a gateway over the given store.
    pub fn new(store: B, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Stores a profile as `vpn-config-<endpointId>-<unixMillis>`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::SecretWrite`] once retries are exhausted.
    pub async fn store_profile(&self, endpoint_id: &str, profile: &str) -> Result<StoredBundle> {
        let name = format!(
            "vpn-config-{endpoint_id}-{}",
            chrono::Utc::now().timestamp_millis()
        );
        let description = format!("OpenVPN configuration for Client VPN endpoint {endpoint_id}");

        let reference = retry_with_backoff(&self.policy, "create_secret", || {
            self.store.create_secret(&name, profile, &description)
        })
        .await
        .map_err(ProvisionError::SecretWrite)?;

        info!(secret = %name, reference = %reference, "client profile stored");
        Ok(StoredBundle { name, reference })
    }
}
