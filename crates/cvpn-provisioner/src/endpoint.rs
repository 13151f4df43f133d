//! Endpoint DNS resolution.

use tracing::{debug, warn};

use crate::clients::{EndpointDescriptor, EndpointDirectory};
use crate::error::{EndpointError, Result};

/// Status code of an endpoint that accepts connections.
pub const AVAILABLE_STATUS: &str = "available";

/// Picks the DNS name out of a lookup result.
///
/// Only the first descriptor is considered.
///
/// # Errors
///
/// Returns [`EndpointError::NoEndpoints`] for an empty result,
/// [`EndpointError::Unavailable`] if the status differs from
/// `available_status`, and [`EndpointError::MissingDns`] for an absent or
/// empty DNS name.
pub fn extract_dns(
    endpoints: &[EndpointDescriptor],
    available_status: &str,
) -> std::result::Result<String, EndpointError> {
    let endpoint = endpoints.first().ok_or(EndpointError::NoEndpoints)?;

    let status = endpoint.status_code();
    if status != Some(available_status) {
        return Err(EndpointError::Unavailable {
            status: status.map(str::to_string),
        });
    }

    match endpoint.dns_name.as_deref() {
        Some(dns) if !dns.is_empty() => Ok(dns.to_string()),
        _ => Err(EndpointError::MissingDns),
    }
}

/// Resolves endpoint ids to DNS names through an [`EndpointDirectory`].
#[derive(Debug)]
pub struct EndpointResolver<D> {
    directory: D,
    available_status: String,
}

impl<D: EndpointDirectory> EndpointResolver<D> {
    /// Creates a resolver using the `available` sentinel.
    pub fn new(directory: D) -> Self {
        Self::with_available_status(directory, AVAILABLE_STATUS)
    }

    /// Creates a resolver with a custom availability sentinel.
    pub fn with_available_status(directory: D, available_status: impl Into<String>) -> Self {
        Self {
            directory,
            available_status: available_status.into(),
        }
    }

    /// Looks up the endpoint and returns its DNS name.
    ///
    /// The lookup is not retried.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProvisionError::Endpoint`] on lookup failure or when
    /// [`extract_dns`] rejects the result.
    pub async fn resolve_dns(&self, endpoint_id: &str) -> Result<String> {
        let endpoints = self
            .directory
            .describe_endpoints(endpoint_id)
            .await
            .map_err(EndpointError::Lookup)?;

        match extract_dns(&endpoints, &self.available_status) {
            Ok(dns) => {
                debug!(endpoint_id, dns = %dns, "endpoint resolved");
                Ok(dns)
            }
            Err(e) => {
                warn!(endpoint_id, error = %e, "endpoint not usable");
                Err(e.into())
            }
        }
    }
}
