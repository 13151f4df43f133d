//! Lifecycle event handling.
//!
//! An [`Orchestrator`] maps Create/Update/Delete events onto a
//! [`LifecycleOperation`] and always answers with a [`LifecycleResult`]:
//!
//! ```text
//! Received ──Delete──────────────────────────▶ Succeeded
//!    │
//!    └─Create/Update─▶ Processing ─┬─ ok ────▶ Succeeded
//!                                  └─ fault ─▶ Failed
//! ```

pub mod authority;
pub mod profile;

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{ErrorKind, ProvisionError, Result};

pub use authority::{AuthorityData, AuthorityIssuance, AuthorityProperties};
pub use profile::{ProfileAssembly, ProfileData, ProfileProperties};

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleKind {
    /// First provisioning.
    Create,
    /// Reprovisioning; handled exactly like Create.
    Update,
    /// Teardown; never touches stored material.
    Delete,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("Create"),
            Self::Update => f.write_str("Update"),
            Self::Delete => f.write_str("Delete"),
        }
    }
}

/// An incoming lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    /// What to do.
    #[serde(alias = "RequestType")]
    pub kind: LifecycleKind,
    /// Physical id returned by an earlier event for the same resource.
    #[serde(default, alias = "PhysicalResourceId", skip_serializing_if = "Option::is_none")]
    pub physical_id: Option<String>,
    /// Operation-specific input.
    #[serde(default, alias = "ResourceProperties")]
    pub properties: serde_json::Value,
}

impl LifecycleEvent {
    /// Creates an event with no prior physical id.
    pub fn new(kind: LifecycleKind, properties: serde_json::Value) -> Self {
        Self {
            kind,
            physical_id: None,
            properties,
        }
    }

    /// Sets the prior physical id.
    #[must_use]
    pub fn with_physical_id(mut self, physical_id: impl Into<String>) -> Self {
        self.physical_id = Some(physical_id.into());
        self
    }
}

/// Processing state of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Event accepted, nothing done yet.
    Received,
    /// Operation running.
    Processing,
    /// Finished successfully.
    Succeeded,
    /// Finished with a fault.
    Failed,
}

impl LifecycleState {
    /// Terminal states accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if `next` may follow `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Processing | Self::Succeeded)
                | (Self::Processing, Self::Succeeded | Self::Failed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("Received"),
            Self::Processing => f.write_str("Processing"),
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// Final outcome reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleStatus {
    /// The event was handled.
    Succeeded,
    /// The operation failed; see `reason`.
    Failed,
}

/// Structured answer to a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleResult<D> {
    /// Outcome.
    pub status: LifecycleStatus,
    /// Physical id the caller should remember.
    pub physical_id: String,
    /// Fault message for failed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Fault class for failed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Operation output for successful Create/Update events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<D>,
}

impl<D> LifecycleResult<D> {
    fn succeeded(physical_id: String, data: Option<D>) -> Self {
        Self {
            status: LifecycleStatus::Succeeded,
            physical_id,
            reason: None,
            error_kind: None,
            data,
        }
    }

    fn failed(physical_id: String, err: &ProvisionError) -> Self {
        Self {
            status: LifecycleStatus::Failed,
            physical_id,
            reason: Some(err.to_string()),
            error_kind: Some(err.kind()),
            data: None,
        }
    }

    /// Returns true for [`LifecycleStatus::Succeeded`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == LifecycleStatus::Succeeded
    }
}

/// A physical id of the form `<prefix>-<unixMillis>-<8 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Mints a new id.
    ///
    /// The suffix comes from a process-wide sequence that starts at a random
    /// offset, so ids minted within one process never repeat, even within
    /// the same millisecond.
    pub fn mint(prefix: &str) -> Self {
        static NEXT_TOKEN: LazyLock<AtomicU32> =
            LazyLock::new(|| AtomicU32::new(uuid::Uuid::new_v4().as_u128() as u32));

        let millis = chrono::Utc::now().timestamp_millis();
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        Self(format!("{prefix}-{millis}-{token:08x}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The work done for Create and Update events.
pub trait LifecycleOperation: Send + Sync {
    /// Output attached to successful results.
    type Data: Serialize + Send;

    /// Prefix of minted physical ids and placeholders.
    fn prefix(&self) -> &'static str;

    /// Runs the operation. `resource_id` becomes the physical id on success.
    fn execute(
        &self,
        properties: serde_json::Value,
        resource_id: &ResourceId,
    ) -> impl Future<Output = Result<Self::Data>> + Send;
}

/// Parses operation properties. A null value parses as the default.
///
/// # Errors
///
/// Returns [`ProvisionError::Config`] if the value has the wrong shape.
pub fn parse_properties<T: DeserializeOwned + Default>(value: serde_json::Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value)
        .map_err(|e| ProvisionError::Config(format!("invalid resource properties: {e}")))
}

/// Turns lifecycle events into results for one operation.
#[derive(Debug)]
pub struct Orchestrator<O> {
    operation: O,
}

impl<O: LifecycleOperation> Orchestrator<O> {
    /// Creates an orchestrator for the operation.
    pub fn new(operation: O) -> Self {
        Self { operation }
    }

    /// Returns the wrapped operation.
    pub fn operation(&self) -> &O {
        &self.operation
    }

    /// Handles one event. Never fails and never panics past this call.
    pub async fn handle(&self, event: LifecycleEvent) -> LifecycleResult<O::Data> {
        let prefix = self.operation.prefix();
        let kind = event.kind;
        info!(operation = prefix, %kind, state = %LifecycleState::Received, "lifecycle event received");

        if kind == LifecycleKind::Delete {
            let physical_id = event
                .physical_id
                .unwrap_or_else(|| format!("{prefix}-deleted"));
            transition(prefix, kind, LifecycleState::Received, LifecycleState::Succeeded, &physical_id);
            return LifecycleResult::succeeded(physical_id, None);
        }

        let resource_id = ResourceId::mint(prefix);
        transition(prefix, kind, LifecycleState::Received, LifecycleState::Processing, resource_id.as_str());

        let outcome = AssertUnwindSafe(self.operation.execute(event.properties, &resource_id))
            .catch_unwind()
            .await
            .unwrap_or(Err(ProvisionError::Unknown));

        match outcome {
            Ok(data) => {
                let physical_id = resource_id.into_string();
                transition(prefix, kind, LifecycleState::Processing, LifecycleState::Succeeded, &physical_id);
                LifecycleResult::succeeded(physical_id, Some(data))
            }
            Err(err) => {
                let physical_id = event
                    .physical_id
                    .unwrap_or_else(|| format!("{prefix}-failed"));
                error!(
                    operation = prefix,
                    %kind,
                    error_kind = ?err.kind(),
                    reason = %err,
                    "lifecycle operation failed"
                );
                transition(prefix, kind, LifecycleState::Processing, LifecycleState::Failed, &physical_id);
                LifecycleResult::failed(physical_id, &err)
            }
        }
    }
}

fn transition(
    operation: &str,
    kind: LifecycleKind,
    from: LifecycleState,
    to: LifecycleState,
    physical_id: &str,
) {
    debug_assert!(from.can_transition_to(to));
    info!(operation, %kind, %from, %to, physical_id, "lifecycle transition");
}
