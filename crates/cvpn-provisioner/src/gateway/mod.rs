//! Retrying gateways in front of the external stores.

pub mod bundles;
pub mod certificates;
pub mod parameters;

pub use bundles::{BundleGateway, StoredBundle};
pub use certificates::{CertificateGateway, ImportedBatch};
pub use parameters::{Artifact, ClientMaterial, SecretGateway};
