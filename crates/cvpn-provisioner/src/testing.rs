//! Fake collaborators shared by unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use cvpn_pki::{generate_batch, Certificate, CertificateBatch, CertificateConfig};
use cvpn_secrets::ParameterName;

use crate::clients::{
    CertificateImporter, EndpointDescriptor, EndpointDirectory, ParameterStoreClient,
    SecretBundleStore,
};
use crate::error::ServiceError;

/// One batch per test binary; RSA generation is slow.
pub fn sample_batch() -> &'static CertificateBatch {
    static BATCH: OnceLock<CertificateBatch> = OnceLock::new();
    BATCH.get_or_init(|| {
        generate_batch(&CertificateConfig {
            organization_name: "Test Organization".into(),
            organizational_unit: "IT Department".into(),
            country: "US".into(),
            state: "California".into(),
            city: "San Francisco".into(),
            key_size: 2048,
            validity_period_days: 365,
        })
        .expect("sample batch")
    })
}

#[derive(Default)]
struct ImporterState {
    calls: u32,
    failures_left: u32,
    failure: Option<ServiceError>,
    failing_subject: Option<(String, ServiceError)>,
    subjects: Vec<String>,
}

/// Records imports; can fail a fixed number of times first.
#[derive(Clone, Default)]
pub struct FakeImporter {
    state: Arc<Mutex<ImporterState>>,
}

impl FakeImporter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_times(self, times: u32, error: ServiceError) -> Self {
        {
            let mut state = self.state.lock().expect("lock");
            state.failures_left = times;
            state.failure = Some(error);
        }
        self
    }

    /// Fails every import of a certificate whose subject CN is `subject`.
    #[must_use]
    pub fn fail_subject(self, subject: &str, error: ServiceError) -> Self {
        self.state.lock().expect("lock").failing_subject = Some((subject.to_string(), error));
        self
    }

    pub fn calls(&self) -> u32 {
        self.state.lock().expect("lock").calls
    }

    pub fn imported_subjects(&self) -> Vec<String> {
        self.state.lock().expect("lock").subjects.clone()
    }
}

impl CertificateImporter for FakeImporter {
    async fn import_certificate(
        &self,
        certificate_pem: &str,
        _private_key_pem: &str,
    ) -> Result<String, ServiceError> {
        let mut state = self.state.lock().expect("lock");
        state.calls += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            if let Some(error) = state.failure.clone() {
                return Err(error);
            }
        }
        let subject = Certificate::from_pem(certificate_pem)
            .map_err(|e| ServiceError::permanent(e.to_string()))?
            .subject()
            .to_string();
        if let Some((failing, error)) = &state.failing_subject {
            if *failing == subject {
                return Err(error.clone());
            }
        }
        state.subjects.push(subject);
        Ok(format!("fake:acm/{}", state.subjects.len()))
    }
}

#[derive(Default)]
struct ParameterState {
    values: BTreeMap<String, (String, bool)>,
    failing_suffix: Option<(String, ServiceError)>,
}

/// A parameter store kept in a map. Sensitive values read without decrypt
/// come back masked.
#[derive(Clone, Default)]
pub struct FakeParameterStore {
    state: Arc<Mutex<ParameterState>>,
}

impl FakeParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every write to a name ending in `suffix`.
    #[must_use]
    pub fn fail_writes_to(self, suffix: &str, error: ServiceError) -> Self {
        self.state.lock().expect("lock").failing_suffix = Some((suffix.to_string(), error));
        self
    }

    /// Names written so far with their sensitivity flag.
    pub fn written(&self) -> Vec<(String, bool)> {
        self.state
            .lock()
            .expect("lock")
            .values
            .iter()
            .map(|(name, (_, sensitive))| (name.clone(), *sensitive))
            .collect()
    }
}

impl ParameterStoreClient for FakeParameterStore {
    async fn put_parameter(
        &self,
        name: &ParameterName,
        value: &str,
        sensitive: bool,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().expect("lock");
        if let Some((suffix, error)) = &state.failing_suffix {
            if name.as_str().ends_with(suffix.as_str()) {
                return Err(error.clone());
            }
        }
        if state.values.contains_key(name.as_str()) {
            return Err(ServiceError::permanent(format!("parameter already exists: {name}")));
        }
        state
            .values
            .insert(name.to_string(), (value.to_string(), sensitive));
        Ok(())
    }

    async fn get_parameter(&self, name: &ParameterName, decrypt: bool) -> Result<String, ServiceError> {
        let state = self.state.lock().expect("lock");
        match state.values.get(name.as_str()) {
            Some((_, true)) if !decrypt => Ok("[ENCRYPTED]".to_string()),
            Some((value, _)) => Ok(value.clone()),
            None => Err(ServiceError::permanent(format!("parameter not found: {name}"))),
        }
    }
}

#[derive(Default)]
struct DirectoryState {
    endpoints: Vec<EndpointDescriptor>,
    failure: Option<ServiceError>,
    calls: u32,
}

/// An endpoint directory over a fixed list.
#[derive(Clone, Default)]
pub struct FakeDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_endpoint(self, endpoint: EndpointDescriptor) -> Self {
        self.state.lock().expect("lock").endpoints.push(endpoint);
        self
    }

    #[must_use]
    pub fn failing(self, error: ServiceError) -> Self {
        self.state.lock().expect("lock").failure = Some(error);
        self
    }

    pub fn calls(&self) -> u32 {
        self.state.lock().expect("lock").calls
    }
}

impl EndpointDirectory for FakeDirectory {
    async fn describe_endpoints(&self, endpoint_id: &str) -> Result<Vec<EndpointDescriptor>, ServiceError> {
        let mut state = self.state.lock().expect("lock");
        state.calls += 1;
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        Ok(state
            .endpoints
            .iter()
            .filter(|e| e.endpoint_id == endpoint_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct BundleState {
    secrets: BTreeMap<String, (String, String)>,
    failure: Option<ServiceError>,
    calls: u32,
}

/// A secret-bundle store kept in a map.
#[derive(Clone, Default)]
pub struct FakeBundleStore {
    state: Arc<Mutex<BundleState>>,
}

impl FakeBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(self, error: ServiceError) -> Self {
        self.state.lock().expect("lock").failure = Some(error);
        self
    }

    pub fn calls(&self) -> u32 {
        self.state.lock().expect("lock").calls
    }

    /// Contents and description of a stored secret.
    pub fn get(&self, name: &str) -> Option<(String, String)> {
        self.state.lock().expect("lock").secrets.get(name).cloned()
    }
}

impl SecretBundleStore for FakeBundleStore {
    async fn create_secret(
        &self,
        name: &str,
        contents: &str,
        description: &str,
    ) -> Result<String, ServiceError> {
        let mut state = self.state.lock().expect("lock");
        state.calls += 1;
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        state
            .secrets
            .insert(name.to_string(), (contents.to_string(), description.to_string()));
        Ok(format!("fake:secret/{name}"))
    }
}
