//! Common test utilities for resolver and tracker tests
//!
//! Provides an in-memory `ConfigStore` that records every call, and a
//! minimal managed resource.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;

use provider_tailscale::crd::{
    CommonCredentialSelectors, CredentialsSource, ProviderConfig, ProviderConfigSpec,
    ProviderConfigUsage, ProviderCredentials, Reference, SecretKeySelector, TypedReference,
};
use provider_tailscale::resource::Managed;
use provider_tailscale::store::{ConfigStore, StoreError};

pub const CREDS_NAMESPACE: &str = "crossplane-system";
pub const CREDS_SECRET: &str = "tailscale-creds";
pub const CREDS_KEY: &str = "credentials";

/// Store calls, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetProviderConfig(String),
    GetSecret(String, String),
    GetUsage(String),
    CreateUsage(String),
    ReplaceUsage(String),
    ListUsages(String),
}

#[derive(Debug, Default)]
pub struct MockStore {
    pub provider_configs: HashMap<String, ProviderConfig>,
    pub secrets: HashMap<(String, String), Secret>,
    pub usages: Mutex<HashMap<String, ProviderConfigUsage>>,
    pub calls: Mutex<Vec<Call>>,
    /// When set, usage writes fail with a conflict
    pub fail_usage_writes: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a Secret-sourced ProviderConfig named `default`
    /// whose secret holds `payload`
    pub fn with_secret_payload(payload: &[u8]) -> Self {
        let mut store = Self::new();
        store.add_provider_config(secret_provider_config("default"));
        store.add_secret(CREDS_NAMESPACE, CREDS_SECRET, CREDS_KEY, payload);
        store
    }

    pub fn add_provider_config(&mut self, pc: ProviderConfig) {
        let name = pc.metadata.name.clone().unwrap_or_default();
        self.provider_configs.insert(name, pc);
    }

    pub fn add_secret(&mut self, namespace: &str, name: &str, key: &str, value: &[u8]) {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(key.to_string(), ByteString(value.to_vec()))])),
            ..Default::default()
        };
        self.secrets
            .insert((namespace.to_string(), name.to_string()), secret);
    }

    pub fn add_usage(&self, usage: ProviderConfigUsage) {
        let name = usage.metadata.name.clone().unwrap_or_default();
        self.usages.lock().unwrap().insert(name, usage);
    }

    pub fn usage(&self, name: &str) -> Option<ProviderConfigUsage> {
        self.usages.lock().unwrap().get(name).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ConfigStore for MockStore {
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError> {
        self.record(Call::GetProviderConfig(name.to_string()));
        self.provider_configs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "ProviderConfig",
                name: name.to_string(),
            })
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        self.record(Call::GetSecret(namespace.to_string(), name.to_string()));
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Secret",
                name: format!("{namespace}/{name}"),
            })
    }

    async fn get_usage(&self, name: &str) -> Result<Option<ProviderConfigUsage>, StoreError> {
        self.record(Call::GetUsage(name.to_string()));
        Ok(self.usage(name))
    }

    async fn create_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        let name = usage.metadata.name.clone().unwrap_or_default();
        self.record(Call::CreateUsage(name.clone()));
        if self.fail_usage_writes {
            return Err(StoreError::Conflict(format!("usage {name} is locked")));
        }
        self.usages.lock().unwrap().insert(name, usage.clone());
        Ok(())
    }

    async fn replace_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        let name = usage.metadata.name.clone().unwrap_or_default();
        self.record(Call::ReplaceUsage(name.clone()));
        if self.fail_usage_writes {
            return Err(StoreError::Conflict(format!("usage {name} is locked")));
        }
        self.usages.lock().unwrap().insert(name, usage.clone());
        Ok(())
    }

    async fn list_usages(
        &self,
        provider_config: &str,
    ) -> Result<Vec<ProviderConfigUsage>, StoreError> {
        self.record(Call::ListUsages(provider_config.to_string()));
        Ok(self
            .usages
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.spec.provider_config_ref.name == provider_config)
            .cloned()
            .collect())
    }
}

/// A ProviderConfig reading credentials from the shared test secret
pub fn secret_provider_config(name: &str) -> ProviderConfig {
    provider_config(
        name,
        CredentialsSource::Secret,
        CommonCredentialSelectors {
            secret_ref: Some(SecretKeySelector {
                name: CREDS_SECRET.to_string(),
                namespace: CREDS_NAMESPACE.to_string(),
                key: CREDS_KEY.to_string(),
            }),
            ..Default::default()
        },
    )
}

pub fn provider_config(
    name: &str,
    source: CredentialsSource,
    selectors: CommonCredentialSelectors,
) -> ProviderConfig {
    ProviderConfig::new(
        name,
        ProviderConfigSpec {
            credentials: ProviderCredentials { source, selectors },
        },
    )
}

/// A managed resource with a fixed identity
#[derive(Debug, Clone)]
pub struct TestManaged {
    pub provider_config_ref: Option<Reference>,
    pub uid: Option<String>,
}

pub const MANAGED_UID: &str = "3f1c9a52-7d0e-4b8f-9a61-2c5e8d7b4f10";

impl TestManaged {
    pub fn referencing(name: &str) -> Self {
        Self {
            provider_config_ref: Some(Reference::new(name)),
            uid: Some(MANAGED_UID.to_string()),
        }
    }

    pub fn unreferenced() -> Self {
        Self {
            provider_config_ref: None,
            uid: Some(MANAGED_UID.to_string()),
        }
    }
}

impl Managed for TestManaged {
    fn provider_config_reference(&self) -> Option<Reference> {
        self.provider_config_ref.clone()
    }

    fn typed_reference(&self) -> TypedReference {
        TypedReference {
            api_version: "tailnet.tailscale.upbound.io/v1alpha1".to_string(),
            kind: "DNSNameservers".to_string(),
            name: "nameservers".to_string(),
            uid: self.uid.clone(),
        }
    }
}

/// An existing usage for `uid`, controlled by `controller_uid`
pub fn existing_usage(uid: &str, provider_config: &str, controller_uid: &str) -> ProviderConfigUsage {
    let mut usage = ProviderConfigUsage::new(
        uid,
        provider_tailscale::crd::ProviderConfigUsageSpec {
            provider_config_ref: Reference::new(provider_config),
            resource_ref: TestManaged::referencing(provider_config).typed_reference(),
        },
    );
    usage.metadata.resource_version = Some("42".to_string());
    usage.metadata.owner_references = Some(vec![OwnerReference {
        api_version: "tailnet.tailscale.upbound.io/v1alpha1".to_string(),
        kind: "DNSNameservers".to_string(),
        name: "nameservers".to_string(),
        uid: controller_uid.to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]);
    usage
}
