//! # Configuration Store
//!
//! The Kubernetes API surface the provider needs, behind a trait so the
//! resolver and the usage tracker can be exercised without a cluster.
//!
//! `KubeStore` is the production implementation over `kube::Client`.
//! Every method is a single API round trip; dropping the returned future
//! cancels the request.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use thiserror::Error;
use tracing::debug;

use crate::constants::LABEL_KEY_PROVIDER_CONFIG;
use crate::crd::{ProviderConfig, ProviderConfigUsage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    fn from_kube(err: kube::Error, kind: &'static str, name: &str) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(api_err) if api_err.code == 409 => {
                StoreError::Conflict(api_err.message)
            }
            other => StoreError::Kube(other),
        }
    }
}

/// Read/write access to the objects the provider depends on
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Get a cluster-scoped ProviderConfig by name
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError>;

    /// Get a Secret by namespace and name
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;

    /// Get a ProviderConfigUsage by name, `None` when it does not exist
    async fn get_usage(&self, name: &str) -> Result<Option<ProviderConfigUsage>, StoreError>;

    /// Create a new ProviderConfigUsage
    async fn create_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError>;

    /// Replace an existing ProviderConfigUsage (resourceVersion must be set)
    async fn replace_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError>;

    /// List the usages labelled with the given ProviderConfig name
    async fn list_usages(
        &self,
        provider_config: &str,
    ) -> Result<Vec<ProviderConfigUsage>, StoreError>;
}

/// `ConfigStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn usages(&self) -> Api<ProviderConfigUsage> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl ConfigStore for KubeStore {
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError> {
        let api: Api<ProviderConfig> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, "ProviderConfig", name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, "Secret", &format!("{namespace}/{name}")))
    }

    async fn get_usage(&self, name: &str) -> Result<Option<ProviderConfigUsage>, StoreError> {
        self.usages()
            .get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(e, "ProviderConfigUsage", name))
    }

    async fn create_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        let name = usage.metadata.name.as_deref().unwrap_or_default();
        debug!("Creating ProviderConfigUsage {}", name);
        self.usages()
            .create(&PostParams::default(), usage)
            .await
            .map_err(|e| StoreError::from_kube(e, "ProviderConfigUsage", name))?;
        Ok(())
    }

    async fn replace_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        let name = usage.metadata.name.as_deref().unwrap_or_default();
        debug!("Replacing ProviderConfigUsage {}", name);
        self.usages()
            .replace(name, &PostParams::default(), usage)
            .await
            .map_err(|e| StoreError::from_kube(e, "ProviderConfigUsage", name))?;
        Ok(())
    }

    async fn list_usages(
        &self,
        provider_config: &str,
    ) -> Result<Vec<ProviderConfigUsage>, StoreError> {
        let params =
            ListParams::default().labels(&format!("{LABEL_KEY_PROVIDER_CONFIG}={provider_config}"));
        let list = self
            .usages()
            .list(&params)
            .await
            .map_err(|e| StoreError::from_kube(e, "ProviderConfigUsage", provider_config))?;
        Ok(list.items)
    }
}
