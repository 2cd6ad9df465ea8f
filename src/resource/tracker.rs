//! # ProviderConfig Usage Tracking
//!
//! Records which managed resources depend on which ProviderConfig by keeping
//! one `ProviderConfigUsage` per managed resource. The ProviderConfig
//! controller counts these to decide whether a config may be deleted.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::ObjectMeta;
use thiserror::Error;
use tracing::debug;

use crate::constants::LABEL_KEY_PROVIDER_CONFIG;
use crate::crd::{ProviderConfigUsage, ProviderConfigUsageSpec, Reference};
use crate::resource::Managed;
use crate::store::{ConfigStore, StoreError};

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("managed resource is not using a provider config")]
    MissingReference,
    #[error("managed resource {0:?} has no UID")]
    MissingUid(String),
    #[error("cannot apply ProviderConfigUsage: existing object is not controlled by UID {0:?}")]
    NotControllable(String),
    #[error("cannot apply ProviderConfigUsage: {0}")]
    Apply(#[from] StoreError),
}

/// Tracks ProviderConfig usage through a [`ConfigStore`]
#[derive(Debug)]
pub struct ProviderConfigUsageTracker<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ProviderConfigUsageTracker<'a, S>
where
    S: ConfigStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Ensure a usage exists recording that `mg` uses its ProviderConfig.
    ///
    /// An existing usage is only rewritten when it points at a different
    /// ProviderConfig, and never when another resource controls it.
    pub async fn track(&self, mg: &dyn Managed) -> Result<(), TrackError> {
        let reference = mg
            .provider_config_reference()
            .ok_or(TrackError::MissingReference)?;
        let mut desired = usage_for(mg, reference)?;
        let name = desired.metadata.name.clone().unwrap_or_default();

        let Some(current) = self.store.get_usage(&name).await? else {
            debug!(
                "Recording usage of ProviderConfig {} by {}",
                desired.provider_config_name(),
                desired.spec.resource_ref.name
            );
            self.store.create_usage(&desired).await?;
            return Ok(());
        };

        if let Some(controller) = current.controller_uid() {
            if controller != name {
                return Err(TrackError::NotControllable(name));
            }
        }

        if current.provider_config_name() == desired.provider_config_name() {
            return Ok(());
        }

        debug!(
            "Moving usage {} from ProviderConfig {} to {}",
            name,
            current.provider_config_name(),
            desired.provider_config_name()
        );
        desired.metadata.resource_version = current.metadata.resource_version;
        self.store.replace_usage(&desired).await?;
        Ok(())
    }
}

/// The usage object describing `mg`'s dependency on `reference`
pub fn usage_for(mg: &dyn Managed, reference: Reference) -> Result<ProviderConfigUsage, TrackError> {
    let resource_ref = mg.typed_reference();
    let uid = resource_ref
        .uid
        .clone()
        .ok_or_else(|| TrackError::MissingUid(resource_ref.name.clone()))?;

    let owner = OwnerReference {
        api_version: resource_ref.api_version.clone(),
        kind: resource_ref.kind.clone(),
        name: resource_ref.name.clone(),
        uid: uid.clone(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    };

    Ok(ProviderConfigUsage {
        metadata: ObjectMeta {
            name: Some(uid),
            labels: Some(BTreeMap::from([(
                LABEL_KEY_PROVIDER_CONFIG.to_string(),
                reference.name.clone(),
            )])),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: ProviderConfigUsageSpec {
            provider_config_ref: reference,
            resource_ref,
        },
    })
}
