//! # Resource Runtime
//!
//! The pieces of managed-resource handling the provider owns:
//!
//! - [`Managed`] - what the resolver needs to know about a managed resource
//! - [`credentials`] - extraction of raw credential bytes from a source
//! - [`tracker`] - ProviderConfigUsage bookkeeping

pub mod credentials;
pub mod tracker;

use kube::api::DynamicObject;

use crate::crd::{Reference, TypedReference};

pub use credentials::{common_credential_extractor, ExtractError};
pub use tracker::{ProviderConfigUsageTracker, TrackError};

/// A managed resource as seen by the configuration resolver
pub trait Managed: Send + Sync {
    /// The ProviderConfig this resource references, if any
    fn provider_config_reference(&self) -> Option<Reference>;

    /// API version, kind, name and UID of this resource
    fn typed_reference(&self) -> TypedReference;
}

/// Managed resources of any generated kind, read through the dynamic API.
/// The reference lives at `spec.providerConfigRef.name`.
impl Managed for DynamicObject {
    fn provider_config_reference(&self) -> Option<Reference> {
        self.data
            .pointer("/spec/providerConfigRef/name")
            .and_then(serde_json::Value::as_str)
            .map(Reference::new)
    }

    fn typed_reference(&self) -> TypedReference {
        let (api_version, kind) = self
            .types
            .as_ref()
            .map(|t| (t.api_version.clone(), t.kind.clone()))
            .unwrap_or_default();
        TypedReference {
            api_version,
            kind,
            name: self.metadata.name.clone().unwrap_or_default(),
            uid: self.metadata.uid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_dynamic_object_reads_provider_config_ref() {
        let obj = dynamic(serde_json::json!({
            "apiVersion": "tailnet.tailscale.upbound.io/v1alpha1",
            "kind": "ACL",
            "metadata": {"name": "acl", "uid": "7c1d"},
            "spec": {"providerConfigRef": {"name": "default"}, "forProvider": {}}
        }));

        assert_eq!(obj.provider_config_reference(), Some(Reference::new("default")));
        let typed = obj.typed_reference();
        assert_eq!(typed.api_version, "tailnet.tailscale.upbound.io/v1alpha1");
        assert_eq!(typed.kind, "ACL");
        assert_eq!(typed.name, "acl");
        assert_eq!(typed.uid.as_deref(), Some("7c1d"));
    }

    #[test]
    fn test_dynamic_object_without_reference() {
        let obj = dynamic(serde_json::json!({
            "apiVersion": "tailnet.tailscale.upbound.io/v1alpha1",
            "kind": "ACL",
            "metadata": {"name": "acl"},
            "spec": {"forProvider": {}}
        }));

        assert_eq!(obj.provider_config_reference(), None);
    }
}
