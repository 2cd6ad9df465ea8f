//! # ProviderConfigUsage
//!
//! Records that a managed resource depends on a `ProviderConfig`. One usage
//! exists per managed resource, named after the resource UID and owned by it,
//! so the usage disappears with the resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Reference, TypedReference};

#[derive(CustomResource, Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfigUsage",
    group = "tailscale.upbound.io",
    version = "v1beta1",
    category = "crossplane",
    category = "provider",
    category = "tailscale",
    printcolumn = r#"{"name":"Config-Name", "type":"string", "jsonPath":".spec.providerConfigRef.name"}"#,
    printcolumn = r#"{"name":"Resource-Kind", "type":"string", "jsonPath":".spec.resourceRef.kind"}"#,
    printcolumn = r#"{"name":"Resource-Name", "type":"string", "jsonPath":".spec.resourceRef.name"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    /// The ProviderConfig being used
    pub provider_config_ref: Reference,
    /// The managed resource using the ProviderConfig
    pub resource_ref: TypedReference,
}

impl ProviderConfigUsage {
    /// Name of the ProviderConfig this usage points at
    #[must_use]
    pub fn provider_config_name(&self) -> &str {
        &self.spec.provider_config_ref.name
    }

    /// UID of the controlling owner, if any
    #[must_use]
    pub fn controller_uid(&self) -> Option<&str> {
        self.metadata
            .owner_references
            .as_ref()?
            .iter()
            .find(|owner| owner.controller == Some(true))
            .map(|owner| owner.uid.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn usage_with_owners(owners: Vec<OwnerReference>) -> ProviderConfigUsage {
        let mut usage = ProviderConfigUsage::new(
            "0b5f2a7e",
            ProviderConfigUsageSpec {
                provider_config_ref: Reference::new("default"),
                resource_ref: TypedReference {
                    api_version: "tailnet.tailscale.upbound.io/v1alpha1".to_string(),
                    kind: "ACL".to_string(),
                    name: "acl".to_string(),
                    uid: None,
                },
            },
        );
        usage.metadata.owner_references = Some(owners);
        usage
    }

    fn owner(uid: &str, controller: bool) -> OwnerReference {
        OwnerReference {
            api_version: "tailnet.tailscale.upbound.io/v1alpha1".to_string(),
            kind: "ACL".to_string(),
            name: "acl".to_string(),
            uid: uid.to_string(),
            controller: Some(controller),
            block_owner_deletion: Some(true),
        }
    }

    #[test]
    fn test_controller_uid_picks_controlling_owner() {
        let usage = usage_with_owners(vec![owner("other", false), owner("0b5f2a7e", true)]);
        assert_eq!(usage.controller_uid(), Some("0b5f2a7e"));
        assert_eq!(usage.provider_config_name(), "default");
    }

    #[test]
    fn test_controller_uid_none_without_controller() {
        let usage = usage_with_owners(vec![owner("other", false)]);
        assert_eq!(usage.controller_uid(), None);
    }
}
