//! # ProviderConfig
//!
//! Cluster-scoped configuration naming where the provider obtains its
//! Tailscale API credentials.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{CommonCredentialSelectors, Condition, CredentialsSource};

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: tailscale.upbound.io/v1beta1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       name: tailscale-creds
///       namespace: crossplane-system
///       key: credentials
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "tailscale.upbound.io",
    version = "v1beta1",
    status = "ProviderConfigStatus",
    category = "crossplane",
    category = "provider",
    category = "tailscale",
    printcolumn = r#"{"name":"Source", "type":"string", "jsonPath":".spec.credentials.source", "priority":1}"#,
    printcolumn = r#"{"name":"Users", "type":"integer", "jsonPath":".status.users"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Credentials required to authenticate to this provider
    pub credentials: ProviderCredentials,
}

/// Required authentication data
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Source of the provider credentials
    pub source: CredentialsSource,
    #[serde(flatten)]
    pub selectors: CommonCredentialSelectors,
}

/// Observed state of a ProviderConfig
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Number of managed resources using this ProviderConfig
    #[serde(default)]
    pub users: Option<i64>,
}
