//! # Shared API Types
//!
//! References, credential selectors and status conditions shared by
//! `ProviderConfig` and `ProviderConfigUsage`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a named, cluster-scoped object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Reference {
    /// Name of the referenced object
    pub name: String,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A reference to an object of a specific API version and kind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    /// API version of the referent
    pub api_version: String,
    /// Kind of the referent
    pub kind: String,
    /// Name of the referent
    pub name: String,
    /// UID of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Where the provider should look for credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CredentialsSource {
    None,
    Secret,
    InjectedIdentity,
    Environment,
    Filesystem,
}

impl CredentialsSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsSource::None => "None",
            CredentialsSource::Secret => "Secret",
            CredentialsSource::InjectedIdentity => "InjectedIdentity",
            CredentialsSource::Environment => "Environment",
            CredentialsSource::Filesystem => "Filesystem",
        }
    }
}

impl fmt::Display for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects a key of a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SecretKeySelector {
    /// Name of the secret
    pub name: String,
    /// Namespace of the secret
    pub namespace: String,
    /// The key to select
    pub key: String,
}

/// Selects an environment variable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct EnvSelector {
    /// Name of the environment variable
    pub name: String,
}

/// Selects a file on the provider's filesystem
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct FsSelector {
    /// Path to the file
    pub path: String,
}

/// Selectors shared by every credentials source.
/// Only the selector matching the declared source is consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonCredentialSelectors {
    /// Filesystem location of the credentials (source: Filesystem)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsSelector>,
    /// Environment variable holding the credentials (source: Environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvSelector>,
    /// Secret key holding the credentials (source: Secret)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    pub fn ready(status: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            r#type: "Ready".to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message: Some(message.into()),
        }
    }
}
