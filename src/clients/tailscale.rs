//! # Tailscale Terraform Setup
//!
//! Resolves the Terraform provider configuration for a managed resource:
//!
//! 1. Read the resource's `providerConfigRef`
//! 2. Fetch the referenced `ProviderConfig`
//! 3. Record a `ProviderConfigUsage` for the resource
//! 4. Extract the credentials the config points at
//! 5. Decode them as a flat JSON object
//! 6. Copy the recognized Tailscale provider arguments into the setup
//!
//! The setup is returned on every path; on failure it carries only the
//! static version and requirement.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::observability::metrics;
use crate::resource::{
    common_credential_extractor, ExtractError, Managed, ProviderConfigUsageTracker, TrackError,
};
use crate::store::{ConfigStore, StoreError};
use crate::terraform::{ProviderRequirement, Setup, SetupFn, SetupOutcome};

/// Tailscale provider arguments copied from the credentials payload,
/// as (payload key, Terraform argument) pairs.
///
/// - `api_key` conflicts with the OAuth client fields upstream; not enforced here
/// - `scopes` is a list of strings, only valid with both OAuth client fields
pub const CREDENTIAL_KEYS: &[(&str, &str)] = &[
    ("api_key", "api_key"),
    ("base_url", "base_url"),
    ("oauth_client_id", "oauth_client_id"),
    ("oauth_client_secret", "oauth_client_secret"),
    ("scopes", "scopes"),
    ("tailnet", "tailnet"),
    ("user_agent", "user_agent"),
];

/// Terraform arguments that must not be printed
pub const SENSITIVE_KEYS: &[&str] = &["api_key", "oauth_client_secret"];

#[derive(Debug, Error)]
pub enum Error {
    #[error("no providerConfigRef provided")]
    NoProviderConfig,
    #[error("cannot get referenced ProviderConfig: {0}")]
    GetProviderConfig(#[source] StoreError),
    #[error("cannot track ProviderConfig usage: {0}")]
    TrackUsage(#[source] TrackError),
    #[error("cannot extract credentials: {0}")]
    ExtractCredentials(#[source] ExtractError),
    #[error("cannot unmarshal tailscale credentials as JSON: {0}")]
    DecodeCredentials(#[source] serde_json::Error),
}

impl Error {
    /// Short name of the failing step, used as a metric label
    #[must_use]
    pub fn step(&self) -> &'static str {
        match self {
            Error::NoProviderConfig => "reference",
            Error::GetProviderConfig(_) => "get",
            Error::TrackUsage(_) => "track",
            Error::ExtractCredentials(_) => "extract",
            Error::DecodeCredentials(_) => "decode",
        }
    }
}

/// A credentials payload value: a string, or a list of strings for `scopes`.
/// `null` decodes as an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialValue {
    Text(String),
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for CredentialValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CredentialValueVisitor)
    }
}

struct CredentialValueVisitor;

impl<'de> Visitor<'de> for CredentialValueVisitor {
    type Value = CredentialValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a list of strings")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(CredentialValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(CredentialValue::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CredentialValue::Text(String::new()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        self.visit_unit()
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(item) = seq.next_element::<Option<String>>()? {
            items.push(item.unwrap_or_default());
        }
        Ok(CredentialValue::List(items))
    }
}

impl From<CredentialValue> for Value {
    fn from(value: CredentialValue) -> Self {
        match value {
            CredentialValue::Text(text) => Value::String(text),
            CredentialValue::List(items) => {
                Value::Array(items.into_iter().map(Value::String).collect())
            }
        }
    }
}

/// Decode a credentials payload as a flat JSON object
pub fn decode_credentials(
    data: &[u8],
) -> Result<BTreeMap<String, CredentialValue>, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Builds Terraform setups for Tailscale managed resources
#[derive(Debug, Clone)]
pub struct TerraformSetupBuilder {
    version: String,
    provider_source: String,
    provider_version: String,
}

/// Create a setup builder for the given Terraform version and provider
/// requirement.
pub fn terraform_setup_builder(
    version: impl Into<String>,
    provider_source: impl Into<String>,
    provider_version: impl Into<String>,
) -> TerraformSetupBuilder {
    TerraformSetupBuilder {
        version: version.into(),
        provider_source: provider_source.into(),
        provider_version: provider_version.into(),
    }
}

impl TerraformSetupBuilder {
    fn base_setup(&self) -> Setup {
        Setup {
            version: self.version.clone(),
            requirement: ProviderRequirement {
                source: self.provider_source.clone(),
                version: self.provider_version.clone(),
            },
            configuration: serde_json::Map::new(),
        }
    }

    /// Resolve the setup for `mg`, recording metrics for the attempt
    pub async fn resolve<S>(&self, store: &S, mg: &dyn Managed) -> SetupOutcome<Error>
    where
        S: ConfigStore + ?Sized,
    {
        let start = Instant::now();
        metrics::increment_setups();

        let mut setup = self.base_setup();
        let result = self.populate(&mut setup, store, mg).await;
        metrics::observe_setup_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => SetupOutcome::ok(setup),
            Err(err) => {
                let resource = mg.typed_reference();
                warn!(
                    "Terraform setup failed for {} {}: {}",
                    resource.kind, resource.name, err
                );
                metrics::increment_setup_errors(err.step());
                SetupOutcome::failed(setup, err)
            }
        }
    }

    async fn populate<S>(&self, setup: &mut Setup, store: &S, mg: &dyn Managed) -> Result<(), Error>
    where
        S: ConfigStore + ?Sized,
    {
        let config_ref = mg
            .provider_config_reference()
            .ok_or(Error::NoProviderConfig)?;

        let pc = store
            .get_provider_config(&config_ref.name)
            .await
            .map_err(Error::GetProviderConfig)?;
        debug!("Resolved ProviderConfig {}", config_ref.name);

        ProviderConfigUsageTracker::new(store)
            .track(mg)
            .await
            .map_err(Error::TrackUsage)?;

        let credentials = &pc.spec.credentials;
        let data = common_credential_extractor(credentials.source, store, &credentials.selectors)
            .await
            .map_err(Error::ExtractCredentials)?;

        let mut creds = decode_credentials(&data).map_err(Error::DecodeCredentials)?;

        for (source_key, destination_key) in CREDENTIAL_KEYS {
            if let Some(value) = creds.remove(*source_key) {
                setup
                    .configuration
                    .insert((*destination_key).to_string(), value.into());
            }
        }
        debug!(
            "Copied {} Tailscale provider arguments from ProviderConfig {}",
            setup.configuration.len(),
            config_ref.name
        );

        Ok(())
    }
}

#[async_trait]
impl SetupFn for TerraformSetupBuilder {
    type Error = Error;

    async fn setup(&self, store: &dyn ConfigStore, mg: &dyn Managed) -> SetupOutcome<Error> {
        self.resolve(store, mg).await
    }
}

/// Copy of `setup` with sensitive arguments masked, for display
#[must_use]
pub fn redact(setup: &Setup) -> Setup {
    let mut redacted = setup.clone();
    for key in SENSITIVE_KEYS {
        if let Some(value) = redacted.configuration.get_mut(*key) {
            *value = Value::String("REDACTED".to_string());
        }
    }
    redacted
}
