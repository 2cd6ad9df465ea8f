//! # Resolve Command
//!
//! Resolves the Terraform setup for one managed resource in the cluster and
//! renders it with sensitive arguments redacted. Useful to check that a
//! ProviderConfig and its credentials are wired correctly.
//!
//! Resolution records a ProviderConfigUsage for the resource, exactly as a
//! reconciliation would.

use anyhow::{Context, Result};
use kube::api::{Api, DynamicObject};
use kube::core::GroupVersion;
use kube::discovery;
use kube::Client;
use tracing::info;

use crate::clients::tailscale::redact;
use crate::clients::TerraformSetupBuilder;
use crate::store::KubeStore;

/// Identifies a managed resource in the cluster
#[derive(Debug, Clone)]
pub struct ResourceTarget<'a> {
    pub api_version: &'a str,
    pub kind: &'a str,
    pub name: &'a str,
    pub namespace: Option<&'a str>,
}

/// Resolve the setup for `target` and render it as pretty JSON
pub async fn resolve(
    client: Client,
    builder: &TerraformSetupBuilder,
    target: &ResourceTarget<'_>,
) -> Result<String> {
    let gv: GroupVersion = target
        .api_version
        .parse()
        .with_context(|| format!("Invalid API version {:?}", target.api_version))?;
    let gvk = gv.with_kind(target.kind);

    let (resource, _caps) = discovery::pinned_kind(&client, &gvk)
        .await
        .with_context(|| format!("Failed to discover {}/{}", target.api_version, target.kind))?;

    let api: Api<DynamicObject> = match target.namespace {
        Some(ns) => Api::namespaced_with(client.clone(), ns, &resource),
        None => Api::all_with(client.clone(), &resource),
    };
    let managed = api
        .get(target.name)
        .await
        .with_context(|| format!("Failed to get {} {}", target.kind, target.name))?;

    info!("Resolving Terraform setup for {} {}", target.kind, target.name);
    let store = KubeStore::new(client);
    let setup = builder
        .resolve(&store, &managed)
        .await
        .into_result()
        .context("Failed to resolve Terraform setup")?;

    serde_json::to_string_pretty(&redact(&setup)).context("Failed to render Terraform setup")
}
