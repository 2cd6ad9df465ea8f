//! # Configuration
//!
//! Command-line flags for the provider binary. Every flag can also be set
//! through the environment so the provider can be configured from its
//! Deployment manifest.

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::clients::{terraform_setup_builder, TerraformSetupBuilder};
use crate::constants::{
    DEFAULT_METRICS_PORT, DEFAULT_REQUEUE_INTERVAL_SECS, DEFAULT_TERRAFORM_PROVIDER_SOURCE,
    DEFAULT_TERRAFORM_PROVIDER_VERSION, DEFAULT_TERRAFORM_VERSION,
};

#[derive(Debug, Parser)]
#[command(
    name = "provider-tailscale",
    about = "Tailscale provider: ProviderConfig controller and Terraform setup resolution",
    version
)]
pub struct Config {
    /// Run with debug logging
    #[arg(short, long, global = true, env = "DEBUG")]
    pub debug: bool,

    /// Port for the metrics and health probe server
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// How often a healthy ProviderConfig is reconciled, in seconds
    #[arg(long, env = "REQUEUE_INTERVAL_SECS", default_value_t = DEFAULT_REQUEUE_INTERVAL_SECS)]
    pub requeue_interval_secs: u64,

    /// Terraform CLI version
    #[arg(long, global = true, env = "TERRAFORM_VERSION", default_value = DEFAULT_TERRAFORM_VERSION)]
    pub terraform_version: String,

    /// Terraform registry source of the Tailscale provider
    #[arg(
        long,
        global = true,
        env = "TERRAFORM_PROVIDER_SOURCE",
        default_value = DEFAULT_TERRAFORM_PROVIDER_SOURCE
    )]
    pub terraform_provider_source: String,

    /// Version of the Tailscale Terraform provider
    #[arg(
        long,
        global = true,
        env = "TERRAFORM_PROVIDER_VERSION",
        default_value = DEFAULT_TERRAFORM_PROVIDER_VERSION
    )]
    pub terraform_provider_version: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the ProviderConfig controller (default)
    Run,
    /// Resolve the Terraform setup for a managed resource and print it
    /// with sensitive values redacted
    Resolve {
        /// API version of the managed resource (e.g. tailnet.tailscale.upbound.io/v1alpha1)
        #[arg(long)]
        api_version: String,
        /// Kind of the managed resource
        #[arg(long)]
        kind: String,
        /// Name of the managed resource
        #[arg(long)]
        name: String,
        /// Namespace, for namespaced managed resources
        #[arg(long)]
        namespace: Option<String>,
    },
}

impl Config {
    #[must_use]
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    /// Setup builder for the configured Terraform versions
    #[must_use]
    pub fn setup_builder(&self) -> TerraformSetupBuilder {
        terraform_setup_builder(
            self.terraform_version.clone(),
            self.terraform_provider_source.clone(),
            self.terraform_provider_version.clone(),
        )
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "provider_tailscale=debug,kube=info"
        } else {
            "provider_tailscale=info"
        }
    }
}
