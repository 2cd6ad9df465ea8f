//! # Tailscale Provider
//!
//! Runs the ProviderConfig controller for the Tailscale provider, or
//! resolves the Terraform setup for a single managed resource.
//!
//! ## Overview
//!
//! 1. **ProviderConfig controller** - keeps `status.users` current and holds
//!    the `in-use.crossplane.io` finalizer while managed resources use a config
//! 2. **Health and metrics** - `/healthz`, `/readyz` and `/metrics`
//! 3. **`resolve` subcommand** - prints a managed resource's Terraform setup
//!    with sensitive values redacted
//!
//! ## Usage
//!
//! ```bash
//! provider-tailscale --debug
//! provider-tailscale resolve --api-version tailnet.tailscale.upbound.io/v1alpha1 --kind ACL --name acl
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use tracing::{error, info};

use provider_tailscale::cli::{self, ResourceTarget};
use provider_tailscale::config::{Command, Config};
use provider_tailscale::controller::{self, Reconciler};
use provider_tailscale::observability::metrics;
use provider_tailscale::server::{start_server, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .init();

    info!(
        "Starting Tailscale provider {} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    match &config.command {
        Some(Command::Resolve {
            api_version,
            kind,
            name,
            namespace,
        }) => {
            let target = ResourceTarget {
                api_version,
                kind,
                name,
                namespace: namespace.as_deref(),
            };
            let rendered = cli::resolve(client, &config.setup_builder(), &target).await?;
            println!("{rendered}");
            Ok(())
        }
        Some(Command::Run) | None => run(client, &config).await,
    }
}

async fn run(client: Client, config: &Config) -> Result<()> {
    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    info!(
        "Terraform setup: terraform {} with {} {}",
        config.terraform_version, config.terraform_provider_source, config.terraform_provider_version
    );

    let reconciler = Arc::new(Reconciler::new(client, config.requeue_interval()));
    server_state.set_ready(true);

    controller::run(reconciler).await;

    server_state.set_ready(false);
    info!("Provider stopped");
    Ok(())
}
