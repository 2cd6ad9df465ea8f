//! Tailscale Provider Library
//!
//! Provider configuration resolution for Tailscale managed resources: a
//! managed resource names a `ProviderConfig`, the config names where the
//! Tailscale credentials live, and [`clients::tailscale`] turns all of that
//! into the [`terraform::Setup`] the Terraform execution engine consumes.
//!
//! Tests are included in the module files and under `tests/`.

pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod resource;
pub mod server;
pub mod store;
pub mod terraform;

pub use clients::tailscale::{terraform_setup_builder, Error, TerraformSetupBuilder};
pub use terraform::{ProviderRequirement, Setup, SetupFn, SetupOutcome};
