//! # Provider Clients
//!
//! Terraform setup builders, one per upstream provider.

pub mod tailscale;

pub use tailscale::{terraform_setup_builder, TerraformSetupBuilder};
