//! # Custom Resource Definitions
//!
//! API types for the Tailscale provider (`tailscale.upbound.io/v1beta1`).
//!
//! ## Module Structure
//!
//! - `provider_config.rs` - `ProviderConfig` and its credentials specification
//! - `usage.rs` - `ProviderConfigUsage`, one per managed resource
//! - `common.rs` - References, credential selectors and conditions

mod common;
mod provider_config;
mod usage;

// Re-export all public types
pub use common::{
    CommonCredentialSelectors, Condition, CredentialsSource, EnvSelector, FsSelector, Reference,
    SecretKeySelector, TypedReference,
};
pub use provider_config::{
    ProviderConfig, ProviderConfigSpec, ProviderConfigStatus, ProviderCredentials,
};
pub use usage::{ProviderConfigUsage, ProviderConfigUsageSpec};
