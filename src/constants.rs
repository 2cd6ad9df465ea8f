//! # Constants
//!
//! Shared constants used throughout the provider.
//!
//! These values represent reasonable defaults and can be overridden via
//! flags or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default requeue interval for ProviderConfig reconciliation (seconds)
pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 30;

/// Default requeue interval after a reconciliation error (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Label placed on every ProviderConfigUsage naming the ProviderConfig it uses
pub const LABEL_KEY_PROVIDER_CONFIG: &str = "crossplane.io/provider-config";

/// Finalizer held on a ProviderConfig while any usage refers to it
pub const FINALIZER_IN_USE: &str = "in-use.crossplane.io";

/// Condition reason set while a deleted ProviderConfig still has users
pub const REASON_IN_USE: &str = "InUse";

/// Condition reason set when a ProviderConfig is available
pub const REASON_AVAILABLE: &str = "Available";

/// Field manager used for status and metadata patches
pub const FIELD_MANAGER: &str = "provider-tailscale";

/// Default Terraform CLI version reported in the setup
pub const DEFAULT_TERRAFORM_VERSION: &str = "1.5.7";

/// Default Terraform registry source of the Tailscale provider
pub const DEFAULT_TERRAFORM_PROVIDER_SOURCE: &str = "tailscale/tailscale";

/// Default Tailscale Terraform provider version
pub const DEFAULT_TERRAFORM_PROVIDER_VERSION: &str = "0.16.1";
