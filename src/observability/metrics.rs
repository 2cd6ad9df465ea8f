//! # Metrics
//!
//! Prometheus metrics for monitoring the provider.
//!
//! ## Metrics Exposed
//!
//! - `provider_tailscale_setups_total` - Total number of Terraform setup resolutions
//! - `provider_tailscale_setup_errors_total` - Failed resolutions by failing step
//! - `provider_tailscale_setup_duration_seconds` - Duration of setup resolution
//! - `provider_tailscale_reconciliations_total` - Total ProviderConfig reconciliations
//! - `provider_tailscale_reconciliation_errors_total` - Total ProviderConfig reconciliation errors
//! - `provider_tailscale_provider_config_users` - Current users per ProviderConfig

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGaugeVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static SETUPS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provider_tailscale_setups_total",
        "Total number of Terraform setup resolutions",
    )
    .expect("Failed to create SETUPS_TOTAL metric - this should never happen")
});

static SETUP_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "provider_tailscale_setup_errors_total",
            "Total number of failed Terraform setup resolutions by step",
        ),
        &["step"],
    )
    .expect("Failed to create SETUP_ERRORS_TOTAL metric - this should never happen")
});

static SETUP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "provider_tailscale_setup_duration_seconds",
            "Duration of Terraform setup resolution in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
    )
    .expect("Failed to create SETUP_DURATION metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provider_tailscale_reconciliations_total",
        "Total number of ProviderConfig reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provider_tailscale_reconciliation_errors_total",
        "Total number of ProviderConfig reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static PROVIDER_CONFIG_USERS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new(
            "provider_tailscale_provider_config_users",
            "Number of managed resources using each ProviderConfig",
        ),
        &["provider_config"],
    )
    .expect("Failed to create PROVIDER_CONFIG_USERS metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Only fails if a collector with a conflicting descriptor is registered"
)]
pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SETUPS_TOTAL.clone()),
        Box::new(SETUP_ERRORS_TOTAL.clone()),
        Box::new(SETUP_DURATION.clone()),
        Box::new(RECONCILIATIONS_TOTAL.clone()),
        Box::new(RECONCILIATION_ERRORS_TOTAL.clone()),
        Box::new(PROVIDER_CONFIG_USERS.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

pub fn increment_setups() {
    SETUPS_TOTAL.inc();
}

pub fn increment_setup_errors(step: &str) {
    SETUP_ERRORS_TOTAL.with_label_values(&[step]).inc();
}

pub fn observe_setup_duration(duration: f64) {
    SETUP_DURATION.observe(duration);
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn set_provider_config_users(provider_config: &str, users: i64) {
    PROVIDER_CONFIG_USERS
        .with_label_values(&[provider_config])
        .set(users);
}

pub fn remove_provider_config(provider_config: &str) {
    // Absent label sets are fine to ignore
    let _ = PROVIDER_CONFIG_USERS.remove_label_values(&[provider_config]);
}
