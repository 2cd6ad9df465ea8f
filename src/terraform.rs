//! # Terraform Setup
//!
//! The bundle handed to the Terraform execution engine to initialize the
//! underlying provider binary, and the [`SetupFn`] seam that produces it.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::resource::Managed;
use crate::store::ConfigStore;

/// Source and version of the Terraform provider binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderRequirement {
    pub source: String,
    pub version: String,
}

/// Terraform provider setup for one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Setup {
    /// Terraform CLI version
    pub version: String,
    pub requirement: ProviderRequirement,
    /// Provider block configuration, keyed by Terraform argument name
    pub configuration: Map<String, Value>,
}

/// A setup together with the error that stopped it, if any.
///
/// The setup is returned even on failure so the static version and
/// requirement stay available to the caller.
#[derive(Debug)]
pub struct SetupOutcome<E> {
    pub setup: Setup,
    pub error: Option<E>,
}

impl<E> SetupOutcome<E> {
    #[must_use]
    pub fn ok(setup: Setup) -> Self {
        Self { setup, error: None }
    }

    #[must_use]
    pub fn failed(setup: Setup, error: E) -> Self {
        Self {
            setup,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Collapse into a `Result`, dropping the partial setup on failure
    pub fn into_result(self) -> Result<Setup, E> {
        match self.error {
            None => Ok(self.setup),
            Some(err) => Err(err),
        }
    }
}

/// Produces the Terraform setup for a managed resource
#[async_trait]
pub trait SetupFn: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn setup(&self, store: &dyn ConfigStore, mg: &dyn Managed)
        -> SetupOutcome<Self::Error>;
}
