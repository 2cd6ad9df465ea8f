//! # Controller
//!
//! - `providerconfig`: ProviderConfig usage accounting and deletion protection

pub mod providerconfig;

pub use providerconfig::{reconcile, run, Reconciler, ReconcilerError};
