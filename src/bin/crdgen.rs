//! # CRD Generator
//!
//! Generates the CustomResourceDefinition YAML for `ProviderConfig` and
//! `ProviderConfigUsage` from the Rust type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > package/crds/tailscale.upbound.io.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use provider_tailscale::crd::{ProviderConfig, ProviderConfigUsage};

fn main() {
    let crds = [ProviderConfig::crd(), ProviderConfigUsage::crd()];

    for crd in crds {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
