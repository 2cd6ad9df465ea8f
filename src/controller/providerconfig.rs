//! # ProviderConfig Reconciler
//!
//! Keeps each `ProviderConfig` honest about who depends on it:
//!
//! - `status.users` is the number of `ProviderConfigUsage` objects labelled
//!   with the config's name
//! - the `in-use.crossplane.io` finalizer is held while the config exists, and
//!   only released on deletion once no usage remains
//!
//! Usage changes are watched and mapped back to their ProviderConfig through
//! the `crossplane.io/provider-config` label.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use futures::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::constants::{
    DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, FIELD_MANAGER, FINALIZER_IN_USE,
    LABEL_KEY_PROVIDER_CONFIG, REASON_AVAILABLE, REASON_IN_USE,
};
use crate::crd::{Condition, ProviderConfig, ProviderConfigStatus, ProviderConfigUsage};
use crate::observability::metrics;
use crate::store::{ConfigStore, KubeStore};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] anyhow::Error),
}

/// Shared state for ProviderConfig reconciliation
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub store: KubeStore,
    /// How often a healthy ProviderConfig is revisited
    pub requeue_interval: Duration,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("requeue_interval", &self.requeue_interval)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(client: Client, requeue_interval: Duration) -> Self {
        Self {
            store: KubeStore::new(client.clone()),
            client,
            requeue_interval,
        }
    }
}

/// What the reconciler must do to a ProviderConfig's finalizers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerAction {
    /// Live config without our finalizer
    Add,
    /// Deleted config with no users left
    Remove,
    /// Deleted config that is still used
    Block,
    /// Nothing to change
    Keep,
}

/// Decide the finalizer action for a config with `users` usages
#[must_use]
pub fn finalizer_action(pc: &ProviderConfig, users: usize) -> FinalizerAction {
    let has_finalizer = pc.finalizers().iter().any(|f| f == FINALIZER_IN_USE);
    let deleting = pc.metadata.deletion_timestamp.is_some();

    match (deleting, users, has_finalizer) {
        (true, 0, true) => FinalizerAction::Remove,
        (true, _, true) => FinalizerAction::Block,
        (false, _, false) => FinalizerAction::Add,
        _ => FinalizerAction::Keep,
    }
}

/// Replace the condition of the same type, keeping the transition time when
/// the status did not change
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        if existing.status == condition.status {
            condition
                .last_transition_time
                .clone_from(&existing.last_transition_time);
        }
        *existing = condition;
    } else {
        conditions.push(condition);
    }
}

/// Reconcile a single ProviderConfig
pub async fn reconcile(
    pc: Arc<ProviderConfig>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    metrics::increment_reconciliations();
    let name = pc.name_any();

    let usages = ctx
        .store
        .list_usages(&name)
        .await
        .with_context(|| format!("cannot list usages of ProviderConfig {name}"))?;
    let users = usages.len();
    debug!("ProviderConfig {} has {} users", name, users);

    let api: Api<ProviderConfig> = Api::all(ctx.client.clone());
    let action = finalizer_action(&pc, users);

    let condition = match action {
        FinalizerAction::Block => Condition::ready(
            false,
            REASON_IN_USE,
            format!("cannot remove finalizer: ProviderConfig is still used by {users} resources"),
        ),
        _ => Condition::ready(true, REASON_AVAILABLE, "ProviderConfig is available"),
    };

    let mut status = pc.status.clone().unwrap_or_default();
    status.users = Some(i64::try_from(users).unwrap_or(i64::MAX));
    set_condition(&mut status.conditions, condition);

    match action {
        FinalizerAction::Add => {
            info!("Adding finalizer {} to ProviderConfig {}", FINALIZER_IN_USE, name);
            let mut finalizers = pc.finalizers().to_vec();
            finalizers.push(FINALIZER_IN_USE.to_string());
            patch_finalizers(&api, &pc, finalizers).await?;
        }
        FinalizerAction::Remove => {
            info!(
                "ProviderConfig {} is no longer used, removing finalizer {}",
                name, FINALIZER_IN_USE
            );
            let finalizers = pc
                .finalizers()
                .iter()
                .filter(|f| *f != FINALIZER_IN_USE)
                .cloned()
                .collect();
            patch_finalizers(&api, &pc, finalizers).await?;
            metrics::remove_provider_config(&name);
            return Ok(Action::await_change());
        }
        FinalizerAction::Block => {
            warn!(
                "ProviderConfig {} is being deleted but still has {} users",
                name, users
            );
        }
        FinalizerAction::Keep => {}
    }

    patch_status(&api, &name, &status).await?;
    metrics::set_provider_config_users(&name, status.users.unwrap_or_default());

    debug!(
        "Reconciled ProviderConfig {} in {:.3}s",
        name,
        start.elapsed().as_secs_f64()
    );
    Ok(Action::requeue(ctx.requeue_interval))
}

async fn patch_status(
    api: &Api<ProviderConfig>,
    name: &str,
    status: &ProviderConfigStatus,
) -> anyhow::Result<()> {
    let patch = serde_json::json!({ "status": status });
    match api
        .patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!("ProviderConfig {} was deleted during reconciliation", name);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("cannot update status of ProviderConfig {name}")),
    }
}

async fn patch_finalizers(
    api: &Api<ProviderConfig>,
    pc: &ProviderConfig,
    finalizers: Vec<String>,
) -> anyhow::Result<()> {
    let name = pc.name_any();
    // resourceVersion makes the merge patch fail on concurrent edits
    let patch = serde_json::json!({
        "metadata": {
            "finalizers": finalizers,
            "resourceVersion": pc.resource_version(),
        }
    });
    api.patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
        .with_context(|| format!("cannot update finalizers of ProviderConfig {name}"))?;
    Ok(())
}

/// Requeue a failed reconciliation after a fixed delay
pub fn error_policy(pc: Arc<ProviderConfig>, error: &ReconcilerError, _ctx: Arc<Reconciler>) -> Action {
    error!("Reconciliation error for ProviderConfig {}: {:?}", pc.name_any(), error);
    metrics::increment_reconciliation_errors();
    Action::requeue(Duration::from_secs(DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS))
}

/// The ProviderConfig a usage refers to, from its label
pub fn usage_to_provider_config(usage: &ProviderConfigUsage) -> Option<ObjectRef<ProviderConfig>> {
    usage
        .labels()
        .get(LABEL_KEY_PROVIDER_CONFIG)
        .map(|name| ObjectRef::new(name))
}

/// Run the ProviderConfig controller until a shutdown signal arrives
pub async fn run(reconciler: Arc<Reconciler>) {
    let configs: Api<ProviderConfig> = Api::all(reconciler.client.clone());
    let usages: Api<ProviderConfigUsage> = Api::all(reconciler.client.clone());

    info!("Starting ProviderConfig controller");
    Controller::new(configs, watcher::Config::default())
        .watches(usages, watcher::Config::default(), |usage| {
            usage_to_provider_config(&usage)
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| {
            if let Err(e) = result {
                debug!("Controller event error: {}", e);
            }
            std::future::ready(())
        })
        .await;
    info!("ProviderConfig controller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CommonCredentialSelectors, CredentialsSource, ProviderConfigSpec, ProviderCredentials};

    fn provider_config(finalizers: &[&str], deleting: bool) -> ProviderConfig {
        let mut pc = ProviderConfig::new(
            "default",
            ProviderConfigSpec {
                credentials: ProviderCredentials {
                    source: CredentialsSource::Secret,
                    selectors: CommonCredentialSelectors::default(),
                },
            },
        );
        pc.metadata.finalizers = Some(finalizers.iter().map(|f| (*f).to_string()).collect());
        if deleting {
            pc.metadata.deletion_timestamp =
                Some(serde_json::from_value(serde_json::json!("2024-05-01T12:00:00Z")).unwrap());
        }
        pc
    }

    fn assert_debug<T: std::fmt::Debug>() {}

    #[test]
    fn test_reconciler_state_is_debug() {
        assert_debug::<Reconciler>();
        assert_debug::<KubeStore>();
    }

    #[test]
    fn test_live_config_without_finalizer_gets_one() {
        let pc = provider_config(&[], false);
        assert_eq!(finalizer_action(&pc, 0), FinalizerAction::Add);
        assert_eq!(finalizer_action(&pc, 3), FinalizerAction::Add);
    }

    #[test]
    fn test_live_config_with_finalizer_is_kept() {
        let pc = provider_config(&[FINALIZER_IN_USE], false);
        assert_eq!(finalizer_action(&pc, 2), FinalizerAction::Keep);
    }

    #[test]
    fn test_deleted_config_in_use_is_blocked() {
        let pc = provider_config(&[FINALIZER_IN_USE], true);
        assert_eq!(finalizer_action(&pc, 1), FinalizerAction::Block);
    }

    #[test]
    fn test_deleted_unused_config_releases_finalizer() {
        let pc = provider_config(&["other.example.com", FINALIZER_IN_USE], true);
        assert_eq!(finalizer_action(&pc, 0), FinalizerAction::Remove);
    }

    #[test]
    fn test_deleted_config_without_our_finalizer_is_left_alone() {
        let pc = provider_config(&["other.example.com"], true);
        assert_eq!(finalizer_action(&pc, 0), FinalizerAction::Keep);
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_status_unchanged() {
        let mut conditions = vec![Condition {
            last_transition_time: Some("2024-01-01T00:00:00+00:00".to_string()),
            ..Condition::ready(true, REASON_AVAILABLE, "ok")
        }];
        set_condition(&mut conditions, Condition::ready(true, REASON_AVAILABLE, "still ok"));

        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
        assert_eq!(conditions[0].message.as_deref(), Some("still ok"));
    }

    #[test]
    fn test_set_condition_updates_transition_time_on_change() {
        let mut conditions = vec![Condition {
            last_transition_time: Some("2024-01-01T00:00:00+00:00".to_string()),
            ..Condition::ready(true, REASON_AVAILABLE, "ok")
        }];
        set_condition(&mut conditions, Condition::ready(false, REASON_IN_USE, "in use"));

        assert_eq!(conditions[0].status, "False");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_usage_maps_to_labelled_provider_config() {
        use crate::crd::{ProviderConfigUsageSpec, Reference, TypedReference};

        let mut usage = ProviderConfigUsage::new(
            "uid-1",
            ProviderConfigUsageSpec {
                provider_config_ref: Reference::new("default"),
                resource_ref: TypedReference {
                    api_version: "tailnet.tailscale.upbound.io/v1alpha1".to_string(),
                    kind: "ACL".to_string(),
                    name: "acl".to_string(),
                    uid: Some("uid-1".to_string()),
                },
            },
        );
        assert!(usage_to_provider_config(&usage).is_none());

        usage.metadata.labels = Some(
            [(LABEL_KEY_PROVIDER_CONFIG.to_string(), "default".to_string())]
                .into_iter()
                .collect(),
        );
        let object_ref = usage_to_provider_config(&usage).unwrap();
        assert_eq!(object_ref.name, "default");
    }
}
