//! In-memory orchestrator.
//!
//! Holds Deployments in a map keyed by `(namespace, name)` and follows the
//! API server's existence rules: create conflicts on an existing object,
//! update and delete fail on a missing one. Used by `podd standalone`, which
//! rebuilds it from the record store on startup, and by tests, which can
//! make the next call of a given operation fail.

use std::collections::{BTreeMap, HashSet};

use k8s_openapi::api::apps::v1::Deployment;
use podgrid_state::{StateResult, StateStore};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::orchestrator::{
    object_name, Orchestrator, OrchestratorError, OrchestratorFuture, OrchestratorResult,
};
use crate::translate::translate;

/// Orchestrator operation, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
}

/// Deployments held in process memory.
#[derive(Debug, Default)]
pub struct MemoryOrchestrator {
    deployments: Mutex<BTreeMap<(String, String), Deployment>>,
    failures: Mutex<HashSet<Operation>>,
}

impl MemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recreate the Deployment of every stored record. Returns how many
    /// were restored.
    pub async fn restore(&self, store: &StateStore) -> StateResult<usize> {
        let mut deployments = self.deployments.lock().await;
        let mut restored = 0;
        for summary in store.list_pods()? {
            // Listing leaves ports and env empty.
            let record = store.get_pod(summary.id)?;
            deployments.insert(key(&record.namespace, &record.name), translate(&record));
            restored += 1;
        }
        info!(restored, "in-memory deployments restored from store");
        Ok(restored)
    }

    /// Make the next call of `operation` fail with an API error.
    pub async fn fail_next(&self, operation: Operation) {
        self.failures.lock().await.insert(operation);
    }

    /// Snapshot of a stored Deployment.
    pub async fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.deployments
            .lock()
            .await
            .get(&key(namespace, name))
            .cloned()
    }

    /// Number of stored Deployments.
    pub async fn len(&self) -> usize {
        self.deployments.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn check_failure(&self, operation: Operation) -> OrchestratorResult<()> {
        if self.failures.lock().await.remove(&operation) {
            return Err(OrchestratorError::Api(format!(
                "injected {operation:?} failure"
            )));
        }
        Ok(())
    }
}

impl Orchestrator for MemoryOrchestrator {
    fn get<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> OrchestratorFuture<'a, Option<Deployment>> {
        Box::pin(async move {
            self.check_failure(Operation::Get).await?;
            Ok(self.deployment(namespace, name).await)
        })
    }

    fn create<'a>(
        &'a self,
        namespace: &'a str,
        deployment: &'a Deployment,
    ) -> OrchestratorFuture<'a, Deployment> {
        Box::pin(async move {
            self.check_failure(Operation::Create).await?;
            let name = object_name(deployment)?;
            let mut deployments = self.deployments.lock().await;
            let slot = key(namespace, name);
            if deployments.contains_key(&slot) {
                return Err(OrchestratorError::conflict(namespace, name));
            }
            deployments.insert(slot, deployment.clone());
            debug!(%namespace, %name, "deployment created in memory");
            Ok(deployment.clone())
        })
    }

    fn update<'a>(
        &'a self,
        namespace: &'a str,
        deployment: &'a Deployment,
    ) -> OrchestratorFuture<'a, Deployment> {
        Box::pin(async move {
            self.check_failure(Operation::Update).await?;
            let name = object_name(deployment)?;
            let mut deployments = self.deployments.lock().await;
            match deployments.get_mut(&key(namespace, name)) {
                Some(existing) => {
                    *existing = deployment.clone();
                    debug!(%namespace, %name, "deployment replaced in memory");
                    Ok(deployment.clone())
                }
                None => Err(OrchestratorError::not_found(namespace, name)),
            }
        })
    }

    fn delete<'a>(&'a self, namespace: &'a str, name: &'a str) -> OrchestratorFuture<'a, ()> {
        Box::pin(async move {
            self.check_failure(Operation::Delete).await?;
            match self.deployments.lock().await.remove(&key(namespace, name)) {
                Some(_) => {
                    debug!(%namespace, %name, "deployment deleted from memory");
                    Ok(())
                }
                None => Err(OrchestratorError::not_found(namespace, name)),
            }
        })
    }
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn named(name: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let orch = MemoryOrchestrator::new();
        assert!(orch.get("default", "api").await.unwrap().is_none());

        orch.create("default", &named("api")).await.unwrap();
        assert!(orch.get("default", "api").await.unwrap().is_some());
        // Namespaces are separate.
        assert!(orch.get("other", "api").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_existing_conflicts() {
        let orch = MemoryOrchestrator::new();
        orch.create("default", &named("api")).await.unwrap();
        let err = orch.create("default", &named("api")).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Conflict { .. }));
        assert_eq!(orch.len().await, 1);
    }

    #[tokio::test]
    async fn update_and_delete_missing_are_not_found() {
        let orch = MemoryOrchestrator::new();
        let err = orch.update("default", &named("api")).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotFound { .. }));
        let err = orch.delete("default", "api").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotFound { .. }));
    }

    #[tokio::test]
    async fn restore_rebuilds_stored_records() {
        use podgrid_state::{PodRecord, PortBinding, RestartPolicy, RolloutStrategy};

        let store = StateStore::open_in_memory().unwrap();
        let record = PodRecord {
            id: 0,
            name: "api".to_string(),
            namespace: "apps".to_string(),
            team_id: 1,
            cpu_min: 0.1,
            cpu_max: 0.5,
            memory_min: 64.0,
            memory_max: 128.0,
            replicas: 3,
            image: "nginx:1.21".to_string(),
            pull_policy: "Always".to_string(),
            restart_policy: RestartPolicy::Always,
            rollout_strategy: RolloutStrategy::Rolling,
            ports: vec![PortBinding {
                container_port: 8080,
                protocol: "TCP".to_string(),
            }],
            env: Vec::new(),
        };
        store.create_pod(&record).unwrap();

        let orch = MemoryOrchestrator::new();
        assert_eq!(orch.restore(&store).await.unwrap(), 1);

        let deployment = orch.get("apps", "api").await.unwrap().unwrap();
        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        let ports = spec.template.spec.unwrap().containers[0].ports.clone();
        assert_eq!(ports.map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let orch = MemoryOrchestrator::new();
        orch.create("default", &named("api")).await.unwrap();
        orch.fail_next(Operation::Delete).await;

        let err = orch.delete("default", "api").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Api(_)));
        assert_eq!(orch.len().await, 1);

        orch.delete("default", "api").await.unwrap();
        assert!(orch.is_empty().await);
    }
}
