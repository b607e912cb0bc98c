//! Reconciler — drives pod records into the orchestrator and the store.

use std::sync::Arc;

use tracing::{info, warn};

use podgrid_k8s::{Orchestrator, translate};
use podgrid_state::{PodId, PodRecord, StateError, StateStore};

use crate::error::{PodError, PodResult};

/// Applies pod records to the orchestrator and persists them.
///
/// Both collaborators are injected and shared; a `Reconciler` is cheap to
/// clone. Concurrent calls for the same name are not serialized: two
/// creates can both see the name as absent, in which case the orchestrator
/// rejects the second one.
#[derive(Clone)]
pub struct Reconciler {
    orchestrator: Arc<dyn Orchestrator>,
    store: StateStore,
}

impl Reconciler {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, store: StateStore) -> Self {
        Self {
            orchestrator,
            store,
        }
    }

    /// The record store, for reads that do not involve the orchestrator.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Create the Deployment for `record`, then persist the record.
    ///
    /// Fails with `AlreadyExists` without touching the orchestrator when a
    /// record already holds the name in any namespace, and without touching
    /// the store when the Deployment is already present. Returns the
    /// store-assigned id.
    pub async fn create(&self, record: &PodRecord) -> PodResult<PodId> {
        let (namespace, name) = (record.namespace.as_str(), record.name.as_str());
        let deployment = translate(record);

        if let Some(id) = self.store.find_pod_id(name)? {
            warn!(id, %namespace, %name, "pod name already recorded");
            return Err(PodError::AlreadyExists(name.to_string()));
        }
        if self.orchestrator.get(namespace, name).await?.is_some() {
            warn!(%namespace, %name, "deployment already exists");
            return Err(PodError::AlreadyExists(name.to_string()));
        }
        self.orchestrator.create(namespace, &deployment).await?;
        info!(%namespace, %name, replicas = record.replicas, "deployment created");

        let id = self
            .store
            .create_pod(record)
            .map_err(|e| unrecorded(name, "create", e))?;
        info!(id, %name, "pod added");
        Ok(id)
    }

    /// Replace the Deployment for a stored record, then replace the record.
    ///
    /// `record.id` must name a stored record with the same name and
    /// namespace. Fails with `NotFound` without any mutation when the
    /// Deployment is absent.
    pub async fn update(&self, record: &PodRecord) -> PodResult<()> {
        let stored = self.store.get_pod(record.id)?;
        if stored.name != record.name {
            return Err(PodError::Validation(format!(
                "pod {} is named {}, names cannot change",
                record.id, stored.name
            )));
        }
        if stored.namespace != record.namespace {
            return Err(PodError::Validation(format!(
                "pod {} lives in namespace {}, namespaces cannot change",
                record.id, stored.namespace
            )));
        }

        let (namespace, name) = (record.namespace.as_str(), record.name.as_str());
        let deployment = translate(record);

        if self.orchestrator.get(namespace, name).await?.is_none() {
            warn!(%namespace, %name, "deployment missing, create the pod first");
            return Err(PodError::NotFound(format!("deployment {namespace}/{name}")));
        }
        self.orchestrator.update(namespace, &deployment).await?;
        info!(%namespace, %name, replicas = record.replicas, "deployment updated");

        self.store
            .update_pod(record)
            .map_err(|e| unrecorded(name, "update", e))?;
        info!(id = record.id, %name, "pod updated");
        Ok(())
    }

    /// Look up a stored record by id and delete it with its Deployment.
    pub async fn delete(&self, id: PodId) -> PodResult<()> {
        let record = self.store.get_pod(id)?;
        self.delete_by_record(&record).await
    }

    /// Delete the Deployment for `record`, then the record and its owned rows.
    ///
    /// If the orchestrator call fails the record is left untouched, so the
    /// delete can be retried. A Deployment that is already gone is reported
    /// as `NotFound` like any other orchestrator failure.
    pub async fn delete_by_record(&self, record: &PodRecord) -> PodResult<()> {
        let (namespace, name) = (record.namespace.as_str(), record.name.as_str());

        if let Err(e) = self.orchestrator.delete(namespace, name).await {
            warn!(%namespace, %name, error = %e, "deployment delete failed, record kept");
            return Err(e.into());
        }
        info!(%namespace, %name, "deployment deleted");

        self.store
            .delete_pod(record.id)
            .map_err(|e| unrecorded(name, "delete", e))?;
        info!(id = record.id, %name, "pod deleted");
        Ok(())
    }
}

/// Report a store failure that followed a successful orchestrator call.
fn unrecorded(name: &str, operation: &str, err: StateError) -> PodError {
    warn!(
        %name,
        operation,
        error = %err,
        "orchestrator applied but store write failed; deployment and record differ"
    );
    err.into()
}
