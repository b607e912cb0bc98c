//! Storage rows and their mapping to and from [`PodRecord`].
//!
//! Rows are what actually lands in the redb tables. The record itself is
//! never serialized; each direction is an explicit field-by-field mapping.

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Scalar columns of a pod, stored in [`crate::tables::PODS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodRow {
    pub id: PodId,
    pub name: String,
    pub namespace: String,
    pub team_id: i64,
    pub cpu_min: f64,
    pub cpu_max: f64,
    pub memory_min: f64,
    pub memory_max: f64,
    pub replicas: u32,
    pub image: String,
    pub pull_policy: String,
    pub restart_policy: RestartPolicy,
    pub rollout_strategy: RolloutStrategy,
}

/// One row of [`crate::tables::POD_PORTS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRow {
    pub pod_id: PodId,
    pub container_port: u16,
    pub protocol: String,
}

/// One row of [`crate::tables::POD_ENVS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvRow {
    pub pod_id: PodId,
    pub key: String,
    pub value: String,
}

impl PodRow {
    /// Scalar columns of `record`, stored under `id`.
    pub fn from_record(id: PodId, record: &PodRecord) -> Self {
        Self {
            id,
            name: record.name.clone(),
            namespace: record.namespace.clone(),
            team_id: record.team_id,
            cpu_min: record.cpu_min,
            cpu_max: record.cpu_max,
            memory_min: record.memory_min,
            memory_max: record.memory_max,
            replicas: record.replicas,
            image: record.image.clone(),
            pull_policy: record.pull_policy.clone(),
            restart_policy: record.restart_policy,
            rollout_strategy: record.rollout_strategy,
        }
    }

    /// Reassemble a record from its row and owned rows.
    pub fn into_record(self, ports: Vec<PortRow>, env: Vec<EnvRow>) -> PodRecord {
        PodRecord {
            id: self.id,
            name: self.name,
            namespace: self.namespace,
            team_id: self.team_id,
            cpu_min: self.cpu_min,
            cpu_max: self.cpu_max,
            memory_min: self.memory_min,
            memory_max: self.memory_max,
            replicas: self.replicas,
            image: self.image,
            pull_policy: self.pull_policy,
            restart_policy: self.restart_policy,
            rollout_strategy: self.rollout_strategy,
            ports: ports.into_iter().map(PortRow::into_binding).collect(),
            env: env.into_iter().map(EnvRow::into_binding).collect(),
        }
    }
}

impl PortRow {
    pub fn from_binding(pod_id: PodId, binding: &PortBinding) -> Self {
        Self {
            pod_id,
            container_port: binding.container_port,
            protocol: binding.protocol.clone(),
        }
    }

    pub fn into_binding(self) -> PortBinding {
        PortBinding {
            container_port: self.container_port,
            protocol: self.protocol,
        }
    }
}

impl EnvRow {
    pub fn from_binding(pod_id: PodId, binding: &EnvBinding) -> Self {
        Self {
            pod_id,
            key: binding.key.clone(),
            value: binding.value.clone(),
        }
    }

    pub fn into_binding(self) -> EnvBinding {
        EnvBinding {
            key: self.key,
            value: self.value,
        }
    }
}
