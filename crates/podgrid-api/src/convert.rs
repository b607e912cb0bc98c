//! Conversions between wire payloads and pod records.
//!
//! Inbound conversion is where request shape is validated; anything that
//! cannot be represented as a [`PodRecord`] is a `PodError::Validation`.
//! Pull policy and port protocol are carried verbatim: unknown values are
//! resolved when the Deployment is built, not rejected here.

use std::collections::HashSet;

use podgrid_reconciler::{PodError, PodResult};
use podgrid_state::*;

use crate::wire::*;

/// Namespace used when a request leaves it empty.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Convert a request payload into a pod record.
///
/// The payload's `id` is copied as-is; callers decide whether it is used.
pub fn pod_from_info(info: &PodInfo) -> PodResult<PodRecord> {
    if info.pod_name.trim().is_empty() {
        return Err(invalid("pod_name must not be empty"));
    }
    if info.pod_image.trim().is_empty() {
        return Err(invalid("pod_image must not be empty"));
    }
    let replicas = u32::try_from(info.pod_replicas).map_err(|_| {
        invalid(format!(
            "pod_replicas must not be negative, got {}",
            info.pod_replicas
        ))
    })?;

    Ok(PodRecord {
        id: info.id,
        name: info.pod_name.clone(),
        namespace: if info.pod_namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            info.pod_namespace.clone()
        },
        team_id: info.pod_team_id,
        cpu_min: info.pod_cpu_min,
        cpu_max: info.pod_cpu_max,
        memory_min: info.pod_memory_min,
        memory_max: info.pod_memory_max,
        replicas,
        image: info.pod_image.clone(),
        pull_policy: info.pod_pull_policy.clone(),
        restart_policy: restart_policy(&info.pod_restart)?,
        rollout_strategy: rollout_strategy(&info.pod_type)?,
        ports: info
            .pod_port
            .iter()
            .map(port_from_info)
            .collect::<PodResult<_>>()?,
        env: env_from_info(&info.pod_env)?,
    })
}

/// Convert a pod record into a response payload.
pub fn info_from_pod(record: &PodRecord) -> PodInfo {
    PodInfo {
        id: record.id,
        pod_name: record.name.clone(),
        pod_namespace: record.namespace.clone(),
        pod_team_id: record.team_id,
        pod_cpu_min: record.cpu_min,
        pod_cpu_max: record.cpu_max,
        // Inbound conversion only accepts non-negative i32 values.
        pod_replicas: i32::try_from(record.replicas).unwrap_or(i32::MAX),
        pod_memory_min: record.memory_min,
        pod_memory_max: record.memory_max,
        pod_port: record
            .ports
            .iter()
            .map(|port| PodPortInfo {
                container_port: i32::from(port.container_port),
                protocol: port.protocol.clone(),
            })
            .collect(),
        pod_env: record
            .env
            .iter()
            .map(|binding| PodEnvInfo {
                env_key: binding.key.clone(),
                env_value: binding.value.clone(),
            })
            .collect(),
        pod_pull_policy: record.pull_policy.clone(),
        pod_restart: record.restart_policy.as_str().to_string(),
        pod_type: record.rollout_strategy.as_str().to_string(),
        pod_image: record.image.clone(),
    }
}

fn port_from_info(port: &PodPortInfo) -> PodResult<PortBinding> {
    match u16::try_from(port.container_port) {
        Ok(container_port) if container_port != 0 => Ok(PortBinding {
            container_port,
            protocol: port.protocol.clone(),
        }),
        _ => Err(invalid(format!(
            "container_port must be within 1-65535, got {}",
            port.container_port
        ))),
    }
}

fn env_from_info(env: &[PodEnvInfo]) -> PodResult<Vec<EnvBinding>> {
    let mut seen = HashSet::new();
    env.iter()
        .map(|entry| {
            if entry.env_key.is_empty() {
                return Err(invalid("env_key must not be empty"));
            }
            if !seen.insert(entry.env_key.as_str()) {
                return Err(invalid(format!("duplicate env_key {}", entry.env_key)));
            }
            Ok(EnvBinding {
                key: entry.env_key.clone(),
                value: entry.env_value.clone(),
            })
        })
        .collect()
}

fn restart_policy(value: &str) -> PodResult<RestartPolicy> {
    if value.is_empty() {
        return Ok(RestartPolicy::default());
    }
    RestartPolicy::from_name(value).ok_or_else(|| {
        invalid(format!(
            "pod_restart must be Always, OnFailure or Never, got {value}"
        ))
    })
}

fn rollout_strategy(value: &str) -> PodResult<RolloutStrategy> {
    if value.is_empty() {
        return Ok(RolloutStrategy::default());
    }
    RolloutStrategy::from_name(value).ok_or_else(|| {
        invalid(format!(
            "pod_type must be Recreate, Rolling or Custom, got {value}"
        ))
    })
}

fn invalid(msg: impl Into<String>) -> PodError {
    PodError::Validation(msg.into())
}
