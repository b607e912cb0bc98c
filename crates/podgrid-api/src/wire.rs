//! Request and response payloads.
//!
//! Field names follow the pod service's message definitions, so existing
//! clients can keep sending the same JSON. Every field is optional on input
//! and takes its zero value when omitted.

use serde::{Deserialize, Serialize};

/// A pod as sent and returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodInfo {
    pub id: i64,
    pub pod_name: String,
    pub pod_namespace: String,
    pub pod_team_id: i64,
    pub pod_cpu_min: f64,
    pub pod_cpu_max: f64,
    pub pod_replicas: i32,
    pub pod_memory_min: f64,
    pub pod_memory_max: f64,
    pub pod_port: Vec<PodPortInfo>,
    pub pod_env: Vec<PodEnvInfo>,
    pub pod_pull_policy: String,
    pub pod_restart: String,
    pub pod_type: String,
    pub pod_image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodPortInfo {
    pub container_port: i32,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodEnvInfo {
    pub env_key: String,
    pub env_value: String,
}

/// Outcome message of a mutating call, or the message of any failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodResponse {
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Every stored pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllPod {
    pub pod_info: Vec<PodInfo>,
}

impl PodResponse {
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            id: None,
        }
    }
}
