//! Domain types for the podgrid record store.
//!
//! A [`PodRecord`] is the desired state of one workload. Its ports and
//! environment bindings are owned collections that are written, read and
//! deleted together with the record.

use serde::{Deserialize, Serialize};

/// Store-assigned identity of a pod record.
pub type PodId = i64;

// ── Pod record ─────────────────────────────────────────────────────

/// Desired state of a workload.
#[derive(Debug, Clone, PartialEq)]
pub struct PodRecord {
    /// Store-assigned id. Zero until the record has been created.
    pub id: PodId,
    /// Unique, immutable name; also the orchestrator object name.
    pub name: String,
    pub namespace: String,
    /// Owning team.
    pub team_id: i64,
    pub cpu_min: f64,
    pub cpu_max: f64,
    pub memory_min: f64,
    pub memory_max: f64,
    pub replicas: u32,
    /// Image reference (`repo:tag`).
    pub image: String,
    /// Image pull policy as submitted. Mapped to an orchestrator policy on
    /// translation.
    pub pull_policy: String,
    pub restart_policy: RestartPolicy,
    pub rollout_strategy: RolloutStrategy,
    pub ports: Vec<PortBinding>,
    pub env: Vec<EnvBinding>,
}

/// A container port exposed by a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub container_port: u16,
    /// Protocol as submitted (`TCP`, `UDP`, `SCTP`).
    pub protocol: String,
}

/// An environment variable injected into a pod's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvBinding {
    pub key: String,
    pub value: String,
}

/// Container restart policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RestartPolicy {
    #[default]
    Always,
    OnFailure,
    Never,
}

/// Rollout strategy requested for a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RolloutStrategy {
    Recreate,
    #[default]
    Rolling,
    Custom,
}

impl RestartPolicy {
    /// Parse the wire name of a restart policy.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Always" => Some(Self::Always),
            "OnFailure" => Some(Self::OnFailure),
            "Never" => Some(Self::Never),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::OnFailure => "OnFailure",
            Self::Never => "Never",
        }
    }
}

impl RolloutStrategy {
    /// Parse the wire name of a rollout strategy.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Recreate" => Some(Self::Recreate),
            "Rolling" => Some(Self::Rolling),
            "Custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recreate => "Recreate",
            Self::Rolling => "Rolling",
            Self::Custom => "Custom",
        }
    }
}
