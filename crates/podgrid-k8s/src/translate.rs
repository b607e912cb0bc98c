//! Pod record → Deployment translation.
//!
//! [`translate`] is pure and total: every record yields a Deployment. The
//! Deployment is rebuilt in full on every create and update; nothing is
//! carried over from the live object.
//!
//! Mapping rules:
//! - object name, container name and the `app-name` label all use the
//!   record name; the selector's `matchLabels` equal the template labels
//! - ports are named `port-<n>`; unknown protocols become `TCP`
//! - unknown image pull policies become `Always`
//! - both resource limits and requests come from the record's maximum CPU
//!   and memory, rendered with six fractional digits
//! - probes, volumes, strategy and restart policy are left to the
//!   orchestrator's defaults

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use podgrid_state::{EnvBinding, PodRecord, PortBinding};

/// Label binding a Deployment's selector to its pod template.
pub const APP_LABEL: &str = "app-name";

/// Container port protocol accepted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Map a stored protocol name, falling back to TCP.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "UDP" => Self::Udp,
            "SCTP" => Self::Sctp,
            _ => Self::Tcp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Sctp => "SCTP",
        }
    }
}

/// Image pull policy accepted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl PullPolicy {
    /// Map a stored pull policy, falling back to `Always`.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "IfNotPresent" => Self::IfNotPresent,
            "Never" => Self::Never,
            _ => Self::Always,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::IfNotPresent => "IfNotPresent",
            Self::Never => "Never",
        }
    }
}

/// Build the Deployment for a pod record.
pub fn translate(record: &PodRecord) -> Deployment {
    let labels = app_labels(&record.name);

    let container = Container {
        name: record.name.clone(),
        image: Some(record.image.clone()),
        ports: container_ports(&record.ports),
        env: env_vars(&record.env),
        resources: Some(resources(record)),
        image_pull_policy: Some(
            PullPolicy::from_stored(&record.pull_policy)
                .as_str()
                .to_string(),
        ),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(record.name.clone()),
            namespace: Some(record.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(i32::try_from(record.replicas).unwrap_or(i32::MAX)),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                match_expressions: None,
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Labels applied to the object, its selector and its pod template.
pub fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), name.to_string())])
}

/// Render a resource amount as a fixed-point quantity.
pub fn quantity(value: f64) -> Quantity {
    Quantity(format!("{value:.6}"))
}

fn container_ports(ports: &[PortBinding]) -> Option<Vec<ContainerPort>> {
    if ports.is_empty() {
        return None;
    }
    Some(
        ports
            .iter()
            .map(|port| ContainerPort {
                name: Some(format!("port-{}", port.container_port)),
                container_port: i32::from(port.container_port),
                protocol: Some(Protocol::from_stored(&port.protocol).as_str().to_string()),
                ..Default::default()
            })
            .collect(),
    )
}

fn env_vars(env: &[EnvBinding]) -> Option<Vec<EnvVar>> {
    if env.is_empty() {
        return None;
    }
    Some(
        env.iter()
            .map(|binding| EnvVar {
                name: binding.key.clone(),
                value: Some(binding.value.clone()),
                value_from: None,
            })
            .collect(),
    )
}

fn resources(record: &PodRecord) -> ResourceRequirements {
    // Requests mirror limits; the stored minimums are not used.
    let amounts = BTreeMap::from([
        ("cpu".to_string(), quantity(record.cpu_max)),
        ("memory".to_string(), quantity(record.memory_max)),
    ]);
    ResourceRequirements {
        limits: Some(amounts.clone()),
        requests: Some(amounts),
        ..Default::default()
    }
}
