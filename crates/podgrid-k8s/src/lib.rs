//! podgrid-k8s — the orchestrator side of podgrid.
//!
//! - [`translate`] maps a [`podgrid_state::PodRecord`] to an `apps/v1`
//!   [`Deployment`](k8s_openapi::api::apps::v1::Deployment).
//! - [`Orchestrator`] is the narrow get/create/update/delete interface the
//!   reconciler drives. [`KubeOrchestrator`] talks to a real cluster;
//!   [`MemoryOrchestrator`] keeps Deployments in memory for standalone mode
//!   and tests.

pub mod client;
pub mod memory;
pub mod orchestrator;
pub mod translate;

pub use client::KubeOrchestrator;
pub use memory::{MemoryOrchestrator, Operation};
pub use orchestrator::{Orchestrator, OrchestratorError, OrchestratorFuture, OrchestratorResult};
pub use translate::{translate, APP_LABEL};
