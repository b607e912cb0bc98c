//! The orchestrator interface and its error type.

use std::future::Future;
use std::pin::Pin;

use k8s_openapi::api::apps::v1::Deployment;
use thiserror::Error;

/// Result type alias for orchestrator calls.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Boxed future alias for orchestrator calls.
pub type OrchestratorFuture<'a, T> =
    Pin<Box<dyn Future<Output = OrchestratorResult<T>> + Send + 'a>>;

/// Errors returned by an orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("deployment {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("deployment {namespace}/{name} already exists")]
    Conflict { namespace: String, name: String },

    #[error("orchestrator api error: {0}")]
    Api(String),

    #[error("orchestrator client error: {0}")]
    Client(String),
}

impl OrchestratorError {
    pub fn not_found(namespace: &str, name: &str) -> Self {
        Self::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn conflict(namespace: &str, name: &str) -> Self {
        Self::Conflict {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// Deployment operations against a cluster, injected into the reconciler.
///
/// `get` returning `Ok(None)` is the only existence signal the reconciler
/// relies on. Implementations must not retry internally; every call is a
/// single round trip, cancelled when the returned future is dropped.
pub trait Orchestrator: Send + Sync {
    /// Fetch a Deployment by namespace and name.
    fn get<'a>(&'a self, namespace: &'a str, name: &'a str)
    -> OrchestratorFuture<'a, Option<Deployment>>;

    /// Create a Deployment in `namespace`.
    fn create<'a>(
        &'a self,
        namespace: &'a str,
        deployment: &'a Deployment,
    ) -> OrchestratorFuture<'a, Deployment>;

    /// Replace the Deployment named by `deployment.metadata.name`.
    fn update<'a>(
        &'a self,
        namespace: &'a str,
        deployment: &'a Deployment,
    ) -> OrchestratorFuture<'a, Deployment>;

    /// Delete a Deployment by namespace and name.
    fn delete<'a>(&'a self, namespace: &'a str, name: &'a str) -> OrchestratorFuture<'a, ()>;
}

/// `metadata.name` of a Deployment about to be sent.
pub(crate) fn object_name(deployment: &Deployment) -> OrchestratorResult<&str> {
    deployment
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| OrchestratorError::Api("deployment has no metadata.name".to_string()))
}
