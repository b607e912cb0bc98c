//! Pod operation error types.

use thiserror::Error;

use podgrid_k8s::OrchestratorError;
use podgrid_state::StateError;

/// Errors surfaced by pod operations, each carrying a human-readable message.
#[derive(Debug, Error)]
pub enum PodError {
    /// The request cannot be converted into a pod record.
    #[error("invalid pod: {0}")]
    Validation(String),

    #[error("pod {0} already exists")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("orchestrator error: {0}")]
    Orchestrator(OrchestratorError),

    #[error("store error: {0}")]
    Store(StateError),
}

pub type PodResult<T> = Result<T, PodError>;

impl From<OrchestratorError> for PodError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::NotFound { namespace, name } => {
                Self::NotFound(format!("deployment {namespace}/{name}"))
            }
            OrchestratorError::Conflict { name, .. } => Self::AlreadyExists(name),
            other => Self::Orchestrator(other),
        }
    }
}

impl From<StateError> for PodError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(what) => Self::NotFound(what),
            StateError::Immutable(msg) => Self::Validation(msg),
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orchestrator_errors_are_classified() {
        let err: PodError = OrchestratorError::not_found("default", "api").into();
        assert!(matches!(err, PodError::NotFound(ref what) if what == "deployment default/api"));

        let err: PodError = OrchestratorError::conflict("default", "api").into();
        assert!(matches!(err, PodError::AlreadyExists(ref name) if name == "api"));

        let err: PodError = OrchestratorError::Client("connection refused".into()).into();
        assert!(matches!(err, PodError::Orchestrator(_)));
    }

    #[test]
    fn store_errors_are_classified() {
        let err: PodError = StateError::NotFound("pod 9".into()).into();
        assert!(matches!(err, PodError::NotFound(_)));

        let err: PodError = StateError::Conflict("pod name api already in use".into()).into();
        assert!(matches!(err, PodError::Store(_)));
        assert_eq!(
            err.to_string(),
            "store error: conflict: pod name api already in use"
        );
    }
}
