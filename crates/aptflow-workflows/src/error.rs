//! Error types for workflow orchestration

use thiserror::Error;

use aptflow_agents::{RegistryError, WorkerError};

/// Orchestrator failure
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Unknown worker: {0}")]
    UnknownWorker(String),

    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),

    #[error("Name already registered: {0}")]
    DuplicateName(String),

    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("Worker '{worker}' timed out after {timeout_ms}ms")]
    WorkerTimeout { worker: String, timeout_ms: u64 },

    #[error("Critical failure in step '{0}'")]
    CriticalStepFailure(String),

    #[error("Engine fault: {0}")]
    EngineFault(String),

    #[error(transparent)]
    Config(#[from] aptflow_core::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using OrchestratorError
pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl OrchestratorError {
    pub fn engine_fault(msg: impl Into<String>) -> Self {
        OrchestratorError::EngineFault(msg.into())
    }

    pub fn invalid_workflow(msg: impl Into<String>) -> Self {
        OrchestratorError::InvalidWorkflow(msg.into())
    }

    /// Whether the caller can retry with a corrected request
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, OrchestratorError::EngineFault(_))
    }
}

impl From<RegistryError> for OrchestratorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateName(name) => OrchestratorError::DuplicateName(name),
            RegistryError::UnknownWorker(name) => OrchestratorError::UnknownWorker(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_errors_map_to_orchestrator_errors() {
        let err: OrchestratorError = RegistryError::UnknownWorker("ghost".into()).into();
        assert!(matches!(err, OrchestratorError::UnknownWorker(ref n) if n == "ghost"));
        assert_eq!(err.to_string(), "Unknown worker: ghost");
    }

    #[test]
    fn test_timeout_message() {
        let err = OrchestratorError::WorkerTimeout {
            worker: "content".into(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "Worker 'content' timed out after 250ms");
        assert!(err.is_recoverable());
        assert!(!OrchestratorError::engine_fault("boom").is_recoverable());
    }
}
