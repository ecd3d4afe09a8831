//! Workflow error types.

use mlgrid_orchestrator::OrchestratorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Scheduling or engine failure, surfaced unchanged — the workflow
    /// layer only adds cleanup, never rewrites the original error.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// The request is malformed independently of any engine.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Whether retrying the same call later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Orchestrator(error) if error.is_retryable())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
