//! Orchestrator error types.

use mlgrid_core::{Endpoint, RequestId};
use mlgrid_engine::EngineError;
use thiserror::Error;

/// Errors raised by booking, dispatch, and release.
///
/// The first three variants are one taxonomy with different causes:
/// `NoAvailableEngine` is a retryable admission rejection, the other two
/// are caller bugs or internal inconsistencies.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Every engine is busy or off; the caller may retry later.
    #[error("no available engine to run {0}, try again later")]
    NoAvailableEngine(String),

    /// The request id is unknown — never booked, or already released.
    #[error("no booked engine with request id {request_id} to run {action}")]
    NoBookedEngine { request_id: RequestId, action: String },

    /// The ledger names an endpoint no engine carries. Not expected;
    /// logged as an internal-consistency failure where it is detected.
    #[error("no engine registered at {endpoint} to run {action}, ledger is inconsistent")]
    InconsistentLedger { endpoint: Endpoint, action: String },

    /// A domain action failed on the engine; passed through verbatim after
    /// the orchestrator's own bookkeeping.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl OrchestratorError {
    /// Whether retrying the same call later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestratorError::NoAvailableEngine(_))
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
