//! Engine error types.

use mlgrid_core::Endpoint;
use thiserror::Error;

/// Errors produced while launching an engine process or calling it.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The process exited during the readiness window; carries whatever it
    /// wrote to stderr before dying.
    #[error("failed to create engine: {stderr}")]
    Creation { stderr: String },

    /// Engine-level wrapper around any launch failure; the engine stays
    /// `Off` when this surfaces.
    #[error("unable to launch engine {endpoint}: {source}")]
    UnableToLaunch {
        endpoint: Endpoint,
        #[source]
        source: Box<EngineError>,
    },

    /// The launcher could not start the process at all.
    #[error("failed to spawn engine process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The engine replied with a non-2xx status; the body is surfaced
    /// verbatim and never interpreted here.
    #[error("engine returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// The call never produced an HTTP response.
    #[error("engine transport error: {0}")]
    Transport(String),

    /// The engine replied 2xx with a body that breaks the wire contract.
    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
