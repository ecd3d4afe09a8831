//! Shared identity and state types used across mlgrid crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Network identity of one engine: an immutable (host, port) pair.
///
/// Used as the key for per-engine locks and the request ledger, so it
/// carries value equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL of the engine's HTTP surface, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lifecycle state of one pooled engine.
///
/// The orchestrator drives `Idle ↔ Booked ↔ Computing`; the engine itself
/// drives `Off ↔ Idle` during launch and crash recovery. There is no
/// terminal state — engines are cycled, never destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// No live backing process.
    Off,
    /// Process alive, not reserved for any request.
    Idle,
    /// Reserved for a request id; no call currently in flight.
    Booked,
    /// A remote call is currently executing.
    Computing,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Off => "off",
            EngineState::Idle => "idle",
            EngineState::Booked => "booked",
            EngineState::Computing => "computing",
        };
        f.write_str(s)
    }
}

/// Opaque token identifying one booked request.
///
/// Allocated by the request ledger from a monotonically increasing counter;
/// clients treat it as opaque and hand it back on every session step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
