//! mlgrid-orchestrator — the worker-pool scheduler.
//!
//! The [`Orchestrator`] owns the fixed engine list and the
//! [`RequestLedger`] and implements the booking protocol:
//!
//! - `book_engine` — first-idle-wins selection under a pool-wide critical
//!   section; no idle engine means immediate rejection, never a queue
//! - `run_on_engine` — one-shot dispatch that always releases afterwards
//! - `run_on_booked_engine` — one session step; the engine returns to
//!   `Booked` and the caller decides when the session ends
//! - `release_engine` / `complete_request` — ledger removal + back to idle
//!
//! Remote calls run holding only the per-engine dispatch lock, so a slow
//! call on one engine never blocks the rest of the pool.

pub mod error;
pub mod ledger;
pub mod orchestrator;

pub use error::{OrchestratorError, OrchestratorResult};
pub use ledger::{RequestLedger, RequestRecord};
pub use orchestrator::Orchestrator;
