//! mlgrid-engine — one pooled compute engine and its backing OS process.
//!
//! An [`Engine`] couples three things:
//!
//! - a [`ProcessSupervisor`] that launches the engine's server process,
//!   probes that it survived startup, and watches for unexpected exits
//! - a four-state lifecycle (`Off`/`Idle`/`Booked`/`Computing`) driven by
//!   the orchestrator during dispatch and by the engine itself during
//!   launch and crash recovery
//! - a lazily-built JSON-over-HTTP [`EngineClient`] bound to the engine's
//!   endpoint, one call per domain action
//!
//! # Architecture
//!
//! ```text
//! Engine
//!   ├── ProcessSupervisor
//!   │     ├── ProcessLauncher (trait; spawns the server process)
//!   │     └── watcher task (fires the exit callback exactly once)
//!   ├── EngineState (plain mutex, short critical sections)
//!   └── EngineClient (hyper, one POST per action)
//! ```

pub mod client;
pub mod engine;
pub mod error;
pub mod launcher;
pub mod supervisor;

pub use client::EngineClient;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use launcher::{ProcessLauncher, PythonLauncher};
pub use supervisor::{ExitCallback, ProcessSupervisor};
