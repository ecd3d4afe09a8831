//! mlgrid-core — shared types, domain model, and coordinator configuration.
//!
//! Everything the other mlgrid crates agree on lives here:
//!
//! - `Endpoint`, `EngineState`, `RequestId` — the pool's identity and
//!   state vocabulary
//! - The time-series and classifier request/response payloads that travel
//!   between the coordinator and the engine processes
//! - `CoordinatorConfig` — explicit configuration, built once at startup
//!   and passed down (no ambient globals)

pub mod config;
pub mod model;
pub mod types;

pub use config::CoordinatorConfig;
pub use types::{Endpoint, EngineState, RequestId};
