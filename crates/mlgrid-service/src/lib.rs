//! mlgrid-service — the two request shapes composed over the orchestrator.
//!
//! - [`TimeSeriesService`]: one-shot request/response actions; the engine
//!   is booked, used, and released inside a single call.
//! - [`ClassifierService`]: multi-step sessions — start books an engine,
//!   data pushes run against it, predict or accuracy ends it. A failure at
//!   any step triggers the compensating cancel-then-release cleanup so no
//!   engine is ever stranded in `Booked`.
//!
//! Consumed by the REST layer; carries no scheduling logic of its own.

pub mod classifier;
pub mod error;
pub mod timeseries;

pub use classifier::ClassifierService;
pub use error::{ServiceError, ServiceResult};
pub use timeseries::TimeSeriesService;
