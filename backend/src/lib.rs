//! Data-access and aggregation layer for the zine sharing app.
//!
//! - [`domain`]: entities, the aggregation service, the invalidation bus
//!   and the ports it consumes.
//! - [`outbound`]: in-process adapters for those ports.
//! - [`config`]: OrthoConfig-backed settings.
//! - [`telemetry`]: `tracing` subscriber setup.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;
