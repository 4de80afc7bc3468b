//! Runtime glue that wires configuration, telemetry, and the top-level
//! orchestrator together.

pub mod config;
pub mod orchestrator;
pub mod telemetry;
