//! Native HTTP load generator for a registration/login flow.
//!
//! Drives a pool of synthetic users through a fixed four-request sequence
//! (CORS preflight + register, CORS preflight + login) against a target
//! gateway, collects per-request latency and pass/fail outcomes, and
//! evaluates global assertions once every virtual user has finished.

pub mod config;
pub mod error;
pub mod feeder;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod target;

// Re-export commonly used types
pub use config::LoadgenConfig;
pub use error::{LoadgenError, Result};
pub use feeder::{UserFeeder, UserRecord};
pub use metrics::{MetricsCollector, RunReport};
pub use runner::ScenarioRunner;
pub use scenario::{Session, Step};
