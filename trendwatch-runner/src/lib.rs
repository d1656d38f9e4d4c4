//! TrendWatch Runner: scheduling, publication and serving of trend results.
//!
//! This crate builds on `trendwatch-core` to provide:
//! - TOML configuration with defaults and validation
//! - Epoch-aligned cadence math
//! - The evaluation scheduler with per-pair failure isolation
//! - The latest-results store shared with the status endpoint
//! - Result sinks (daily logs, JSON snapshot, console)
//! - The axum status endpoint and tracing setup

pub mod cadence;
pub mod config;
pub mod logging;
pub mod scheduler;
pub mod sinks;
pub mod status;
pub mod store;

pub use cadence::{Cadence, ParseCadenceError};
pub use config::{ConfigError, MonitorConfig};
pub use logging::init_tracing;
pub use scheduler::{
    EvaluationCycle, EvaluationError, PairFailure, Scheduler, SchedulerConfig, SchedulerState,
};
pub use sinks::{ConsoleSink, ResultSink, SinkError, SnapshotSink, TrendLogSink};
pub use status::{router, serve, StatusState, TrendView};
pub use store::LatestResults;
