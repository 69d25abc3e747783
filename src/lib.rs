//! Result aggregation for HTTP load runs.
//!
//! Concurrent workers push one [`OutcomeEvent`] per finished request
//! onto a bounded queue. A single [`Aggregator`] drains it, and once
//! every producer has dropped its sender the [`Finalizer`] prints one
//! JSON [`RunSummary`] to stdout and releases anyone waiting on the
//! run's [`Completion`].

pub mod config;
pub mod error;
pub mod load_generator;
pub mod metrics;
pub mod telemetry;

pub use error::{ConfigError, SummaryError};
pub use metrics::{
    spawn_aggregator, Aggregator, Completion, Finalizer, OutcomeEvent, RunSummary,
};
