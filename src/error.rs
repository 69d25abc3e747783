use thiserror::Error;

/// Failure while emitting the final run report.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The report could not be encoded as JSON
    #[error("serializing run summary: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The encoded report could not be written to its sink
    #[error("writing run summary: {0}")]
    Write(#[from] std::io::Error),

    /// The blocking finalization task died before returning
    #[error("finalizer task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Problems with the demo run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
