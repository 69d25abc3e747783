use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

// ─── Run configuration ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointTarget {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
}

impl EndpointTarget {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }
}

/// Settings for the synthetic producer pool driving a demo run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Number of concurrent Tokio tasks producing outcomes
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Outcomes each worker emits before it stops
    #[serde(default = "default_requests_per_worker")]
    pub requests_per_worker: u64,

    /// Bound of the outcome queue; producers wait when it is full
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Percentage of outcomes that come back as 5xx (0–100)
    #[serde(default = "default_error_pct")]
    pub error_pct: u8,

    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointTarget>,

    /// Worker `i` seeds its RNG with `seed + i`
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_method() -> String {
    "GET".into()
}
fn default_workers() -> u32 {
    10
}
fn default_requests_per_worker() -> u64 {
    100
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_error_pct() -> u8 {
    5
}
fn default_endpoints() -> Vec<EndpointTarget> {
    vec![
        EndpointTarget::new("GET", "/api/users"),
        EndpointTarget::new("POST", "/api/users"),
        EndpointTarget::new("GET", "/api/products"),
    ]
}
fn default_seed() -> u64 {
    1000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            requests_per_worker: default_requests_per_worker(),
            queue_capacity: default_queue_capacity(),
            error_pct: default_error_pct(),
            endpoints: default_endpoints(),
            seed: default_seed(),
        }
    }
}

impl RunConfig {
    /// Load from a JSON file; missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 || self.workers > 500 {
            return Err(ConfigError::Invalid(
                "workers must be between 1 and 500".into(),
            ));
        }
        if self.requests_per_worker == 0 || self.requests_per_worker > 1_000_000 {
            return Err(ConfigError::Invalid(
                "requests_per_worker must be between 1 and 1000000".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.error_pct > 100 {
            return Err(ConfigError::Invalid(
                "error_pct must be between 0 and 100".into(),
            ));
        }
        if self.endpoints.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one endpoint is required".into(),
            ));
        }
        Ok(())
    }

    pub fn total_requests(&self) -> u64 {
        u64::from(self.workers) * self.requests_per_worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = RunConfig::from_json("{}").unwrap();
        assert_eq!(config.workers, 10);
        assert_eq!(config.requests_per_worker, 100);
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.endpoints.len(), 3);
        assert_eq!(config.total_requests(), 1000);
    }

    #[test]
    fn endpoint_method_defaults_to_get() {
        let config =
            RunConfig::from_json(r#"{"endpoints":[{"url":"/health"}]}"#).unwrap();
        assert_eq!(config.endpoints, vec![EndpointTarget::new("GET", "/health")]);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for raw in [
            r#"{"workers":0}"#,
            r#"{"workers":501}"#,
            r#"{"requests_per_worker":0}"#,
            r#"{"queue_capacity":0}"#,
            r#"{"error_pct":101}"#,
            r#"{"endpoints":[]}"#,
        ] {
            assert!(
                matches!(RunConfig::from_json(raw), Err(ConfigError::Invalid(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            RunConfig::from_json("{workers:"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            RunConfig::from_file("/nonexistent/run.json"),
            Err(ConfigError::Read { .. })
        ));
    }
}
