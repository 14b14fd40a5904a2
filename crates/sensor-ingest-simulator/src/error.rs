//! Error types for the sensor ingest simulator

use thiserror::Error;

/// Simulator error types
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Histogram error: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("Task join failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimulatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_converts() {
        let err: SimulatorError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, SimulatorError::Json(_)));
        assert!(err.to_string().starts_with("JSON error"));
    }
}
