//! Configuration structs for the sensor ingest simulator.

use crate::error::{Result, SimulatorError};
use crate::pacing::Pacing;
use crate::tasks::TaskWeights;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for the simulator - can be loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ingestion service base URL (e.g., "http://localhost:8080")
    pub server_url: String,

    /// Number of concurrent simulated users
    pub users: usize,

    /// How long to run, in seconds
    pub duration_secs: f64,

    /// Wait between two actions of one user
    pub pacing: PacingConfig,

    /// Traffic mix
    pub tasks: TaskWeights,

    /// HTTP request settings
    pub request: RequestConfig,

    /// Seed for reproducible runs; each user derives its own stream from it
    pub seed: Option<u64>,

    /// Output file for the report (optional)
    pub output_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            users: 10,
            duration_secs: 60.0,
            pacing: PacingConfig::default(),
            tasks: TaskWeights::default(),
            request: RequestConfig::default(),
            seed: None,
            output_file: None,
        }
    }
}

/// Pacing interval between tasks of one simulated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_wait_secs: f64,
    pub max_wait_secs: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_wait_secs: 0.2,
            max_wait_secs: 1.0,
        }
    }
}

/// HTTP request settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Request timeout in seconds
    pub timeout_secs: f64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_secs: 30.0 }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Write default config to a file (for generating example config)
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(&Self::default())?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Checks the settings a run depends on.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(invalid("server_url must not be empty"));
        }
        if self.users == 0 {
            return Err(invalid("users must be at least 1"));
        }
        check_secs("duration_secs", self.duration_secs)?;
        check_secs("pacing.min_wait_secs", self.pacing.min_wait_secs)?;
        check_secs("pacing.max_wait_secs", self.pacing.max_wait_secs)?;
        check_secs("request.timeout_secs", self.request.timeout_secs)?;
        if self.request.timeout_secs == 0.0 {
            return Err(invalid("request.timeout_secs must be greater than zero"));
        }
        if self.pacing.min_wait_secs > self.pacing.max_wait_secs {
            return Err(invalid(format!(
                "pacing.min_wait_secs ({}) exceeds pacing.max_wait_secs ({})",
                self.pacing.min_wait_secs, self.pacing.max_wait_secs
            )));
        }
        self.tasks.validate()
    }

    pub fn duration(&self) -> Duration {
        secs(self.duration_secs)
    }

    pub fn timeout(&self) -> Duration {
        secs(self.request.timeout_secs)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::new(
            secs(self.pacing.min_wait_secs),
            secs(self.pacing.max_wait_secs),
        )
    }

    /// Full URL of the ingest endpoint.
    pub fn ingest_url(&self) -> String {
        format!("{}/ingest", self.server_url.trim_end_matches('/'))
    }
}

fn invalid(msg: impl Into<String>) -> SimulatorError {
    SimulatorError::InvalidConfig(msg.into())
}

fn check_secs(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }
    Ok(())
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
