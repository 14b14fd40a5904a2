//! Synthetic IoT sensor traffic for ingestion service load testing.
//!
//! Simulated users repeatedly pick a traffic kind by weight, build a JSON
//! reading and `POST` it to `/ingest`, pausing a random interval between
//! requests.
//!
//! # Traffic
//! - `known_device` (weight 5): one of four catalog devices reports its
//!   typed reading (`temperature`, `brightness`, `motion`,
//!   `low_power_output`)
//! - `unknown_device` (weight 1): a random, unregistered device id reports
//!   a `noise` reading
//!
//! # Usage
//! ```bash
//! # 20 users for two minutes
//! sensor-ingest-simulator run --server http://localhost:8080 --users 20 --duration 120
//!
//! # Print payloads without sending anything
//! sensor-ingest-simulator sample --count 5 --seed 42
//! ```

pub mod config;
pub mod error;
pub mod fleet;
pub mod pacing;
pub mod payload;
pub mod report;
pub mod tasks;
pub mod workload;
pub mod writer;

pub use config::{Config, PacingConfig, RequestConfig};
pub use error::{Result, SimulatorError};
pub use fleet::{DeviceFixture, ReadingValue, ValueGenerator, DEVICE_CATALOG};
pub use pacing::Pacing;
pub use payload::{IngestPayload, Reading, TrafficModel};
pub use report::Report;
pub use tasks::{TaskKind, TaskTable, TaskWeights};
pub use workload::run_workload;
