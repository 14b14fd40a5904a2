//! Weighted task selection between the two traffic kinds.

use crate::error::{Result, SimulatorError};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinds of simulated traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// A catalog device reporting its typed reading
    KnownDevice,
    /// An unregistered device reporting noise
    UnknownDevice,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::KnownDevice => "known_device",
            TaskKind::UnknownDevice => "unknown_device",
        }
    }

    pub fn all() -> &'static [TaskKind] {
        &[TaskKind::KnownDevice, TaskKind::UnknownDevice]
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative selection weights per task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskWeights {
    pub known_device: u32,
    pub unknown_device: u32,
}

impl Default for TaskWeights {
    fn default() -> Self {
        Self {
            known_device: 5,
            unknown_device: 1,
        }
    }
}

impl TaskWeights {
    pub fn weight(&self, task: TaskKind) -> u32 {
        match task {
            TaskKind::KnownDevice => self.known_device,
            TaskKind::UnknownDevice => self.unknown_device,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.known_device.checked_add(self.unknown_device).unwrap_or(0) == 0 {
            return Err(SimulatorError::InvalidConfig(
                "task weights must be non-zero and must not overflow".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cumulative weight table drawn against a single uniform integer.
#[derive(Debug, Clone)]
pub struct TaskTable {
    /// (task, exclusive upper bound of its cumulative range)
    entries: Vec<(TaskKind, u32)>,
    total: u32,
}

impl TaskTable {
    pub fn new(weights: &TaskWeights) -> Result<Self> {
        weights.validate()?;

        let mut entries = Vec::with_capacity(TaskKind::all().len());
        let mut total = 0u32;
        for &task in TaskKind::all() {
            let weight = weights.weight(task);
            if weight == 0 {
                continue;
            }
            total += weight;
            entries.push((task, total));
        }

        Ok(Self { entries, total })
    }

    pub fn total_weight(&self) -> u32 {
        self.total
    }

    /// Probability that `task` is selected on a single draw.
    pub fn probability(&self, task: TaskKind) -> f64 {
        let mut lower = 0;
        for &(t, upper) in &self.entries {
            if t == task {
                return (upper - lower) as f64 / self.total as f64;
            }
            lower = upper;
        }
        0.0
    }

    pub fn select(&self, rng: &mut impl Rng) -> TaskKind {
        let roll = rng.gen_range(0..self.total);
        self.entries
            .iter()
            .find(|(_, upper)| roll < *upper)
            .map(|(task, _)| *task)
            .unwrap_or(self.entries[self.entries.len() - 1].0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_weights() {
        let table = TaskTable::new(&TaskWeights::default()).unwrap();
        assert_eq!(table.total_weight(), 6);
        assert!((table.probability(TaskKind::KnownDevice) - 5.0 / 6.0).abs() < 1e-12);
        assert!((table.probability(TaskKind::UnknownDevice) - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_selection_ratio_chi_square() {
        let table = TaskTable::new(&TaskWeights::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 6000;

        let known = (0..n)
            .filter(|_| table.select(&mut rng) == TaskKind::KnownDevice)
            .count() as f64;
        let unknown = n as f64 - known;

        let expected_known = n as f64 * 5.0 / 6.0;
        let expected_unknown = n as f64 / 6.0;
        let chi_square = (known - expected_known).powi(2) / expected_known
            + (unknown - expected_unknown).powi(2) / expected_unknown;

        // 1 degree of freedom, p = 0.001
        assert!(chi_square < 10.828, "chi-square {}", chi_square);
    }

    #[test]
    fn test_zero_weight_disables_task() {
        let weights = TaskWeights {
            known_device: 0,
            unknown_device: 3,
        };
        let table = TaskTable::new(&weights).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        assert!((0..500).all(|_| table.select(&mut rng) == TaskKind::UnknownDevice));
        assert_eq!(table.probability(TaskKind::KnownDevice), 0.0);
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let weights = TaskWeights {
            known_device: 0,
            unknown_device: 0,
        };
        assert!(matches!(
            TaskTable::new(&weights),
            Err(SimulatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_overflowing_weights_rejected() {
        let weights = TaskWeights {
            known_device: u32::MAX,
            unknown_device: 1,
        };
        assert!(TaskTable::new(&weights).is_err());
    }

    #[test]
    fn test_task_kind_serde() {
        assert_eq!(
            serde_json::to_string(&TaskKind::UnknownDevice).unwrap(),
            "\"unknown_device\""
        );
        assert_eq!(TaskKind::KnownDevice.to_string(), "known_device");
    }
}
