//! Simulated sensor fleet: the fixed device catalog and its reading generators.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// A sampled reading value.
///
/// Discrete readings stay integers on the wire (`0`, `99999`), continuous
/// readings are rounded floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Int(i64),
    Float(f64),
}

impl ReadingValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ReadingValue::Int(v) => *v as f64,
            ReadingValue::Float(v) => *v,
        }
    }
}

/// Sampling policy for a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueGenerator {
    /// Uniform real in `[low, high]`, rounded to `precision` decimals.
    Uniform { low: f64, high: f64, precision: u32 },
    /// Uniform choice among a fixed set of integers.
    ///
    /// The set must be non-empty; build it through [`ValueGenerator::choice`]
    /// to have that checked.
    Choice(&'static [i64]),
}

impl ValueGenerator {
    /// Discrete generator over `values`, or `None` when `values` is empty.
    pub fn choice(values: &'static [i64]) -> Option<Self> {
        if values.is_empty() {
            None
        } else {
            Some(ValueGenerator::Choice(values))
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> ReadingValue {
        match *self {
            ValueGenerator::Uniform {
                low,
                high,
                precision,
            } => ReadingValue::Float(round_to(rng.gen_range(low..=high), precision)),
            ValueGenerator::Choice(values) => {
                // Catalog choice sets are never empty.
                ReadingValue::Int(values.choose(rng).copied().unwrap_or_default())
            }
        }
    }

    /// Returns whether `value` could have been produced by this generator.
    pub fn admits(&self, value: ReadingValue) -> bool {
        match (*self, value) {
            (ValueGenerator::Uniform { low, high, .. }, ReadingValue::Float(v)) => {
                (low..=high).contains(&v)
            }
            (ValueGenerator::Choice(values), ReadingValue::Int(v)) => values.contains(&v),
            _ => false,
        }
    }
}

/// Rounds half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

/// A predefined simulated device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceFixture {
    /// Device UUID registered with the ingestion service
    pub id: &'static str,

    /// Key of the single reading this device reports
    pub reading_name: &'static str,

    pub generator: ValueGenerator,
}

impl DeviceFixture {
    pub fn sample(&self, rng: &mut impl Rng) -> ReadingValue {
        self.generator.sample(rng)
    }
}

/// Known devices, in their fixed order.
pub static DEVICE_CATALOG: [DeviceFixture; 4] = [
    DeviceFixture {
        id: "1a1b1c1d-2e2f-3a3b-4c4d-5e5f5a5b5c5d",
        reading_name: "temperature",
        generator: ValueGenerator::Uniform {
            low: 10.0,
            high: 35.0,
            precision: 2,
        },
    },
    DeviceFixture {
        id: "b2c3d4e5-f6e5-4d3c-2b1a-0fedcba98765",
        reading_name: "brightness",
        generator: ValueGenerator::Uniform {
            low: 0.0,
            high: 200.0,
            precision: 2,
        },
    },
    DeviceFixture {
        id: "c3d4e5f6-a1b2-3c4d-5e6f-789012345678",
        reading_name: "motion",
        generator: ValueGenerator::Choice(&[0, 1]),
    },
    DeviceFixture {
        id: "a7b8c9d0-e1f2-3a4b-5c6d-7e8f01234567",
        reading_name: "low_power_output",
        generator: ValueGenerator::Choice(&[500, 99999]),
    },
];

/// Reading key reported by unrecognized devices.
pub const NOISE_READING: &str = "noise";

/// Sampling policy for the noise reading.
pub const NOISE_GENERATOR: ValueGenerator = ValueGenerator::Uniform {
    low: 0.0,
    high: 120.0,
    precision: 2,
};

/// Looks up a catalog fixture by device id.
pub fn find_fixture(id: &str) -> Option<&'static DeviceFixture> {
    DEVICE_CATALOG.iter().find(|d| d.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn has_at_most_two_decimals(v: f64) -> bool {
        ((v * 100.0).round() - v * 100.0).abs() < 1e-6
    }

    #[test]
    fn test_catalog_ids_are_uuids() {
        for device in &DEVICE_CATALOG {
            assert!(uuid::Uuid::parse_str(device.id).is_ok(), "{}", device.id);
        }
        let names: Vec<_> = DEVICE_CATALOG.iter().map(|d| d.reading_name).collect();
        assert_eq!(
            names,
            ["temperature", "brightness", "motion", "low_power_output"]
        );
    }

    #[test]
    fn test_value_domains() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            for device in &DEVICE_CATALOG {
                let value = device.sample(&mut rng);
                assert!(device.generator.admits(value), "{:?} {:?}", device, value);
                match device.reading_name {
                    "temperature" | "brightness" => {
                        assert!(has_at_most_two_decimals(value.as_f64()))
                    }
                    "motion" => assert!(matches!(value, ReadingValue::Int(0 | 1))),
                    "low_power_output" => {
                        assert!(matches!(value, ReadingValue::Int(500 | 99999)))
                    }
                    other => panic!("unexpected reading {}", other),
                }
            }
        }
    }

    #[test]
    fn test_choice_hits_every_value() {
        let mut rng = StdRng::seed_from_u64(1);
        let gen = ValueGenerator::Choice(&[500, 99999]);
        let samples: Vec<_> = (0..200).map(|_| gen.sample(&mut rng)).collect();
        assert!(samples.contains(&ReadingValue::Int(500)));
        assert!(samples.contains(&ReadingValue::Int(99999)));
    }

    #[test]
    fn test_choice_requires_values() {
        assert!(ValueGenerator::choice(&[]).is_none());
        assert_eq!(
            ValueGenerator::choice(&[0, 1]),
            Some(ValueGenerator::Choice(&[0, 1]))
        );
        for device in &DEVICE_CATALOG {
            if let ValueGenerator::Choice(values) = device.generator {
                assert!(!values.is_empty(), "{}", device.id);
            }
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345678, 2), 12.35);
        assert_eq!(round_to(0.004, 2), 0.0);
        assert_eq!(round_to(119.999, 2), 120.0);
    }

    #[test]
    fn test_reading_value_json() {
        assert_eq!(serde_json::to_string(&ReadingValue::Int(1)).unwrap(), "1");
        assert_eq!(
            serde_json::to_string(&ReadingValue::Float(21.5)).unwrap(),
            "21.5"
        );
    }

    #[test]
    fn test_find_fixture() {
        let fixture = find_fixture("c3d4e5f6-a1b2-3c4d-5e6f-789012345678").unwrap();
        assert_eq!(fixture.reading_name, "motion");
        assert!(find_fixture("00000000-0000-0000-0000-000000000000").is_none());
    }
}
