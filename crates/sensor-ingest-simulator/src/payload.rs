//! Ingest payloads and the traffic model that produces them.

use crate::fleet::{DeviceFixture, ReadingValue, DEVICE_CATALOG, NOISE_GENERATOR, NOISE_READING};
use crate::tasks::TaskKind;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single named observation.
///
/// On the wire this is a one-key object: `{"temperature": 21.37}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub name: String,
    pub value: ReadingValue,
}

impl Reading {
    pub fn new(name: impl Into<String>, value: ReadingValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Serialize for Reading {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ReadingVisitor;

        impl<'de> Visitor<'de> for ReadingVisitor {
            type Value = Reading;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object with exactly one reading")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Reading, A::Error>
            where
                A: MapAccess<'de>,
            {
                let (name, value) = map
                    .next_entry::<String, ReadingValue>()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if map.next_key::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(2, &self));
                }
                Ok(Reading { name, value })
            }
        }

        deserializer.deserialize_map(ReadingVisitor)
    }
}

/// JSON body of one `POST /ingest` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestPayload {
    pub device_id: String,

    /// ISO-8601 UTC timestamp with explicit offset
    pub timestamp: String,

    pub readings: Vec<Reading>,
}

impl IngestPayload {
    /// Returns the first (and, for generated payloads, only) reading.
    pub fn reading(&self) -> Option<&Reading> {
        self.readings.first()
    }
}

/// Formats a timestamp as ISO-8601 with microseconds and a `+00:00` offset.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Source of payload timestamps.
pub type Clock = fn() -> DateTime<Utc>;

/// Produces randomized ingest payloads from the device catalog.
///
/// The model holds no mutable state; all randomness comes from the
/// generator passed to each call.
#[derive(Debug, Clone, Copy)]
pub struct TrafficModel {
    clock: Clock,
}

impl Default for TrafficModel {
    fn default() -> Self {
        Self { clock: Utc::now }
    }
}

impl TrafficModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `clock` instead of the wall clock for timestamps.
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    pub fn catalog(&self) -> &'static [DeviceFixture] {
        &DEVICE_CATALOG
    }

    fn now(&self) -> String {
        format_timestamp((self.clock)())
    }

    /// Builds a reading from a uniformly chosen catalog device.
    pub fn pick_known_device_payload(&self, rng: &mut impl Rng) -> IngestPayload {
        let catalog = self.catalog();
        let device = &catalog[rng.gen_range(0..catalog.len())];
        let value = device.sample(rng);

        IngestPayload {
            device_id: device.id.to_string(),
            timestamp: self.now(),
            readings: vec![Reading::new(device.reading_name, value)],
        }
    }

    /// Builds a noise reading from a freshly generated device id.
    pub fn pick_unknown_device_payload(&self, rng: &mut impl Rng) -> IngestPayload {
        let device_id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
        let value = NOISE_GENERATOR.sample(rng);

        IngestPayload {
            device_id: device_id.to_string(),
            timestamp: self.now(),
            readings: vec![Reading::new(NOISE_READING, value)],
        }
    }

    pub fn payload_for(&self, task: TaskKind, rng: &mut impl Rng) -> IngestPayload {
        match task {
            TaskKind::KnownDevice => self.pick_known_device_payload(rng),
            TaskKind::UnknownDevice => self.pick_unknown_device_payload(rng),
        }
    }
}
