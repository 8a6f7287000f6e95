use crate::error::PerfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Measurement unit carried unchanged through every composition step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "packets")]
    Packets,
    #[serde(rename = "bits")]
    Bits,
    #[serde(rename = "bytes")]
    Bytes,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "ns")]
    Nanoseconds,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Packets => "packets",
            Unit::Bits => "bits",
            Unit::Bytes => "bytes",
            Unit::Percent => "%",
            Unit::Seconds => "s",
            Unit::Nanoseconds => "ns",
        }
    }

    /// Fail with `UnitMismatch` unless `other` equals `self`
    pub fn ensure_same(&self, other: Unit) -> Result<(), PerfError> {
        if *self != other {
            return Err(PerfError::UnitMismatch {
                expected: self.to_string(),
                found: other.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "packets" => Ok(Unit::Packets),
            "bits" => Ok(Unit::Bits),
            "bytes" => Ok(Unit::Bytes),
            "%" => Ok(Unit::Percent),
            "s" => Ok(Unit::Seconds),
            "ns" => Ok(Unit::Nanoseconds),
            other => Err(PerfError::parse(format!("unknown unit '{}'", other))),
        }
    }
}

/// A single rate sample: `value` accumulated over `duration` seconds
///
/// `timestamp` is the epoch-seconds mark the sample is filed under. A
/// duration of zero marks a point sample (e.g. one latency measurement).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub value: f64,
    pub duration: f64,
    pub unit: Unit,
    pub timestamp: f64,
}

impl Interval {
    pub fn new(value: f64, duration: f64, unit: Unit, timestamp: f64) -> Self {
        Self {
            value,
            duration,
            unit,
            timestamp,
        }
    }

    /// Rate of this interval; point samples report their raw value
    pub fn average(&self) -> f64 {
        if self.duration > 0.0 {
            self.value / self.duration
        } else {
            self.value
        }
    }

    pub fn start_timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn end_timestamp(&self) -> f64 {
        self.timestamp + self.duration
    }

    pub fn is_point(&self) -> bool {
        self.duration <= 0.0
    }

    /// Whether the interval lies entirely within `[start, end)`
    pub fn within(&self, start: f64, end: f64) -> bool {
        if self.is_point() {
            self.timestamp >= start && self.timestamp < end
        } else {
            self.start_timestamp() >= start && self.end_timestamp() <= end
        }
    }
}
