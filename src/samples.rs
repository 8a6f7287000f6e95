//! Conversion of raw collector samples into rate intervals.
//!
//! Collectors deliver completed, ordered batches of records. Each record holds
//! an epoch `timestamp` and one or more named counters, e.g.
//!
//! ```json
//! {"timestamp": 1700000001.0, "tx_packets": 1000, "tx_bytes": 64000}
//! ```

use crate::error::PerfError;
use crate::interval::{Interval, Unit};
use crate::parallel::ParallelResult;
use crate::sequential::SequentialResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One polling tick of a collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp: f64,
    #[serde(flatten)]
    pub counters: HashMap<String, f64>,
}

impl RawSample {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            counters: HashMap::new(),
        }
    }

    pub fn with_counter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    fn counter(&self, metric_key: &str) -> Result<f64, PerfError> {
        self.counters.get(metric_key).copied().ok_or_else(|| {
            PerfError::parse(format!(
                "sample at {} has no '{}' counter",
                self.timestamp, metric_key
            ))
        })
    }
}

/// How a collector reports a counter
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SampleMode {
    /// Running total since the collector started (netlink link stats, pktgen, /proc/stat)
    #[default]
    Cumulative,
    /// Per-second rate reported once per `period` seconds (xdp-bench summary lines)
    Rate { period: f64 },
}

/// Derive one interval per consecutive pair of cumulative samples
///
/// The first record only seeds the previous counter value and timestamp.
/// Each emitted interval is stamped with the later record's timestamp.
pub fn parse_samples(
    raw_samples: &[RawSample],
    metric_key: &str,
    unit: Unit,
) -> Result<SequentialResult, PerfError> {
    if raw_samples.len() < 2 {
        return Err(PerfError::parse(format!(
            "need at least 2 samples of '{}' to derive a rate, got {}",
            metric_key,
            raw_samples.len()
        )));
    }

    let mut result = SequentialResult::new(unit);
    let mut prev_value = raw_samples[0].counter(metric_key)?;
    let mut prev_timestamp = raw_samples[0].timestamp;

    for sample in &raw_samples[1..] {
        let value = sample.counter(metric_key)?;
        if value < prev_value {
            return Err(PerfError::parse(format!(
                "counter '{}' decreased from {} to {} at {}",
                metric_key, prev_value, value, sample.timestamp
            )));
        }

        result.push(Interval::new(
            value - prev_value,
            sample.timestamp - prev_timestamp,
            unit,
            sample.timestamp,
        ))?;

        prev_value = value;
        prev_timestamp = sample.timestamp;
    }

    debug!(
        "Parsed {} intervals of '{}' ({} {}/s)",
        result.len(),
        metric_key,
        result.average(),
        unit
    );
    Ok(result)
}

/// One interval per record for collectors that already report a per-second rate
pub fn parse_rate_samples(
    raw_samples: &[RawSample],
    metric_key: &str,
    unit: Unit,
    period: f64,
) -> Result<SequentialResult, PerfError> {
    if raw_samples.is_empty() {
        return Err(PerfError::parse(format!("no samples of '{}'", metric_key)));
    }
    if period <= 0.0 {
        return Err(PerfError::parse(format!(
            "sampling period must be positive, got {}",
            period
        )));
    }

    let mut result = SequentialResult::new(unit);
    for sample in raw_samples {
        let rate = sample.counter(metric_key)?;
        result.push(Interval::new(rate * period, period, unit, sample.timestamp))?;
    }
    Ok(result)
}

/// A single round trip measured by the latency client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub latency: f64,
    pub timestamp: f64,
}

/// Turn latency measurements into point samples, one per round trip
pub fn parse_latency_samples(
    samples: &[LatencySample],
    unit: Unit,
) -> Result<SequentialResult, PerfError> {
    if samples.is_empty() {
        return Err(PerfError::parse("no latency samples"));
    }

    let intervals = samples
        .iter()
        .map(|s| Interval::new(s.latency, 0.0, unit, s.timestamp))
        .collect();
    SequentialResult::from_intervals(unit, intervals)
}

/// Parse every channel of one role into a parallel result
pub fn parse_channels(
    channels: &[Vec<RawSample>],
    metric_key: &str,
    unit: Unit,
    mode: SampleMode,
) -> Result<ParallelResult, PerfError> {
    let mut result = ParallelResult::new(unit);
    for raw in channels {
        let channel = match mode {
            SampleMode::Cumulative => parse_samples(raw, metric_key, unit)?,
            SampleMode::Rate { period } => parse_rate_samples(raw, metric_key, unit, period)?,
        };
        result.append(channel)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(points: &[(f64, f64)]) -> Vec<RawSample> {
        points
            .iter()
            .map(|&(t, c)| RawSample::new(t).with_counter("tx_packets", c))
            .collect()
    }

    #[test]
    fn test_parse_samples_example() {
        let raw = samples(&[(0.0, 0.0), (1.0, 1000.0), (2.0, 2100.0)]);
        let result = parse_samples(&raw, "tx_packets", Unit::Packets).unwrap();

        assert_eq!(
            result.intervals(),
            &[
                Interval::new(1000.0, 1.0, Unit::Packets, 1.0),
                Interval::new(1100.0, 1.0, Unit::Packets, 2.0),
            ]
        );
        assert_eq!(result.average(), 1050.0);
    }

    #[test]
    fn test_parse_samples_yields_n_intervals() {
        let raw: Vec<(f64, f64)> = (0..11).map(|i| (i as f64 * 0.5, (i * i) as f64)).collect();
        let result = parse_samples(&samples(&raw), "tx_packets", Unit::Packets).unwrap();

        assert_eq!(result.len(), 10);
        for (i, interval) in result.intervals().iter().enumerate() {
            assert_eq!(interval.value, raw[i + 1].1 - raw[i].1);
            assert_eq!(interval.duration, 0.5);
        }
    }

    #[test]
    fn test_parse_samples_requires_two_records() {
        let err = parse_samples(&samples(&[(0.0, 0.0)]), "tx_packets", Unit::Packets);
        assert!(matches!(err, Err(PerfError::ParseFailure(_))));
        assert!(parse_samples(&[], "tx_packets", Unit::Packets).is_err());
    }

    #[test]
    fn test_parse_samples_missing_counter() {
        let raw = vec![
            RawSample::new(0.0).with_counter("rx", 0.0),
            RawSample::new(1.0).with_counter("rx", 10.0),
        ];
        assert!(parse_samples(&raw, "tx_packets", Unit::Packets).is_err());
    }

    #[test]
    fn test_parse_samples_counter_reset() {
        let err = parse_samples(&samples(&[(0.0, 50.0), (1.0, 10.0)]), "tx_packets", Unit::Packets);
        assert!(matches!(err, Err(PerfError::ParseFailure(_))));
    }

    #[test]
    fn test_parse_samples_out_of_order_timestamp() {
        let raw = samples(&[(0.0, 0.0), (2.0, 200.0), (1.0, 300.0), (3.0, 600.0)]);
        let result = parse_samples(&raw, "tx_packets", Unit::Packets).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(
            result.intervals()[1],
            Interval::new(100.0, -1.0, Unit::Packets, 1.0)
        );
        // total value over first-to-last span
        assert_eq!(result.average(), 600.0 / (3.0 - 0.0));
    }

    #[test]
    fn test_parse_rate_samples() {
        let raw = vec![
            RawSample::new(1.0).with_counter("rx", 1_000_000.0),
            RawSample::new(2.0).with_counter("rx", 3_000_000.0),
        ];
        let result = parse_rate_samples(&raw, "rx", Unit::Packets, 1.0).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.average(), 2_000_000.0);
    }

    #[test]
    fn test_raw_sample_deserialize() {
        let raw: RawSample =
            serde_json::from_str(r#"{"timestamp": 3.5, "tx_packets": 10, "err": 0}"#).unwrap();
        assert_eq!(raw.timestamp, 3.5);
        assert_eq!(raw.counters["tx_packets"], 10.0);
        assert_eq!(raw.counters.len(), 2);
    }

    #[test]
    fn test_parse_channels() {
        let channels = vec![
            samples(&[(0.0, 0.0), (1.0, 500.0)]),
            samples(&[(0.0, 0.0), (1.0, 700.0)]),
        ];
        let result =
            parse_channels(&channels, "tx_packets", Unit::Packets, SampleMode::Cumulative).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.average(), 1200.0);
    }

    #[test]
    fn test_parse_latency_samples() {
        let raw = [
            LatencySample { latency: 4.0, timestamp: 0.0 },
            LatencySample { latency: 2.0, timestamp: 0.1 },
        ];
        let result = parse_latency_samples(&raw, Unit::Nanoseconds).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.average(), 3.0);
        assert!(parse_latency_samples(&[], Unit::Nanoseconds).is_err());
    }
}
