//! Time-ordered composition of intervals sampled from a single channel.

use crate::error::PerfError;
use crate::interval::{Interval, Unit};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Ordered sequence of intervals from one channel
///
/// Insertion order is time order. Samplers on different hosts are not
/// guaranteed to produce strictly monotonic timestamps, so a decreasing
/// timestamp is logged as a data quality issue and otherwise accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialResult {
    unit: Unit,
    intervals: Vec<Interval>,
}

impl SequentialResult {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            intervals: Vec::new(),
        }
    }

    /// Build a result from already ordered intervals
    pub fn from_intervals(unit: Unit, intervals: Vec<Interval>) -> Result<Self, PerfError> {
        let mut result = Self::new(unit);
        for interval in intervals {
            result.push(interval)?;
        }
        Ok(result)
    }

    /// Append one interval at the end of the sequence
    pub fn push(&mut self, interval: Interval) -> Result<(), PerfError> {
        self.unit.ensure_same(interval.unit)?;

        if let Some(last) = self.intervals.last() {
            if interval.timestamp < last.timestamp {
                warn!(
                    "Non-monotonic sample timestamp: {} follows {}",
                    interval.timestamp, last.timestamp
                );
            }
        }

        self.intervals.push(interval);
        Ok(())
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Sum of interval values
    pub fn value(&self) -> f64 {
        self.intervals.iter().map(|i| i.value).sum()
    }

    /// Sum of interval durations
    pub fn duration(&self) -> f64 {
        self.intervals.iter().map(|i| i.duration).sum()
    }

    /// Duration-weighted rate: total value over total duration
    ///
    /// When every held interval is a point sample the arithmetic mean of the
    /// values is returned instead. An empty sequence averages to zero.
    pub fn average(&self) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }

        let duration = self.duration();
        if duration > 0.0 {
            self.value() / duration
        } else {
            self.value() / self.intervals.len() as f64
        }
    }

    /// Standard deviation of the per-interval rates, weighted by duration
    pub fn std_deviation(&self) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }

        let weighted = self.duration() > 0.0;
        let weight = |i: &Interval| if weighted { i.duration.max(0.0) } else { 1.0 };

        let total_weight: f64 = self.intervals.iter().map(weight).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }

        let mean = self.average();
        let variance = self
            .intervals
            .iter()
            .map(|i| weight(i) * (i.average() - mean).powi(2))
            .sum::<f64>()
            / total_weight;

        variance.sqrt()
    }

    pub fn start_timestamp(&self) -> Option<f64> {
        self.intervals.first().map(Interval::start_timestamp)
    }

    pub fn end_timestamp(&self) -> Option<f64> {
        self.intervals.last().map(Interval::end_timestamp)
    }

    /// Wall-clock span from the first interval to the end of the last one
    pub fn real_duration(&self) -> f64 {
        match (self.intervals.first(), self.intervals.last()) {
            (Some(first), Some(last)) => last.timestamp + last.duration - first.timestamp,
            _ => 0.0,
        }
    }

    /// New result holding only the intervals fully inside `[start, end)`
    pub fn time_slice(&self, start: f64, end: f64) -> SequentialResult {
        SequentialResult {
            unit: self.unit,
            intervals: self
                .intervals
                .iter()
                .filter(|i| i.within(start, end))
                .copied()
                .collect(),
        }
    }

    /// New result holding the intervals at positions `[start, end)`, clamped to the held range
    pub fn samples_slice(&self, start: usize, end: usize) -> SequentialResult {
        let end = end.min(self.intervals.len());
        let start = start.min(end);

        SequentialResult {
            unit: self.unit,
            intervals: self.intervals[start..end].to_vec(),
        }
    }

    /// Timestamp-ordered union of both interval sequences; neither source changes
    pub fn merge_with(&self, other: &SequentialResult) -> Result<SequentialResult, PerfError> {
        self.unit.ensure_same(other.unit)?;

        let mut intervals = Vec::with_capacity(self.len() + other.len());
        intervals.extend_from_slice(&self.intervals);
        intervals.extend_from_slice(&other.intervals);
        // stable: equal timestamps keep self-before-other order
        intervals.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        Ok(SequentialResult {
            unit: self.unit,
            intervals,
        })
    }

    /// In-place form of [`merge_with`](Self::merge_with)
    pub fn extend(&mut self, other: &SequentialResult) -> Result<(), PerfError> {
        *self = self.merge_with(other)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(points: &[(f64, f64, f64)]) -> SequentialResult {
        SequentialResult::from_intervals(
            Unit::Packets,
            points
                .iter()
                .map(|&(v, d, t)| Interval::new(v, d, Unit::Packets, t))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_duration_weighted_average() {
        // simple mean of rates would be (1000 + 500) / 2 = 750
        let result = seq(&[(1000.0, 1.0, 1.0), (1500.0, 3.0, 2.0)]);
        assert_eq!(result.average(), 2500.0 / 4.0);
    }

    #[test]
    fn test_std_deviation() {
        let flat = seq(&[(100.0, 1.0, 0.0), (100.0, 1.0, 1.0)]);
        assert_eq!(flat.std_deviation(), 0.0);

        let varied = seq(&[(100.0, 1.0, 0.0), (300.0, 1.0, 1.0)]);
        assert!((varied.std_deviation() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_result() {
        let result = SequentialResult::new(Unit::Bits);
        assert_eq!(result.average(), 0.0);
        assert_eq!(result.std_deviation(), 0.0);
        assert_eq!(result.real_duration(), 0.0);
        assert!(result.start_timestamp().is_none());
    }

    #[test]
    fn test_real_duration() {
        let result = seq(&[(1.0, 1.0, 1.0), (1.0, 1.0, 2.0), (1.0, 1.0, 5.0)]);
        assert_eq!(result.real_duration(), 5.0);
    }

    #[test]
    fn test_time_slice_does_not_mutate() {
        let result = seq(&[(1.0, 1.0, 0.0), (2.0, 1.0, 1.0), (3.0, 1.0, 2.0), (4.0, 1.0, 3.0)]);
        let sliced = result.time_slice(1.0, 3.0);

        assert_eq!(result.len(), 4);
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.value(), 5.0);
        assert_eq!(sliced.time_slice(1.0, 3.0), sliced);
    }

    #[test]
    fn test_samples_slice_clamps() {
        let result = seq(&[(1.0, 0.0, 0.0), (2.0, 0.0, 1.0), (3.0, 0.0, 2.0)]);
        assert_eq!(result.samples_slice(1, 2).value(), 2.0);
        assert_eq!(result.samples_slice(2, 10).len(), 1);
        assert!(result.samples_slice(5, 10).is_empty());
    }

    #[test]
    fn test_merge_orders_by_timestamp() {
        let a = seq(&[(1.0, 1.0, 0.0), (3.0, 1.0, 2.0)]);
        let b = seq(&[(2.0, 1.0, 1.0)]);

        let merged = a.merge_with(&b).unwrap();
        let values: Vec<f64> = merged.intervals().iter().map(|i| i.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_unit_mismatch_rejected() {
        let mut result = SequentialResult::new(Unit::Packets);
        let err = result.push(Interval::new(1.0, 1.0, Unit::Bits, 0.0));
        assert!(matches!(err, Err(PerfError::UnitMismatch { .. })));

        let other = SequentialResult::new(Unit::Bits);
        assert!(result.merge_with(&other).is_err());
    }

    #[test]
    fn test_push_out_of_order_timestamp() {
        let mut result = SequentialResult::new(Unit::Packets);
        result.push(Interval::new(300.0, 2.0, Unit::Packets, 5.0)).unwrap();
        assert!(result.push(Interval::new(100.0, 2.0, Unit::Packets, 3.0)).is_ok());

        assert_eq!(result.len(), 2);
        assert_eq!(result.intervals()[1].timestamp, 3.0);
        assert_eq!(result.average(), 100.0);
    }

    #[test]
    fn test_point_samples_average() {
        let result = seq(&[(2.0, 0.0, 0.0), (4.0, 0.0, 1.0)]);
        assert_eq!(result.average(), 3.0);
        assert_eq!(result.std_deviation(), 1.0);
    }
}
