//! Concurrent composition of channels measuring one metric.
//!
//! A [`ParallelResult`] models N producers sampled at the same time (one
//! pktgen thread per CPU, one counter per NIC queue, ...). Its rate is the
//! sum of the channel rates. Channels are [`PerfResult`]s, so a parallel
//! result may nest another parallel result.

use crate::error::PerfError;
use crate::interval::Unit;
use crate::sequential::SequentialResult;
use serde::{Deserialize, Serialize};

/// One channel of a parallel result, or a whole role of a domain result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PerfResult {
    Sequential(SequentialResult),
    Parallel(ParallelResult),
}

impl PerfResult {
    pub fn unit(&self) -> Unit {
        match self {
            PerfResult::Sequential(s) => s.unit(),
            PerfResult::Parallel(p) => p.unit(),
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            PerfResult::Sequential(s) => s.value(),
            PerfResult::Parallel(p) => p.value(),
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            PerfResult::Sequential(s) => s.duration(),
            PerfResult::Parallel(p) => p.duration(),
        }
    }

    pub fn average(&self) -> f64 {
        match self {
            PerfResult::Sequential(s) => s.average(),
            PerfResult::Parallel(p) => p.average(),
        }
    }

    pub fn std_deviation(&self) -> f64 {
        match self {
            PerfResult::Sequential(s) => s.std_deviation(),
            PerfResult::Parallel(p) => p.std_deviation(),
        }
    }

    pub fn start_timestamp(&self) -> Option<f64> {
        match self {
            PerfResult::Sequential(s) => s.start_timestamp(),
            PerfResult::Parallel(p) => p.start_timestamp(),
        }
    }

    pub fn end_timestamp(&self) -> Option<f64> {
        match self {
            PerfResult::Sequential(s) => s.end_timestamp(),
            PerfResult::Parallel(p) => p.end_timestamp(),
        }
    }

    /// Number of intervals held across every nested channel
    pub fn interval_count(&self) -> usize {
        match self {
            PerfResult::Sequential(s) => s.len(),
            PerfResult::Parallel(p) => p.channels.iter().map(PerfResult::interval_count).sum(),
        }
    }

    pub fn time_slice(&self, start: f64, end: f64) -> PerfResult {
        match self {
            PerfResult::Sequential(s) => PerfResult::Sequential(s.time_slice(start, end)),
            PerfResult::Parallel(p) => PerfResult::Parallel(p.time_slice(start, end)),
        }
    }

    pub fn as_sequential(&self) -> Option<&SequentialResult> {
        match self {
            PerfResult::Sequential(s) => Some(s),
            PerfResult::Parallel(_) => None,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            PerfResult::Sequential(_) => "sequential result",
            PerfResult::Parallel(_) => "parallel result",
        }
    }

    /// Merge a same-shaped result from another run into this one
    ///
    /// Sequential channels are unioned in timestamp order, parallel channels
    /// are merged index by index.
    pub fn merge(&mut self, other: &PerfResult) -> Result<(), PerfError> {
        match (self, other) {
            (PerfResult::Sequential(mine), PerfResult::Sequential(theirs)) => mine.extend(theirs),
            (PerfResult::Parallel(mine), PerfResult::Parallel(theirs)) => mine.extend(theirs),
            (mine, theirs) => Err(PerfError::IncompatibleResultType {
                expected: mine.shape().to_string(),
                found: theirs.shape().to_string(),
            }),
        }
    }
}

impl From<SequentialResult> for PerfResult {
    fn from(result: SequentialResult) -> Self {
        PerfResult::Sequential(result)
    }
}

impl From<ParallelResult> for PerfResult {
    fn from(result: ParallelResult) -> Self {
        PerfResult::Parallel(result)
    }
}

/// Channels of one metric captured concurrently; all share one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelResult {
    unit: Unit,
    channels: Vec<PerfResult>,
}

impl ParallelResult {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            channels: Vec::new(),
        }
    }

    /// Add one more channel to the collection
    pub fn append(&mut self, channel: impl Into<PerfResult>) -> Result<(), PerfError> {
        let channel = channel.into();
        self.unit.ensure_same(channel.unit())?;
        self.channels.push(channel);
        Ok(())
    }

    /// Merge channel `i` of `other` into channel `i` of `self`
    ///
    /// An empty collection adopts `other`'s channels as they are. Nothing is
    /// modified when any channel is rejected.
    pub fn extend(&mut self, other: &ParallelResult) -> Result<(), PerfError> {
        self.unit.ensure_same(other.unit)?;

        if self.channels.is_empty() {
            self.channels = other.channels.clone();
            return Ok(());
        }

        if self.channels.len() != other.channels.len() {
            return Err(PerfError::ChannelCountMismatch {
                expected: self.channels.len(),
                found: other.channels.len(),
            });
        }

        let mut channels = self.channels.clone();
        for (mine, theirs) in channels.iter_mut().zip(&other.channels) {
            mine.merge(theirs)?;
        }

        self.channels = channels;
        Ok(())
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn channels(&self) -> &[PerfResult] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn value(&self) -> f64 {
        self.channels.iter().map(PerfResult::value).sum()
    }

    /// Longest channel duration; channels run side by side
    pub fn duration(&self) -> f64 {
        self.channels
            .iter()
            .map(PerfResult::duration)
            .fold(0.0, f64::max)
    }

    /// Total rate across all producers
    pub fn average(&self) -> f64 {
        self.channels.iter().map(PerfResult::average).sum()
    }

    /// Deviation of the summed rate, treating channels as independent
    pub fn std_deviation(&self) -> f64 {
        self.channels
            .iter()
            .map(|c| c.std_deviation().powi(2))
            .sum::<f64>()
            .sqrt()
    }

    pub fn start_timestamp(&self) -> Option<f64> {
        self.channels
            .iter()
            .filter_map(PerfResult::start_timestamp)
            .reduce(f64::min)
    }

    pub fn end_timestamp(&self) -> Option<f64> {
        self.channels
            .iter()
            .filter_map(PerfResult::end_timestamp)
            .reduce(f64::max)
    }

    pub fn time_slice(&self, start: f64, end: f64) -> ParallelResult {
        ParallelResult {
            unit: self.unit,
            channels: self
                .channels
                .iter()
                .map(|c| c.time_slice(start, end))
                .collect(),
        }
    }
}
