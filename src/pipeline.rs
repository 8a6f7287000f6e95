//! # Batch Pipeline
//!
//! Turns the completed sample batches of repeated runs into aggregates:
//!
//! 1. **Parse**: every [`RunInput`] of a run file becomes a [`DomainResult`]
//! 2. **Trim**: warmup and cooldown are sliced off each run
//! 3. **Fold**: the run's results are folded index by index into the aggregates
//!
//! State lives in a [`BatchContext`] value. Each stage returns a new context,
//! so a run that fails half way leaves the previous context intact and the
//! remaining runs of the batch can still be folded.

use crate::aggregate::{aggregate_batch, AggregatedResult};
use crate::domain::{DomainKind, DomainResult, Flow, Identity, Role};
use crate::error::PerfError;
use crate::interval::Unit;
use crate::parallel::PerfResult;
use crate::samples::{
    parse_channels, parse_latency_samples, LatencySample, RawSample, SampleMode,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Raw samples of one role, one inner list per parallel channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInput {
    /// Counter field to read from every sample, e.g. `tx_packets`
    pub metric: String,
    pub unit: Unit,
    pub channels: Vec<Vec<RawSample>>,
    /// Set when the collector reports per-second rates every `rate_period` seconds
    #[serde(default)]
    pub rate_period: Option<f64>,
    /// Keep a single channel as a plain sequential result
    #[serde(default)]
    pub sequential: bool,
}

impl RoleInput {
    fn mode(&self) -> SampleMode {
        match self.rate_period {
            Some(period) => SampleMode::Rate { period },
            None => SampleMode::Cumulative,
        }
    }

    fn to_result(&self) -> Result<PerfResult, PerfError> {
        let parsed = parse_channels(&self.channels, &self.metric, self.unit, self.mode())?;

        if !self.sequential {
            return Ok(parsed.into());
        }

        match parsed.channels() {
            [PerfResult::Sequential(single)] => Ok(single.clone().into()),
            channels => Err(PerfError::ChannelCountMismatch {
                expected: 1,
                found: channels.len(),
            }),
        }
    }
}

/// One measurement of one run as delivered by the run-execution layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInput {
    pub kind: DomainKind,
    #[serde(default)]
    pub flow: Option<Flow>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default = "default_success")]
    pub measurement_success: bool,
    /// Seconds trimmed from both ends of the run
    #[serde(default)]
    pub warmup_duration: f64,
    #[serde(default)]
    pub roles: BTreeMap<Role, RoleInput>,
    #[serde(default)]
    pub latency_samples: Vec<LatencySample>,
    #[serde(default = "default_latency_unit")]
    pub latency_unit: Unit,
}

fn default_success() -> bool {
    true
}

fn default_latency_unit() -> Unit {
    Unit::Nanoseconds
}

impl RunInput {
    fn identity(&self) -> Result<Identity, PerfError> {
        match self.kind {
            DomainKind::Cpu => match (&self.host, &self.cpu) {
                (Some(host), Some(cpu)) => Ok(Identity::Cpu {
                    host: host.clone(),
                    cpu: cpu.clone(),
                }),
                _ => Err(PerfError::parse("cpu measurement without host and cpu")),
            },
            DomainKind::Flow
            | DomainKind::XdpBench
            | DomainKind::Forwarding
            | DomainKind::Latency => self.flow.clone().map(Identity::Flow).ok_or_else(|| {
                PerfError::parse(format!("{} measurement without flow", self.kind))
            }),
        }
    }

    /// Parse the raw samples into a finalized single-run result
    pub fn to_result(&self, warmup_override: Option<f64>) -> Result<DomainResult, PerfError> {
        let identity = self.identity()?;

        let mut roles = BTreeMap::new();
        for (role, input) in &self.roles {
            debug!("Parsing {} channel(s) of {}", input.channels.len(), role);
            roles.insert(*role, input.to_result()?);
        }

        if self.kind == DomainKind::Latency && !roles.contains_key(&Role::Latency) {
            let samples = parse_latency_samples(&self.latency_samples, self.latency_unit)?;
            roles.insert(Role::Latency, samples.into());
        }

        DomainResult::new(
            self.kind,
            identity,
            roles,
            self.measurement_success,
            warmup_override.unwrap_or(self.warmup_duration),
        )
    }
}

/// Aggregation state of one batch of repeated runs
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    pub aggregates: Vec<AggregatedResult>,
    pub runs_folded: usize,
    pub failed_runs: Vec<String>,
}

impl BatchContext {
    /// Parse, trim and fold one run, returning the updated context
    pub fn ingest(
        &self,
        run: &[RunInput],
        warmup_override: Option<f64>,
    ) -> Result<BatchContext, PerfError> {
        let results = run
            .iter()
            .map(|input| input.to_result(warmup_override).map(|r| r.without_warmup()))
            .collect::<Result<Vec<_>, _>>()?;

        let old = if self.aggregates.is_empty() {
            None
        } else {
            Some(self.aggregates.clone())
        };
        let aggregates = aggregate_batch(old, results)?;

        info!(
            "Run {} folded into {} aggregate(s)",
            self.runs_folded + 1,
            aggregates.len()
        );

        Ok(BatchContext {
            aggregates,
            runs_folded: self.runs_folded + 1,
            failed_runs: self.failed_runs.clone(),
        })
    }

    /// Context noting that the run called `name` could not be processed
    pub fn with_failure(&self, name: &str, error: &PerfError) -> BatchContext {
        let mut failed_runs = self.failed_runs.clone();
        failed_runs.push(format!("{}: {}", name, error));

        BatchContext {
            aggregates: self.aggregates.clone(),
            runs_folded: self.runs_folded,
            failed_runs,
        }
    }
}

/// Read a run file: a JSON list with one measurement per result index
pub fn load_run_file(path: &Path) -> Result<Vec<RunInput>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid run file {:?}", path))
}

/// Read baseline aggregates; `null` entries mark results without a baseline
pub fn load_baseline(path: &Path) -> Result<Vec<Option<AggregatedResult>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read baseline {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid baseline file {:?}", path))
}

/// Read the `"{index}_{metric}" -> percent` threshold map
pub fn load_thresholds(path: &Path) -> Result<HashMap<String, f64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read thresholds {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid thresholds file {:?}", path))
}

/// Write aggregates in the format [`load_baseline`] reads
pub fn save_aggregates(path: &Path, aggregates: &[AggregatedResult]) -> Result<()> {
    let entries: Vec<Option<&AggregatedResult>> = aggregates.iter().map(Some).collect();
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write aggregates to {:?}", path))
}
