//! # Network Performance Evaluation Library
//!
//! Composes the samples collected during network performance runs into
//! results, aggregates repeated runs and judges them against a baseline.
//!
//! ## Measurement Kinds
//!
//! - **Flow**: generator and receiver throughput plus CPU statistics of both hosts
//! - **XDP bench**: packets generated by pktgen and processed by an XDP program
//! - **Forwarding**: like XDP bench with an additional forwarding host
//! - **CPU**: utilization of one CPU on one host
//! - **Latency**: request/response round trips, split into cached and uncached samples
//!
//! ## Architecture Overview
//!
//! - `interval`, `sequential`, `parallel`: the result composition tree
//! - `samples`: raw collector samples turned into sequential results
//! - `domain`: measurement kinds, their roles and single-run results
//! - `aggregate`: folding repeated runs into one result per flow or CPU
//! - `evaluator`: PASS / WARNING / FAIL verdicts against baseline aggregates
//! - `report`: structured records handed to the report writer
//! - `pipeline`: run file parsing and the batch fold used by the binary
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use netperf_eval::{pipeline, BaselineEvaluator};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut context = pipeline::BatchContext::default();
//!     for file in ["run1.json", "run2.json"] {
//!         let run = pipeline::load_run_file(Path::new(file))?;
//!         context = context.ingest(&run, None)?;
//!     }
//!
//!     let baseline = pipeline::load_baseline(Path::new("baseline.json"))?;
//!     let evaluator = BaselineEvaluator::default();
//!     let group = evaluator.evaluate_group(&context.aggregates, &baseline);
//!
//!     println!("Verdict: {}", group.verdict);
//!     Ok(())
//! }
//! ```

pub mod aggregate;

/// Command-line interface and configuration
///
/// Argument parsing with clap and conversion into the evaluation
/// configuration used by the binary.
pub mod cli;

pub mod domain;
pub mod error;

/// Baseline comparison
///
/// Computes per-metric percent differences against baseline aggregates and
/// folds them into per-result and per-group verdicts.
pub mod evaluator;

pub mod interval;
pub mod logging;
pub mod parallel;
pub mod pipeline;

/// Report records, system information and the JSON report writer
pub mod report;

pub mod samples;
pub mod sequential;
pub mod utils;

pub use aggregate::{aggregate, aggregate_batch, AggregatedResult, Contribution};
pub use cli::Args;
pub use domain::{DomainKind, DomainResult, Flow, Identity, MeasurementResults, Role};
pub use error::PerfError;
pub use evaluator::{BaselineEvaluator, Comparison, GroupEvaluation, Verdict};
pub use interval::{Interval, Unit};
pub use parallel::{ParallelResult, PerfResult};
pub use report::{ReportManager, ReportRecord};
pub use sequential::SequentialResult;

/// The current version of the evaluation tool
///
/// Populated from Cargo.toml and written into every report.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default report file name
    pub const OUTPUT_FILE: &str = "evaluation_report.json";

    /// Metrics compared when a flow measurement has no explicit selection
    pub const FLOW_METRICS: &[&str] = &[
        "generator_results",
        "generator_cpu_stats",
        "receiver_results",
        "receiver_cpu_stats",
    ];

    /// Metric names containing this marker are CPU figures, where lower is better
    pub const CPU_METRIC_MARKER: &str = "_cpu_";
}
