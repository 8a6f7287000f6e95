//! # Network Performance Evaluation - Main Entry Point
//!
//! Aggregates the run files of repeated network performance measurements and
//! evaluates the aggregates against a baseline.
//!
//! ## Architecture Overview
//!
//! 1. **Initialize logging**: colorized console output, or full tracing output with `--verbose`
//! 2. **Parse arguments**: command-line configuration
//! 3. **Fold runs**: every run file is parsed, trimmed and folded into the aggregates
//! 4. **Evaluate**: the aggregates are compared with the baseline, if one is given
//! 5. **Report**: records are written to the output file and verdicts printed
//!
//! ## Error Handling
//!
//! A run that cannot be parsed or folded stops the evaluation unless
//! `--continue-on-error` is given, in which case it is skipped and listed
//! in the log. The process exits with a non-zero code when the overall
//! verdict is FAIL.

use anyhow::{bail, Result};
use clap::Parser;
use netperf_eval::{
    cli::{Args, EvaluationConfiguration},
    evaluator::{BaselineEvaluator, GroupEvaluation, Verdict},
    logging::{colorize_line, colorize_verdict, ColorizedFormatter},
    pipeline::{self, BatchContext},
    report::{cpu_reports_by_host, ReportManager, ReportRecord},
    AggregatedResult, DomainKind, MeasurementResults, PerfError,
};
use std::collections::HashMap;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // RUST_LOG overrides the default level in both modes
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .event_format(ColorizedFormatter)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    info!("Starting network performance evaluation");
    let config = EvaluationConfiguration::from(&args);

    let context = fold_runs(&config)?;
    if context.aggregates.is_empty() {
        bail!("No run could be aggregated");
    }
    for failed in &context.failed_runs {
        warn!("Skipped run {}", failed);
    }

    if let Some(path) = &config.aggregate_output {
        pipeline::save_aggregates(path, &context.aggregates)?;
        info!("Aggregates written to: {:?}", path);
    }

    let evaluation = match &config.baseline {
        Some(path) => Some(evaluate(&config, path, &context.aggregates)?),
        None => {
            info!("No baseline given, skipping evaluation");
            None
        }
    };

    let mut report = ReportManager::new(&config.output_file);
    for (index, aggregated) in context.aggregates.iter().enumerate() {
        let comparison = evaluation
            .as_ref()
            .and_then(|e| e.results.get(index))
            .map(|r| &r.comparison);
        report.add_record(ReportRecord::from_aggregate(aggregated, comparison));
    }
    let cpu_records = cpu_reports_by_host(&context.aggregates);
    for record in &cpu_records {
        report.add_record(record.clone());
    }
    let final_report = report.finalize()?;

    for aggregated in context.aggregates.iter().filter(|a| a.kind() != DomainKind::Cpu) {
        println!("{}", aggregated.describe());
    }
    for record in &cpu_records {
        println!("{}", record.description);
    }

    if let Some(evaluation) = &evaluation {
        print_evaluation(evaluation);
    }

    info!("Evaluation completed");
    match final_report.verdict {
        Some(Verdict::Fail) => Ok(ExitCode::FAILURE),
        _ => Ok(ExitCode::SUCCESS),
    }
}

/// Fold every run file, honoring `continue_on_error`
fn fold_runs(config: &EvaluationConfiguration) -> Result<BatchContext> {
    let mut context = BatchContext::default();

    for path in &config.runs {
        info!("Processing run file: {:?}", path);
        let name = path.display().to_string();

        let run = match pipeline::load_run_file(path) {
            Ok(run) => run,
            Err(e) => {
                error!("Failed to load run {}: {:#}", name, e);
                if !config.continue_on_error {
                    return Err(e);
                }
                context = context.with_failure(&name, &PerfError::ParseFailure(format!("{:#}", e)));
                continue;
            }
        };

        match context.ingest(&run, config.warmup_override) {
            Ok(next) => context = next,
            Err(e) => {
                error!("Failed to aggregate run {}: {}", name, e);
                if !config.continue_on_error {
                    return Err(e.into());
                }
                context = context.with_failure(&name, &e);
            }
        }
    }

    Ok(context)
}

fn evaluate(
    config: &EvaluationConfiguration,
    baseline_path: &std::path::Path,
    aggregates: &[AggregatedResult],
) -> Result<GroupEvaluation> {
    let baselines = pipeline::load_baseline(baseline_path)?;
    let thresholds = match &config.thresholds {
        Some(path) => pipeline::load_thresholds(path)?,
        None => {
            warn!("No thresholds given, every metric will fail");
            HashMap::new()
        }
    };

    let evaluator = BaselineEvaluator::new(thresholds, config.metrics_to_evaluate.clone());
    Ok(evaluator.evaluate_group(aggregates, &baselines))
}

fn print_evaluation(evaluation: &GroupEvaluation) {
    for result in &evaluation.results {
        println!();
        for line in &result.description {
            println!("{}", line);
        }
        for metric in &result.comparison.metrics {
            println!("  {}", colorize_line(metric.verdict, &metric.text));
        }
        if result.comparison.metrics.is_empty() {
            for line in &result.comparison.lines {
                println!("  {}", colorize_line(result.comparison.verdict, line));
            }
        }
        println!("  Result: {}", colorize_verdict(result.comparison.verdict));
    }

    println!();
    println!("Overall verdict: {}", colorize_verdict(evaluation.verdict));
}
