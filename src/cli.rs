use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network performance evaluation - aggregate repeated runs and judge them against a baseline
#[derive(Parser, Debug, Clone, Default)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Run files to aggregate, one per repetition of the measurement
    #[clap(short = 'r', long, required = true, num_args = 1.., help_heading = "Core Options")]
    pub runs: Vec<PathBuf>,

    /// Baseline aggregates to compare against (JSON list, null for missing entries)
    #[clap(short = 'b', long, help_heading = "Core Options")]
    pub baseline: Option<PathBuf>,

    /// Allowed percent difference per "{index}_{metric}" key (JSON object)
    #[clap(short = 't', long, help_heading = "Core Options")]
    pub thresholds: Option<PathBuf>,

    /// Metrics to evaluate instead of each measurement's own metric list
    #[clap(short = 'm', long, num_args = 1..)]
    pub metrics: Vec<String>,

    /// Warmup trimmed from both ends of every run, overriding the run files (e.g. "2s", "500ms")
    #[clap(short = 'w', long, value_parser = parse_seconds)]
    pub warmup: Option<f64>,

    /// Output file for the evaluation report (JSON format)
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// Also write the aggregates in baseline format, for use as a future baseline
    #[clap(long)]
    pub aggregate_output: Option<PathBuf>,

    /// Continue with the remaining runs even if one fails to parse or fold
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Configuration for one evaluation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationConfiguration {
    pub runs: Vec<PathBuf>,
    pub baseline: Option<PathBuf>,
    pub thresholds: Option<PathBuf>,
    pub metrics_to_evaluate: Option<Vec<String>>,
    pub warmup_override: Option<f64>,
    pub output_file: PathBuf,
    pub aggregate_output: Option<PathBuf>,
    pub continue_on_error: bool,
}

impl From<&Args> for EvaluationConfiguration {
    fn from(args: &Args) -> Self {
        Self {
            runs: args.runs.clone(),
            baseline: args.baseline.clone(),
            thresholds: args.thresholds.clone(),
            metrics_to_evaluate: if args.metrics.is_empty() {
                None
            } else {
                Some(args.metrics.clone())
            },
            warmup_override: args.warmup,
            output_file: args.output_file.clone(),
            aggregate_output: args.aggregate_output.clone(),
            continue_on_error: args.continue_on_error,
        }
    }
}

/// Parse a duration in seconds from string (e.g., "2s", "500ms", "1m")
fn parse_seconds(s: &str) -> Result<f64, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, scale) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, 0.001)
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1.0)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60.0)
    } else {
        (s, 1.0) // Default to seconds
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    Ok(num * scale)
}
