//! # Baseline Evaluation
//!
//! Compares the averages of an aggregated measurement against a baseline
//! aggregate and classifies every metric:
//!
//! - throughput metrics are better when higher, CPU and latency metrics when lower
//! - a change within `±threshold` percent is a PASS
//! - a change beyond the threshold in the better direction is a WARNING,
//!   reported as an IMPROVEMENT
//! - anything else is a FAIL (regression)
//!
//! Missing thresholds, metrics or baselines are reported as FAIL verdicts
//! with explanatory text rather than raised as errors, so an operator can
//! tell "nothing to compare against" apart from a real regression. The
//! evaluator keeps no state between calls.

use crate::domain::{Identity, MeasurementResults, MetricDirection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// Outcome of a comparison, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Warning,
    Fail,
}

impl Verdict {
    pub fn max_severity(self, other: Verdict) -> Verdict {
        self.max(other)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Warning => write!(f, "WARNING"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Result of evaluating one `{index}_{metric}` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub key: String,
    pub verdict: Verdict,
    pub difference: Option<f64>,
    pub threshold: Option<f64>,
    pub text: String,
}

impl MetricComparison {
    pub fn is_improvement(&self) -> bool {
        self.verdict == Verdict::Warning
    }
}

/// Verdict and text lines for one result compared with its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub verdict: Verdict,
    pub lines: Vec<String>,
    pub metrics: Vec<MetricComparison>,
}

/// One evaluated result of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedResult {
    pub description: Vec<String>,
    pub comparison: Comparison,
}

/// Evaluation of every result of a measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEvaluation {
    pub verdict: Verdict,
    pub results: Vec<EvaluatedResult>,
}

/// Percent deviation of the target average from the baseline average
pub fn result_averages_difference(target: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        if target == 0.0 {
            return 0.0;
        }
        return if target > 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
    }
    100.0 * (target - baseline) / baseline
}

/// Classify a percent difference against a percent threshold
pub fn classify(difference: f64, threshold: f64, direction: MetricDirection) -> Verdict {
    match direction {
        MetricDirection::HigherIsBetter if difference > threshold => Verdict::Warning,
        MetricDirection::LowerIsBetter if difference < -threshold => Verdict::Warning,
        _ if (-threshold..=threshold).contains(&difference) => Verdict::Pass,
        _ => Verdict::Fail,
    }
}

/// Compares results against baselines using per-metric percent thresholds
#[derive(Debug, Clone, Default)]
pub struct BaselineEvaluator {
    thresholds: HashMap<String, f64>,
    metrics_to_evaluate: Option<Vec<String>>,
}

impl BaselineEvaluator {
    /// `metrics_to_evaluate` of `None` evaluates each result's own metric list
    pub fn new(thresholds: HashMap<String, f64>, metrics_to_evaluate: Option<Vec<String>>) -> Self {
        Self {
            thresholds,
            metrics_to_evaluate,
        }
    }

    fn metrics_for<R: MeasurementResults + ?Sized>(&self, result: &R) -> Vec<String> {
        match &self.metrics_to_evaluate {
            Some(metrics) => metrics.clone(),
            None => result.metrics().into_iter().map(str::to_string).collect(),
        }
    }

    /// Header lines naming what a group of results was measured for
    pub fn describe_group_results<R: MeasurementResults + ?Sized>(
        &self,
        result: &R,
    ) -> Vec<String> {
        match result.identity() {
            Identity::Flow(flow) => vec![
                "Baseline average evaluation of flow:".to_string(),
                flow.to_string(),
            ],
            Identity::Cpu { host, cpu } => vec![
                "Baseline average evaluation of CPU utilization:".to_string(),
                format!("host {} cpu '{}'", host, cpu),
            ],
        }
    }

    /// Compare every configured metric of `result` with `baseline`
    pub fn compare_result_with_baseline<R, B>(
        &self,
        result: &R,
        baseline: Option<&B>,
        result_index: usize,
    ) -> Comparison
    where
        R: MeasurementResults + ?Sized,
        B: MeasurementResults + ?Sized,
    {
        let baseline = match baseline {
            Some(baseline) => baseline,
            None => {
                warn!("No baseline found for {}", result.identity());
                return Comparison {
                    verdict: Verdict::Fail,
                    lines: vec!["No baseline found for this flow.".to_string()],
                    metrics: Vec::new(),
                };
            }
        };

        let mut verdict = Verdict::Pass;
        let mut lines = Vec::new();
        let mut metrics = Vec::new();

        for metric in self.metrics_for(result) {
            let comparison = self.compare_metric(result, baseline, &metric, result_index);
            verdict = verdict.max_severity(comparison.verdict);
            lines.push(comparison.text.clone());
            metrics.push(comparison);
        }

        Comparison {
            verdict,
            lines,
            metrics,
        }
    }

    fn compare_metric<R, B>(
        &self,
        result: &R,
        baseline: &B,
        metric: &str,
        index: usize,
    ) -> MetricComparison
    where
        R: MeasurementResults + ?Sized,
        B: MeasurementResults + ?Sized,
    {
        let key = format!("{}_{}", index, metric);

        let threshold = match self.thresholds.get(&key) {
            Some(&threshold) => threshold,
            None => {
                warn!("Metric {}, threshold not found", key);
                return MetricComparison {
                    text: format!("Metric {}, threshold not found", key),
                    key,
                    verdict: Verdict::Fail,
                    difference: None,
                    threshold: None,
                };
            }
        };

        let averages = (result.metric_average(metric), baseline.metric_average(metric));
        let (target, reference) = match averages {
            (Some(target), Some(reference)) => (target, reference),
            _ => {
                warn!("Metric {}, metric not found", key);
                return MetricComparison {
                    text: format!("Metric {}, metric not found", key),
                    key,
                    verdict: Verdict::Fail,
                    difference: None,
                    threshold: Some(threshold),
                };
            }
        };

        let difference = result_averages_difference(target, reference);
        let verdict = classify(difference, threshold, MetricDirection::of_metric(&key));

        let text = format!(
            "New {} average is {:.2}% {} from the baseline. Allowed difference: {}%",
            key,
            difference.abs(),
            if difference >= 0.0 { "higher" } else { "lower" },
            threshold
        );
        let text = match verdict {
            Verdict::Warning => format!("IMPROVEMENT: {}", text),
            Verdict::Pass | Verdict::Fail => format!("{}: {}", verdict, text),
        };

        match verdict {
            Verdict::Fail => warn!("{}", text),
            Verdict::Pass | Verdict::Warning => info!("{}", text),
        }

        MetricComparison {
            key,
            verdict,
            difference: Some(difference),
            threshold: Some(threshold),
            text,
        }
    }

    /// Evaluate index-aligned results and baselines; the group verdict is the most severe one
    pub fn evaluate_group<R, B>(&self, results: &[R], baselines: &[Option<B>]) -> GroupEvaluation
    where
        R: MeasurementResults,
        B: MeasurementResults,
    {
        let mut verdict = Verdict::Pass;
        let mut evaluated = Vec::with_capacity(results.len());

        for (index, result) in results.iter().enumerate() {
            let baseline = baselines.get(index).and_then(Option::as_ref);
            let comparison = self.compare_result_with_baseline(result, baseline, index);
            verdict = verdict.max_severity(comparison.verdict);

            evaluated.push(EvaluatedResult {
                description: self.describe_group_results(result),
                comparison,
            });
        }

        GroupEvaluation {
            verdict,
            results: evaluated,
        }
    }
}
