use anyhow::Result;
use netperf_eval::{
    aggregate,
    evaluator::BaselineEvaluator,
    samples::{parse_samples, RawSample},
    AggregatedResult, DomainKind, DomainResult, Flow, Identity, Interval, MeasurementResults,
    ParallelResult, PerfError, PerfResult, Role, SequentialResult, Unit, Verdict,
};
use std::collections::{BTreeMap, HashMap};

fn flow() -> Flow {
    Flow {
        test_type: "udp_stream".to_string(),
        generator: "host1".to_string(),
        generator_bind: "192.168.101.1".to_string(),
        receiver: "host2".to_string(),
        receiver_bind: "192.168.101.2".to_string(),
        msg_size: 64,
        duration: 10,
        parallel_streams: 1,
    }
}

fn channel(rate: f64, unit: Unit, samples: usize) -> Result<SequentialResult> {
    let intervals = (0..samples)
        .map(|i| Interval::new(rate, 1.0, unit, i as f64))
        .collect();
    Ok(SequentialResult::from_intervals(unit, intervals)?)
}

fn parallel(rates: &[f64], unit: Unit) -> Result<PerfResult> {
    let mut result = ParallelResult::new(unit);
    for &rate in rates {
        result.append(channel(rate, unit, 10)?)?;
    }
    Ok(result.into())
}

fn xdp_run(generator: f64, receiver: f64) -> Result<DomainResult> {
    let mut roles = BTreeMap::new();
    roles.insert(Role::GeneratorResults, parallel(&[generator], Unit::Packets)?);
    roles.insert(Role::ReceiverResults, parallel(&[receiver], Unit::Packets)?);
    Ok(DomainResult::new(
        DomainKind::XdpBench,
        Identity::Flow(flow()),
        roles,
        true,
        0.0,
    )?)
}

fn flow_run(throughput: f64, cpu: f64) -> Result<DomainResult> {
    let mut roles = BTreeMap::new();
    roles.insert(Role::GeneratorResults, parallel(&[throughput], Unit::Bits)?);
    roles.insert(Role::ReceiverResults, parallel(&[throughput], Unit::Bits)?);
    roles.insert(Role::GeneratorCpuStats, parallel(&[cpu], Unit::Percent)?);
    roles.insert(Role::ReceiverCpuStats, parallel(&[cpu], Unit::Percent)?);
    Ok(DomainResult::new(
        DomainKind::Flow,
        Identity::Flow(flow()),
        roles,
        true,
        0.0,
    )?)
}

fn single_metric_evaluator(metric: &str, threshold: f64) -> BaselineEvaluator {
    let mut thresholds = HashMap::new();
    thresholds.insert(format!("0_{}", metric), threshold);
    BaselineEvaluator::new(thresholds, Some(vec![metric.to_string()]))
}

#[test]
fn cumulative_samples_become_rate_intervals() -> Result<()> {
    let raw = vec![
        RawSample::new(0.0).with_counter("tx_packets", 0.0),
        RawSample::new(1.0).with_counter("tx_packets", 1000.0),
        RawSample::new(2.0).with_counter("tx_packets", 2100.0),
    ];
    let result = parse_samples(&raw, "tx_packets", Unit::Packets)?;

    assert_eq!(result.len(), 2);
    assert_eq!(result.intervals()[0].value, 1000.0);
    assert_eq!(result.intervals()[1].value, 1100.0);
    assert_eq!(result.intervals()[1].duration, 1.0);
    assert_eq!(result.average(), 1050.0);
    Ok(())
}

#[test]
fn single_sample_is_a_parse_failure() {
    let raw = vec![RawSample::new(0.0).with_counter("tx_packets", 0.0)];
    assert!(matches!(
        parse_samples(&raw, "tx_packets", Unit::Packets),
        Err(PerfError::ParseFailure(_))
    ));
}

#[test]
fn parallel_channels_add_up() -> Result<()> {
    let combined = parallel(&[500.0, 500.0, 500.0], Unit::Packets)?;
    assert_eq!(combined.average(), 1500.0);
    Ok(())
}

#[test]
fn mixed_units_are_rejected() -> Result<()> {
    let mut result = ParallelResult::new(Unit::Packets);
    result.append(channel(1.0, Unit::Packets, 3)?)?;
    assert!(matches!(
        result.append(channel(1.0, Unit::Bits, 3)?),
        Err(PerfError::UnitMismatch { .. })
    ));
    Ok(())
}

#[test]
fn time_slice_is_idempotent_and_leaves_source_alone() -> Result<()> {
    let run = xdp_run(1000.0, 900.0)?;
    let once = run.time_slice(2.0, 8.0);
    let twice = once.time_slice(2.0, 8.0);

    assert_eq!(once, twice);
    assert_eq!(once.warmup_duration(), 0.0);
    assert_eq!(once.role(Role::GeneratorResults).map(PerfResult::interval_count), Some(6));
    assert_eq!(run.role(Role::GeneratorResults).map(PerfResult::interval_count), Some(10));
    Ok(())
}

#[test]
fn aggregation_is_order_independent() -> Result<()> {
    let a = xdp_run(1000.0, 900.0)?;
    let b = xdp_run(3000.0, 2900.0)?;

    let ab = aggregate(Some(aggregate(None, a.clone())?), b.clone())?;
    let ba = aggregate(Some(aggregate(None, b.clone())?), a.clone())?;

    for metric in ["generator_results", "receiver_results"] {
        assert_eq!(ab.metric_average(metric), ba.metric_average(metric));
    }
    assert_eq!(ab.metric_average("generator_results"), Some(2000.0));
    assert_eq!(ab.individual_results(), &[a.clone(), b.clone()]);
    assert_eq!(ba.individual_results(), &[b, a]);
    Ok(())
}

#[test]
fn aggregation_rejects_other_flows() -> Result<()> {
    let aggregated = aggregate(None, xdp_run(1000.0, 900.0)?)?;

    let mut other = flow();
    other.receiver = "host3".to_string();
    let mut roles = BTreeMap::new();
    roles.insert(Role::GeneratorResults, parallel(&[1000.0], Unit::Packets)?);
    roles.insert(Role::ReceiverResults, parallel(&[900.0], Unit::Packets)?);
    let run = DomainResult::new(DomainKind::XdpBench, Identity::Flow(other), roles, true, 0.0)?;

    assert!(matches!(
        aggregate(Some(aggregated), run),
        Err(PerfError::IdentityMismatch { .. })
    ));
    Ok(())
}

#[test]
fn aggregation_rejects_other_kinds() -> Result<()> {
    let aggregated = aggregate(None, xdp_run(1000.0, 900.0)?)?;
    assert!(matches!(
        aggregate(Some(aggregated), flow_run(1000.0, 10.0)?),
        Err(PerfError::IncompatibleResultType { .. })
    ));
    Ok(())
}

#[test]
fn throughput_verdicts() -> Result<()> {
    let baseline = aggregate(None, xdp_run(1000.0, 1000.0)?)?;
    let evaluator = single_metric_evaluator("generator_results", 10.0);

    let cases = [
        (1050.0, Verdict::Pass, "PASS: "),
        (1200.0, Verdict::Warning, "IMPROVEMENT: "),
        (850.0, Verdict::Fail, "FAIL: "),
    ];
    for (target, verdict, prefix) in cases {
        let result = aggregate(None, xdp_run(target, 1000.0)?)?;
        let comparison = evaluator.compare_result_with_baseline(&result, Some(&baseline), 0);

        assert_eq!(comparison.verdict, verdict, "target {}", target);
        assert!(comparison.lines[0].starts_with(prefix), "{}", comparison.lines[0]);
    }
    Ok(())
}

#[test]
fn cpu_verdicts_are_inverted() -> Result<()> {
    let baseline = aggregate(None, flow_run(1000.0, 100.0)?)?;
    let evaluator = single_metric_evaluator("generator_cpu_stats", 10.0);

    let cases = [
        (80.0, Verdict::Warning),
        (120.0, Verdict::Fail),
        (105.0, Verdict::Pass),
    ];
    for (cpu, verdict) in cases {
        let result = aggregate(None, flow_run(1000.0, cpu)?)?;
        let comparison = evaluator.compare_result_with_baseline(&result, Some(&baseline), 0);
        assert_eq!(comparison.verdict, verdict, "cpu {}", cpu);
    }
    Ok(())
}

#[test]
fn missing_threshold_and_baseline_fail() -> Result<()> {
    let result = aggregate(None, xdp_run(1000.0, 1000.0)?)?;
    let evaluator = BaselineEvaluator::default();

    let comparison = evaluator.compare_result_with_baseline(&result, Some(&result), 0);
    assert_eq!(comparison.verdict, Verdict::Fail);
    assert!(comparison.lines.iter().all(|l| l.contains("threshold not found")));

    let group = evaluator.evaluate_group::<AggregatedResult, AggregatedResult>(&[result], &[None]);
    assert_eq!(group.verdict, Verdict::Fail);
    assert_eq!(
        group.results[0].comparison.lines,
        vec!["No baseline found for this flow.".to_string()]
    );
    Ok(())
}

#[test]
fn group_verdict_is_most_severe() -> Result<()> {
    let baseline = aggregate(None, xdp_run(1000.0, 1000.0)?)?;
    let mut thresholds = HashMap::new();
    for key in ["0_generator_results", "1_generator_results"] {
        thresholds.insert(key.to_string(), 10.0);
    }
    let evaluator = BaselineEvaluator::new(thresholds, Some(vec!["generator_results".to_string()]));

    let results = vec![
        aggregate(None, xdp_run(1200.0, 1000.0)?)?,
        aggregate(None, xdp_run(1000.0, 1000.0)?)?,
    ];
    let group = evaluator.evaluate_group(&results, &[Some(baseline.clone()), Some(baseline)]);

    assert_eq!(group.results[0].comparison.verdict, Verdict::Warning);
    assert_eq!(group.results[1].comparison.verdict, Verdict::Pass);
    assert_eq!(group.verdict, Verdict::Warning);
    Ok(())
}
