use crate::aggregate::AggregatedResult;
use crate::domain::{
    DomainKind, Identity, MeasurementResults, Role, LATENCY_CACHED, LATENCY_UNCACHED,
};
use crate::evaluator::{Comparison, Verdict};
use crate::parallel::PerfResult;
use crate::utils::{generate_report_id, get_cpu_count};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Structured record handed to the report writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: String,
    pub kind: DomainKind,
    pub description: String,
    pub measurement_success: bool,
    pub verdict: Option<Verdict>,
    pub lines: Vec<String>,
    pub data: Value,
}

impl ReportRecord {
    /// Record for one aggregate, optionally carrying its baseline comparison
    pub fn from_aggregate(result: &AggregatedResult, comparison: Option<&Comparison>) -> Self {
        let mut data = Map::new();

        for &role in result.kind().roles() {
            if role == Role::Latency {
                continue;
            }
            if let Some(merged) = result.role(role) {
                let runs = result
                    .individual_results()
                    .iter()
                    .filter_map(|r| r.role(role).map(PerfResult::average))
                    .collect();
                data.insert(role.name().to_string(), role_data(merged, runs));
            }
        }

        if result.kind() == DomainKind::Latency {
            if let (Some(cached), Some(uncached)) =
                (result.cached_latency_average(), result.uncached_latency_average())
            {
                data.insert(LATENCY_CACHED.to_string(), json!(cached));
                data.insert(LATENCY_UNCACHED.to_string(), json!(uncached));
            }
        }

        if let Identity::Flow(flow) = result.identity() {
            data.insert(
                "flow_results".to_string(),
                json!({
                    "flow": flow,
                    "runs": result.len(),
                    "measurement_success": result.measurement_success(),
                }),
            );
        }

        Self {
            id: generate_report_id(),
            kind: result.kind(),
            description: result.describe(),
            measurement_success: result.measurement_success(),
            verdict: comparison.map(|c| c.verdict),
            lines: comparison.map(|c| c.lines.clone()).unwrap_or_default(),
            data: Value::Object(data),
        }
    }
}

fn role_data(result: &PerfResult, runs: Vec<f64>) -> Value {
    json!({
        "average": result.average(),
        "std_deviation": result.std_deviation(),
        "unit": result.unit(),
        "duration": result.duration(),
        "runs": runs,
    })
}

/// One record per host listing the utilization of each of its CPUs
pub fn cpu_reports_by_host(results: &[AggregatedResult]) -> Vec<ReportRecord> {
    let mut hosts: Vec<(&str, Vec<&AggregatedResult>)> = Vec::new();

    for result in results {
        if let Identity::Cpu { host, .. } = result.identity() {
            match hosts.iter_mut().find(|(h, _)| *h == host.as_str()) {
                Some((_, group)) => group.push(result),
                None => hosts.push((host.as_str(), vec![result])),
            }
        }
    }

    hosts
        .into_iter()
        .map(|(host, group)| {
            let mut desc = vec![format!("CPU Utilization on host {}:", host)];
            let mut data = Map::new();

            for result in &group {
                let (Identity::Cpu { cpu, .. }, Some(utilization)) =
                    (result.identity(), result.role(Role::Utilization))
                else {
                    continue;
                };
                desc.push(format!(
                    "cpu '{}': {:.2} +-{:.2} {} per second",
                    cpu,
                    utilization.average(),
                    utilization.std_deviation(),
                    utilization.unit()
                ));
                let runs = result
                    .individual_results()
                    .iter()
                    .filter_map(|r| r.role(Role::Utilization).map(PerfResult::average))
                    .collect();
                data.insert(cpu.clone(), role_data(utilization, runs));
            }

            ReportRecord {
                id: generate_report_id(),
                kind: DomainKind::Cpu,
                description: desc.join("\n"),
                measurement_success: group.iter().all(|r| r.measurement_success()),
                verdict: None,
                lines: Vec::new(),
                data: Value::Object(data),
            }
        })
        .collect()
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub tool_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: get_cpu_count(),
            tool_version: crate::VERSION.to_string(),
        }
    }
}

/// Report metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub total_records: usize,
    pub system_info: SystemInfo,
}

/// Document written by [`ReportManager::finalize`]
#[derive(Debug, Serialize, Deserialize)]
pub struct FinalReport {
    pub metadata: ReportMetadata,
    pub verdict: Option<Verdict>,
    pub records: Vec<ReportRecord>,
}

/// Collects report records and writes them out as one JSON document
pub struct ReportManager {
    output_file: PathBuf,
    records: Vec<ReportRecord>,
}

impl ReportManager {
    pub fn new(output_file: &Path) -> Self {
        Self {
            output_file: output_file.to_path_buf(),
            records: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: ReportRecord) {
        debug!("Adding {} report record {}", record.kind, record.id);
        self.records.push(record);
    }

    pub fn records(&self) -> &[ReportRecord] {
        &self.records
    }

    /// Most severe verdict over all evaluated records
    pub fn overall_verdict(&self) -> Option<Verdict> {
        self.records.iter().filter_map(|r| r.verdict).max()
    }

    /// Write the final report to the output file
    pub fn finalize(&self) -> Result<FinalReport> {
        info!("Finalizing evaluation report");

        let report = FinalReport {
            metadata: ReportMetadata {
                version: crate::VERSION.to_string(),
                timestamp: chrono::Utc::now(),
                total_records: self.records.len(),
                system_info: SystemInfo::default(),
            },
            verdict: self.overall_verdict(),
            records: self.records.clone(),
        };

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&self.output_file, json)
            .with_context(|| format!("Failed to write report to {:?}", self.output_file))?;

        info!("Report written to: {:?}", self.output_file);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::domain::tests::{forwarding_result, parallel};
    use crate::domain::DomainResult;
    use std::collections::BTreeMap;
    use tempfile::NamedTempFile;

    fn cpu_aggregate(host: &str, cpu: &str, rate: f64) -> AggregatedResult {
        let mut roles = BTreeMap::new();
        roles.insert(Role::Utilization, parallel(&[rate], 0.0, 4));
        let run = DomainResult::new(
            DomainKind::Cpu,
            Identity::Cpu {
                host: host.to_string(),
                cpu: cpu.to_string(),
            },
            roles,
            true,
            0.0,
        )
        .unwrap();
        aggregate(None, run).unwrap()
    }

    #[test]
    fn test_forwarding_record_keys() {
        let aggregated = aggregate(None, forwarding_result(100.0, 0.0)).unwrap();
        let record = ReportRecord::from_aggregate(&aggregated, None);

        for key in ["generator_results", "receiver_results", "forwarder_results", "flow_results"] {
            assert!(record.data.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(record.data["generator_results"]["average"], json!(200.0));
        assert_eq!(record.data["generator_results"]["unit"], json!("packets"));
        assert_eq!(record.data["flow_results"]["runs"], json!(1));
        assert!(record.verdict.is_none());
    }

    #[test]
    fn test_cpu_reports_grouped_by_host() {
        let results = vec![
            cpu_aggregate("host1", "0", 10.0),
            cpu_aggregate("host2", "0", 20.0),
            cpu_aggregate("host1", "1", 30.0),
        ];
        let records = cpu_reports_by_host(&results);

        assert_eq!(records.len(), 2);
        assert!(records[0].description.starts_with("CPU Utilization on host host1:"));
        assert!(records[0].description.contains("cpu '1': 30.00 +-0.00 packets per second"));
        assert_eq!(records[0].data.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_report_manager_finalize() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut manager = ReportManager::new(temp_file.path());
        let aggregated = aggregate(None, forwarding_result(100.0, 0.0)).unwrap();

        let comparison = Comparison {
            verdict: Verdict::Warning,
            lines: vec!["IMPROVEMENT: ...".to_string()],
            metrics: Vec::new(),
        };
        manager.add_record(ReportRecord::from_aggregate(&aggregated, Some(&comparison)));
        manager.add_record(ReportRecord::from_aggregate(&aggregated, None));

        let report = manager.finalize().unwrap();
        assert_eq!(report.verdict, Some(Verdict::Warning));
        assert_eq!(report.metadata.total_records, 2);

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(temp_file.path()).unwrap()).unwrap();
        assert_eq!(written["verdict"], json!("WARNING"));
        assert_eq!(written["records"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_system_info_default() {
        let info = SystemInfo::default();

        assert!(!info.os.is_empty());
        assert!(!info.architecture.is_empty());
        assert!(info.cpu_cores > 0);
    }
}
