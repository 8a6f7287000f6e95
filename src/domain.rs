//! # Domain Results
//!
//! A [`DomainResult`] is the finalized outcome of one measurement run: a set
//! of named roles (generator, receiver, forwarder, cpu utilization, latency)
//! together with the identity the run was measured for.
//!
//! Domains are configurations rather than types. [`DomainKind`] fixes which
//! roles a result owns and which metrics can be evaluated against a
//! baseline; the merge, slice and describe logic is shared.
//!
//! | Kind         | Roles                                                          |
//! |--------------|----------------------------------------------------------------|
//! | `Flow`       | generator/receiver throughput and process CPU stats            |
//! | `XdpBench`   | generator (one channel per pktgen CPU), receiver (xdp-bench)   |
//! | `Forwarding` | XdpBench roles plus the forwarder interface counters           |
//! | `Cpu`        | utilization of one `(host, cpu)` pair                          |
//! | `Latency`    | round trip samples of one flow                                 |

use crate::error::PerfError;
use crate::parallel::PerfResult;
use crate::sequential::SequentialResult;
use crate::utils::format_number;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Network flow a measurement was taken for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flow {
    pub test_type: String,
    pub generator: String,
    pub generator_bind: String,
    pub receiver: String,
    pub receiver_bind: String,
    pub msg_size: u32,
    pub duration: u32,
    #[serde(default = "default_parallel_streams")]
    pub parallel_streams: u32,
}

fn default_parallel_streams() -> u32 {
    1
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Flow(type={}, generator={}({}), receiver={}({}), \
             msg_size={}, duration={}, parallel_streams={})",
            self.test_type,
            self.generator,
            self.generator_bind,
            self.receiver,
            self.receiver_bind,
            self.msg_size,
            self.duration,
            self.parallel_streams
        )
    }
}

/// What a result was measured for; fixed at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    Flow(Flow),
    Cpu { host: String, cpu: String },
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Flow(flow) => write!(f, "{}", flow),
            Identity::Cpu { host, cpu } => write!(f, "host {} cpu '{}'", host, cpu),
        }
    }
}

/// Named slot of a domain result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    GeneratorResults,
    GeneratorCpuStats,
    ReceiverResults,
    ReceiverCpuStats,
    ForwarderResults,
    Utilization,
    Latency,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::GeneratorResults => "generator_results",
            Role::GeneratorCpuStats => "generator_cpu_stats",
            Role::ReceiverResults => "receiver_results",
            Role::ReceiverCpuStats => "receiver_cpu_stats",
            Role::ForwarderResults => "forwarder_results",
            Role::Utilization => "utilization",
            Role::Latency => "latency",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        ALL_ROLES.iter().copied().find(|r| r.name() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ALL_ROLES: [Role; 7] = [
    Role::GeneratorResults,
    Role::GeneratorCpuStats,
    Role::ReceiverResults,
    Role::ReceiverCpuStats,
    Role::ForwarderResults,
    Role::Utilization,
    Role::Latency,
];

pub const LATENCY_CACHED: &str = "latency_cached";
pub const LATENCY_UNCACHED: &str = "latency_uncached";

/// Measurement domain; decides the role set of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Flow,
    XdpBench,
    Forwarding,
    Cpu,
    Latency,
}

impl DomainKind {
    pub fn roles(&self) -> &'static [Role] {
        match self {
            DomainKind::Flow => &[
                Role::GeneratorResults,
                Role::GeneratorCpuStats,
                Role::ReceiverResults,
                Role::ReceiverCpuStats,
            ],
            DomainKind::XdpBench => &[Role::GeneratorResults, Role::ReceiverResults],
            DomainKind::Forwarding => &[
                Role::GeneratorResults,
                Role::ReceiverResults,
                Role::ForwarderResults,
            ],
            DomainKind::Cpu => &[Role::Utilization],
            DomainKind::Latency => &[Role::Latency],
        }
    }

    /// Metric names that can be compared against a baseline
    pub fn metrics(&self) -> Vec<&'static str> {
        match self {
            DomainKind::Latency => vec![LATENCY_CACHED, LATENCY_UNCACHED],
            DomainKind::Flow => crate::defaults::FLOW_METRICS.to_vec(),
            DomainKind::XdpBench | DomainKind::Forwarding | DomainKind::Cpu => {
                self.roles().iter().map(Role::name).collect()
            }
        }
    }

    fn accepts(&self, identity: &Identity) -> bool {
        match (self, identity) {
            (DomainKind::Cpu, Identity::Cpu { .. }) => true,
            (DomainKind::Cpu, Identity::Flow(_)) => false,
            (
                DomainKind::Flow
                | DomainKind::XdpBench
                | DomainKind::Forwarding
                | DomainKind::Latency,
                identity,
            ) => matches!(identity, Identity::Flow(_)),
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainKind::Flow => write!(f, "flow"),
            DomainKind::XdpBench => write!(f, "xdp-bench"),
            DomainKind::Forwarding => write!(f, "forwarding"),
            DomainKind::Cpu => write!(f, "cpu"),
            DomainKind::Latency => write!(f, "latency"),
        }
    }
}

/// Which way a metric should move for the run to count as better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricDirection {
    HigherIsBetter,
    LowerIsBetter,
}

impl MetricDirection {
    /// CPU usage and latency metrics are lower-is-better, throughput is higher-is-better
    ///
    /// Only names containing `_cpu_` were inverted in older evaluations. Latency
    /// and bare `utilization` metrics are inverted here too, so baselines judged
    /// under the CPU-only rule classify them the other way.
    pub fn of_metric(name: &str) -> MetricDirection {
        let name = name.trim_start_matches(|c: char| c.is_ascii_digit() || c == '_');
        if name.contains(crate::defaults::CPU_METRIC_MARKER)
            || name == Role::Utilization.name()
            || name.starts_with(Role::Latency.name())
        {
            MetricDirection::LowerIsBetter
        } else {
            MetricDirection::HigherIsBetter
        }
    }
}

/// Read access shared by single-run results and aggregates
pub trait MeasurementResults {
    fn kind(&self) -> DomainKind;

    fn identity(&self) -> &Identity;

    fn measurement_success(&self) -> bool;

    fn role(&self, role: Role) -> Option<&PerfResult>;

    /// Cached and uncached latency samples, for latency results only
    ///
    /// Cached samples exclude the first and last round trip of a run
    /// (connection setup and the post-sleep sample), uncached samples are
    /// exactly those two.
    fn latency_split(&self) -> Option<(SequentialResult, SequentialResult)>;

    fn flow(&self) -> Option<&Flow> {
        match self.identity() {
            Identity::Flow(flow) => Some(flow),
            Identity::Cpu { .. } => None,
        }
    }

    fn metrics(&self) -> Vec<&'static str> {
        self.kind().metrics()
    }

    fn cached_latency_average(&self) -> Option<f64> {
        self.latency_split().map(|(cached, _)| cached.average())
    }

    fn uncached_latency_average(&self) -> Option<f64> {
        self.latency_split().map(|(_, uncached)| uncached.average())
    }

    /// Average of a role or a derived latency metric
    fn metric_average(&self, name: &str) -> Option<f64> {
        match name {
            LATENCY_CACHED => self.cached_latency_average(),
            LATENCY_UNCACHED => self.uncached_latency_average(),
            _ => Role::from_name(name)
                .and_then(|role| self.role(role))
                .map(PerfResult::average),
        }
    }

    fn start_timestamp(&self) -> Option<f64> {
        self.kind()
            .roles()
            .iter()
            .filter_map(|&r| self.role(r).and_then(PerfResult::start_timestamp))
            .reduce(f64::min)
    }

    fn end_timestamp(&self) -> Option<f64> {
        self.kind()
            .roles()
            .iter()
            .filter_map(|&r| self.role(r).and_then(PerfResult::end_timestamp))
            .reduce(f64::max)
    }

    /// Human readable summary, one line per measured quantity
    fn describe(&self) -> String {
        let mut desc = vec![self.identity().to_string()];

        match self.kind() {
            DomainKind::Flow => {
                desc.push(throughput_line(
                    self,
                    Role::GeneratorResults,
                    "Generator measured throughput",
                ));
                desc.push(cpu_line(self, Role::GeneratorCpuStats, "Generator process CPU data"));
                desc.push(throughput_line(
                    self,
                    Role::ReceiverResults,
                    "Receiver measured throughput",
                ));
                desc.push(cpu_line(self, Role::ReceiverCpuStats, "Receiver process CPU data"));
            }
            DomainKind::XdpBench => {
                desc.push(throughput_line(self, Role::GeneratorResults, "Generator generated"));
                desc.push(throughput_line(self, Role::ReceiverResults, "Receiver processed"));
            }
            DomainKind::Forwarding => {
                desc.push(throughput_line(self, Role::GeneratorResults, "Generator generated"));
                desc.push(throughput_line(self, Role::ReceiverResults, "Receiver processed"));
                if let Some(forwarder) = self.role(Role::ForwarderResults) {
                    desc.push(format!(
                        "Forwarder forwarded (forwarder_results): {} {} per second.",
                        format_number(forwarder.average()),
                        forwarder.unit()
                    ));
                }
            }
            DomainKind::Cpu => {
                desc.push(cpu_line(self, Role::Utilization, "Utilization"));
            }
            DomainKind::Latency => {
                if let Some((cached, uncached)) = self.latency_split() {
                    let unit = cached.unit();
                    desc.push(format!(
                        "Generator <-> receiver cached latency (average):   {} {}.",
                        format_number(cached.average()),
                        unit
                    ));
                    desc.push(format!(
                        "Generator <-> receiver uncached latency (average): {} {}.",
                        format_number(uncached.average()),
                        unit
                    ));
                    if cached.average() > 0.0 {
                        desc.push(format!(
                            "Uncached average / cached average ratio: {:.6}",
                            uncached.average() / cached.average()
                        ));
                    }
                }
            }
        }

        desc.join("\n")
    }
}

fn throughput_line<R: MeasurementResults + ?Sized>(results: &R, role: Role, label: &str) -> String {
    match results.role(role) {
        Some(result) => {
            let average = result.average();
            let deviation = result.std_deviation();
            let percentage = if average != 0.0 {
                deviation / average * 100.0
            } else {
                0.0
            };
            format!(
                "{} ({}): {} +-{:.2}({:.2}%) {} per second.",
                label,
                role,
                format_number(average),
                deviation,
                percentage,
                result.unit()
            )
        }
        None => format!("{} ({}): no data.", label, role),
    }
}

fn cpu_line<R: MeasurementResults + ?Sized>(results: &R, role: Role, label: &str) -> String {
    match results.role(role) {
        Some(result) => format!(
            "{} ({}): {:.2} +-{:.2} {} per second.",
            label,
            role,
            result.average(),
            result.std_deviation(),
            result.unit()
        ),
        None => format!("{} ({}): no data.", label, role),
    }
}

/// Results of a single measurement run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResult {
    kind: DomainKind,
    identity: Identity,
    roles: BTreeMap<Role, PerfResult>,
    measurement_success: bool,
    warmup_duration: f64,
}

impl DomainResult {
    /// Create a result owning exactly the roles of `kind`
    pub fn new(
        kind: DomainKind,
        identity: Identity,
        roles: BTreeMap<Role, PerfResult>,
        measurement_success: bool,
        warmup_duration: f64,
    ) -> Result<Self, PerfError> {
        if !kind.accepts(&identity) {
            return Err(PerfError::IncompatibleResultType {
                expected: format!("{} identity", kind),
                found: identity.to_string(),
            });
        }

        for role in roles.keys() {
            if !kind.roles().contains(role) {
                return Err(PerfError::IncompatibleResultType {
                    expected: format!("{} roles", kind),
                    found: role.to_string(),
                });
            }
        }

        if let Some(missing) = kind.roles().iter().find(|r| !roles.contains_key(r)) {
            return Err(PerfError::IncompatibleResultType {
                expected: format!("{} role", missing),
                found: "nothing".to_string(),
            });
        }

        if kind == DomainKind::Latency && roles[&Role::Latency].as_sequential().is_none() {
            return Err(PerfError::IncompatibleResultType {
                expected: "sequential latency samples".to_string(),
                found: "parallel result".to_string(),
            });
        }

        Ok(Self {
            kind,
            identity,
            roles,
            measurement_success,
            warmup_duration: warmup_duration.max(0.0),
        })
    }

    pub fn warmup_duration(&self) -> f64 {
        self.warmup_duration
    }

    pub fn roles(&self) -> impl Iterator<Item = (Role, &PerfResult)> {
        self.roles.iter().map(|(role, result)| (*role, result))
    }

    /// Copy holding only the intervals inside `[start, end)` in every role
    ///
    /// The copy's warmup is zero since slicing already removed it.
    pub fn time_slice(&self, start: f64, end: f64) -> DomainResult {
        DomainResult {
            kind: self.kind,
            identity: self.identity.clone(),
            roles: self
                .roles
                .iter()
                .map(|(role, result)| (*role, result.time_slice(start, end)))
                .collect(),
            measurement_success: self.measurement_success,
            warmup_duration: 0.0,
        }
    }

    /// Drop `warmup_duration` seconds from both ends of the run
    pub fn without_warmup(&self) -> DomainResult {
        if self.warmup_duration <= 0.0 {
            return self.clone();
        }

        match (self.start_timestamp(), self.end_timestamp()) {
            (Some(start), Some(end)) => {
                self.time_slice(start + self.warmup_duration, end - self.warmup_duration)
            }
            _ => DomainResult {
                warmup_duration: 0.0,
                ..self.clone()
            },
        }
    }

    /// Merge every role of `other` into the matching role of `self`
    ///
    /// Nothing is modified when any role is rejected.
    pub fn add_results(&mut self, other: &DomainResult) -> Result<(), PerfError> {
        self.ensure_compatible(other)?;

        let mut roles = self.roles.clone();
        for (role, result) in roles.iter_mut() {
            let theirs = other.roles.get(role).ok_or_else(|| {
                PerfError::IncompatibleResultType {
                    expected: format!("{} role", role),
                    found: "nothing".to_string(),
                }
            })?;
            result.merge(theirs)?;
        }

        self.roles = roles;
        Ok(())
    }

    /// Same kind and same identity
    pub fn ensure_compatible(&self, other: &DomainResult) -> Result<(), PerfError> {
        if self.kind != other.kind {
            return Err(PerfError::IncompatibleResultType {
                expected: self.kind.to_string(),
                found: other.kind.to_string(),
            });
        }
        if self.identity != other.identity {
            return Err(PerfError::IdentityMismatch {
                existing: self.identity.to_string(),
                new: other.identity.to_string(),
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_measurement_success(&mut self, success: bool) {
        self.measurement_success = success;
    }
}

impl MeasurementResults for DomainResult {
    fn kind(&self) -> DomainKind {
        self.kind
    }

    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn measurement_success(&self) -> bool {
        self.measurement_success
    }

    fn role(&self, role: Role) -> Option<&PerfResult> {
        self.roles.get(&role)
    }

    fn latency_split(&self) -> Option<(SequentialResult, SequentialResult)> {
        let samples = self.role(Role::Latency)?.as_sequential()?;
        Some(split_latency_samples(samples))
    }
}

pub(crate) fn split_latency_samples(
    samples: &SequentialResult,
) -> (SequentialResult, SequentialResult) {
    let len = samples.len();
    if len < 2 {
        return (samples.samples_slice(0, 0), samples.clone());
    }

    let cached = samples.samples_slice(1, len - 1);
    let first = samples.samples_slice(0, 1);
    let last = samples.samples_slice(len - 1, len);
    // both slices come from one sequence, so units always agree
    let uncached = first.merge_with(&last).unwrap_or(first);

    (cached, uncached)
}
