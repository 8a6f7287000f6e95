//! # Run Aggregation
//!
//! Repeated executions of the same measurement are folded into an
//! [`AggregatedResult`]: every contributing run is kept in order in
//! `individual_results`, and each role is merged channel by channel into a
//! combined result that the baseline evaluator compares.
//!
//! Folding is append-only and happens in place. An aggregate must not be
//! folded into from several threads at once; callers fold one run at a
//! time and each run exactly once (folding the same run twice counts it
//! twice).

use crate::domain::{
    split_latency_samples, DomainKind, DomainResult, Identity, MeasurementResults, Role,
};
use crate::error::PerfError;
use crate::parallel::PerfResult;
use crate::sequential::SequentialResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Something that can be folded into an aggregate
#[derive(Debug, Clone)]
pub enum Contribution {
    /// A single finished run
    Run(DomainResult),
    /// Another aggregate of the same identity, e.g. a partial batch
    Aggregate(AggregatedResult),
}

/// Fold of several same-identity runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    kind: DomainKind,
    identity: Identity,
    roles: BTreeMap<Role, PerfResult>,
    individual_results: Vec<DomainResult>,
}

impl AggregatedResult {
    /// Empty aggregate; its identity is fixed from here on
    pub fn new(kind: DomainKind, identity: Identity) -> Self {
        Self {
            kind,
            identity,
            roles: BTreeMap::new(),
            individual_results: Vec::new(),
        }
    }

    pub fn individual_results(&self) -> &[DomainResult] {
        &self.individual_results
    }

    pub fn len(&self) -> usize {
        self.individual_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individual_results.is_empty()
    }

    /// Fold a run or another aggregate into this one
    ///
    /// Nothing is modified when the contribution is rejected.
    pub fn add_results(&mut self, contribution: Contribution) -> Result<(), PerfError> {
        match contribution {
            Contribution::Run(run) => {
                self.ensure_compatible(run.kind(), run.identity())?;
                let roles = self.merged_roles(run.roles())?;

                self.roles = roles;
                self.individual_results.push(run);
                debug!(
                    "Aggregated run #{} of {} results for {}",
                    self.individual_results.len(),
                    self.kind,
                    self.identity
                );
            }
            Contribution::Aggregate(other) => {
                self.ensure_compatible(other.kind, &other.identity)?;
                let roles = self.merged_roles(other.roles.iter().map(|(r, p)| (*r, p)))?;

                self.roles = roles;
                self.individual_results.extend(other.individual_results);
            }
        }
        Ok(())
    }

    fn ensure_compatible(&self, kind: DomainKind, identity: &Identity) -> Result<(), PerfError> {
        if self.kind != kind {
            return Err(PerfError::IncompatibleResultType {
                expected: self.kind.to_string(),
                found: kind.to_string(),
            });
        }
        if &self.identity != identity {
            return Err(PerfError::IdentityMismatch {
                existing: self.identity.to_string(),
                new: identity.to_string(),
            });
        }
        Ok(())
    }

    fn merged_roles<'a>(
        &self,
        incoming: impl Iterator<Item = (Role, &'a PerfResult)>,
    ) -> Result<BTreeMap<Role, PerfResult>, PerfError> {
        let mut roles = self.roles.clone();
        for (role, result) in incoming {
            match roles.get_mut(&role) {
                Some(existing) => existing.merge(result)?,
                None => {
                    roles.insert(role, result.clone());
                }
            }
        }
        Ok(roles)
    }

    /// Slice every merged role and every contributing run to `[start, end)`
    pub fn time_slice(&self, start: f64, end: f64) -> AggregatedResult {
        AggregatedResult {
            kind: self.kind,
            identity: self.identity.clone(),
            roles: self
                .roles
                .iter()
                .map(|(role, result)| (*role, result.time_slice(start, end)))
                .collect(),
            individual_results: self
                .individual_results
                .iter()
                .map(|r| r.time_slice(start, end))
                .collect(),
        }
    }
}

impl MeasurementResults for AggregatedResult {
    fn kind(&self) -> DomainKind {
        self.kind
    }

    fn identity(&self) -> &Identity {
        &self.identity
    }

    /// True only when there is at least one run and every run succeeded
    fn measurement_success(&self) -> bool {
        !self.individual_results.is_empty()
            && self
                .individual_results
                .iter()
                .all(MeasurementResults::measurement_success)
    }

    fn role(&self, role: Role) -> Option<&PerfResult> {
        self.roles.get(&role)
    }

    /// First and last samples are taken per run, not from the merged sequence
    fn latency_split(&self) -> Option<(SequentialResult, SequentialResult)> {
        let mut split: Option<(SequentialResult, SequentialResult)> = None;

        for run in &self.individual_results {
            let samples = run.role(Role::Latency)?.as_sequential()?;
            let (cached, uncached) = split_latency_samples(samples);

            split = Some(match split {
                None => (cached, uncached),
                Some((all_cached, all_uncached)) => (
                    all_cached.merge_with(&cached).ok()?,
                    all_uncached.merge_with(&uncached).ok()?,
                ),
            });
        }

        split
    }
}

/// Fold one run into an aggregate, creating the aggregate for the first run
pub fn aggregate(
    old: Option<AggregatedResult>,
    new: DomainResult,
) -> Result<AggregatedResult, PerfError> {
    let mut aggregated =
        old.unwrap_or_else(|| AggregatedResult::new(new.kind(), new.identity().clone()));

    aggregated.add_results(Contribution::Run(new))?;

    info!(
        "Folded run {} into {} aggregate for {}",
        aggregated.len(),
        aggregated.kind(),
        aggregated.identity()
    );
    Ok(aggregated)
}

/// Fold index-aligned lists of results (one entry per flow or host cpu)
pub fn aggregate_batch(
    old: Option<Vec<AggregatedResult>>,
    new: Vec<DomainResult>,
) -> Result<Vec<AggregatedResult>, PerfError> {
    let old: Vec<Option<AggregatedResult>> = match old {
        Some(old) => {
            if old.len() != new.len() {
                return Err(PerfError::ChannelCountMismatch {
                    expected: old.len(),
                    found: new.len(),
                });
            }
            old.into_iter().map(Some).collect()
        }
        None => vec![None; new.len()],
    };

    old.into_iter()
        .zip(new)
        .map(|(old, new)| aggregate(old, new))
        .collect()
}
