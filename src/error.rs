//! Error kinds raised while composing and aggregating measurement results.
//!
//! Evaluation-time conditions such as a missing baseline or threshold are
//! deliberately absent here: they are reported as FAIL verdicts by the
//! evaluator instead of being raised.

use thiserror::Error;

/// Errors produced by the composition and aggregation layers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PerfError {
    /// Results of a different domain or shape were offered to `add_results`
    #[error("Adding incorrect results: expected {expected}, found {found}")]
    IncompatibleResultType { expected: String, found: String },

    /// Runs with a different flow or host/cpu identity were aggregated together
    #[error("Aggregating incompatible results: {existing} != {new}")]
    IdentityMismatch { existing: String, new: String },

    /// Raw collector samples could not be turned into intervals
    #[error("Failed to parse samples: {0}")]
    ParseFailure(String),

    /// Two results carrying different units were combined
    #[error("Unit mismatch: expected '{expected}', found '{found}'")]
    UnitMismatch { expected: String, found: String },

    /// Parallel channel counts differ between merged results
    #[error("Channel count mismatch: expected {expected}, found {found}")]
    ChannelCountMismatch { expected: usize, found: usize },
}

impl PerfError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        PerfError::ParseFailure(msg.into())
    }
}
