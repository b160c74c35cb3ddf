//! Error taxonomy for rate arithmetic, graph mutation and the analysis lifecycle.
//!
//! Absent graph entries and removal of a missing edge are not errors: the
//! first is reported as a "no opportunity" result, the second as `false`.

use thiserror::Error;

/// Errors raised by the arbitrage core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbError {
    /// A rational was divided by zero.
    #[error("division by a zero rational")]
    DivisionByZero,

    /// An edge was rejected at the graph-mutation boundary.
    #[error("invalid edge: {reason}")]
    InvalidEdge {
        /// Why the edge was rejected.
        reason: String,
    },

    /// The hop bound must be at least one.
    #[error("max path length must be positive")]
    InvalidPathLength,

    /// A string could not be parsed as a rational.
    #[error("cannot parse rational from {input:?}")]
    ParseRational {
        /// The offending input.
        input: String,
    },

    /// A decimal's exponent is too large to expand exactly.
    #[error("decimal exponent {scale} exceeds the limit of {limit}")]
    DecimalExponentOutOfRange {
        /// Scale of the rejected decimal; negative scales are positive powers of ten.
        scale: i64,
        /// Largest accepted magnitude.
        limit: u64,
    },

    /// A lossy float conversion produced no finite value.
    #[error("rational {value} has no finite float approximation")]
    NotRepresentable {
        /// The rejected value, formatted as `n/d`.
        value: String,
    },

    /// The natural log of a zero or negative rational was requested.
    #[error("logarithm of non-positive rational {value}")]
    NonPositiveLogarithm {
        /// The rejected value, formatted as `n/d`.
        value: String,
    },

    /// `stop` was called on an analyzer that is not running.
    #[error("analysis loop is not running")]
    NotStarted,

    /// `start` was called on an analyzer that is already running.
    #[error("analysis loop is already running")]
    AlreadyStarted,

    /// `stop` was called while another stop is still waiting.
    #[error("analysis loop is already stopping")]
    StopPending,

    /// `start` was called outside a Tokio runtime.
    #[error("no Tokio runtime available for the analysis loop")]
    NoRuntime,

    /// The analysis task did not terminate cleanly while being awaited.
    #[error("interrupted while waiting for the analysis loop: {reason}")]
    Interrupted {
        /// Cancellation or panic description from the runtime.
        reason: String,
    },
}

impl ArbError {
    pub(crate) fn invalid_edge(reason: impl Into<String>) -> Self {
        Self::InvalidEdge {
            reason: reason.into(),
        }
    }
}
