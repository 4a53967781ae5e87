//! Error types for the escalation checker.

use thiserror::Error;

/// Result type for checker operations.
pub type Result<T> = std::result::Result<T, CheckError>;

/// Errors surfaced by policy validation and the escalation check.
///
/// Input errors are raised before any solver work begins; solver errors
/// are raised after the context has been released. An error is never
/// paired with a partial verdict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// A path pattern or its capability list failed validation.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern as written.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The solver gave up without a verdict (timeout or resource limit).
    ///
    /// This is a distinct outcome from "no escalation" and must never be
    /// reported as safe.
    #[error("solver returned unknown: {reason}")]
    SolverUnknown {
        /// The solver's stated reason.
        reason: String,
    },

    /// The solver misbehaved: a satisfiable query produced no usable model.
    #[error("solver internal failure: {detail}")]
    SolverInternal {
        /// What went wrong.
        detail: String,
    },
}
