//! Error types for the solving loop.

use thiserror::Error;

/// Errors that can occur while driving the branch-and-bound loop.
///
/// Limits and infeasibility are *statuses*, not errors; only genuine
/// failures (a broken relaxation backend, a plugin violating its result
/// contract, an internal inconsistency) surface through this type.
#[derive(Error, Debug)]
pub enum SolveError {
    /// Problem validation failed
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// The relaxation backend failed and the retry budget is exhausted
    #[error("Relaxation solve failed after {attempts} attempts: {detail}")]
    RelaxationError {
        /// Number of solve attempts made on the failing node.
        attempts: u32,
        /// Backend-reported failure description.
        detail: String,
    },

    /// A pluggable callback returned a result inconsistent with its contract
    #[error("Plugin '{plugin}' violated its contract: {detail}")]
    PluginContract {
        /// Name of the offending plugin.
        plugin: String,
        /// What the plugin did wrong.
        detail: String,
    },

    /// Internal solver error with diagnostic context
    #[error("Internal error: {detail} (nodes={nodes}, relaxation solves={relax_solves})")]
    Internal {
        /// Description of the inconsistency.
        detail: String,
        /// Nodes processed when the error was raised.
        nodes: u64,
        /// Relaxation solves performed when the error was raised.
        relax_solves: u64,
    },
}

/// Result type for solving-loop operations.
pub type SolveResult<T> = Result<T, SolveError>;
