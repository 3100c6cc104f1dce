//! Solve statistics and the final report.

use crate::model::{Solution, SolveStatus};

/// Counters accumulated over a solve.
#[derive(Debug, Default, Clone)]
pub struct SolveStats {
    /// Nodes processed in the current run (reset on restart).
    pub n_nodes: u64,

    /// Nodes processed across all restarts.
    pub n_total_nodes: u64,

    /// Nodes processed since the incumbent last improved.
    pub n_stall_nodes: u64,

    /// Relaxation solves.
    pub n_relax_solves: u64,

    /// Relaxation solver errors (including recovered ones).
    pub n_relax_errors: u64,

    /// Pricing rounds executed.
    pub n_price_rounds: u64,

    /// Columns added by pricers.
    pub n_cols_added: u64,

    /// Separation rounds executed.
    pub n_sepa_rounds: u64,

    /// Cuts applied to the relaxation.
    pub n_cuts_applied: u64,

    /// Propagation rounds executed.
    pub n_prop_rounds: u64,

    /// Domain reductions found by propagation.
    pub n_reductions: u64,

    /// Branchings performed.
    pub n_branchings: u64,

    /// Nodes pruned by bound.
    pub n_pruned: u64,

    /// Nodes found infeasible.
    pub n_infeasible: u64,

    /// Conflict constraints learned.
    pub n_conflicts: u64,

    /// Restarts performed.
    pub n_restarts: u64,

    /// Feasible solutions found.
    pub n_solutions: u64,

    /// Solve wall time in milliseconds.
    pub time_ms: u64,
}

impl SolveStats {
    /// Reset the per-run node counter; cumulative counters survive.
    pub fn notify_restart(&mut self) {
        self.n_nodes = 0;
        self.n_restarts += 1;
    }
}

/// Outcome of a solve: status, incumbent, bounds and counters.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Final status.
    pub status: SolveStatus,

    /// Best solution found, if any.
    pub best: Option<Solution>,

    /// Objective of the best solution (+inf without an incumbent).
    pub obj: f64,

    /// Global lower bound at termination.
    pub lower_bound: f64,

    /// Relative primal-dual gap at termination.
    pub gap: f64,

    /// Counters.
    pub stats: SolveStats,
}

impl SolveReport {
    /// Whether the solve proved optimality.
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}
