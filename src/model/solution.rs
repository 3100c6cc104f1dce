//! Solve statuses, solutions, and the global solution store.

use super::problem::Problem;

/// Final status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found and proven.
    Optimal,

    /// Problem is infeasible.
    Infeasible,

    /// Problem is unbounded (a feasible ray exists).
    Unbounded,

    /// Root relaxation is unbounded; feasibility was not established.
    InfeasibleOrUnbounded,

    /// Node limit for the current tree reached.
    NodeLimit,

    /// Node limit across all restarts reached.
    TotalNodeLimit,

    /// Too many nodes since the last incumbent improvement.
    StallNodeLimit,

    /// Time limit reached.
    TimeLimit,

    /// Memory limit reached.
    MemLimit,

    /// Optimality gap dropped below the configured tolerance.
    GapLimit,

    /// Configured number of feasible solutions found.
    SolLimit,

    /// Configured number of incumbent improvements reached.
    BestSolLimit,

    /// User interrupt.
    UserInterrupt,

    /// Solve has not produced a terminal status.
    Unknown,
}

impl SolveStatus {
    /// Whether the status certifies a proven outcome (not a limit).
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            SolveStatus::Optimal
                | SolveStatus::Infeasible
                | SolveStatus::Unbounded
                | SolveStatus::InfeasibleOrUnbounded
        )
    }

    /// Whether exploration stopped because of a limit.
    pub fn is_limit(&self) -> bool {
        !self.is_resolved() && !matches!(self, SolveStatus::Unknown)
    }
}

/// A feasible assignment with its recomputed objective value.
///
/// Immutable once accepted by the store.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Variable values.
    pub values: Vec<f64>,

    /// Objective value, recomputed from the problem at acceptance.
    pub obj: f64,
}

const IMPROVE_EPS: f64 = 1e-9;

/// Global store of feasible solutions.
///
/// The best accepted solution defines the cutoff bound: any node whose
/// lower bound reaches it can be pruned. The cutoff bound is monotonically
/// non-increasing.
#[derive(Debug, Clone)]
pub struct SolutionStore {
    /// Best known solution, if any.
    best: Option<Solution>,

    /// Current cutoff bound (+inf until a solution is accepted).
    cutoff_bound: f64,

    /// Feasible solutions seen (accepted or not improving).
    n_found: u64,

    /// Incumbent improvements.
    n_improving: u64,
}

impl Default for SolutionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SolutionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            best: None,
            cutoff_bound: f64::INFINITY,
            n_found: 0,
            n_improving: 0,
        }
    }

    /// Current cutoff bound.
    pub fn cutoff_bound(&self) -> f64 {
        self.cutoff_bound
    }

    /// Best known solution.
    pub fn best(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    /// Objective of the best solution (+inf if none).
    pub fn upper_bound(&self) -> f64 {
        self.best.as_ref().map_or(f64::INFINITY, |s| s.obj)
    }

    /// Whether an incumbent exists.
    pub fn has_incumbent(&self) -> bool {
        self.best.is_some()
    }

    /// Feasible solutions seen so far.
    pub fn num_found(&self) -> u64 {
        self.n_found
    }

    /// Incumbent improvements so far.
    pub fn num_improving(&self) -> u64 {
        self.n_improving
    }

    /// Validate a candidate assignment and accept it if improving.
    ///
    /// The objective is recomputed from the problem; candidates that fail
    /// the feasibility re-check are rejected outright. Returns true when
    /// the incumbent improved.
    pub fn try_add(&mut self, problem: &Problem, values: &[f64], tol: f64) -> bool {
        if !problem.check_solution(values, tol) {
            return false;
        }
        let obj = problem.objective_value(values);
        self.n_found += 1;

        if obj < self.cutoff_bound - IMPROVE_EPS {
            self.best = Some(Solution { values: values.to_vec(), obj });
            self.cutoff_bound = obj;
            self.n_improving += 1;
            true
        } else {
            false
        }
    }

    /// Relative gap between the upper bound and a lower bound.
    pub fn rel_gap(&self, lower: f64) -> f64 {
        let upper = self.upper_bound();
        if !upper.is_finite() || !lower.is_finite() {
            return f64::INFINITY;
        }
        (upper - lower).abs() / upper.abs().max(1e-10)
    }

    /// Absolute gap between the upper bound and a lower bound.
    pub fn abs_gap(&self, lower: f64) -> f64 {
        let upper = self.upper_bound();
        if !upper.is_finite() || !lower.is_finite() {
            return f64::INFINITY;
        }
        (upper - lower).abs()
    }
}
