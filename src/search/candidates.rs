//! Branching candidate sets.
//!
//! Candidates are a derived view over the current relaxation solution (or
//! externally registered variables, or the pseudo solution). The LP-based
//! set is keyed to the relaxation's solve counter and recomputed on
//! demand; any re-solve invalidates it.

use crate::model::Problem;

/// A branching candidate.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Variable index.
    pub var: usize,

    /// Value to branch around.
    pub value: f64,

    /// Fractionality of the value (0 for integral pseudo candidates).
    pub frac: f64,
}

/// A concrete two-way branching decision.
#[derive(Debug, Clone, Copy)]
pub struct BranchDecision {
    /// Variable to branch on.
    pub var: usize,

    /// Value branched around.
    pub value: f64,

    /// Upper bound of the down child (x <= down_ub).
    pub down_ub: f64,

    /// Lower bound of the up child (x >= up_lb).
    pub up_lb: f64,

    /// Selection score (for logging).
    pub score: f64,
}

impl BranchDecision {
    /// Branch around a fractional value: x <= floor(v) | x >= ceil(v).
    pub fn around_fractional(var: usize, value: f64, score: f64) -> Self {
        Self { var, value, down_ub: value.floor(), up_lb: value.ceil(), score }
    }

    /// Branch around an integral value: x <= v | x >= v + 1.
    pub fn around_integral(var: usize, value: f64, score: f64) -> Self {
        Self { var, value, down_ub: value, up_lb: value + 1.0, score }
    }
}

/// The three candidate sets the branching step draws from.
#[derive(Default)]
pub struct BranchCandidates {
    /// Fractional variables of the current relaxation solution.
    lp: Vec<Candidate>,

    /// Relaxation solve count the LP set was computed for.
    lp_valid_for: Option<u64>,

    /// Externally registered candidates (e.g. by enforcement callbacks).
    external: Vec<Candidate>,
}

impl BranchCandidates {
    /// Create empty candidate sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the LP candidate set from a relaxation solution.
    pub fn compute_lp(&mut self, problem: &Problem, x: &[f64], tol: f64, solve_count: u64) {
        self.lp = problem
            .fractional_vars(x, tol)
            .into_iter()
            .map(|(var, value, frac)| Candidate { var, value, frac })
            .collect();
        self.lp_valid_for = Some(solve_count);
    }

    /// LP candidates, only if still valid for the given solve count.
    pub fn lp(&self, solve_count: u64) -> Option<&[Candidate]> {
        (self.lp_valid_for == Some(solve_count)).then_some(self.lp.as_slice())
    }

    /// Register an external candidate.
    pub fn add_external(&mut self, cand: Candidate) {
        self.external.push(cand);
    }

    /// Externally registered candidates.
    pub fn external(&self) -> &[Candidate] {
        &self.external
    }

    /// Drop everything (node is done).
    pub fn clear(&mut self) {
        self.lp.clear();
        self.lp_valid_for = None;
        self.external.clear();
    }
}
