//! Variable domain state and bound-change tracking.
//!
//! Nodes are defined by bound changes relative to the root; focusing a node
//! resets the domain to the root bounds and replays the node's path. Every
//! tightening performed while a node is in focus lands on the trail so the
//! node's children can inherit it.

use super::problem::Problem;

/// Which bound a change affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundDir {
    /// Lower bound.
    Lower,

    /// Upper bound.
    Upper,
}

/// Why a bound change was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// Branching decision.
    Branching,

    /// Domain propagation.
    Propagation,

    /// Conflict-driven deduction.
    Conflict,
}

/// A single bound change.
#[derive(Debug, Clone, Copy)]
pub struct BoundChange {
    /// Variable index.
    pub var: usize,

    /// Which bound changed.
    pub dir: BoundDir,

    /// Bound value before the change.
    pub old: f64,

    /// Bound value after the change.
    pub new: f64,

    /// Why the change was made.
    pub reason: ChangeReason,
}

/// Outcome of a tightening attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomResult {
    /// The new bound was not stronger than the current one.
    Unchanged,

    /// The bound was tightened.
    Tightened,

    /// The tightening empties the domain.
    Infeasible,
}

const BOUND_EPS: f64 = 1e-9;

/// Current variable bounds plus the trail of changes made in focus.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Root lower bounds.
    root_lb: Vec<f64>,

    /// Root upper bounds.
    root_ub: Vec<f64>,

    /// Current lower bounds.
    lb: Vec<f64>,

    /// Current upper bounds.
    ub: Vec<f64>,

    /// Changes made since the last `reset_to_root`/`clear_trail`.
    trail: Vec<BoundChange>,
}

impl DomainState {
    /// Create a domain state from the problem's global bounds.
    pub fn from_problem(problem: &Problem) -> Self {
        let root_lb: Vec<f64> = problem.vars.iter().map(|v| v.lb).collect();
        let root_ub: Vec<f64> = problem.vars.iter().map(|v| v.ub).collect();
        Self {
            lb: root_lb.clone(),
            ub: root_ub.clone(),
            root_lb,
            root_ub,
            trail: Vec::new(),
        }
    }

    /// Current lower bound of a variable.
    pub fn lb(&self, var: usize) -> f64 {
        self.lb[var]
    }

    /// Current upper bound of a variable.
    pub fn ub(&self, var: usize) -> f64 {
        self.ub[var]
    }

    /// Number of variables tracked.
    pub fn len(&self) -> usize {
        self.lb.len()
    }

    /// Whether no variables are tracked.
    pub fn is_empty(&self) -> bool {
        self.lb.is_empty()
    }

    /// Register a new variable (column generation).
    pub fn add_variable(&mut self, lb: f64, ub: f64) {
        self.root_lb.push(lb);
        self.root_ub.push(ub);
        self.lb.push(lb);
        self.ub.push(ub);
    }

    /// Tighten a root (global) bound. Used for globally valid reductions
    /// found at the root node so they survive restarts.
    pub fn tighten_root(&mut self, var: usize, dir: BoundDir, val: f64) {
        match dir {
            BoundDir::Lower => self.root_lb[var] = self.root_lb[var].max(val),
            BoundDir::Upper => self.root_ub[var] = self.root_ub[var].min(val),
        }
    }

    /// Reset all bounds to the root bounds and clear the trail.
    pub fn reset_to_root(&mut self) {
        self.lb.copy_from_slice(&self.root_lb);
        self.ub.copy_from_slice(&self.root_ub);
        self.trail.clear();
    }

    /// Replay a node's bound-change path without recording to the trail.
    pub fn replay(&mut self, path: &[BoundChange]) {
        for chg in path {
            match chg.dir {
                BoundDir::Lower => self.lb[chg.var] = self.lb[chg.var].max(chg.new),
                BoundDir::Upper => self.ub[chg.var] = self.ub[chg.var].min(chg.new),
            }
        }
    }

    /// Try to raise a lower bound. Records to the trail on success.
    pub fn tighten_lb(&mut self, var: usize, val: f64, reason: ChangeReason) -> DomResult {
        if val <= self.lb[var] + BOUND_EPS {
            return DomResult::Unchanged;
        }
        if val > self.ub[var] + BOUND_EPS {
            return DomResult::Infeasible;
        }
        self.trail.push(BoundChange {
            var,
            dir: BoundDir::Lower,
            old: self.lb[var],
            new: val,
            reason,
        });
        self.lb[var] = val;
        DomResult::Tightened
    }

    /// Try to lower an upper bound. Records to the trail on success.
    pub fn tighten_ub(&mut self, var: usize, val: f64, reason: ChangeReason) -> DomResult {
        if val >= self.ub[var] - BOUND_EPS {
            return DomResult::Unchanged;
        }
        if val < self.lb[var] - BOUND_EPS {
            return DomResult::Infeasible;
        }
        self.trail.push(BoundChange {
            var,
            dir: BoundDir::Upper,
            old: self.ub[var],
            new: val,
            reason,
        });
        self.ub[var] = val;
        DomResult::Tightened
    }

    /// Changes recorded since the last reset.
    pub fn trail(&self) -> &[BoundChange] {
        &self.trail
    }

    /// Take the trail, leaving it empty.
    pub fn take_trail(&mut self) -> Vec<BoundChange> {
        std::mem::take(&mut self.trail)
    }

    /// Whether a variable is fixed (lb == ub within tolerance).
    pub fn is_fixed(&self, var: usize) -> bool {
        self.ub[var] - self.lb[var] <= BOUND_EPS
    }

    /// Count fixed integral variables.
    pub fn num_fixed_integers(&self, problem: &Problem) -> usize {
        problem.integer_vars().iter().filter(|&&i| self.is_fixed(i)).count()
    }

    /// The pseudo solution: every variable at its objective-best bound.
    ///
    /// Returns the assignment and its objective value. The objective is
    /// -inf when some variable is unbounded in its cheap direction; such a
    /// pseudo solution is still usable for enforcement but not as a bound.
    pub fn pseudo_solution(&self, problem: &Problem) -> (Vec<f64>, f64) {
        let mut x = vec![0.0; self.len()];
        let mut obj = 0.0;
        for (i, v) in problem.vars.iter().enumerate() {
            let best = if v.obj >= 0.0 { self.lb[i] } else { self.ub[i] };
            if best.is_finite() {
                x[i] = best;
                obj += v.obj * best;
            } else if v.obj != 0.0 {
                // Unbounded in the improving direction.
                x[i] = if self.lb[i].is_finite() { self.lb[i] } else { 0.0 };
                obj = f64::NEG_INFINITY;
            } else {
                x[i] = if self.lb[i].is_finite() {
                    self.lb[i]
                } else if self.ub[i].is_finite() {
                    self.ub[i]
                } else {
                    0.0
                };
            }
        }
        (x, obj)
    }
}
