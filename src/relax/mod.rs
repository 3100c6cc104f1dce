//! Relaxation adapter: the wrapper around the external LP solver.
//!
//! The backend is a pluggable [`RelaxationSolver`]; the loop only talks to
//! the [`Relaxation`] wrapper, which buffers bound changes, cut rows, and
//! priced columns, and tracks the `{flushed, solved}` state pair. Code that
//! reads relaxation values must only do so when both flags are set.

use std::rc::Rc;

use crate::error::SolveResult;
use crate::model::{DomainState, Problem, Variable};

/// Status reported by a relaxation solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxStatus {
    /// Relaxation solved to optimality.
    Optimal,

    /// Relaxation is infeasible.
    Infeasible,

    /// Relaxation is unbounded; the solution vector holds a ray.
    UnboundedRay,

    /// Objective limit (cutoff bound) reached before optimality.
    ObjLimit,

    /// Iteration limit hit; the solution is not a valid dual bound.
    IterLimit,

    /// Backend time limit hit.
    TimeLimit,

    /// No solve has completed for the current flushed state.
    NotSolved,

    /// Backend reported a numerical failure.
    Error,
}

impl RelaxStatus {
    /// Whether the objective value is a valid dual bound for the node.
    pub fn gives_dual_bound(self) -> bool {
        matches!(self, RelaxStatus::Optimal | RelaxStatus::ObjLimit)
    }
}

/// Solution returned by the backend.
#[derive(Debug, Clone)]
pub struct RelaxSolution {
    /// Solve status.
    pub status: RelaxStatus,

    /// Objective value (meaning depends on status).
    pub obj: f64,

    /// Primal values (or a ray for `UnboundedRay`).
    pub x: Vec<f64>,

    /// Row duals, used by pricers. May be empty if the backend has none.
    pub duals: Vec<f64>,
}

impl RelaxSolution {
    /// An `Error`-status solution.
    pub fn error() -> Self {
        Self { status: RelaxStatus::Error, obj: f64::NAN, x: Vec::new(), duals: Vec::new() }
    }
}

/// Opaque warm-start state captured from the backend.
///
/// Saved after a focus-node solve and shared with the children so the
/// backend can warm-start from the parent's basis.
#[derive(Debug, Clone)]
pub struct RelaxState(pub Vec<u8>);

/// A linear cut `a^T x <= rhs` destined for the relaxation.
#[derive(Debug, Clone)]
pub struct Cut {
    /// Dense coefficient vector (length = number of variables).
    pub coefs: Vec<f64>,

    /// Right-hand side.
    pub rhs: f64,

    /// Optional name for diagnostics.
    pub name: Option<String>,

    /// Whether the cut is valid for the whole tree (pool-eligible) or only
    /// for the current subtree.
    pub global: bool,
}

impl Cut {
    /// Create a globally valid cut.
    pub fn new(coefs: Vec<f64>, rhs: f64) -> Self {
        Self { coefs, rhs, name: None, global: true }
    }

    /// Mark the cut as only locally valid.
    pub fn local(mut self) -> Self {
        self.global = false;
        self
    }

    /// Attach a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Violation at a point: a^T x - rhs (positive means violated).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let lhs: f64 = self.coefs.iter().zip(x).map(|(a, xi)| a * xi).sum();
        lhs - self.rhs
    }

    /// Euclidean norm of the coefficient vector.
    pub fn norm(&self) -> f64 {
        self.coefs.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Efficacy at a point: violation scaled by the coefficient norm.
    pub fn efficacy(&self, x: &[f64]) -> f64 {
        let norm = self.norm();
        if norm < 1e-12 {
            return 0.0;
        }
        self.violation(x) / norm
    }

    /// Whether the coefficients are usable (finite, not all zero).
    pub fn is_valid(&self) -> bool {
        let has_nonzero = self.coefs.iter().any(|c| c.abs() > 1e-12);
        let all_finite = self.coefs.iter().all(|c| c.is_finite()) && self.rhs.is_finite();
        has_nonzero && all_finite
    }

    /// Whether two cuts are (near-)parallel with matching scaled rhs.
    pub fn is_parallel_to(&self, other: &Cut) -> bool {
        if self.coefs.len() != other.coefs.len() {
            return false;
        }
        let (na, nb) = (self.norm(), other.norm());
        if na < 1e-10 || nb < 1e-10 {
            return na < 1e-10 && nb < 1e-10;
        }
        let dot: f64 = self.coefs.iter().zip(&other.coefs).map(|(a, b)| a * b).sum();
        if (dot / (na * nb)).abs() > 0.9999 {
            (self.rhs / na - other.rhs / nb).abs() < 1e-8
        } else {
            false
        }
    }
}

/// Trait for relaxation backends (the external LP solver).
///
/// The loop never inspects the backend's internal representation; it loads
/// the problem once, then pushes incremental bound changes, cut rows, and
/// priced columns, and asks for solves.
pub trait RelaxationSolver {
    /// Load the base problem (variables, bounds, rows).
    fn load(&mut self, problem: &Problem) -> SolveResult<()>;

    /// Change the bounds of a variable.
    fn set_bounds(&mut self, var: usize, lb: f64, ub: f64);

    /// Add a cut row. Returns a row identifier.
    fn add_row(&mut self, cut: &Cut) -> usize;

    /// Add a priced column with its constraint coefficients.
    fn add_col(&mut self, var: &Variable, coefs: &[(usize, f64)]);

    /// Set or clear the objective limit used for early cutoff.
    fn set_obj_limit(&mut self, limit: Option<f64>);

    /// Solve the current relaxation.
    fn solve(&mut self, iter_limit: Option<u64>) -> SolveResult<RelaxSolution>;

    /// Capture warm-start state, if the backend supports it.
    fn save_state(&mut self) -> Option<RelaxState> {
        None
    }

    /// Restore previously captured warm-start state.
    fn load_state(&mut self, _state: &RelaxState) {}
}

/// The relaxation wrapper driven by the node solving loop.
pub struct Relaxation {
    /// The external solver.
    backend: Box<dyn RelaxationSolver>,

    /// Bounds currently known to the backend.
    backend_lb: Vec<f64>,
    backend_ub: Vec<f64>,

    /// Pending bound changes (var, lb, ub).
    pending_bounds: Vec<(usize, f64, f64)>,

    /// Pending cut rows.
    pending_rows: Vec<Cut>,

    /// Pending priced columns.
    pending_cols: Vec<(Variable, Vec<(usize, f64)>)>,

    /// Whether the in-memory relaxation matches the staged state.
    flushed: bool,

    /// Whether the last solve completed for the current flushed state.
    solved: bool,

    /// Monotonically increasing solve counter; keys candidate invalidation.
    solve_count: u64,

    /// Result of the last completed solve.
    last: Option<RelaxSolution>,

    /// Cut rows added to the backend so far.
    n_rows_added: usize,
}

impl Relaxation {
    /// Create a relaxation over a backend and load the problem into it.
    pub fn new(mut backend: Box<dyn RelaxationSolver>, problem: &Problem) -> SolveResult<Self> {
        backend.load(problem)?;
        Ok(Self {
            backend,
            backend_lb: problem.vars.iter().map(|v| v.lb).collect(),
            backend_ub: problem.vars.iter().map(|v| v.ub).collect(),
            pending_bounds: Vec::new(),
            pending_rows: Vec::new(),
            pending_cols: Vec::new(),
            flushed: true,
            solved: false,
            solve_count: 0,
            last: None,
            n_rows_added: 0,
        })
    }

    /// Whether the backend state matches everything staged so far.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Whether a solve completed for the current flushed state.
    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Number of completed solves.
    pub fn solve_count(&self) -> u64 {
        self.solve_count
    }

    /// Status of the last solve (NotSolved if none completed).
    pub fn status(&self) -> RelaxStatus {
        if !self.solved {
            return RelaxStatus::NotSolved;
        }
        self.last.as_ref().map_or(RelaxStatus::NotSolved, |s| s.status)
    }

    /// Last solve result, only when `{flushed, solved}` both hold.
    pub fn solution(&self) -> Option<&RelaxSolution> {
        if self.flushed && self.solved {
            self.last.as_ref()
        } else {
            None
        }
    }

    /// Objective of the last solve.
    pub fn obj(&self) -> Option<f64> {
        self.solution().map(|s| s.obj)
    }

    /// Stage bound changes so the backend matches the domain state.
    pub fn sync_bounds(&mut self, domains: &DomainState) {
        for var in 0..self.backend_lb.len() {
            let (lb, ub) = (domains.lb(var), domains.ub(var));
            if lb != self.backend_lb[var] || ub != self.backend_ub[var] {
                self.pending_bounds.push((var, lb, ub));
                self.backend_lb[var] = lb;
                self.backend_ub[var] = ub;
                self.flushed = false;
            }
        }
    }

    /// Stage a cut row.
    pub fn stage_cut(&mut self, cut: Cut) {
        self.pending_rows.push(cut);
        self.flushed = false;
    }

    /// Stage a priced column.
    pub fn stage_column(&mut self, var: Variable, coefs: Vec<(usize, f64)>) {
        self.backend_lb.push(var.lb);
        self.backend_ub.push(var.ub);
        self.pending_cols.push((var, coefs));
        self.flushed = false;
    }

    /// Number of cut rows handed to the backend.
    pub fn num_rows_added(&self) -> usize {
        self.n_rows_added
    }

    /// Apply all staged changes to the backend.
    ///
    /// Flushing an already-flushed relaxation is a no-op and leaves the
    /// `solved` flag untouched.
    pub fn flush(&mut self) {
        if self.flushed {
            return;
        }
        for (var, lb, ub) in self.pending_bounds.drain(..) {
            self.backend.set_bounds(var, lb, ub);
        }
        for cut in self.pending_rows.drain(..) {
            self.backend.add_row(&cut);
            self.n_rows_added += 1;
        }
        for (var, coefs) in self.pending_cols.drain(..) {
            self.backend.add_col(&var, &coefs);
        }
        self.flushed = true;
        self.solved = false;
    }

    /// Flush and solve the relaxation.
    ///
    /// `honor_cutoff` installs the cutoff bound as the backend's objective
    /// limit; disabling it is how the loop distinguishes genuine
    /// infeasibility from cutoff-induced early termination.
    pub fn solve(
        &mut self,
        iter_limit: Option<u64>,
        honor_cutoff: bool,
        cutoff_bound: f64,
    ) -> SolveResult<RelaxStatus> {
        self.flush();
        let limit = (honor_cutoff && cutoff_bound.is_finite()).then_some(cutoff_bound);
        self.backend.set_obj_limit(limit);

        let sol = self.backend.solve(iter_limit)?;
        let status = sol.status;
        self.last = Some(sol);
        self.solved = true;
        self.solve_count += 1;
        Ok(status)
    }

    /// Mark the current solve stale (e.g. new rows invalidated it).
    pub fn invalidate(&mut self) {
        self.solved = false;
    }

    /// Capture warm-start state from the backend.
    pub fn save_state(&mut self) -> Option<Rc<RelaxState>> {
        self.backend.save_state().map(Rc::new)
    }

    /// Restore warm-start state into the backend.
    pub fn load_state(&mut self, state: &RelaxState) {
        self.backend.load_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeReason, Variable};

    /// Backend that records operations and always reports optimal.
    struct RecordingBackend {
        n_solves: u64,
        n_bound_sets: u64,
        n_rows: usize,
    }

    impl RelaxationSolver for RecordingBackend {
        fn load(&mut self, _problem: &Problem) -> SolveResult<()> {
            Ok(())
        }
        fn set_bounds(&mut self, _var: usize, _lb: f64, _ub: f64) {
            self.n_bound_sets += 1;
        }
        fn add_row(&mut self, _cut: &Cut) -> usize {
            self.n_rows += 1;
            self.n_rows - 1
        }
        fn add_col(&mut self, _var: &Variable, _coefs: &[(usize, f64)]) {}
        fn set_obj_limit(&mut self, _limit: Option<f64>) {}
        fn solve(&mut self, _iter_limit: Option<u64>) -> SolveResult<RelaxSolution> {
            self.n_solves += 1;
            Ok(RelaxSolution {
                status: RelaxStatus::Optimal,
                obj: 1.0,
                x: vec![0.5],
                duals: vec![],
            })
        }
    }

    fn setup() -> (Problem, Relaxation) {
        let prob = Problem::new(vec![Variable::integer("x", 1.0, 0.0, 10.0)], vec![]).unwrap();
        let backend = Box::new(RecordingBackend { n_solves: 0, n_bound_sets: 0, n_rows: 0 });
        let relax = Relaxation::new(backend, &prob).unwrap();
        (prob, relax)
    }

    #[test]
    fn test_idempotent_flush() {
        let (_, mut relax) = setup();
        assert!(relax.is_flushed());

        relax.solve(None, false, f64::INFINITY).unwrap();
        assert!(relax.is_solved());

        // Flushing a clean state must not clear `solved`.
        relax.flush();
        assert!(relax.is_solved());
        assert_eq!(relax.solve_count(), 1);
    }

    #[test]
    fn test_staging_invalidates() {
        let (prob, mut relax) = setup();
        relax.solve(None, false, f64::INFINITY).unwrap();

        let mut domains = DomainState::from_problem(&prob);
        domains.tighten_ub(0, 4.0, ChangeReason::Branching);
        relax.sync_bounds(&domains);

        assert!(!relax.is_flushed());
        // Values must be unreadable while unflushed.
        assert!(relax.solution().is_none());

        relax.flush();
        assert!(relax.is_flushed());
        assert!(!relax.is_solved());
    }

    #[test]
    fn test_sync_bounds_is_incremental() {
        let (prob, mut relax) = setup();
        let domains = DomainState::from_problem(&prob);

        // Bounds identical to what the backend has: nothing staged.
        relax.sync_bounds(&domains);
        assert!(relax.is_flushed());
    }

    #[test]
    fn test_solve_counter_monotone() {
        let (_, mut relax) = setup();
        assert_eq!(relax.solve_count(), 0);
        relax.solve(None, false, f64::INFINITY).unwrap();
        relax.stage_cut(Cut::new(vec![1.0], 3.0));
        relax.solve(None, true, 5.0).unwrap();
        assert_eq!(relax.solve_count(), 2);
        assert_eq!(relax.num_rows_added(), 1);
    }

    #[test]
    fn test_cut_geometry() {
        let cut = Cut::new(vec![1.0, 1.0], 1.0);
        assert!(cut.violation(&[0.6, 0.6]) > 0.0);
        assert!(cut.efficacy(&[0.6, 0.6]) > 0.0);
        assert!(cut.is_valid());

        let parallel = Cut::new(vec![2.0, 2.0], 2.0);
        assert!(cut.is_parallel_to(&parallel));
        let other = Cut::new(vec![1.0, -1.0], 0.0);
        assert!(!cut.is_parallel_to(&other));
    }
}
