//! End-to-end tests for the branch-and-bound loop.
//!
//! The backend here is an exact LP oracle for each tiny test problem: it
//! tracks the bounds the loop pushes down and computes the relaxation
//! optimum in closed form. That keeps the tests deterministic while still
//! driving the full propagate / solve / price / enforce / branch cycle.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use solver_bnb::plugins::{PriceCtx, Priced, Pricer, SepaCtx, SepaResult, Separator};
use solver_bnb::store::PricedColumn;
use solver_bnb::{
    Cut, LinRow, NodeSelection, Problem, RelaxSolution, RelaxStatus, RelaxationSolver, SolveError,
    SolveLoop, SolveResult, SolveSettings, SolveStatus, Variable,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Backend that delegates each solve to a closure over the current bounds.
struct OracleBackend {
    lb: Vec<f64>,
    ub: Vec<f64>,
    n_solves: Rc<RefCell<u64>>,
    oracle: Box<dyn Fn(&[f64], &[f64]) -> RelaxSolution>,
}

impl RelaxationSolver for OracleBackend {
    fn load(&mut self, problem: &Problem) -> SolveResult<()> {
        self.lb = problem.vars.iter().map(|v| v.lb).collect();
        self.ub = problem.vars.iter().map(|v| v.ub).collect();
        Ok(())
    }

    fn set_bounds(&mut self, var: usize, lb: f64, ub: f64) {
        self.lb[var] = lb;
        self.ub[var] = ub;
    }

    fn add_row(&mut self, _cut: &Cut) -> usize {
        0
    }

    fn add_col(&mut self, var: &Variable, _coefs: &[(usize, f64)]) {
        self.lb.push(var.lb);
        self.ub.push(var.ub);
    }

    fn set_obj_limit(&mut self, _limit: Option<f64>) {}

    fn solve(&mut self, _iter_limit: Option<u64>) -> SolveResult<RelaxSolution> {
        *self.n_solves.borrow_mut() += 1;
        Ok((self.oracle)(&self.lb, &self.ub))
    }
}

fn oracle_backend(
    oracle: impl Fn(&[f64], &[f64]) -> RelaxSolution + 'static,
) -> (Box<dyn RelaxationSolver>, Rc<RefCell<u64>>) {
    let n_solves = Rc::new(RefCell::new(0));
    let backend = OracleBackend {
        lb: Vec::new(),
        ub: Vec::new(),
        n_solves: Rc::clone(&n_solves),
        oracle: Box::new(oracle),
    };
    (Box::new(backend), n_solves)
}

fn optimal(obj: f64, x: Vec<f64>, duals: Vec<f64>) -> RelaxSolution {
    RelaxSolution { status: RelaxStatus::Optimal, obj, x, duals }
}

fn infeasible() -> RelaxSolution {
    RelaxSolution {
        status: RelaxStatus::Infeasible,
        obj: f64::INFINITY,
        x: Vec::new(),
        duals: Vec::new(),
    }
}

/// min -x0 - 2 x1, both binary, x0 + x1 <= 1. The root relaxation optimum
/// (x1 = 1) is already integral.
fn knapsack_problem() -> Problem {
    Problem::new(
        vec![Variable::binary("x0", -1.0), Variable::binary("x1", -2.0)],
        vec![LinRow::le("cap", vec![(0, 1.0), (1, 1.0)], 1.0)],
    )
    .unwrap()
}

fn knapsack_oracle(lb: &[f64], ub: &[f64]) -> RelaxSolution {
    if lb[0] + lb[1] > 1.0 + 1e-9 {
        return infeasible();
    }
    let x1 = ub[1].min(1.0 - lb[0]).max(lb[1]);
    let x0 = ub[0].min(1.0 - x1).max(lb[0]);
    optimal(-x0 - 2.0 * x1, vec![x0, x1], Vec::new())
}

#[test]
fn test_integral_root_solves_without_branching() {
    init_logs();
    let (backend, _) = oracle_backend(knapsack_oracle);
    let report = solver_bnb::solve(knapsack_problem(), backend, SolveSettings::default()).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - -2.0).abs() < 1e-9);
    let best = report.best.unwrap();
    assert!((best.values[0] - 0.0).abs() < 1e-6);
    assert!((best.values[1] - 1.0).abs() < 1e-6);
    assert_eq!(report.stats.n_branchings, 0);
    assert_eq!(report.stats.n_total_nodes, 1);
}

/// min -x - y, both integer in [0, 5], 2x + 2y <= 7. The relaxation stays
/// fractional (x + y = 3.5) until branching closes the last unit.
fn split_problem() -> Problem {
    Problem::new(
        vec![
            Variable::integer("x", -1.0, 0.0, 5.0),
            Variable::integer("y", -1.0, 0.0, 5.0),
        ],
        vec![LinRow::le("cap", vec![(0, 2.0), (1, 2.0)], 7.0)],
    )
    .unwrap()
}

fn split_oracle(lb: &[f64], ub: &[f64]) -> RelaxSolution {
    if lb[0] + lb[1] > 3.5 + 1e-9 {
        return infeasible();
    }
    let total = (ub[0] + ub[1]).min(3.5);
    let x = ub[0].min(total - lb[1]).max(lb[0]);
    let y = total - x;
    optimal(-total, vec![x, y], Vec::new())
}

#[test]
fn test_fractional_relaxation_branches_to_optimality() {
    init_logs();
    let (backend, _) = oracle_backend(split_oracle);
    let report = solver_bnb::solve(split_problem(), backend, SolveSettings::default()).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - -3.0).abs() < 1e-9);
    let best = report.best.unwrap();
    let sum: f64 = best.values.iter().sum();
    assert!((sum - 3.0).abs() < 1e-6);
    for v in &best.values {
        assert!((v - v.round()).abs() < 1e-6);
    }
    assert!(report.stats.n_branchings >= 1);
    // Once the incumbent is found, sibling subtrees reach the cutoff bound.
    assert!(report.stats.n_pruned >= 1);
}

#[test]
fn test_propagation_cutoff_needs_no_relaxation_solve() {
    init_logs();
    // x >= 4 and x <= 2 contradict each other; activity propagation must
    // detect this before any relaxation solve.
    let problem = Problem::new(
        vec![Variable::integer("x", 1.0, 0.0, 10.0)],
        vec![
            LinRow::ge("low", vec![(0, 1.0)], 4.0),
            LinRow::le("high", vec![(0, 1.0)], 2.0),
        ],
    )
    .unwrap();

    let (backend, n_solves) = oracle_backend(|_, _| infeasible());
    let report = solver_bnb::solve(problem, backend, SolveSettings::default()).unwrap();

    assert_eq!(report.status, SolveStatus::Infeasible);
    assert!(report.best.is_none());
    assert_eq!(*n_solves.borrow(), 0);
}

/// Pricer that offers one cheaper column covering the demand row, then
/// reports a fixed point.
struct DemandPricer;

impl Pricer for DemandPricer {
    fn name(&self) -> &str {
        "demand"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, ctx: &mut PriceCtx) -> SolveResult<Priced> {
        let dual = ctx.duals.first().copied().unwrap_or(0.0);
        let reduced = 1.0 - dual;
        if ctx.problem.num_vars() == 2 && reduced < -1e-9 {
            ctx.store.add_column(PricedColumn {
                var: Variable::continuous("y", 1.0, 0.0, 10.0),
                coefs: vec![(0, 1.0)],
                reduced_cost: reduced,
            });
        }
        Ok(Priced::success())
    }
}

#[test]
fn test_pricing_reaches_fixed_point() {
    init_logs();
    // min 2 x0 + 2 x1 with x0 + x1 >= 3; the pricer introduces a third
    // column with cost 1 that takes over the whole demand.
    let problem = Problem::new(
        vec![
            Variable::continuous("x0", 2.0, 0.0, 10.0),
            Variable::continuous("x1", 2.0, 0.0, 10.0),
        ],
        vec![LinRow::ge("demand", vec![(0, 1.0), (1, 1.0)], 3.0)],
    )
    .unwrap();

    let (backend, _) = oracle_backend(|lb, ub| {
        if lb.len() == 2 {
            let x0 = (3.0 - lb[1]).max(lb[0]).min(ub[0]);
            let x1 = (3.0 - x0).max(lb[1]);
            optimal(2.0 * (x0 + x1), vec![x0, x1], vec![2.0])
        } else {
            let y = (3.0 - lb[0] - lb[1]).max(0.0);
            optimal(2.0 * (lb[0] + lb[1]) + y, vec![lb[0], lb[1], y], vec![1.0])
        }
    });

    let mut solver = SolveLoop::new(problem, backend, SolveSettings::default()).unwrap();
    solver.plugins_mut().add_pricer(Box::new(DemandPricer));
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - 3.0).abs() < 1e-9);
    assert_eq!(report.stats.n_price_rounds, 2);
    assert_eq!(report.stats.n_cols_added, 1);
    assert_eq!(report.best.unwrap().values.len(), 3);
}

/// Pricer that holds back its columns: it reveals a cost-1.5 column only
/// once the first relaxation prices it in, and a cost-1.0 column only
/// after that.
struct StagedColumnPricer;

impl Pricer for StagedColumnPricer {
    fn name(&self) -> &str {
        "staged"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, ctx: &mut PriceCtx) -> SolveResult<Priced> {
        let dual = ctx.duals.first().copied().unwrap_or(0.0);
        let n = ctx.problem.num_vars();
        if n == 2 && dual > 1.5 + 1e-9 {
            ctx.store.add_column(PricedColumn {
                var: Variable::continuous("y1", 1.5, 0.0, 10.0),
                coefs: vec![(0, 1.0)],
                reduced_cost: 1.5 - dual,
            });
        } else if n == 3 && dual > 1.0 + 1e-9 {
            ctx.store.add_column(PricedColumn {
                var: Variable::continuous("y2", 1.0, 0.0, 10.0),
                coefs: vec![(0, 1.0)],
                reduced_cost: 1.0 - dual,
            });
        }
        Ok(Priced::success())
    }
}

#[test]
fn test_exhausted_price_rounds_resume_before_accepting() {
    init_logs();
    // With a one-round budget the pricer still holds an improving column
    // when the node looks solved; the node must pick pricing back up with
    // a fresh budget instead of accepting the intermediate optimum (4.5
    // instead of the true 3.0).
    let problem = Problem::new(
        vec![
            Variable::continuous("a", 2.0, 0.0, 10.0),
            Variable::continuous("b", 2.0, 0.0, 10.0),
        ],
        vec![LinRow::ge("demand", vec![(0, 1.0), (1, 1.0)], 3.0)],
    )
    .unwrap();

    let (backend, _) = oracle_backend(|lb, _ub| match lb.len() {
        2 => optimal(6.0, vec![3.0, 0.0], vec![2.0]),
        3 => optimal(4.5, vec![0.0, 0.0, 3.0], vec![1.5]),
        _ => optimal(3.0, vec![0.0, 0.0, 0.0, 3.0], vec![1.0]),
    });

    let mut settings = SolveSettings::default();
    settings.max_price_rounds = 1;

    let mut solver = SolveLoop::new(problem, backend, settings).unwrap();
    solver.plugins_mut().add_pricer(Box::new(StagedColumnPricer));
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - 3.0).abs() < 1e-9);
    assert_eq!(report.stats.n_cols_added, 2);
}

#[test]
fn test_node_limit_stops_the_search() {
    init_logs();
    let (backend, _) = oracle_backend(split_oracle);
    let settings = SolveSettings::default().with_node_limit(1);
    let report = solver_bnb::solve(split_problem(), backend, settings).unwrap();

    assert_eq!(report.status, SolveStatus::NodeLimit);
    assert!(report.best.is_none());
    // The dual bound from the open children is still reported.
    assert!(report.lower_bound <= -3.0);
}

#[test]
fn test_gap_limit_accepts_loose_incumbent() {
    init_logs();
    let (backend, _) = oracle_backend(split_oracle);
    let settings = SolveSettings::default().with_gap_tol(1.0);
    let report = solver_bnb::solve(split_problem(), backend, settings).unwrap();

    assert_eq!(report.status, SolveStatus::GapLimit);
    assert!(report.best.is_some());
    assert!(report.gap <= 1.0);
}

#[test]
fn test_infeasible_branch_learns_conflict_and_restarts() {
    init_logs();
    // The oracle hides a constraint the rows cannot express: x = 1 is
    // never completable. Row propagation cannot see it, so the up branch
    // on x turns into a genuinely infeasible leaf, learns a one-literal
    // conflict, and with the threshold at one conflict the search
    // restarts and closes the problem from the learned constraint.
    let problem = Problem::new(
        vec![
            Variable::integer("x", -1.0, 0.0, 1.0),
            Variable::continuous("y", -1.0, 0.0, 1.0),
        ],
        vec![LinRow::le("cap", vec![(0, 1.0), (1, 1.0)], 1.5)],
    )
    .unwrap();

    let (backend, _) = oracle_backend(|lb, ub| {
        if lb[0] >= 1.0 - 1e-6 {
            return infeasible();
        }
        let x = ub[0].min(0.75).max(lb[0]);
        let y = ub[1].min(1.5 - x).max(lb[1]);
        optimal(-x - y, vec![x, y], Vec::new())
    });

    // Best-estimate selection explores the thin up branch first, while
    // the down branch is still open.
    let mut settings = SolveSettings::default().with_node_selection(NodeSelection::BestEstimate);
    settings.conflict_restart_base = 1;
    settings.max_restarts = 1;

    let mut solver = SolveLoop::new(problem, backend, settings).unwrap();
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - -1.0).abs() < 1e-9);
    let best = report.best.unwrap();
    assert!((best.values[0] - 0.0).abs() < 1e-6);
    assert!((best.values[1] - 1.0).abs() < 1e-6);
    assert!(report.stats.n_conflicts >= 1);
    assert!(report.stats.n_restarts >= 1);
}

#[test]
fn test_requested_restart_rebuilds_the_tree() {
    init_logs();
    let (backend, _) = oracle_backend(split_oracle);
    let mut solver = SolveLoop::new(split_problem(), backend, SolveSettings::default()).unwrap();
    solver.restart_handle().store(true, Ordering::Relaxed);
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - -3.0).abs() < 1e-9);
    assert!(report.stats.n_restarts >= 1);
}

#[test]
fn test_interrupt_before_solve() {
    init_logs();
    let (backend, n_solves) = oracle_backend(knapsack_oracle);
    let mut solver = SolveLoop::new(knapsack_problem(), backend, SolveSettings::default()).unwrap();
    solver.interrupt_handle().store(true, Ordering::Relaxed);
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::UserInterrupt);
    assert_eq!(*n_solves.borrow(), 0);
}

/// Pricer that raises the interrupt flag on its first call and keeps
/// proposing columns forever after.
struct InterruptingPricer {
    stop: Arc<AtomicBool>,
    n: usize,
}

impl Pricer for InterruptingPricer {
    fn name(&self) -> &str {
        "interrupting"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, ctx: &mut PriceCtx) -> SolveResult<Priced> {
        self.stop.store(true, Ordering::Relaxed);
        let name = format!("z{}", self.n);
        self.n += 1;
        ctx.store.add_column(PricedColumn {
            var: Variable::continuous(name, 1.0, 0.0, 2.0),
            coefs: Vec::new(),
            reduced_cost: -1.0,
        });
        Ok(Priced::success())
    }
}

#[test]
fn test_interrupt_mid_pricing_stops_promptly() {
    init_logs();
    // The interrupt fires during the first pricing round; the loop must
    // wind down at the next round boundary instead of running the pricer
    // to its round budget.
    let problem = Problem::new(
        vec![
            Variable::continuous("a", 1.0, 0.0, 2.0),
            Variable::continuous("b", 1.0, 0.0, 2.0),
        ],
        vec![LinRow::ge("demand", vec![(0, 1.0), (1, 1.0)], 3.0)],
    )
    .unwrap();

    let (backend, _) = oracle_backend(|lb, _ub| optimal(2.0, vec![1.0; lb.len()], vec![1.0]));

    let mut solver = SolveLoop::new(problem, backend, SolveSettings::default()).unwrap();
    let stop = solver.interrupt_handle();
    solver.plugins_mut().add_pricer(Box::new(InterruptingPricer { stop, n: 0 }));
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::UserInterrupt);
    assert!(report.best.is_none());
    assert_eq!(report.stats.n_cols_added, 1);
}

/// min -x - y, both binary, x + y <= 1.5. The root point (1, 0.5) stays
/// fractional; rounding it violates the row, so no early incumbent cuts
/// separation short.
fn fractional_cap_problem() -> Problem {
    Problem::new(
        vec![Variable::binary("x", -1.0), Variable::binary("y", -1.0)],
        vec![LinRow::le("cap", vec![(0, 1.0), (1, 1.0)], 1.5)],
    )
    .unwrap()
}

fn fractional_cap_oracle(lb: &[f64], ub: &[f64]) -> RelaxSolution {
    if lb[0] + lb[1] > 1.5 + 1e-9 {
        return infeasible();
    }
    let total = (ub[0] + ub[1]).min(1.5);
    let x = ub[0].min(total - lb[1]).max(lb[0]);
    let y = total - x;
    optimal(-total, vec![x, y], Vec::new())
}

/// Separator that asks for one immediate extra round, then stays quiet.
struct OneShotNewRound {
    calls: Rc<RefCell<u64>>,
    fired: bool,
}

impl Separator for OneShotNewRound {
    fn name(&self) -> &str {
        "one_shot_new_round"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, _ctx: &mut SepaCtx) -> SolveResult<SepaResult> {
        *self.calls.borrow_mut() += 1;
        if !self.fired {
            self.fired = true;
            return Ok(SepaResult::NewRound);
        }
        Ok(SepaResult::DidNotRun)
    }
}

#[test]
fn test_new_round_result_runs_an_extra_round() {
    init_logs();
    let (backend, _) = oracle_backend(fractional_cap_oracle);
    let calls = Rc::new(RefCell::new(0u64));

    let mut solver =
        SolveLoop::new(fractional_cap_problem(), backend, SolveSettings::default()).unwrap();
    solver.plugins_mut().add_separator(Box::new(OneShotNewRound {
        calls: Rc::clone(&calls),
        fired: false,
    }));
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - -1.0).abs() < 1e-9);
    // Root: the request round plus the immediate extra round; one more
    // round at the fractional up child.
    assert_eq!(*calls.borrow(), 3);
    assert_eq!(report.stats.n_sepa_rounds, 3);
}

/// Separator that always passes, counting its invocations.
struct CountingSeparator {
    calls: Rc<RefCell<u64>>,
}

impl Separator for CountingSeparator {
    fn name(&self) -> &str {
        "counting"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, _ctx: &mut SepaCtx) -> SolveResult<SepaResult> {
        *self.calls.borrow_mut() += 1;
        Ok(SepaResult::DidNotRun)
    }
}

/// Separator that defers its first call of every round to the retry pass.
struct HesitantSeparator {
    calls: Rc<RefCell<u64>>,
    pending: bool,
}

impl Separator for HesitantSeparator {
    fn name(&self) -> &str {
        "hesitant"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, _ctx: &mut SepaCtx) -> SolveResult<SepaResult> {
        *self.calls.borrow_mut() += 1;
        if !self.pending {
            self.pending = true;
            return Ok(SepaResult::Delayed);
        }
        self.pending = false;
        Ok(SepaResult::DidNotRun)
    }
}

#[test]
fn test_delayed_result_reruns_only_the_asker() {
    init_logs();
    // The retry pass must rerun just the separator that answered Delayed,
    // not the whole lineup.
    let (backend, _) = oracle_backend(fractional_cap_oracle);
    let eager_calls = Rc::new(RefCell::new(0u64));
    let hesitant_calls = Rc::new(RefCell::new(0u64));

    let mut solver =
        SolveLoop::new(fractional_cap_problem(), backend, SolveSettings::default()).unwrap();
    solver
        .plugins_mut()
        .add_separator(Box::new(CountingSeparator { calls: Rc::clone(&eager_calls) }));
    solver.plugins_mut().add_separator(Box::new(HesitantSeparator {
        calls: Rc::clone(&hesitant_calls),
        pending: false,
    }));
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - -1.0).abs() < 1e-9);
    // Two separation rounds happen (root and the fractional up child);
    // the eager separator runs once per round, the hesitant one twice.
    assert_eq!(*eager_calls.borrow(), 2);
    assert_eq!(*hesitant_calls.borrow(), 4);
}

/// Separator that adds a bound row to the problem the first time the
/// point touches it.
struct VarCapSeparator {
    added: Rc<RefCell<u64>>,
}

impl Separator for VarCapSeparator {
    fn name(&self) -> &str {
        "var_cap"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, ctx: &mut SepaCtx) -> SolveResult<SepaResult> {
        if *self.added.borrow() == 0 && ctx.point[0] >= 3.0 - 1e-6 {
            // 2x + 2y <= 7 with integral x implies x <= 3.
            ctx.added_rows.push(LinRow::le("x_cap", vec![(0, 1.0)], 3.0));
            *self.added.borrow_mut() += 1;
            return Ok(SepaResult::ConsAdded);
        }
        Ok(SepaResult::DidNotRun)
    }
}

#[test]
fn test_separator_added_rows_enter_the_problem() {
    init_logs();
    let (backend, _) = oracle_backend(split_oracle);
    let added = Rc::new(RefCell::new(0u64));

    let mut solver = SolveLoop::new(split_problem(), backend, SolveSettings::default()).unwrap();
    solver
        .plugins_mut()
        .add_separator(Box::new(VarCapSeparator { added: Rc::clone(&added) }));
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - -3.0).abs() < 1e-9);
    assert_eq!(*added.borrow(), 1);
    // The row triggers a re-solve round before the node branches.
    assert!(report.stats.n_sepa_rounds >= 2);
}

#[test]
fn test_unbounded_ray_gets_a_separation_chance() {
    init_logs();
    // Separators see the ray before the solve gives up as unbounded.
    let problem = Problem::new(
        vec![
            Variable::continuous("x", -1.0, 0.0, f64::INFINITY),
            Variable::continuous("y", -1.0, 0.0, f64::INFINITY),
        ],
        vec![],
    )
    .unwrap();

    let (backend, _) = oracle_backend(|_, _| RelaxSolution {
        status: RelaxStatus::UnboundedRay,
        obj: f64::NEG_INFINITY,
        x: vec![1.0, 1.0],
        duals: Vec::new(),
    });

    let calls = Rc::new(RefCell::new(0u64));
    let mut solver = SolveLoop::new(problem, backend, SolveSettings::default()).unwrap();
    solver
        .plugins_mut()
        .add_separator(Box::new(CountingSeparator { calls: Rc::clone(&calls) }));
    let report = solver.solve().unwrap();

    assert_eq!(report.status, SolveStatus::InfeasibleOrUnbounded);
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(report.stats.n_sepa_rounds, 1);
}

#[test]
fn test_relax_errors_degrade_to_pseudo_handling() {
    init_logs();
    // A backend that keeps failing exhausts the per-call retry budget;
    // the node then falls back to the pseudo solution and still closes
    // the trivial problem.
    let problem =
        Problem::new(vec![Variable::integer("x", 1.0, 0.0, 2.0)], vec![]).unwrap();

    let (backend, n_solves) = oracle_backend(|_, _| RelaxSolution {
        status: RelaxStatus::Error,
        obj: 0.0,
        x: Vec::new(),
        duals: Vec::new(),
    });

    let report = solver_bnb::solve(problem, backend, SolveSettings::default()).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.obj - 0.0).abs() < 1e-9);
    // Default per-call budget of 3 retries: four attempts in total.
    assert_eq!(report.stats.n_relax_errors, 4);
    assert_eq!(*n_solves.borrow(), 4);
}

#[test]
fn test_relax_error_budget_is_fatal() {
    init_logs();
    let problem =
        Problem::new(vec![Variable::integer("x", 1.0, 0.0, 2.0)], vec![]).unwrap();

    let (backend, _) = oracle_backend(|_, _| RelaxSolution {
        status: RelaxStatus::Error,
        obj: 0.0,
        x: Vec::new(),
        duals: Vec::new(),
    });

    let mut settings = SolveSettings::default();
    settings.max_total_relax_errors = 2;

    let err = solver_bnb::solve(problem, backend, settings).unwrap_err();
    assert!(matches!(err, SolveError::RelaxationError { .. }));
}
