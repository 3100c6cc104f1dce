//! Linear constraint handler.
//!
//! Propagates the problem's linear rows with activity-based bound
//! tightening and checks them during enforcement. Violated rows found on
//! a relaxation point are separated as forced cuts; on a pseudo solution
//! they make the node branch (or cut off, when everything is fixed).

use crate::error::SolveResult;
use crate::model::{DomResult, LinRow};
use crate::relax::Cut;

use super::conshdlr::{ConstraintHandler, EnforceCtx, EnforceResult};
use super::propagator::{PropCtx, PropResult};

/// Built-in linear-row propagation and enforcement.
pub struct LinearHandler;

/// Activity bound of a row: finite part plus infinite-term bookkeeping.
struct Activity {
    sum: f64,
    n_inf: usize,
}

fn min_activity(row: &LinRow, lb: impl Fn(usize) -> f64, ub: impl Fn(usize) -> f64) -> Activity {
    let mut sum = 0.0;
    let mut n_inf = 0;
    for &(j, a) in &row.coefs {
        let term = if a > 0.0 { a * lb(j) } else { a * ub(j) };
        if term.is_finite() {
            sum += term;
        } else {
            n_inf += 1;
        }
    }
    Activity { sum, n_inf }
}

fn max_activity(row: &LinRow, lb: impl Fn(usize) -> f64, ub: impl Fn(usize) -> f64) -> Activity {
    let mut sum = 0.0;
    let mut n_inf = 0;
    for &(j, a) in &row.coefs {
        let term = if a > 0.0 { a * ub(j) } else { a * lb(j) };
        if term.is_finite() {
            sum += term;
        } else {
            n_inf += 1;
        }
    }
    Activity { sum, n_inf }
}

const ACT_TOL: f64 = 1e-9;

impl LinearHandler {
    fn propagate_row(ctx: &mut PropCtx, row: &LinRow) -> SolveResult<PropResult> {
        let lb = |j: usize| ctx.domains.lb(j);
        let ub = |j: usize| ctx.domains.ub(j);

        // rhs side: min activity must stay below rhs.
        if row.rhs.is_finite() {
            let act = min_activity(row, lb, ub);
            if act.n_inf == 0 && act.sum > row.rhs + ACT_TOL {
                return Ok(PropResult::Cutoff);
            }
            if act.n_inf <= 1 {
                for &(j, a) in &row.coefs {
                    let term = if a > 0.0 { a * ctx.domains.lb(j) } else { a * ctx.domains.ub(j) };
                    let residual = if term.is_finite() {
                        if act.n_inf > 0 {
                            continue; // the infinity sits on another term
                        }
                        act.sum - term
                    } else {
                        act.sum
                    };
                    let slack = row.rhs - residual;
                    let res = if a > 0.0 {
                        ctx.tighten_ub(j, slack / a)
                    } else {
                        ctx.tighten_lb(j, slack / a)
                    };
                    if res == DomResult::Infeasible {
                        return Ok(PropResult::Cutoff);
                    }
                }
            }
        }

        // lhs side: max activity must stay above lhs.
        if row.lhs.is_finite() {
            let act = max_activity(row, |j| ctx.domains.lb(j), |j| ctx.domains.ub(j));
            if act.n_inf == 0 && act.sum < row.lhs - ACT_TOL {
                return Ok(PropResult::Cutoff);
            }
            if act.n_inf <= 1 {
                for &(j, a) in &row.coefs {
                    let term = if a > 0.0 { a * ctx.domains.ub(j) } else { a * ctx.domains.lb(j) };
                    let residual = if term.is_finite() {
                        if act.n_inf > 0 {
                            continue;
                        }
                        act.sum - term
                    } else {
                        act.sum
                    };
                    let need = row.lhs - residual;
                    let res = if a > 0.0 {
                        ctx.tighten_lb(j, need / a)
                    } else {
                        ctx.tighten_ub(j, need / a)
                    };
                    if res == DomResult::Infeasible {
                        return Ok(PropResult::Cutoff);
                    }
                }
            }
        }

        Ok(PropResult::DidNotRun)
    }

    /// Dense <=-form cut for the violated side of a row.
    fn row_as_cut(row: &LinRow, num_vars: usize, upper_side: bool) -> Cut {
        let mut coefs = vec![0.0; num_vars];
        if upper_side {
            for &(j, a) in &row.coefs {
                coefs[j] = a;
            }
            Cut::new(coefs, row.rhs).with_name(row.name.clone())
        } else {
            for &(j, a) in &row.coefs {
                coefs[j] = -a;
            }
            Cut::new(coefs, -row.lhs).with_name(row.name.clone())
        }
    }
}

impl ConstraintHandler for LinearHandler {
    fn name(&self) -> &str {
        "linear"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn propagate(&mut self, ctx: &mut PropCtx) -> SolveResult<PropResult> {
        let before = ctx.n_reductions;
        for row in &ctx.problem.rows {
            if Self::propagate_row(ctx, row)? == PropResult::Cutoff {
                return Ok(PropResult::Cutoff);
            }
        }
        Ok(if ctx.n_reductions > before {
            PropResult::ReducedDomain
        } else {
            PropResult::DidNotRun
        })
    }

    fn enforce(&mut self, ctx: &mut EnforceCtx) -> SolveResult<EnforceResult> {
        let n = ctx.problem.num_vars();
        let mut separated = false;
        for row in &ctx.problem.rows {
            let act = row.activity(ctx.sol);
            let upper_violated = act > row.rhs + ctx.tol;
            let lower_violated = act < row.lhs - ctx.tol;
            if !upper_violated && !lower_violated {
                continue;
            }

            if ctx.pseudo {
                // A pseudo solution with every variable fixed cannot be
                // completed into a feasible one.
                let all_fixed = (0..n).all(|j| ctx.domains.is_fixed(j));
                return Ok(if all_fixed {
                    EnforceResult::Cutoff
                } else {
                    EnforceResult::Infeasible
                });
            }

            let cut = Self::row_as_cut(row, n, upper_violated);
            if ctx.store.add_cut(cut, ctx.sol, 0.0) {
                separated = true;
            }
        }

        Ok(if separated { EnforceResult::Separated } else { EnforceResult::Feasible })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DomainState, Problem, Variable};
    use crate::plugins::propagator::PropTiming;
    use crate::search::BranchCandidates;
    use crate::store::SepaStore;

    fn fixture() -> Problem {
        // x0 + 2 x1 <= 8, both integer in [0, 10].
        Problem::new(
            vec![
                Variable::integer("x0", 1.0, 0.0, 10.0),
                Variable::integer("x1", 1.0, 0.0, 10.0),
            ],
            vec![LinRow::le("r0", vec![(0, 1.0), (1, 2.0)], 8.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_activity_propagation_tightens() {
        let prob = fixture();
        let mut domains = DomainState::from_problem(&prob);
        let mut ctx = PropCtx {
            problem: &prob,
            domains: &mut domains,
            depth: 0,
            timing: PropTiming::BEFORE_RELAX,
            tol: 1e-6,
            n_reductions: 0,
        };

        let res = LinearHandler.propagate(&mut ctx).unwrap();
        assert_eq!(res, PropResult::ReducedDomain);
        // x0 <= 8 - 2*0 = 8; x1 <= (8 - 0) / 2 = 4.
        assert_eq!(ctx.domains.ub(0), 8.0);
        assert_eq!(ctx.domains.ub(1), 4.0);
    }

    #[test]
    fn test_propagation_detects_cutoff() {
        let prob = fixture();
        let mut domains = DomainState::from_problem(&prob);
        // Force min activity above the rhs: x0 >= 7, x1 >= 3 -> 7 + 6 > 8.
        domains.tighten_lb(0, 7.0, crate::model::ChangeReason::Branching);
        domains.tighten_lb(1, 3.0, crate::model::ChangeReason::Branching);

        let mut ctx = PropCtx {
            problem: &prob,
            domains: &mut domains,
            depth: 0,
            timing: PropTiming::BEFORE_RELAX,
            tol: 1e-6,
            n_reductions: 0,
        };
        assert_eq!(LinearHandler.propagate(&mut ctx).unwrap(), PropResult::Cutoff);
    }

    #[test]
    fn test_enforce_separates_violated_row() {
        let prob = fixture();
        let mut domains = DomainState::from_problem(&prob);
        let mut store = SepaStore::new();
        store.set_force(true);
        let mut candidates = BranchCandidates::new();
        let sol = [6.0, 2.0]; // activity 10 > 8

        let mut ctx = EnforceCtx {
            problem: &prob,
            sol: &sol,
            pseudo: false,
            domains: &mut domains,
            store: &mut store,
            candidates: &mut candidates,
            added_rows: Vec::new(),
            decision: None,
            tol: 1e-6,
        };
        let res = LinearHandler.enforce(&mut ctx).unwrap();
        assert_eq!(res, EnforceResult::Separated);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_enforce_pseudo_branches_or_cuts_off() {
        let prob = fixture();
        let mut store = SepaStore::new();
        let mut candidates = BranchCandidates::new();
        let sol = [6.0, 2.0];

        // Unfixed domains: infeasible, must branch.
        let mut domains = DomainState::from_problem(&prob);
        let mut ctx = EnforceCtx {
            problem: &prob,
            sol: &sol,
            pseudo: true,
            domains: &mut domains,
            store: &mut store,
            candidates: &mut candidates,
            added_rows: Vec::new(),
            decision: None,
            tol: 1e-6,
        };
        assert_eq!(LinearHandler.enforce(&mut ctx).unwrap(), EnforceResult::Infeasible);

        // Everything fixed: the node is dead.
        let mut fixed = DomainState::from_problem(&prob);
        fixed.tighten_lb(0, 6.0, crate::model::ChangeReason::Branching);
        fixed.tighten_ub(0, 6.0, crate::model::ChangeReason::Branching);
        fixed.tighten_lb(1, 2.0, crate::model::ChangeReason::Branching);
        fixed.tighten_ub(1, 2.0, crate::model::ChangeReason::Branching);
        let mut ctx = EnforceCtx {
            problem: &prob,
            sol: &sol,
            pseudo: true,
            domains: &mut fixed,
            store: &mut store,
            candidates: &mut candidates,
            added_rows: Vec::new(),
            decision: None,
            tol: 1e-6,
        };
        assert_eq!(LinearHandler.enforce(&mut ctx).unwrap(), EnforceResult::Cutoff);
    }
}
