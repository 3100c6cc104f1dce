//! Conflict analysis: learn no-good constraints from infeasible nodes.
//!
//! When a node is declared infeasible, the branching decisions on its
//! path form an assignment that can never be part of a feasible solution.
//! The analyzer records that assignment as a conflict constraint and
//! later propagates it at other nodes: once all but one branching bound
//! of a conflict holds, the remaining one can be negated.

use crate::model::{BoundChange, BoundDir, ChangeReason, DomResult};
use crate::plugins::{PropCtx, PropResult};

/// A single bound literal of a conflict constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ConflictLiteral {
    var: usize,
    dir: BoundDir,
    bound: f64,
}

impl ConflictLiteral {
    /// Whether the literal holds under the given domains.
    fn holds(&self, ctx: &PropCtx) -> bool {
        match self.dir {
            BoundDir::Lower => ctx.domains.lb(self.var) >= self.bound - 1e-9,
            BoundDir::Upper => ctx.domains.ub(self.var) <= self.bound + 1e-9,
        }
    }

    /// Whether the literal can no longer hold (its bound left the domain).
    fn impossible(&self, ctx: &PropCtx) -> bool {
        match self.dir {
            BoundDir::Lower => ctx.domains.ub(self.var) < self.bound - 1e-9,
            BoundDir::Upper => ctx.domains.lb(self.var) > self.bound + 1e-9,
        }
    }
}

/// A learned no-good: the conjunction of its literals is infeasible.
#[derive(Debug, Clone)]
struct ConflictConstraint {
    literals: Vec<ConflictLiteral>,
}

/// Collects conflict constraints and propagates them.
pub struct ConflictAnalyzer {
    /// Learned constraints.
    constraints: Vec<ConflictConstraint>,

    /// Maximum literal count for a constraint to be kept.
    max_len: usize,

    /// Conflicts learned over the whole solve.
    n_found: u64,

    /// Domain reductions derived from conflicts.
    n_applied: u64,

    /// Conflicts learned since the last restart; drives the restart policy.
    since_restart: u64,
}

impl ConflictAnalyzer {
    /// Create an analyzer keeping conflicts of at most `max_len` literals.
    pub fn new(max_len: usize) -> Self {
        Self {
            constraints: Vec::new(),
            max_len,
            n_found: 0,
            n_applied: 0,
            since_restart: 0,
        }
    }

    /// Learn a conflict from the bound-change path of an infeasible node.
    ///
    /// Only branching changes enter the constraint; propagation-derived
    /// bounds are consequences of them and carry no extra information.
    /// Overlong conflicts are discarded, they would almost never fire.
    pub fn analyze(&mut self, path: &[BoundChange]) -> bool {
        let literals: Vec<ConflictLiteral> = path
            .iter()
            .filter(|c| c.reason == ChangeReason::Branching)
            .map(|c| ConflictLiteral { var: c.var, dir: c.dir, bound: c.new })
            .collect();

        if literals.is_empty() || literals.len() > self.max_len {
            return false;
        }
        log::debug!("learned conflict with {} literals", literals.len());
        self.constraints.push(ConflictConstraint { literals });
        self.n_found += 1;
        self.since_restart += 1;
        true
    }

    /// Propagate all learned conflicts against the current domains.
    pub fn propagate(&mut self, ctx: &mut PropCtx) -> PropResult {
        let mut reduced = false;
        for cons in &self.constraints {
            let mut unresolved: Option<&ConflictLiteral> = None;
            let mut vacuous = false;
            let mut n_holding = 0;
            for lit in &cons.literals {
                if lit.holds(ctx) {
                    n_holding += 1;
                } else if lit.impossible(ctx) {
                    vacuous = true;
                    break;
                } else if unresolved.is_some() {
                    // Two open literals, nothing to derive.
                    unresolved = None;
                    break;
                } else {
                    unresolved = Some(lit);
                }
            }
            if vacuous {
                continue;
            }
            if n_holding == cons.literals.len() {
                return PropResult::Cutoff;
            }
            let lit = match unresolved {
                Some(l) if n_holding == cons.literals.len() - 1 => l,
                _ => continue,
            };
            // Negate the remaining literal. Only integral variables allow a
            // clean negation of a branching bound.
            if !ctx.problem.vars[lit.var].kind.is_integral() {
                continue;
            }
            let res = match lit.dir {
                BoundDir::Lower => ctx.tighten_ub(lit.var, lit.bound - 1.0),
                BoundDir::Upper => ctx.tighten_lb(lit.var, lit.bound + 1.0),
            };
            match res {
                DomResult::Infeasible => return PropResult::Cutoff,
                DomResult::Tightened => {
                    self.n_applied += 1;
                    reduced = true;
                }
                DomResult::Unchanged => {}
            }
        }
        if reduced {
            PropResult::ReducedDomain
        } else {
            PropResult::DidNotRun
        }
    }

    /// Conflicts learned over the whole solve.
    pub fn num_found(&self) -> u64 {
        self.n_found
    }

    /// Domain reductions derived from conflicts.
    pub fn num_applied(&self) -> u64 {
        self.n_applied
    }

    /// Conflicts learned since the last restart.
    pub fn since_restart(&self) -> u64 {
        self.since_restart
    }

    /// Reset the per-restart conflict counter; learned constraints survive.
    pub fn notify_restart(&mut self) {
        self.since_restart = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DomainState, Problem, Variable};
    use crate::plugins::PropTiming;

    fn prob() -> Problem {
        Problem::new(
            vec![
                Variable::binary("x", 1.0),
                Variable::binary("y", 1.0),
                Variable::binary("z", 1.0),
            ],
            vec![],
        )
        .unwrap()
    }

    fn change(var: usize, dir: BoundDir, new: f64, reason: ChangeReason) -> BoundChange {
        let old = match dir {
            BoundDir::Lower => 0.0,
            BoundDir::Upper => 1.0,
        };
        BoundChange { var, dir, old, new, reason }
    }

    fn ctx<'a>(prob: &'a Problem, domains: &'a mut DomainState) -> PropCtx<'a> {
        PropCtx {
            problem: prob,
            domains,
            depth: 1,
            timing: PropTiming::BEFORE_RELAX,
            tol: 1e-6,
            n_reductions: 0,
        }
    }

    #[test]
    fn test_analyze_keeps_branching_literals_only() {
        let mut analyzer = ConflictAnalyzer::new(8);
        let path = vec![
            change(0, BoundDir::Lower, 1.0, ChangeReason::Branching),
            change(1, BoundDir::Upper, 0.0, ChangeReason::Propagation),
            change(2, BoundDir::Lower, 1.0, ChangeReason::Branching),
        ];
        assert!(analyzer.analyze(&path));
        assert_eq!(analyzer.constraints[0].literals.len(), 2);
        assert_eq!(analyzer.since_restart(), 1);
    }

    #[test]
    fn test_analyze_discards_overlong() {
        let mut analyzer = ConflictAnalyzer::new(1);
        let path = vec![
            change(0, BoundDir::Lower, 1.0, ChangeReason::Branching),
            change(1, BoundDir::Lower, 1.0, ChangeReason::Branching),
        ];
        assert!(!analyzer.analyze(&path));
        assert_eq!(analyzer.num_found(), 0);
    }

    #[test]
    fn test_propagate_negates_last_open_literal() {
        let p = prob();
        let mut analyzer = ConflictAnalyzer::new(8);
        // Conflict: x = 1 and y = 1 cannot both hold.
        analyzer.analyze(&[
            change(0, BoundDir::Lower, 1.0, ChangeReason::Branching),
            change(1, BoundDir::Lower, 1.0, ChangeReason::Branching),
        ]);

        let mut domains = DomainState::from_problem(&p);
        domains.tighten_lb(0, 1.0, ChangeReason::Branching);
        let mut ctx = ctx(&p, &mut domains);
        assert_eq!(analyzer.propagate(&mut ctx), PropResult::ReducedDomain);
        // y forced to 0.
        assert_eq!(ctx.domains.ub(1), 0.0);
        assert_eq!(analyzer.num_applied(), 1);
    }

    #[test]
    fn test_propagate_detects_cutoff() {
        let p = prob();
        let mut analyzer = ConflictAnalyzer::new(8);
        analyzer.analyze(&[
            change(0, BoundDir::Lower, 1.0, ChangeReason::Branching),
            change(1, BoundDir::Lower, 1.0, ChangeReason::Branching),
        ]);

        let mut domains = DomainState::from_problem(&p);
        domains.tighten_lb(0, 1.0, ChangeReason::Branching);
        domains.tighten_lb(1, 1.0, ChangeReason::Branching);
        let mut ctx = ctx(&p, &mut domains);
        assert_eq!(analyzer.propagate(&mut ctx), PropResult::Cutoff);
    }

    #[test]
    fn test_vacuous_conflict_is_skipped() {
        let p = prob();
        let mut analyzer = ConflictAnalyzer::new(8);
        analyzer.analyze(&[
            change(0, BoundDir::Lower, 1.0, ChangeReason::Branching),
            change(1, BoundDir::Lower, 1.0, ChangeReason::Branching),
        ]);

        // x fixed to 0: the conflict can never fire here.
        let mut domains = DomainState::from_problem(&p);
        domains.tighten_ub(0, 0.0, ChangeReason::Branching);
        domains.tighten_lb(1, 1.0, ChangeReason::Branching);
        let mut ctx = ctx(&p, &mut domains);
        assert_eq!(analyzer.propagate(&mut ctx), PropResult::DidNotRun);
    }
}
