//! Domain propagator contract.

use std::ops::BitOr;

use crate::error::SolveResult;
use crate::model::{ChangeReason, DomResult, DomainState, Problem};

/// Timing mask restricting when a propagator runs within the node cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropTiming(u8);

impl PropTiming {
    /// Before the relaxation is solved.
    pub const BEFORE_RELAX: PropTiming = PropTiming(0b001);

    /// Inside the relaxation loop (between re-solves).
    pub const DURING_RELAX: PropTiming = PropTiming(0b010);

    /// After the relaxation loop finished.
    pub const AFTER_RELAX: PropTiming = PropTiming(0b100);

    /// All timing points.
    pub const ALWAYS: PropTiming = PropTiming(0b111);

    /// Whether this mask includes the given timing point.
    pub fn contains(self, point: PropTiming) -> bool {
        self.0 & point.0 != 0
    }
}

impl BitOr for PropTiming {
    type Output = PropTiming;
    fn bitor(self, rhs: PropTiming) -> PropTiming {
        PropTiming(self.0 | rhs.0)
    }
}

/// Result of a propagation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropResult {
    /// Callback chose not to run.
    DidNotRun,

    /// Callback wants to be retried once the round makes no more progress.
    Delayed,

    /// At least one domain was reduced.
    ReducedDomain,

    /// The subproblem is infeasible.
    Cutoff,
}

/// Context handed to propagation callbacks.
pub struct PropCtx<'a> {
    /// The problem.
    pub problem: &'a Problem,

    /// Current variable domains.
    pub domains: &'a mut DomainState,

    /// Depth of the focus node.
    pub depth: usize,

    /// Current timing point.
    pub timing: PropTiming,

    /// Integer feasibility tolerance.
    pub tol: f64,

    /// Reductions performed through this context.
    pub n_reductions: u32,
}

impl<'a> PropCtx<'a> {
    /// Tighten a lower bound, rounding up for integral variables.
    pub fn tighten_lb(&mut self, var: usize, val: f64) -> DomResult {
        let val = if self.problem.vars[var].kind.is_integral() {
            (val - self.tol).ceil()
        } else {
            val
        };
        let res = self.domains.tighten_lb(var, val, ChangeReason::Propagation);
        if res == DomResult::Tightened {
            self.n_reductions += 1;
        }
        res
    }

    /// Tighten an upper bound, rounding down for integral variables.
    pub fn tighten_ub(&mut self, var: usize, val: f64) -> DomResult {
        let val = if self.problem.vars[var].kind.is_integral() {
            (val + self.tol).floor()
        } else {
            val
        };
        let res = self.domains.tighten_ub(var, val, ChangeReason::Propagation);
        if res == DomResult::Tightened {
            self.n_reductions += 1;
        }
        res
    }
}

/// A domain propagator.
pub trait Propagator {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Priority; non-negative propagators run before constraint handlers,
    /// negative ones after.
    fn priority(&self) -> i32;

    /// Timing points at which this propagator participates.
    fn timing(&self) -> PropTiming {
        PropTiming::ALWAYS
    }

    /// Whether this propagator should only run once a round stops
    /// making progress.
    fn delayed(&self) -> bool {
        false
    }

    /// Run one propagation pass.
    fn execute(&mut self, ctx: &mut PropCtx) -> SolveResult<PropResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variable;

    #[test]
    fn test_timing_mask() {
        let mask = PropTiming::BEFORE_RELAX | PropTiming::AFTER_RELAX;
        assert!(mask.contains(PropTiming::BEFORE_RELAX));
        assert!(!mask.contains(PropTiming::DURING_RELAX));
        assert!(PropTiming::ALWAYS.contains(PropTiming::DURING_RELAX));
    }

    #[test]
    fn test_ctx_rounds_integer_bounds() {
        let prob = Problem::new(vec![Variable::integer("x", 1.0, 0.0, 10.0)], vec![]).unwrap();
        let mut dom = DomainState::from_problem(&prob);
        let mut ctx = PropCtx {
            problem: &prob,
            domains: &mut dom,
            depth: 0,
            timing: PropTiming::BEFORE_RELAX,
            tol: 1e-6,
            n_reductions: 0,
        };

        assert_eq!(ctx.tighten_lb(0, 2.3), DomResult::Tightened);
        assert_eq!(ctx.domains.lb(0), 3.0);
        assert_eq!(ctx.tighten_ub(0, 7.8), DomResult::Tightened);
        assert_eq!(ctx.domains.ub(0), 7.0);
        assert_eq!(ctx.n_reductions, 2);
    }
}
