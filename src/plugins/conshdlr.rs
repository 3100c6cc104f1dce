//! Constraint-handler contract: propagation, separation, and enforcement
//! callbacks under one roof.

use crate::error::SolveResult;
use crate::model::{DomainState, LinRow, Problem};
use crate::search::{BranchCandidates, BranchDecision};
use crate::store::SepaStore;

use super::propagator::{PropCtx, PropResult};
use super::separator::{SepaCtx, SepaResult};

/// Result of an enforcement callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforceResult {
    /// The solution satisfies this handler's constraints.
    Feasible,

    /// The solution violates a constraint and nothing else resolved it;
    /// the loop must branch.
    Infeasible,

    /// The subproblem is infeasible regardless of the solution.
    Cutoff,

    /// Constraints were added (triggers a full propagate + resolve pass).
    ConsAdded,

    /// A domain was reduced.
    ReducedDomain,

    /// A cut was placed into the (forced) separation store.
    Separated,

    /// A branching decision was produced.
    Branched,

    /// The relaxation must be solved before this handler can decide
    /// (only meaningful when enforcing a pseudo solution).
    SolveRelaxation,

    /// Callback chose not to run.
    DidNotRun,
}

/// Context handed to enforcement callbacks.
pub struct EnforceCtx<'a> {
    /// The problem.
    pub problem: &'a Problem,

    /// The solution being enforced (relaxation or pseudo solution).
    pub sol: &'a [f64],

    /// Whether `sol` is the pseudo solution (no relaxation available).
    pub pseudo: bool,

    /// Current variable domains.
    pub domains: &'a mut DomainState,

    /// Separation store, pre-set to force mode.
    pub store: &'a mut SepaStore,

    /// Branching candidate sets; handlers register candidates here.
    pub candidates: &'a mut BranchCandidates,

    /// Rows added by the callback (`ConsAdded` result).
    pub added_rows: Vec<LinRow>,

    /// Branching decision produced by the callback (`Branched` result).
    pub decision: Option<BranchDecision>,

    /// Integer feasibility tolerance.
    pub tol: f64,
}

/// A constraint handler.
///
/// Only `enforce` is mandatory; handlers without propagation or
/// separation logic inherit the do-nothing defaults.
pub trait ConstraintHandler {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Handler priority; orders both the middle propagation/separation
    /// tier and the enforcement round.
    fn priority(&self) -> i32;

    /// Propagation callback.
    fn propagate(&mut self, _ctx: &mut PropCtx) -> SolveResult<PropResult> {
        Ok(PropResult::DidNotRun)
    }

    /// Separation callback.
    fn separate(&mut self, _ctx: &mut SepaCtx) -> SolveResult<SepaResult> {
        Ok(SepaResult::DidNotRun)
    }

    /// Enforcement callback. Runs on the final relaxation solution (or
    /// the pseudo solution when no relaxation was solved).
    fn enforce(&mut self, ctx: &mut EnforceCtx) -> SolveResult<EnforceResult>;
}
