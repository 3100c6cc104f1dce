//! Branching-rule contract and the default pseudocost rule.

use crate::error::SolveResult;
use crate::model::{DomainState, Problem};
use crate::search::{BranchDecision, Candidate, PseudocostStore};

/// Result of a branching-rule callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchResult {
    /// Rule chose not to run.
    DidNotRun,

    /// Rule ran but found no usable decision.
    DidNotFind,

    /// The subproblem is infeasible.
    Cutoff,

    /// Constraints were added instead of branching.
    ConsAdded,

    /// A domain was reduced instead of branching.
    ReducedDomain,

    /// A cut was separated instead of branching.
    Separated,

    /// A branching decision was produced.
    Branched,
}

/// Context handed to branching rules.
pub struct BranchCtx<'a> {
    /// The problem.
    pub problem: &'a Problem,

    /// Candidates to choose from (LP-fractional, external, or pseudo).
    pub candidates: &'a [Candidate],

    /// Current variable domains.
    pub domains: &'a DomainState,

    /// Pseudocost statistics for scoring.
    pub pseudocosts: &'a PseudocostStore,

    /// Integer feasibility tolerance.
    pub tol: f64,

    /// The produced decision (`Branched` result).
    pub decision: Option<BranchDecision>,
}

impl<'a> BranchCtx<'a> {
    /// Record a branching decision.
    pub fn branch(&mut self, decision: BranchDecision) {
        self.decision = Some(decision);
    }
}

/// A branching rule.
pub trait BranchRule {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Priority among branching rules.
    fn priority(&self) -> i32;

    /// Pick a branching decision from the candidate set.
    fn execute(&mut self, ctx: &mut BranchCtx) -> SolveResult<BranchResult>;
}

/// Default branching rule: pseudocost scoring with a most-fractional
/// fallback for unobserved variables.
pub struct PseudocostBranching;

impl BranchRule for PseudocostBranching {
    fn name(&self) -> &str {
        "pseudocost"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn execute(&mut self, ctx: &mut BranchCtx) -> SolveResult<BranchResult> {
        if ctx.candidates.is_empty() {
            return Ok(BranchResult::DidNotFind);
        }

        let best = ctx
            .candidates
            .iter()
            .map(|c| {
                let score = if c.frac > ctx.tol {
                    ctx.pseudocosts.score(c.var, c.value)
                } else {
                    // Integral (pseudo) candidate: score by domain width so
                    // wide domains split first.
                    ctx.domains.ub(c.var) - ctx.domains.lb(c.var)
                };
                (score, *c)
            })
            .max_by(|(s1, _), (s2, _)| s1.partial_cmp(s2).unwrap_or(std::cmp::Ordering::Equal));

        let Some((score, cand)) = best else {
            return Ok(BranchResult::DidNotFind);
        };

        let decision = if cand.frac > ctx.tol {
            BranchDecision::around_fractional(cand.var, cand.value, score)
        } else {
            // Split an integral candidate at the domain midpoint.
            let lb = ctx.domains.lb(cand.var);
            let ub = ctx.domains.ub(cand.var);
            if ub - lb < 1.0 - ctx.tol {
                return Ok(BranchResult::DidNotFind);
            }
            let mid = ((lb + ub) / 2.0).floor();
            BranchDecision::around_integral(cand.var, mid, score)
        };

        ctx.branch(decision);
        Ok(BranchResult::Branched)
    }
}
