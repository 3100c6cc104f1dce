//! Integrality constraint handler.
//!
//! Enforces integrality of the relaxation solution by registering the
//! fractional variables as branching candidates and reporting the
//! solution infeasible. Runs after every other handler so that cheaper
//! resolutions (cuts, domain reductions) get their chance first.

use crate::error::SolveResult;
use crate::search::Candidate;

use super::conshdlr::{ConstraintHandler, EnforceCtx, EnforceResult};

/// Built-in integrality enforcement.
pub struct IntegralityHandler;

impl ConstraintHandler for IntegralityHandler {
    fn name(&self) -> &str {
        "integrality"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn enforce(&mut self, ctx: &mut EnforceCtx) -> SolveResult<EnforceResult> {
        let fractional = ctx.problem.fractional_vars(ctx.sol, ctx.tol);
        if fractional.is_empty() {
            return Ok(EnforceResult::Feasible);
        }

        for (var, value, frac) in fractional {
            ctx.candidates.add_external(Candidate { var, value, frac });
        }
        Ok(EnforceResult::Infeasible)
    }
}
