//! Simple rounding heuristic.

use crate::error::SolveResult;

use super::heuristic::{HeurCtx, HeurTiming, Heuristic};

/// Rounds the current relaxation point to the nearest integers and
/// submits the result as a candidate solution. Values are clamped to the
/// current domains, so branching fixings are respected. Whether the
/// rounded point satisfies the rows is checked by the solution store.
pub struct RoundingHeuristic;

impl Heuristic for RoundingHeuristic {
    fn name(&self) -> &str {
        "rounding"
    }

    fn priority(&self) -> i32 {
        -1000
    }

    fn timing(&self) -> HeurTiming {
        HeurTiming::DuringRelax
    }

    fn execute(&mut self, ctx: &mut HeurCtx) -> SolveResult<bool> {
        let point = match ctx.point {
            Some(p) => p,
            None => return Ok(false),
        };

        let mut values = point.to_vec();
        for &j in ctx.problem.integer_vars() {
            let rounded = values[j].round();
            values[j] = rounded.clamp(ctx.domains.lb(j), ctx.domains.ub(j));
        }
        ctx.submit(values);
        Ok(true)
    }
}
