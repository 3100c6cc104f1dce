//! Separator contract.

use crate::error::SolveResult;
use crate::model::{DomainState, LinRow, Problem};
use crate::store::SepaStore;

/// Result of a separation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SepaResult {
    /// Callback chose not to run.
    DidNotRun,

    /// Callback wants to be retried once the round makes no more progress.
    Delayed,

    /// One or more constraints were added to the problem.
    ConsAdded,

    /// A domain was reduced.
    ReducedDomain,

    /// Cuts were added to the separation store.
    Separated,

    /// Request an immediate new separation round.
    NewRound,

    /// The subproblem is infeasible.
    Cutoff,
}

/// Context handed to separation callbacks.
pub struct SepaCtx<'a> {
    /// The problem.
    pub problem: &'a Problem,

    /// The relaxation point to separate.
    pub point: &'a [f64],

    /// Depth of the focus node.
    pub depth: usize,

    /// Relative distance of the node's bound from the global lower bound.
    pub bound_dist: f64,

    /// Separation store receiving generated cuts.
    pub store: &'a mut SepaStore,

    /// Current variable domains (for reduced-domain results).
    pub domains: &'a mut DomainState,

    /// Rows added by the callback (`ConsAdded` result).
    pub added_rows: Vec<LinRow>,
}

/// A cutting-plane separator.
pub trait Separator {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Priority; non-negative separators run before constraint handlers,
    /// negative ones after.
    fn priority(&self) -> i32;

    /// Whether this separator should only run once a round stops
    /// making progress.
    fn delayed(&self) -> bool {
        false
    }

    /// Separate the given relaxation point.
    fn execute(&mut self, ctx: &mut SepaCtx) -> SolveResult<SepaResult>;
}
