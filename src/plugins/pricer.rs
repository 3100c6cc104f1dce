//! Pricer contract (column generation).

use crate::error::SolveResult;
use crate::model::{DomainState, Problem};
use crate::store::PriceStore;

/// Result of a pricing callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceResult {
    /// Callback chose not to run.
    DidNotRun,

    /// Pricing ran to completion (columns may or may not have been added).
    Success,
}

/// Outcome of a pricing callback.
#[derive(Debug, Clone, Copy)]
pub struct Priced {
    /// Result code.
    pub result: PriceResult,

    /// Optional valid lower bound on the relaxation objective even with
    /// columns still missing (strengthens the node bound while pricing).
    pub lower_bound: Option<f64>,
}

impl Priced {
    /// A completed pricing run without a bound contribution.
    pub fn success() -> Self {
        Self { result: PriceResult::Success, lower_bound: None }
    }

    /// A skipped pricing run.
    pub fn did_not_run() -> Self {
        Self { result: PriceResult::DidNotRun, lower_bound: None }
    }
}

/// Context handed to pricing callbacks.
pub struct PriceCtx<'a> {
    /// The problem.
    pub problem: &'a Problem,

    /// Current variable domains.
    pub domains: &'a DomainState,

    /// Row duals of the last relaxation solve.
    pub duals: &'a [f64],

    /// Objective of the last relaxation solve.
    pub lp_obj: f64,

    /// Pricing store receiving generated columns.
    pub store: &'a mut PriceStore,
}

/// A variable pricer.
pub trait Pricer {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Priority among pricers.
    fn priority(&self) -> i32;

    /// Generate columns that might improve the relaxation bound.
    fn execute(&mut self, ctx: &mut PriceCtx) -> SolveResult<Priced>;
}
