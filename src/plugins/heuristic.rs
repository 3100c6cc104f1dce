//! Primal heuristic contract.

use crate::error::SolveResult;
use crate::model::{DomainState, Problem};

/// Timing point at which a heuristic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeurTiming {
    /// Before the focus node is processed.
    BeforeNode,

    /// After a relaxation solve, inside the node loop.
    DuringRelax,

    /// After the focus node finished.
    AfterNode,
}

/// Context handed to heuristics.
pub struct HeurCtx<'a> {
    /// The problem.
    pub problem: &'a Problem,

    /// Current relaxation point, when one is available.
    pub point: Option<&'a [f64]>,

    /// Current variable domains.
    pub domains: &'a DomainState,

    /// Integer feasibility tolerance.
    pub tol: f64,

    /// Candidate assignments proposed by the heuristic. Each candidate is
    /// validated by the solution store before acceptance.
    pub candidates: Vec<Vec<f64>>,
}

impl<'a> HeurCtx<'a> {
    /// Propose a candidate assignment.
    pub fn submit(&mut self, values: Vec<f64>) {
        self.candidates.push(values);
    }
}

/// A primal heuristic.
pub trait Heuristic {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Priority among heuristics.
    fn priority(&self) -> i32;

    /// Timing point at which this heuristic participates.
    fn timing(&self) -> HeurTiming;

    /// Run the heuristic; returns true if it proposed at least one
    /// candidate.
    fn execute(&mut self, ctx: &mut HeurCtx) -> SolveResult<bool>;
}
