//! Problem, domain, and solution types for the solving loop.

mod domain;
mod problem;
mod solution;

pub use domain::{BoundChange, BoundDir, ChangeReason, DomResult, DomainState};
pub use problem::{LinRow, Problem, VarKind, Variable};
pub use solution::{Solution, SolutionStore, SolveStatus};
