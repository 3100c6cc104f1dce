//! Branch-and-bound / price-and-cut search core for mixed-integer
//! optimization.
//!
//! This library runs the tree search around a pluggable linear
//! relaxation backend:
//!
//! - **Node processing**: propagate, solve the relaxation, price in
//!   columns, separate cuts, enforce, then branch
//! - **Main loop**: best-bound node selection, bound-based pruning,
//!   restarts, and the usual stopping criteria (gap, node, time,
//!   solution limits)
//! - **Pluggable strategies**: propagators, separators, constraint
//!   handlers, pricers, primal heuristics, and branching rules are trait
//!   objects registered on the loop
//! - **Built-ins**: linear-constraint handler with activity propagation,
//!   integrality enforcement, pseudocost branching, a rounding
//!   heuristic, and conflict learning from infeasible subproblems
//!
//! # Example
//!
//! ```ignore
//! use solver_bnb::{LinRow, Problem, SolveSettings, Variable};
//!
//! let problem = Problem::new(
//!     vec![Variable::integer("x", 1.0, 0.0, 10.0), Variable::continuous("y", 2.0, 0.0, 10.0)],
//!     vec![LinRow::ge("cover", vec![(0, 1.0), (1, 1.0)], 3.5)],
//! )?;
//!
//! let backend = /* any RelaxationSolver */;
//! let report = solver_bnb::solve(problem, backend, SolveSettings::default())?;
//! println!("{:?}: {:?}", report.status, report.obj);
//! ```
//!
//! The backend only has to solve bounded linear relaxations; everything
//! above it (the search, the stores, the plugin rounds) lives here.

#![warn(clippy::all)]

pub mod conflict;
pub mod error;
pub mod model;
pub mod plugins;
pub mod relax;
pub mod search;
pub mod settings;
pub mod solve;
pub mod store;

pub use conflict::ConflictAnalyzer;
pub use error::{SolveError, SolveResult};
pub use model::{
    BoundChange, BoundDir, ChangeReason, DomainState, LinRow, Problem, Solution, SolveStatus,
    VarKind, Variable,
};
pub use relax::{Cut, RelaxSolution, RelaxState, RelaxStatus, Relaxation, RelaxationSolver};
pub use search::{BranchDecision, Candidate};
pub use settings::{NodeSelection, SolveSettings};
pub use solve::{SolveLoop, SolveReport, SolveStats};

/// Solve a problem with the given relaxation backend and settings.
///
/// Convenience wrapper around [`SolveLoop::new`] followed by
/// [`SolveLoop::solve`] for callers that do not register extra plugins.
pub fn solve(
    problem: Problem,
    backend: Box<dyn RelaxationSolver>,
    settings: SolveSettings,
) -> SolveResult<SolveReport> {
    let mut solver = SolveLoop::new(problem, backend, settings)?;
    solver.solve()
}
