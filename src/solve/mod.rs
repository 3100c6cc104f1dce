//! The main branch-and-bound loop.
//!
//! [`SolveLoop`] owns every component of the solve: the problem, the
//! relaxation adapter, the search tree, the plugin registry, the stores,
//! and the statistics. [`SolveLoop::solve`] drives node selection,
//! focusing, restarts, and stopping criteria; the per-node state machine
//! lives in the `node` submodule, pricing and separation in their own.

mod node;
mod price;
mod separate;
mod stats;

pub use stats::{SolveReport, SolveStats};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::conflict::ConflictAnalyzer;
use crate::error::SolveResult;
use crate::model::{BoundDir, DomainState, Problem, SolutionStore, SolveStatus};
use crate::plugins::{
    HeurCtx, HeurTiming, IntegralityHandler, LinearHandler, Plugins, PseudocostBranching,
    RoundingHeuristic,
};
use crate::relax::{Relaxation, RelaxationSolver};
use crate::search::{BranchCandidates, PseudocostStore, SearchTree};
use crate::settings::SolveSettings;
use crate::store::{CutPool, PriceStore, SepaStore};

use node::NodeOutcome;

/// The branch-and-bound solving loop.
pub struct SolveLoop {
    /// The problem (grows under column generation and added rows).
    problem: Problem,

    /// Settings.
    settings: SolveSettings,

    /// Relaxation adapter over the external solver.
    relax: Relaxation,

    /// Current variable domains (reset and replayed per focus node).
    domains: DomainState,

    /// The search tree.
    tree: SearchTree,

    /// Plugin registry.
    plugins: Plugins,

    /// Separation store.
    sepastore: SepaStore,

    /// Pricing store.
    pricestore: PriceStore,

    /// Pool of globally valid cuts.
    cutpool: CutPool,

    /// Pool of globally valid cuts held back from earlier rounds,
    /// consulted only when the main pool yields nothing.
    delayed_cutpool: CutPool,

    /// Feasible solutions and the cutoff bound.
    solutions: SolutionStore,

    /// Branching candidate sets.
    candidates: BranchCandidates,

    /// Pseudocost statistics.
    pseudocosts: PseudocostStore,

    /// Conflict analyzer.
    conflicts: ConflictAnalyzer,

    /// Counters.
    stats: SolveStats,

    /// Wall clock, reset at the start of `solve`.
    clock: Instant,

    /// Cooperative interrupt flag.
    interrupt: Arc<AtomicBool>,

    /// User-requested restart flag, consumed at the next restart check.
    restart_request: Arc<AtomicBool>,

    /// Restarts performed.
    restarts: u32,

    /// Fixed integral variables when the root came into focus.
    root_fixed_at_start: usize,

    /// Fraction of integral variables fixed while the root was in focus.
    root_fixed_frac: f64,
}

impl SolveLoop {
    /// Create a solving loop over a problem and a relaxation backend.
    ///
    /// The built-in plugins (linear and integrality constraint handlers,
    /// the rounding heuristic, pseudocost branching) are registered here;
    /// further plugins can be added through [`SolveLoop::plugins_mut`]
    /// before calling [`SolveLoop::solve`].
    pub fn new(
        problem: Problem,
        backend: Box<dyn RelaxationSolver>,
        settings: SolveSettings,
    ) -> SolveResult<Self> {
        let relax = Relaxation::new(backend, &problem)?;
        let domains = DomainState::from_problem(&problem);
        let pseudocosts = PseudocostStore::new(problem.num_vars());
        let tree = SearchTree::new(settings.node_selection);
        let cutpool = CutPool::new(settings.pool_max_age);
        let delayed_cutpool = CutPool::new(settings.pool_max_age);
        let conflicts = ConflictAnalyzer::new(settings.conflict_max_len);

        let mut plugins = Plugins::new();
        plugins.add_conshdlr(Box::new(LinearHandler));
        plugins.add_conshdlr(Box::new(IntegralityHandler));
        plugins.add_heuristic(Box::new(RoundingHeuristic));
        plugins.add_branchrule(Box::new(PseudocostBranching));

        Ok(Self {
            problem,
            settings,
            relax,
            domains,
            tree,
            plugins,
            sepastore: SepaStore::new(),
            pricestore: PriceStore::new(),
            cutpool,
            delayed_cutpool,
            solutions: SolutionStore::new(),
            candidates: BranchCandidates::new(),
            pseudocosts,
            conflicts,
            stats: SolveStats::default(),
            clock: Instant::now(),
            interrupt: Arc::new(AtomicBool::new(false)),
            restart_request: Arc::new(AtomicBool::new(false)),
            restarts: 0,
            root_fixed_at_start: 0,
            root_fixed_frac: 0.0,
        })
    }

    /// Plugin registry, for registering additional strategies.
    pub fn plugins_mut(&mut self) -> &mut Plugins {
        &mut self.plugins
    }

    /// Settings in effect.
    pub fn settings(&self) -> &SolveSettings {
        &self.settings
    }

    /// Handle that lets another thread request a clean stop.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Handle that lets another thread request a restart. The flag is
    /// consumed after the current node finishes; under column generation
    /// the request is ignored, as restarts are.
    pub fn restart_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.restart_request)
    }

    /// True once a stop condition that must not wait for the current
    /// node has fired. Checked at pass, pricing-round, and
    /// propagation-round boundaries; the main loop resolves the status.
    pub(crate) fn stop_requested(&self) -> bool {
        if self.interrupt.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(ms) = self.settings.time_limit_ms {
            if self.clock.elapsed().as_millis() as u64 >= ms {
                return true;
            }
        }
        false
    }

    /// Run the branch-and-bound loop to completion.
    pub fn solve(&mut self) -> SolveResult<SolveReport> {
        self.clock = Instant::now();
        log::info!(
            "solving: {} variables ({} integral), {} rows",
            self.problem.num_vars(),
            self.problem.num_integers(),
            self.problem.num_rows()
        );

        self.tree.init_root();
        let status = self.main_loop()?;
        let report = self.report(status);

        log::info!(
            "finished: {:?}, obj={:.6}, lower={:.6}, {} nodes, {:.2}s",
            report.status,
            report.obj,
            report.lower_bound,
            report.stats.n_total_nodes,
            report.stats.time_ms as f64 / 1000.0
        );
        Ok(report)
    }

    fn main_loop(&mut self) -> SolveResult<SolveStatus> {
        loop {
            if let Some(status) = self.check_stop() {
                return Ok(status);
            }

            let cutoff = self.solutions.cutoff_bound();
            let mut focus = match self.tree.select_next(cutoff) {
                Some(n) => n,
                None => return Ok(self.resolve_exhausted()),
            };

            self.focus(&focus);
            self.run_heuristics(HeurTiming::BeforeNode, None)?;

            let outcome = self.solve_focus(&mut focus)?;
            self.stats.n_nodes += 1;
            self.stats.n_total_nodes += 1;
            self.stats.n_stall_nodes += 1;

            if focus.depth == 0 {
                self.globalize_root();
            }

            match outcome {
                NodeOutcome::Cutoff => {
                    self.stats.n_pruned += 1;
                }
                NodeOutcome::Infeasible => {
                    self.tree.count_infeasible();
                    self.stats.n_infeasible += 1;
                    self.conflicts.analyze(&focus.path);
                    if let Some((var, dir)) = focus.branch {
                        self.pseudocosts.record_cutoff(var, dir);
                    }
                    if focus.depth == 0 {
                        // Infeasible root: the whole problem is infeasible.
                        return Ok(SolveStatus::Infeasible);
                    }
                }
                NodeOutcome::Feasible(values) => {
                    if self.solutions.try_add(&self.problem, &values, self.settings.int_feas_tol) {
                        self.on_incumbent();
                    }
                }
                NodeOutcome::Branched(decision) => {
                    let trail = self.domains.take_trail();
                    let down_frac = decision.value - decision.down_ub;
                    let up_frac = decision.up_lb - decision.value;
                    let est_down = focus.lower
                        + self.pseudocosts.estimate_delta(decision.var, BoundDir::Upper, down_frac);
                    let est_up = focus.lower
                        + self.pseudocosts.estimate_delta(decision.var, BoundDir::Lower, up_frac);
                    let parent_obj = self.relax.obj();
                    let warm = self.relax.save_state();
                    self.tree.branch(
                        &focus,
                        &trail,
                        &decision,
                        &self.domains,
                        (est_down, est_up),
                        parent_obj,
                        warm,
                    );
                    log::debug!(
                        "node {}: branched on '{}' at {:.4}",
                        focus.id,
                        self.problem.vars[decision.var].name,
                        decision.value
                    );
                }
                NodeOutcome::Unbounded => {
                    return Ok(if self.solutions.has_incumbent() {
                        SolveStatus::Unbounded
                    } else {
                        SolveStatus::InfeasibleOrUnbounded
                    });
                }
                NodeOutcome::Suspended => {
                    // a stop condition fired mid-node; requeue the
                    // unfinished node so the global lower bound stays
                    // valid, and let check_stop name the status
                    self.tree.enqueue(focus);
                }
            }

            let point = self.relax.solution().map(|s| s.x.clone());
            self.run_heuristics(HeurTiming::AfterNode, point.as_deref())?;

            if self.stats.n_nodes % self.settings.log_freq == 0 {
                self.log_progress();
            }
            self.maybe_restart();
        }
    }

    /// Bring a node into focus: rebuild its domains from the root bounds
    /// and its path, sync the relaxation, restore warm-start state.
    fn focus(&mut self, node: &crate::search::Node) {
        self.domains.reset_to_root();
        self.domains.replay(&node.path);
        self.relax.sync_bounds(&self.domains);
        if let Some(state) = &node.warm_start {
            self.relax.load_state(state);
        }
        self.candidates.clear();
        if node.depth == 0 {
            self.root_fixed_at_start = self.domains.num_fixed_integers(&self.problem);
        }
    }

    /// Check global stopping criteria. `None` means keep going.
    fn check_stop(&mut self) -> Option<SolveStatus> {
        // a closed bound resolves ahead of any pending limit
        if self.solutions.has_incumbent()
            && self.global_lower() >= self.solutions.upper_bound() - 1e-9
        {
            return Some(SolveStatus::Optimal);
        }
        if self.interrupt.load(Ordering::Relaxed) {
            return Some(SolveStatus::UserInterrupt);
        }
        if let Some(ms) = self.settings.time_limit_ms {
            if self.clock.elapsed().as_millis() as u64 >= ms {
                return Some(SolveStatus::TimeLimit);
            }
        }
        if let Some(kb) = self.settings.mem_limit_kb {
            if self.estimated_mem_kb() >= kb {
                return Some(SolveStatus::MemLimit);
            }
        }
        if let Some(limit) = self.settings.sol_limit {
            if self.solutions.num_found() >= limit {
                return Some(SolveStatus::SolLimit);
            }
        }
        if let Some(limit) = self.settings.best_sol_limit {
            if self.solutions.num_improving() >= limit {
                return Some(SolveStatus::BestSolLimit);
            }
        }
        if self.stats.n_total_nodes >= self.settings.total_node_limit {
            return Some(SolveStatus::TotalNodeLimit);
        }
        if self.stats.n_nodes >= self.settings.node_limit {
            return Some(SolveStatus::NodeLimit);
        }
        if self.stats.n_stall_nodes >= self.settings.stall_node_limit {
            return Some(SolveStatus::StallNodeLimit);
        }

        if self.solutions.has_incumbent() {
            let lower = self.global_lower();
            if self.solutions.rel_gap(lower) <= self.settings.gap_rel_tol
                || self.solutions.abs_gap(lower) <= self.settings.gap_abs_tol
            {
                return Some(SolveStatus::GapLimit);
            }
        }
        None
    }

    /// Status once the tree has no open nodes left.
    fn resolve_exhausted(&self) -> SolveStatus {
        if self.solutions.has_incumbent() {
            SolveStatus::Optimal
        } else {
            SolveStatus::Infeasible
        }
    }

    /// Global lower bound: the best bound over the open nodes.
    fn global_lower(&self) -> f64 {
        if self.tree.is_exhausted() {
            self.solutions.upper_bound()
        } else {
            self.tree.lower_bound()
        }
    }

    /// Rough memory footprint of the open tree.
    fn estimated_mem_kb(&self) -> u64 {
        let per_node = self.problem.num_vars() * 8 + 256;
        (self.tree.num_open() * per_node) as u64 / 1024
    }

    /// Run all heuristics registered for a timing point and feed their
    /// candidate assignments to the solution store.
    fn run_heuristics(&mut self, timing: HeurTiming, point: Option<&[f64]>) -> SolveResult<()> {
        let mut submitted = Vec::new();
        for heur in &mut self.plugins.heuristics {
            if heur.timing() != timing {
                continue;
            }
            let mut ctx = HeurCtx {
                problem: &self.problem,
                point,
                domains: &self.domains,
                tol: self.settings.int_feas_tol,
                candidates: Vec::new(),
            };
            heur.execute(&mut ctx)?;
            submitted.append(&mut ctx.candidates);
        }
        for values in submitted {
            if self.solutions.try_add(&self.problem, &values, self.settings.int_feas_tol) {
                self.on_incumbent();
            }
        }
        Ok(())
    }

    /// Bookkeeping after an incumbent improvement.
    fn on_incumbent(&mut self) {
        self.stats.n_stall_nodes = 0;
        let cutoff = self.solutions.cutoff_bound();
        let pruned = self.tree.prune_by_bound(cutoff);
        log::info!(
            "new incumbent: obj={:.6} ({} open nodes pruned)",
            self.solutions.upper_bound(),
            pruned
        );
    }

    /// Promote root-node reductions to global bounds and measure how much
    /// of the integral variable set got fixed.
    fn globalize_root(&mut self) {
        for chg in self.domains.trail().to_vec() {
            self.domains.tighten_root(chg.var, chg.dir, chg.new);
        }
        let n_int = self.problem.num_integers();
        if n_int > 0 {
            let fixed = self.domains.num_fixed_integers(&self.problem);
            self.root_fixed_frac =
                fixed.saturating_sub(self.root_fixed_at_start) as f64 / n_int as f64;
        }
    }

    /// Restart policy: geometric conflict threshold or substantial root
    /// fixings. Suppressed under column generation, where the tree state
    /// cannot be rebuilt cheaply.
    fn maybe_restart(&mut self) {
        if self.plugins.has_pricers()
            || self.restarts >= self.settings.max_restarts
            || self.tree.is_exhausted()
        {
            return;
        }

        let threshold = (self.settings.conflict_restart_base as f64
            * self.settings.conflict_restart_factor.powi(self.restarts as i32))
            as u64;
        let user_trigger = self.restart_request.swap(false, Ordering::Relaxed);
        let conflict_trigger = self.conflicts.since_restart() >= threshold.max(1);
        let fixing_trigger = self.stats.n_nodes == 1
            && self.root_fixed_frac >= self.settings.root_fixing_restart_frac
            && self.root_fixed_frac > 0.0;

        if user_trigger || conflict_trigger || fixing_trigger {
            self.perform_restart();
        }
    }

    /// Rebuild the tree from a fresh root. Solutions, conflicts,
    /// pseudocosts, and the cut pool survive; open nodes do not.
    fn perform_restart(&mut self) {
        self.restarts += 1;
        log::info!(
            "restart {} ({} conflicts since last, {:.0}% of integers fixed at root)",
            self.restarts,
            self.conflicts.since_restart(),
            self.root_fixed_frac * 100.0
        );
        self.stats.notify_restart();
        self.conflicts.notify_restart();
        self.tree.restart();
        self.sepastore.clear();
        self.pricestore.clear();
        self.candidates.clear();
        self.root_fixed_frac = 0.0;
        self.domains.reset_to_root();
        self.relax.sync_bounds(&self.domains);
    }

    fn log_progress(&self) {
        let lower = self.global_lower();
        log::info!(
            "nodes={} open={} lower={:.6} upper={:.6} gap={:.2}%",
            self.stats.n_total_nodes,
            self.tree.num_open(),
            lower,
            self.solutions.upper_bound(),
            self.solutions.rel_gap(lower) * 100.0
        );
    }

    /// Assemble the final report.
    fn report(&self, status: SolveStatus) -> SolveReport {
        let lower = if status == SolveStatus::Optimal {
            self.solutions.upper_bound()
        } else {
            self.global_lower()
        };

        let mut stats = self.stats.clone();
        stats.time_ms = self.clock.elapsed().as_millis() as u64;
        stats.n_pruned += self.tree.num_pruned();
        stats.n_branchings = self.tree.num_branched();
        stats.n_conflicts = self.conflicts.num_found();
        stats.n_solutions = self.solutions.num_found();
        stats.n_cuts_applied = self.sepastore.num_applied();

        SolveReport {
            status,
            best: self.solutions.best().cloned(),
            obj: self.solutions.upper_bound(),
            lower_bound: lower,
            gap: self.solutions.rel_gap(lower),
            stats,
        }
    }
}
