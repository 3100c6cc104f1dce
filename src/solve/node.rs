//! The node solving loop: propagate, solve the relaxation, price,
//! separate, enforce, branch.
//!
//! One call to [`SolveLoop::solve_focus`] processes the focus node to a
//! terminal outcome. The loop re-enters earlier phases whenever a later
//! one changes the subproblem (added rows, reduced domains, applied
//! cuts), and every phase re-checks the node bound against the cutoff
//! bound first.

use crate::error::{SolveError, SolveResult};
use crate::model::{DomainState, LinRow, Problem};
use crate::plugins::{
    BranchCtx, BranchResult, ConstraintHandler, EnforceCtx, EnforceResult, HeurTiming, PropCtx,
    PropResult, PropTiming, Propagator,
};
use crate::relax::{Cut, RelaxStatus};
use crate::search::{BranchDecision, Candidate, Node};

use super::separate::SepaRound;
use super::stats::SolveStats;
use super::SolveLoop;

/// Terminal outcome of processing a focus node.
pub(crate) enum NodeOutcome {
    /// Node bound reached the cutoff bound.
    Cutoff,

    /// Subproblem proven infeasible.
    Infeasible,

    /// A feasible assignment for the whole subproblem.
    Feasible(Vec<f64>),

    /// A branching decision splitting the subproblem.
    Branched(BranchDecision),

    /// The relaxation is unbounded.
    Unbounded,

    /// A global stop condition fired mid-node; the node is unfinished.
    Suspended,
}

/// Outcome of one enforcement round over all constraint handlers.
enum EnforceOutcome {
    /// Every handler accepted the solution.
    AllFeasible,

    /// At least one handler rejected it without resolving; branch.
    MustBranch,

    /// The subproblem is infeasible.
    Cutoff,

    /// A handler added rows to the problem.
    ConsAdded(Vec<LinRow>),

    /// A handler reduced a domain.
    Reduced,

    /// A handler put forced cuts into the separation store.
    Separated,

    /// A handler produced its own branching decision.
    Branched(BranchDecision),

    /// A handler wants the relaxation solved before it can decide.
    SolveRelax,
}

/// Outcome of the branching step.
enum BranchStep {
    Branched(BranchDecision),
    Cutoff,

    /// A rule changed the subproblem instead of branching.
    Progress,

    /// No rule produced anything usable.
    NoneFound,
}

/// Shared per-round bookkeeping for the propagation driver.
struct PropRound {
    progress: bool,
    delayed_skipped: bool,
}

/// Run the propagators of one priority tier.
fn run_propagators(
    props: &mut [Box<dyn Propagator>],
    negative_tier: bool,
    run_delayed: bool,
    problem: &Problem,
    domains: &mut DomainState,
    depth: usize,
    timing: PropTiming,
    tol: f64,
    stats: &mut SolveStats,
    round: &mut PropRound,
) -> SolveResult<bool> {
    for prop in props {
        if (prop.priority() < 0) != negative_tier {
            continue;
        }
        if !prop.timing().contains(timing) {
            continue;
        }
        if prop.delayed() && !run_delayed {
            round.delayed_skipped = true;
            continue;
        }
        let mut ctx = PropCtx { problem, domains, depth, timing, tol, n_reductions: 0 };
        let res = prop.execute(&mut ctx)?;
        stats.n_reductions += ctx.n_reductions as u64;
        match res {
            PropResult::Cutoff => return Ok(true),
            PropResult::ReducedDomain => round.progress = true,
            PropResult::Delayed => round.delayed_skipped = true,
            PropResult::DidNotRun => {}
        }
    }
    Ok(false)
}

/// Run the propagation callbacks of the constraint handlers.
fn run_conshdlr_propagation(
    handlers: &mut [Box<dyn ConstraintHandler>],
    problem: &Problem,
    domains: &mut DomainState,
    depth: usize,
    timing: PropTiming,
    tol: f64,
    stats: &mut SolveStats,
    round: &mut PropRound,
) -> SolveResult<bool> {
    for h in handlers {
        let mut ctx = PropCtx { problem, domains, depth, timing, tol, n_reductions: 0 };
        let res = h.propagate(&mut ctx)?;
        stats.n_reductions += ctx.n_reductions as u64;
        match res {
            PropResult::Cutoff => return Ok(true),
            PropResult::ReducedDomain => round.progress = true,
            PropResult::Delayed => round.delayed_skipped = true,
            PropResult::DidNotRun => {}
        }
    }
    Ok(false)
}

impl SolveLoop {
    /// Process the focus node to a terminal outcome.
    pub(crate) fn solve_focus(&mut self, node: &mut Node) -> SolveResult<NodeOutcome> {
        let depth = node.depth;
        let tol = self.settings.int_feas_tol;

        let mut do_propagate = true;
        let mut pricing_aborted = false;
        let mut force_no_cutoff = false;
        let mut forced_fallbacks = 0u32;
        let mut sepa_rounds = 0u32;
        let mut sepa_stalls = 0u32;
        let mut last_sepa_obj = f64::NEG_INFINITY;
        let mut last_nfrac = usize::MAX;

        for _pass in 0..self.settings.max_node_passes {
            if self.stop_requested() {
                return Ok(NodeOutcome::Suspended);
            }
            if node.can_prune(self.solutions.cutoff_bound()) {
                return Ok(NodeOutcome::Cutoff);
            }

            if do_propagate {
                do_propagate = false;
                if self.propagation_rounds(depth, PropTiming::BEFORE_RELAX)? == PropResult::Cutoff {
                    return Ok(NodeOutcome::Infeasible);
                }
                self.relax.sync_bounds(&self.domains);

                // the box alone already bounds the objective from below
                let (_, pseudo_obj) = self.domains.pseudo_solution(&self.problem);
                if pseudo_obj.is_finite() {
                    node.update_lower(pseudo_obj);
                    if node.can_prune(self.solutions.cutoff_bound()) {
                        return Ok(NodeOutcome::Cutoff);
                    }
                }
            }

            let forced = force_no_cutoff;
            let honor = !pricing_aborted && !forced;
            let mut status = self.try_solve_relax(honor, forced)?;
            force_no_cutoff = false;

            // the first solved relaxation pays the branching's
            // pseudocost observation
            if status.gives_dual_bound() {
                if let (Some((parent_obj, frac)), Some((var, dir))) =
                    (node.branch_gain.take(), node.branch)
                {
                    if let Some(obj) = self.relax.obj() {
                        self.pseudocosts.update(var, dir, frac, obj - parent_obj);
                    }
                }
            }

            if status == RelaxStatus::Optimal && self.plugins.has_pricers() {
                let priced = self.pricing_loop()?;
                if priced.cutoff {
                    return Ok(NodeOutcome::Infeasible);
                }
                pricing_aborted = priced.aborted;
                if let Some(lb) = priced.lower {
                    node.update_lower(lb);
                }
                status = self.relax.status();
            }

            match status {
                RelaxStatus::Infeasible => return Ok(NodeOutcome::Infeasible),
                RelaxStatus::UnboundedRay => {
                    // an unbounded ray may still be separable
                    if sepa_rounds < self.settings.sepa_max_rounds {
                        sepa_rounds += 1;
                        match self.separation_round(node)? {
                            SepaRound::Cutoff => return Ok(NodeOutcome::Infeasible),
                            SepaRound::Progress => {
                                do_propagate = true;
                                continue;
                            }
                            SepaRound::NoCuts => {}
                        }
                    }
                    return Ok(NodeOutcome::Unbounded);
                }
                RelaxStatus::ObjLimit => {
                    // only certifies the cutoff with a complete column set
                    if pricing_aborted {
                        force_no_cutoff = true;
                        continue;
                    }
                    return Ok(NodeOutcome::Cutoff);
                }
                RelaxStatus::Optimal => {
                    if !pricing_aborted {
                        if let Some(obj) = self.relax.obj() {
                            node.update_lower(obj);
                            if node.can_prune(self.solutions.cutoff_bound()) {
                                return Ok(NodeOutcome::Cutoff);
                            }
                        }
                    }

                    if self.propagation_rounds(depth, PropTiming::DURING_RELAX)?
                        == PropResult::Cutoff
                    {
                        return Ok(NodeOutcome::Infeasible);
                    }
                    self.relax.sync_bounds(&self.domains);
                    if !self.relax.is_flushed() {
                        continue;
                    }

                    let x = self.relax.solution().map(|s| s.x.clone());
                    self.run_heuristics(HeurTiming::DuringRelax, x.as_deref())?;
                    if node.can_prune(self.solutions.cutoff_bound()) {
                        return Ok(NodeOutcome::Cutoff);
                    }

                    if sepa_rounds < self.settings.sepa_max_rounds {
                        if let Some(sol) = self.relax.solution() {
                            let obj = sol.obj;
                            let nfrac = self.problem.fractional_vars(&sol.x, tol).len();
                            let improved = obj
                                > last_sepa_obj
                                    + self.settings.sepa_stall_obj_tol * (1.0 + obj.abs());
                            if last_sepa_obj.is_finite() && !improved && nfrac >= last_nfrac {
                                sepa_stalls += 1;
                            } else {
                                sepa_stalls = 0;
                            }
                            last_sepa_obj = obj;
                            last_nfrac = nfrac;
                        }
                        if sepa_stalls < self.settings.sepa_max_stall_rounds {
                            sepa_rounds += 1;
                            match self.separation_round(node)? {
                                SepaRound::Cutoff => return Ok(NodeOutcome::Infeasible),
                                SepaRound::Progress => {
                                    do_propagate = true;
                                    continue;
                                }
                                SepaRound::NoCuts => {}
                            }
                        }
                    }
                }
                // iteration/time limit or a backend failure: no usable
                // relaxation information, fall through to pseudo handling
                _ => {}
            }

            if self.propagation_rounds(depth, PropTiming::AFTER_RELAX)? == PropResult::Cutoff {
                return Ok(NodeOutcome::Infeasible);
            }
            self.relax.sync_bounds(&self.domains);
            if !self.relax.is_flushed() {
                continue;
            }

            // enforcement: use the relaxation solution when one exists for
            // the current subproblem, the pseudo solution otherwise
            let usable_relax =
                self.relax.status() == RelaxStatus::Optimal && self.relax.solution().is_some();
            let (sol, pseudo) = if usable_relax {
                (self.relax.solution().map(|s| s.x.clone()).unwrap_or_default(), false)
            } else {
                (self.domains.pseudo_solution(&self.problem).0, true)
            };

            match self.enforce_round(&sol, pseudo, tol)? {
                EnforceOutcome::Cutoff => {
                    self.sepastore.clear();
                    return Ok(NodeOutcome::Infeasible);
                }
                EnforceOutcome::AllFeasible => {
                    // with columns still missing, an accepted point could
                    // discard part of the subtree; resume pricing with a
                    // fresh round budget instead
                    if pricing_aborted {
                        continue;
                    }
                    return Ok(NodeOutcome::Feasible(sol));
                }
                EnforceOutcome::ConsAdded(rows) => {
                    for row in rows {
                        self.stage_row(&row);
                        self.problem.add_row(row);
                    }
                    do_propagate = true;
                    continue;
                }
                EnforceOutcome::Reduced => {
                    do_propagate = true;
                    continue;
                }
                EnforceOutcome::Separated => {
                    let applied = self
                        .sepastore
                        .apply(&mut self.relax, self.settings.sepa_cuts_per_round.max(1));
                    for cut in applied {
                        if cut.global {
                            self.cutpool.add(cut);
                        }
                    }
                    for cut in self.sepastore.take_deferred() {
                        if cut.global {
                            self.delayed_cutpool.add(cut);
                        }
                    }
                    continue;
                }
                EnforceOutcome::Branched(d) => return Ok(NodeOutcome::Branched(d)),
                EnforceOutcome::SolveRelax => {
                    self.relax.invalidate();
                    continue;
                }
                EnforceOutcome::MustBranch => {}
            }

            match self.branch_step(&sol, pseudo, tol)? {
                BranchStep::Branched(d) => return Ok(NodeOutcome::Branched(d)),
                BranchStep::Cutoff => return Ok(NodeOutcome::Infeasible),
                BranchStep::Progress => {
                    do_propagate = true;
                }
                BranchStep::NoneFound => {
                    // before declaring the node stuck, force a relaxation
                    // solve with the cutoff bound disabled
                    if forced_fallbacks < 2 {
                        forced_fallbacks += 1;
                        force_no_cutoff = true;
                        self.relax.invalidate();
                        continue;
                    }
                    return Err(SolveError::Internal {
                        detail: format!("no progress possible at node {}", node.id),
                        nodes: self.stats.n_total_nodes,
                        relax_solves: self.stats.n_relax_solves,
                    });
                }
            }
        }

        Err(SolveError::Internal {
            detail: format!("node pass limit exceeded at node {}", node.id),
            nodes: self.stats.n_total_nodes,
            relax_solves: self.stats.n_relax_solves,
        })
    }

    /// Run domain propagation to a fixed point at the given timing.
    ///
    /// Three tiers per round: non-negative-priority propagators, the
    /// constraint handlers together with learned conflicts, then
    /// negative-priority propagators. Delayed propagators only run once a
    /// round makes no more progress.
    pub(crate) fn propagation_rounds(
        &mut self,
        depth: usize,
        timing: PropTiming,
    ) -> SolveResult<PropResult> {
        let tol = self.settings.int_feas_tol;
        let mut any_reduced = false;
        let mut run_delayed = false;

        for _round in 0..self.settings.max_prop_rounds {
            if self.stop_requested() {
                break;
            }
            self.stats.n_prop_rounds += 1;
            let mut round = PropRound { progress: false, delayed_skipped: false };

            if run_propagators(
                &mut self.plugins.propagators,
                false,
                run_delayed,
                &self.problem,
                &mut self.domains,
                depth,
                timing,
                tol,
                &mut self.stats,
                &mut round,
            )? {
                return Ok(PropResult::Cutoff);
            }

            if run_conshdlr_propagation(
                &mut self.plugins.conshdlrs,
                &self.problem,
                &mut self.domains,
                depth,
                timing,
                tol,
                &mut self.stats,
                &mut round,
            )? {
                return Ok(PropResult::Cutoff);
            }

            let mut ctx = PropCtx {
                problem: &self.problem,
                domains: &mut self.domains,
                depth,
                timing,
                tol,
                n_reductions: 0,
            };
            let res = self.conflicts.propagate(&mut ctx);
            self.stats.n_reductions += ctx.n_reductions as u64;
            match res {
                PropResult::Cutoff => return Ok(PropResult::Cutoff),
                PropResult::ReducedDomain => round.progress = true,
                _ => {}
            }

            if run_propagators(
                &mut self.plugins.propagators,
                true,
                run_delayed,
                &self.problem,
                &mut self.domains,
                depth,
                timing,
                tol,
                &mut self.stats,
                &mut round,
            )? {
                return Ok(PropResult::Cutoff);
            }

            if round.progress {
                any_reduced = true;
                run_delayed = false;
                continue;
            }
            if round.delayed_skipped && !run_delayed {
                run_delayed = true;
                continue;
            }
            break;
        }

        Ok(if any_reduced { PropResult::ReducedDomain } else { PropResult::DidNotRun })
    }

    /// Solve the relaxation, retrying numerical failures within the node
    /// retry budget and the system-wide error budget.
    ///
    /// Spending the node retry budget degrades to `RelaxStatus::Error` so
    /// the node can fall back to pseudo-solution handling. A failure on a
    /// forced solve (the cutoff bound was already disabled after an
    /// earlier failure or bound rejection), or exhausting the system-wide
    /// budget, is fatal.
    pub(crate) fn try_solve_relax(
        &mut self,
        honor_cutoff: bool,
        forced: bool,
    ) -> SolveResult<RelaxStatus> {
        let cutoff = self.solutions.cutoff_bound();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let failure =
                match self.relax.solve(self.settings.relax_iter_limit, honor_cutoff, cutoff) {
                    Ok(RelaxStatus::Error) => "numerical failure".to_string(),
                    Ok(status) => {
                        self.stats.n_relax_solves += 1;
                        return Ok(status);
                    }
                    Err(e) => e.to_string(),
                };

            self.stats.n_relax_errors += 1;
            if forced || self.stats.n_relax_errors > self.settings.max_total_relax_errors {
                return Err(SolveError::RelaxationError { attempts, detail: failure });
            }
            if attempts > self.settings.max_relax_errors {
                return Ok(RelaxStatus::Error);
            }
            log::warn!("relaxation solve failed (attempt {attempts}): {failure}");
            self.relax.invalidate();
        }
    }

    /// One enforcement round over the constraint handlers, in descending
    /// priority order. The first handler that resolves the solution
    /// non-trivially ends the round.
    fn enforce_round(&mut self, sol: &[f64], pseudo: bool, tol: f64) -> SolveResult<EnforceOutcome> {
        self.sepastore.set_force(true);
        let mut must_branch = false;
        let mut outcome = None;

        for h in &mut self.plugins.conshdlrs {
            let mut ctx = EnforceCtx {
                problem: &self.problem,
                sol,
                pseudo,
                domains: &mut self.domains,
                store: &mut self.sepastore,
                candidates: &mut self.candidates,
                added_rows: Vec::new(),
                decision: None,
                tol,
            };
            let res = h.enforce(&mut ctx)?;
            let rows = std::mem::take(&mut ctx.added_rows);
            let decision = ctx.decision.take();

            match res {
                EnforceResult::Feasible | EnforceResult::DidNotRun => {}
                EnforceResult::Infeasible => must_branch = true,
                EnforceResult::Cutoff => return Ok(EnforceOutcome::Cutoff),
                EnforceResult::ConsAdded => {
                    outcome = Some(EnforceOutcome::ConsAdded(rows));
                    break;
                }
                EnforceResult::ReducedDomain => {
                    outcome = Some(EnforceOutcome::Reduced);
                    break;
                }
                EnforceResult::Separated => {
                    outcome = Some(EnforceOutcome::Separated);
                    break;
                }
                EnforceResult::Branched => {
                    let d = decision.ok_or_else(|| SolveError::PluginContract {
                        plugin: h.name().to_string(),
                        detail: "Branched result without a decision".into(),
                    })?;
                    outcome = Some(EnforceOutcome::Branched(d));
                    break;
                }
                EnforceResult::SolveRelaxation => {
                    if !pseudo {
                        return Err(SolveError::PluginContract {
                            plugin: h.name().to_string(),
                            detail: "SolveRelaxation outside pseudo enforcement".into(),
                        });
                    }
                    outcome = Some(EnforceOutcome::SolveRelax);
                    break;
                }
            }
        }

        self.sepastore.set_force(false);
        Ok(outcome.unwrap_or(if must_branch {
            EnforceOutcome::MustBranch
        } else {
            EnforceOutcome::AllFeasible
        }))
    }

    /// Pick a branching decision: LP-fractional candidates if still valid
    /// for the current solve, then externally registered candidates, then
    /// the unfixed integral variables of the pseudo solution.
    fn branch_step(&mut self, sol: &[f64], pseudo: bool, tol: f64) -> SolveResult<BranchStep> {
        let count = self.relax.solve_count();
        let pseudo_cands: Vec<Candidate>;
        let cands: &[Candidate] = if !pseudo {
            if self.candidates.lp(count).is_none() {
                self.candidates.compute_lp(&self.problem, sol, tol, count);
            }
            self.candidates.lp(count).unwrap_or(&[])
        } else if !self.candidates.external().is_empty() {
            self.candidates.external()
        } else {
            pseudo_cands = self
                .problem
                .integer_vars()
                .iter()
                .filter(|&&i| !self.domains.is_fixed(i))
                .map(|&i| Candidate { var: i, value: sol[i], frac: 0.0 })
                .collect();
            pseudo_cands.as_slice()
        };
        if cands.is_empty() {
            return Ok(BranchStep::NoneFound);
        }

        for rule in &mut self.plugins.branchrules {
            let mut ctx = BranchCtx {
                problem: &self.problem,
                candidates: cands,
                domains: &self.domains,
                pseudocosts: &self.pseudocosts,
                tol,
                decision: None,
            };
            let res = rule.execute(&mut ctx)?;
            let decision = ctx.decision.take();

            match res {
                BranchResult::DidNotRun | BranchResult::DidNotFind => continue,
                BranchResult::Cutoff => return Ok(BranchStep::Cutoff),
                BranchResult::ConsAdded
                | BranchResult::ReducedDomain
                | BranchResult::Separated => return Ok(BranchStep::Progress),
                BranchResult::Branched => {
                    let d = decision.ok_or_else(|| SolveError::PluginContract {
                        plugin: rule.name().to_string(),
                        detail: "Branched result without a decision".into(),
                    })?;
                    return Ok(BranchStep::Branched(d));
                }
            }
        }
        Ok(BranchStep::NoneFound)
    }

    /// Stage a problem row into the relaxation as one or two <=-form cuts.
    pub(super) fn stage_row(&mut self, row: &LinRow) {
        let n = self.problem.num_vars();
        if row.rhs.is_finite() {
            let mut coefs = vec![0.0; n];
            for &(j, a) in &row.coefs {
                coefs[j] = a;
            }
            self.relax.stage_cut(Cut::new(coefs, row.rhs).with_name(row.name.clone()));
        }
        if row.lhs.is_finite() {
            let mut coefs = vec![0.0; n];
            for &(j, a) in &row.coefs {
                coefs[j] = -a;
            }
            self.relax
                .stage_cut(Cut::new(coefs, -row.lhs).with_name(format!("{}_lhs", row.name)));
        }
    }
}
