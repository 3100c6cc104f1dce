//! One separation round: pool cuts first, then the separator plugins
//! and constraint handler separation callbacks in tier order.

use crate::error::SolveResult;
use crate::model::LinRow;
use crate::plugins::{SepaCtx, SepaResult};
use crate::relax::RelaxStatus;
use crate::search::Node;

use super::SolveLoop;

/// What a separation round produced.
pub(crate) enum SepaRound {
    /// A separator proved the subproblem infeasible.
    Cutoff,

    /// Cuts were applied to the relaxation (or the subproblem changed);
    /// it needs re-solving.
    Progress,

    /// Nothing cut off the current point.
    NoCuts,
}

impl SolveLoop {
    /// Separate cuts for the current relaxation point (or unbounded ray).
    ///
    /// Pool cuts come first since they are free to check; the delayed
    /// pool is only consulted when the main pool comes up empty. Plugin
    /// order is non-negative-priority separators, then the constraint
    /// handlers, then negative-priority separators. Delayed separators,
    /// and plugins that answered `Delayed` this round, only run once a
    /// round would otherwise come up empty.
    pub(crate) fn separation_round(&mut self, node: &Node) -> SolveResult<SepaRound> {
        let point = match self.relax.solution() {
            Some(sol)
                if matches!(sol.status, RelaxStatus::Optimal | RelaxStatus::UnboundedRay) =>
            {
                sol.x.clone()
            }
            _ => return Ok(SepaRound::NoCuts),
        };

        let cutoff = self.solutions.cutoff_bound();
        let global_lower = self.tree.lower_bound().min(node.lower);
        let bound_dist = if cutoff.is_finite() && cutoff > global_lower {
            ((node.lower - global_lower) / (cutoff - global_lower)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if bound_dist > self.settings.sepa_maxbounddist {
            return Ok(SepaRound::NoCuts);
        }

        self.stats.n_sepa_rounds += 1;

        let mut pool_cuts = self.cutpool.separate(
            &point,
            self.settings.pool_violation_tol,
            self.settings.sepa_cuts_per_round,
        );
        if pool_cuts.is_empty() {
            pool_cuts = self.delayed_cutpool.separate(
                &point,
                self.settings.pool_violation_tol,
                self.settings.sepa_cuts_per_round,
            );
        }
        for cut in pool_cuts {
            self.sepastore.add_cut(cut, &point, self.settings.sepa_min_efficacy);
        }

        let mut changed = false;
        let mut new_round = false;
        let mut new_rows: Vec<LinRow> = Vec::new();
        let mut retry_hdlrs: Vec<usize> = Vec::new();
        let mut retry_seps: Vec<usize> = Vec::new();

        for run_delayed in [false, true] {
            if run_delayed && (changed || new_round || !self.sepastore.is_empty()) {
                break;
            }
            if run_delayed && retry_hdlrs.is_empty() && retry_seps.is_empty() {
                let any_static =
                    self.plugins.separators.iter().any(|s| s.delayed());
                if !any_static {
                    break;
                }
            }

            for tier in 0..3u8 {
                if tier == 1 {
                    for i in 0..self.plugins.conshdlrs.len() {
                        if run_delayed && !retry_hdlrs.contains(&i) {
                            continue;
                        }
                        let mut ctx = SepaCtx {
                            problem: &self.problem,
                            point: &point,
                            depth: node.depth,
                            bound_dist,
                            store: &mut self.sepastore,
                            domains: &mut self.domains,
                            added_rows: Vec::new(),
                        };
                        let res = self.plugins.conshdlrs[i].separate(&mut ctx)?;
                        let rows = std::mem::take(&mut ctx.added_rows);
                        match res {
                            SepaResult::Cutoff => {
                                self.sepastore.clear();
                                return Ok(SepaRound::Cutoff);
                            }
                            SepaResult::ConsAdded => {
                                new_rows.extend(rows);
                                changed = true;
                            }
                            SepaResult::ReducedDomain => changed = true,
                            SepaResult::NewRound => new_round = true,
                            SepaResult::Delayed if !run_delayed => retry_hdlrs.push(i),
                            _ => {}
                        }
                    }
                    continue;
                }

                let negative_tier = tier == 2;
                for i in 0..self.plugins.separators.len() {
                    if (self.plugins.separators[i].priority() < 0) != negative_tier {
                        continue;
                    }
                    let static_delayed = self.plugins.separators[i].delayed();
                    if !run_delayed && static_delayed {
                        continue;
                    }
                    if run_delayed && !static_delayed && !retry_seps.contains(&i) {
                        continue;
                    }
                    let mut ctx = SepaCtx {
                        problem: &self.problem,
                        point: &point,
                        depth: node.depth,
                        bound_dist,
                        store: &mut self.sepastore,
                        domains: &mut self.domains,
                        added_rows: Vec::new(),
                    };
                    let res = self.plugins.separators[i].execute(&mut ctx)?;
                    let rows = std::mem::take(&mut ctx.added_rows);
                    match res {
                        SepaResult::Cutoff => {
                            self.sepastore.clear();
                            return Ok(SepaRound::Cutoff);
                        }
                        SepaResult::ConsAdded => {
                            new_rows.extend(rows);
                            changed = true;
                        }
                        SepaResult::ReducedDomain => changed = true,
                        SepaResult::NewRound => new_round = true,
                        SepaResult::Delayed if !run_delayed => retry_seps.push(i),
                        _ => {}
                    }
                }
            }
        }

        for row in new_rows {
            self.stage_row(&row);
            self.problem.add_row(row);
        }

        if self.sepastore.is_empty() {
            return Ok(if changed || new_round { SepaRound::Progress } else { SepaRound::NoCuts });
        }

        let applied = self.sepastore.apply(&mut self.relax, self.settings.sepa_cuts_per_round);
        let n_applied = applied.len();
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
        log::debug!("separation applied {} cuts at depth {}", n_applied, node.depth);
        Ok(SepaRound::Progress)
    }
}
