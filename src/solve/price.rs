//! The pricing loop: ask pricers for columns with negative reduced cost
//! and re-solve the relaxation until no more arrive or the round budget
//! runs out.

use crate::error::SolveResult;
use crate::plugins::PriceCtx;
use crate::relax::RelaxStatus;

use super::SolveLoop;

/// What a pricing loop left behind.
pub(crate) struct PriceOutcome {
    /// The round budget ran out before a fixed point was reached. While
    /// this holds, relaxation objectives are not valid dual bounds.
    pub aborted: bool,

    /// Pricing proved the subproblem infeasible.
    pub cutoff: bool,

    /// Best lower bound reported by any pricer, if one reported any.
    pub lower: Option<f64>,

    /// Columns added across all rounds.
    pub n_cols: usize,
}

impl SolveLoop {
    /// Run pricing rounds on an optimally solved relaxation.
    ///
    /// Each round hands the current duals to every pricer, pulls the best
    /// columns out of the price store, extends the problem and the
    /// relaxation, and re-solves. The cutoff bound stays disabled during
    /// these solves: an incomplete column set cannot certify a cutoff.
    pub(crate) fn pricing_loop(&mut self) -> SolveResult<PriceOutcome> {
        let mut out = PriceOutcome { aborted: false, cutoff: false, lower: None, n_cols: 0 };

        for round in 0..self.settings.max_price_rounds {
            if self.stop_requested() {
                // leave the bound unusable; the caller resolves the stop
                out.aborted = true;
                return Ok(out);
            }
            let (duals, lp_obj) = match self.relax.solution() {
                Some(sol) if sol.status == RelaxStatus::Optimal => (sol.duals.clone(), sol.obj),
                _ => return Ok(out),
            };
            self.stats.n_price_rounds += 1;

            for pricer in &mut self.plugins.pricers {
                let mut ctx = PriceCtx {
                    problem: &self.problem,
                    domains: &self.domains,
                    duals: &duals,
                    lp_obj,
                    store: &mut self.pricestore,
                };
                let priced = pricer.execute(&mut ctx)?;
                if let Some(lb) = priced.lower_bound {
                    out.lower = Some(out.lower.map_or(lb, |cur: f64| cur.max(lb)));
                }
            }

            let cols = self.pricestore.take_best(self.settings.max_price_cols);
            if cols.is_empty() {
                // fixed point: the current relaxation prices out
                return Ok(out);
            }

            let round_cols = cols.len();
            for col in cols {
                self.domains.add_variable(col.var.lb, col.var.ub);
                self.relax.stage_column(col.var.clone(), col.coefs.clone());
                let idx = self.problem.add_variable(col.var);
                // the rows must see the new column too, or feasibility
                // checks on the grown problem would reject priced solutions
                for &(row, a) in &col.coefs {
                    if let Some(r) = self.problem.rows.get_mut(row) {
                        r.coefs.push((idx, a));
                    }
                }
            }
            out.n_cols += round_cols;
            self.pseudocosts.ensure_len(self.problem.num_vars());
            self.stats.n_cols_added += round_cols as u64;

            log::debug!(
                "pricing round {}: {} columns in the problem now",
                round + 1,
                self.problem.num_vars()
            );

            let status = self.try_solve_relax(false, false)?;
            match status {
                RelaxStatus::Optimal => {}
                RelaxStatus::Infeasible => {
                    out.cutoff = true;
                    return Ok(out);
                }
                _ => return Ok(out),
            }
        }

        out.aborted = true;
        Ok(out)
    }
}
