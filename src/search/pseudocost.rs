//! Pseudocost and branching-history statistics.
//!
//! Per-variable accumulators of (objective gain, branched fraction) pairs
//! from past branching decisions, plus cutoff counters attributed to the
//! branching that created an infeasible node. Counts only ever grow.

use crate::model::BoundDir;

/// Per-variable branching history.
#[derive(Debug, Clone, Default)]
struct VarHistory {
    /// Sum of per-unit objective gains, down direction.
    down_sum: f64,

    /// Observations in the down direction.
    down_count: u64,

    /// Sum of per-unit objective gains, up direction.
    up_sum: f64,

    /// Observations in the up direction.
    up_count: u64,

    /// Cutoffs attributed to down branches of this variable.
    down_cutoffs: u64,

    /// Cutoffs attributed to up branches of this variable.
    up_cutoffs: u64,
}

/// Pseudocost store for all variables.
#[derive(Debug, Clone, Default)]
pub struct PseudocostStore {
    history: Vec<VarHistory>,
}

impl PseudocostStore {
    /// Create a store for `num_vars` variables.
    pub fn new(num_vars: usize) -> Self {
        Self { history: vec![VarHistory::default(); num_vars] }
    }

    /// Make room for priced-in variables.
    pub fn ensure_len(&mut self, num_vars: usize) {
        if self.history.len() < num_vars {
            self.history.resize(num_vars, VarHistory::default());
        }
    }

    /// Record an observed objective gain after branching.
    ///
    /// `frac` is the branched fraction in the given direction (distance
    /// the bound moved the value); `gain` is the child objective minus the
    /// parent objective.
    pub fn update(&mut self, var: usize, dir: BoundDir, frac: f64, gain: f64) {
        if frac <= 1e-6 || !gain.is_finite() {
            return;
        }
        let h = &mut self.history[var];
        let per_unit = (gain / frac).max(0.0);
        match dir {
            BoundDir::Upper => {
                h.down_sum += per_unit;
                h.down_count += 1;
            }
            BoundDir::Lower => {
                h.up_sum += per_unit;
                h.up_count += 1;
            }
        }
    }

    /// Attribute an infeasible node to the branching that created it.
    pub fn record_cutoff(&mut self, var: usize, dir: BoundDir) {
        let h = &mut self.history[var];
        match dir {
            BoundDir::Upper => h.down_cutoffs += 1,
            BoundDir::Lower => h.up_cutoffs += 1,
        }
    }

    /// Average per-unit gain for a direction (1.0 when unobserved).
    fn avg(&self, var: usize, dir: BoundDir) -> f64 {
        let h = &self.history[var];
        let (sum, count) = match dir {
            BoundDir::Upper => (h.down_sum, h.down_count),
            BoundDir::Lower => (h.up_sum, h.up_count),
        };
        if count == 0 {
            1.0
        } else {
            sum / count as f64
        }
    }

    /// Product score of branching on a variable at a fractional value.
    ///
    /// Balances the estimated gains of the two children; this is the
    /// classic product rule.
    pub fn score(&self, var: usize, value: f64) -> f64 {
        let down_frac = value - value.floor();
        let up_frac = 1.0 - down_frac;
        let down = down_frac * self.avg(var, BoundDir::Upper);
        let up = up_frac * self.avg(var, BoundDir::Lower);
        (down * up).max(1e-10)
    }

    /// Estimated objective degradation of one child.
    pub fn estimate_delta(&self, var: usize, dir: BoundDir, frac: f64) -> f64 {
        frac * self.avg(var, dir)
    }

    /// Total recorded observations for a variable.
    pub fn num_observations(&self, var: usize) -> u64 {
        let h = &self.history[var];
        h.down_count + h.up_count
    }

    /// Total cutoffs attributed to a variable.
    pub fn num_cutoffs(&self, var: usize) -> u64 {
        let h = &self.history[var];
        h.down_cutoffs + h.up_cutoffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_score() {
        let mut pc = PseudocostStore::new(2);

        // Down branch (upper bound moved) on var 0 gained 2.0 over 0.5.
        pc.update(0, BoundDir::Upper, 0.5, 2.0);
        assert_eq!(pc.num_observations(0), 1);

        // Var 0 should now outscore the unobserved var 1 at value 0.5.
        assert!(pc.score(0, 0.5) > pc.score(1, 0.5));
    }

    #[test]
    fn test_counts_only_grow() {
        let mut pc = PseudocostStore::new(1);
        pc.update(0, BoundDir::Lower, 0.3, 1.0);
        pc.update(0, BoundDir::Lower, 0.3, -5.0); // negative gain clamps, still counts
        assert_eq!(pc.num_observations(0), 2);
    }

    #[test]
    fn test_cutoff_attribution() {
        let mut pc = PseudocostStore::new(1);
        pc.record_cutoff(0, BoundDir::Upper);
        pc.record_cutoff(0, BoundDir::Lower);
        assert_eq!(pc.num_cutoffs(0), 2);
    }

    #[test]
    fn test_estimate_delta() {
        let mut pc = PseudocostStore::new(1);
        pc.update(0, BoundDir::Upper, 1.0, 4.0);
        let delta = pc.estimate_delta(0, BoundDir::Upper, 0.5);
        assert!((delta - 2.0).abs() < 1e-12);
    }
}
