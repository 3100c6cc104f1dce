//! Separation store: buffers cuts generated within a round.

use crate::relax::{Cut, Relaxation};

/// A buffered cut with its score.
#[derive(Debug, Clone)]
struct StoredCut {
    cut: Cut,
    efficacy: f64,
    forced: bool,
}

/// Buffer for cuts generated during a separation or enforcement round.
///
/// Cuts are only applied to the relaxation after the full round; a cutoff
/// detected mid-round clears the buffer instead. In force mode (used
/// during enforcement) cuts bypass the efficacy threshold, because
/// enforcement correctness depends on them entering the relaxation.
#[derive(Default)]
pub struct SepaStore {
    /// Buffered cuts.
    cuts: Vec<StoredCut>,

    /// Whether newly added cuts are forced.
    force: bool,

    /// Cuts rejected as inefficacious or duplicate.
    n_filtered: u64,

    /// Cuts that missed the last round's selection cap.
    deferred: Vec<Cut>,

    /// Cuts applied to the relaxation over the whole solve.
    n_applied: u64,
}

impl SepaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable force mode.
    pub fn set_force(&mut self, force: bool) {
        self.force = force;
    }

    /// Number of buffered cuts.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Cuts applied to the relaxation so far.
    pub fn num_applied(&self) -> u64 {
        self.n_applied
    }

    /// Cuts rejected as inefficacious or duplicate so far.
    pub fn num_filtered(&self) -> u64 {
        self.n_filtered
    }

    /// Add a cut evaluated at the current relaxation point.
    ///
    /// Returns true if the cut entered the buffer.
    pub fn add_cut(&mut self, cut: Cut, point: &[f64], min_efficacy: f64) -> bool {
        if !cut.is_valid() {
            self.n_filtered += 1;
            return false;
        }
        let efficacy = cut.efficacy(point);
        if !self.force && efficacy < min_efficacy {
            self.n_filtered += 1;
            return false;
        }
        // Drop duplicates already in the buffer; a forced duplicate
        // upgrades the buffered copy instead.
        if let Some(existing) = self.cuts.iter_mut().find(|s| s.cut.is_parallel_to(&cut)) {
            existing.forced |= self.force;
            self.n_filtered += 1;
            return false;
        }
        self.cuts.push(StoredCut { cut, efficacy, forced: self.force });
        true
    }

    /// Apply the best buffered cuts to the relaxation and clear the buffer.
    ///
    /// Forced cuts always enter; the rest enter in descending efficacy
    /// order up to `max_cuts`. Returns the applied cuts (the caller copies
    /// globally valid ones into the cut pool).
    pub fn apply(&mut self, relax: &mut Relaxation, max_cuts: usize) -> Vec<Cut> {
        self.cuts.sort_by(|a, b| {
            b.forced
                .cmp(&a.forced)
                .then(b.efficacy.partial_cmp(&a.efficacy).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut applied = Vec::new();
        for stored in self.cuts.drain(..) {
            if !stored.forced && applied.len() >= max_cuts {
                self.deferred.push(stored.cut);
                continue;
            }
            relax.stage_cut(stored.cut.clone());
            applied.push(stored.cut);
        }
        self.n_applied += applied.len() as u64;
        self.force = false;
        applied
    }

    /// Take the cuts that missed the last round's selection cap.
    pub fn take_deferred(&mut self) -> Vec<Cut> {
        std::mem::take(&mut self.deferred)
    }

    /// Discard all buffered cuts (node was cut off mid-round).
    pub fn clear(&mut self) {
        self.cuts.clear();
        self.deferred.clear();
        self.force = false;
    }
}
