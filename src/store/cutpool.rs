//! Cut pools: persistent storage of globally valid cuts.
//!
//! Pool cuts are separated cheaply against the current relaxation point
//! before any full separator runs. Cuts that stay slack for too many
//! rounds are evicted.

use fxhash::FxHashMap;

use crate::relax::Cut;

/// A cut with pool metadata.
#[derive(Debug, Clone)]
pub struct PooledCut {
    /// The underlying cut.
    pub cut: Cut,

    /// Unique ID in the pool.
    pub id: usize,

    /// Rounds in which this cut was found violated.
    pub n_violated: u32,

    /// Consecutive separation rounds without a violation.
    pub age: u32,
}

/// A pool of globally valid cuts.
pub struct CutPool {
    /// All live cuts.
    cuts: Vec<PooledCut>,

    /// Coarse duplicate index: quantized normalized-coefficient hash to
    /// candidate positions. Collisions fall back to a parallel check.
    index: FxHashMap<u64, Vec<usize>>,

    /// Next cut ID.
    next_id: usize,

    /// Evict cuts not violated for this many consecutive rounds.
    max_age: u32,

    /// Total cuts ever added.
    n_added: u64,

    /// Total cuts evicted.
    n_evicted: u64,
}

fn coef_hash(cut: &Cut) -> u64 {
    // Hash the sign pattern and quantized normalized coefficients so
    // scaled duplicates land in the same bucket.
    let norm = cut.norm();
    if norm < 1e-12 {
        return 0;
    }
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &c in &cut.coefs {
        let q = ((c / norm) * 1e6).round() as i64;
        h = (h ^ q as u64).wrapping_mul(0x100_0000_01b3);
    }
    h
}

impl CutPool {
    /// Create an empty pool.
    pub fn new(max_age: u32) -> Self {
        Self {
            cuts: Vec::new(),
            index: FxHashMap::default(),
            next_id: 0,
            max_age,
            n_added: 0,
            n_evicted: 0,
        }
    }

    /// Number of live cuts.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Total cuts ever added.
    pub fn num_added(&self) -> u64 {
        self.n_added
    }

    /// Total cuts evicted by aging.
    pub fn num_evicted(&self) -> u64 {
        self.n_evicted
    }

    /// Add a globally valid cut.
    ///
    /// Returns the cut's pool ID and whether it was a duplicate of an
    /// existing pool cut.
    pub fn add(&mut self, cut: Cut) -> (usize, bool) {
        let h = coef_hash(&cut);
        if let Some(bucket) = self.index.get(&h) {
            for &pos in bucket {
                if self.cuts[pos].cut.is_parallel_to(&cut) {
                    return (self.cuts[pos].id, true);
                }
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let pos = self.cuts.len();
        self.cuts.push(PooledCut { cut, id, n_violated: 0, age: 0 });
        self.index.entry(h).or_default().push(pos);
        self.n_added += 1;
        (id, false)
    }

    /// Separate the pool against a relaxation point.
    ///
    /// Returns up to `max_cuts` violated cuts, ages the rest, and evicts
    /// cuts that have been slack for longer than the age limit.
    pub fn separate(&mut self, point: &[f64], tol: f64, max_cuts: usize) -> Vec<Cut> {
        let mut found = Vec::new();
        for pooled in &mut self.cuts {
            let violated = pooled.cut.coefs.len() <= point.len()
                && pooled.cut.violation(point) > tol;
            if violated {
                pooled.n_violated += 1;
                pooled.age = 0;
                if found.len() < max_cuts {
                    found.push(pooled.cut.clone());
                }
            } else {
                pooled.age += 1;
            }
        }

        let before = self.cuts.len();
        let max_age = self.max_age;
        self.cuts.retain(|p| p.age <= max_age);
        if self.cuts.len() != before {
            self.n_evicted += (before - self.cuts.len()) as u64;
            self.rebuild_index();
        }

        found
    }

    /// Drop all cuts.
    pub fn clear(&mut self) {
        self.cuts.clear();
        self.index.clear();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, pooled) in self.cuts.iter().enumerate() {
            self.index.entry(coef_hash(&pooled.cut)).or_default().push(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_duplicate() {
        let mut pool = CutPool::new(10);

        let (id1, dup1) = pool.add(Cut::new(vec![1.0, 2.0], 3.0));
        let (id2, dup2) = pool.add(Cut::new(vec![4.0, 5.0], 6.0));
        // Scaled copy of the first cut.
        let (id3, dup3) = pool.add(Cut::new(vec![2.0, 4.0], 6.0));

        assert!(!dup1 && !dup2);
        assert!(dup3);
        assert_ne!(id1, id2);
        assert_eq!(id1, id3);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_separate_returns_violated() {
        let mut pool = CutPool::new(10);
        pool.add(Cut::new(vec![1.0, 1.0], 1.0));
        pool.add(Cut::new(vec![1.0, 0.0], 5.0));

        // Point violates the first cut only.
        let found = pool.separate(&[1.0, 1.0], 1e-7, 10);
        assert_eq!(found.len(), 1);
        assert!((found[0].rhs - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_aging_evicts_slack_cuts() {
        let mut pool = CutPool::new(2);
        pool.add(Cut::new(vec![1.0], 10.0));

        // Never violated: evicted after max_age rounds.
        pool.separate(&[0.0], 1e-7, 10);
        pool.separate(&[0.0], 1e-7, 10);
        assert_eq!(pool.len(), 1);
        pool.separate(&[0.0], 1e-7, 10);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_violated_cut_survives_aging() {
        let mut pool = CutPool::new(1);
        pool.add(Cut::new(vec![1.0], 0.5));

        for _ in 0..5 {
            let found = pool.separate(&[1.0], 1e-7, 10);
            assert_eq!(found.len(), 1);
        }
        assert_eq!(pool.len(), 1);
    }
}
