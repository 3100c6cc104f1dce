//! Pricing store: buffers priced-in columns before they enter the
//! relaxation.

use crate::model::Variable;

/// A column produced by a pricer.
#[derive(Debug, Clone)]
pub struct PricedColumn {
    /// The new variable.
    pub var: Variable,

    /// Constraint coefficients as (row index, value) pairs.
    pub coefs: Vec<(usize, f64)>,

    /// Reduced cost reported by the pricer (negative = improving).
    pub reduced_cost: f64,
}

/// Buffer of priced columns awaiting a flush into the relaxation.
#[derive(Default)]
pub struct PriceStore {
    /// Buffered columns.
    cols: Vec<PricedColumn>,

    /// Columns flushed over the whole solve.
    n_flushed: u64,
}

impl PriceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered columns.
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Columns flushed over the whole solve.
    pub fn num_flushed(&self) -> u64 {
        self.n_flushed
    }

    /// Buffer a column. Columns with non-negative reduced cost are kept
    /// too; the pricer decides what is worth proposing.
    pub fn add_column(&mut self, col: PricedColumn) {
        self.cols.push(col);
    }

    /// Take the best `max_cols` columns (most negative reduced cost first)
    /// and clear the buffer.
    pub fn take_best(&mut self, max_cols: usize) -> Vec<PricedColumn> {
        self.cols.sort_by(|a, b| {
            a.reduced_cost
                .partial_cmp(&b.reduced_cost)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let kept: Vec<PricedColumn> = self.cols.drain(..).take(max_cols).collect();
        self.n_flushed += kept.len() as u64;
        kept
    }

    /// Discard all buffered columns.
    pub fn clear(&mut self) {
        self.cols.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, rc: f64) -> PricedColumn {
        PricedColumn {
            var: Variable::continuous(name, 1.0, 0.0, f64::INFINITY),
            coefs: vec![(0, 1.0)],
            reduced_cost: rc,
        }
    }

    #[test]
    fn test_take_best_orders_by_reduced_cost() {
        let mut store = PriceStore::new();
        store.add_column(col("a", -0.5));
        store.add_column(col("b", -2.0));
        store.add_column(col("c", -1.0));

        let best = store.take_best(2);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].var.name, "b");
        assert_eq!(best[1].var.name, "c");
        assert!(store.is_empty());
        assert_eq!(store.num_flushed(), 2);
    }
}
