//! Problem representation.
//!
//! The loop only needs variables (bounds, objective coefficients,
//! integrality) and linear rows; how the relaxation represents them
//! internally is the backend's business.

use crate::error::{SolveError, SolveResult};

/// Kind of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Continuous variable.
    Continuous,

    /// General integer variable.
    Integer,

    /// Binary (0/1) variable.
    Binary,
}

impl VarKind {
    /// Whether the variable is restricted to integral values.
    pub fn is_integral(self) -> bool {
        !matches!(self, VarKind::Continuous)
    }
}

/// A decision variable.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Variable name (for logging and diagnostics).
    pub name: String,

    /// Objective coefficient (minimization).
    pub obj: f64,

    /// Global lower bound.
    pub lb: f64,

    /// Global upper bound.
    pub ub: f64,

    /// Variable kind.
    pub kind: VarKind,
}

impl Variable {
    /// Create a continuous variable.
    pub fn continuous(name: impl Into<String>, obj: f64, lb: f64, ub: f64) -> Self {
        Self { name: name.into(), obj, lb, ub, kind: VarKind::Continuous }
    }

    /// Create a general integer variable.
    pub fn integer(name: impl Into<String>, obj: f64, lb: f64, ub: f64) -> Self {
        Self { name: name.into(), obj, lb, ub, kind: VarKind::Integer }
    }

    /// Create a binary variable.
    pub fn binary(name: impl Into<String>, obj: f64) -> Self {
        Self { name: name.into(), obj, lb: 0.0, ub: 1.0, kind: VarKind::Binary }
    }
}

/// A linear row: lhs <= a^T x <= rhs (either side may be infinite).
#[derive(Debug, Clone)]
pub struct LinRow {
    /// Row name.
    pub name: String,

    /// Sparse coefficients as (variable index, value) pairs.
    pub coefs: Vec<(usize, f64)>,

    /// Left-hand side (-inf for a pure <= row).
    pub lhs: f64,

    /// Right-hand side (+inf for a pure >= row).
    pub rhs: f64,
}

impl LinRow {
    /// Create a `a^T x <= rhs` row.
    pub fn le(name: impl Into<String>, coefs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self { name: name.into(), coefs, lhs: f64::NEG_INFINITY, rhs }
    }

    /// Create a `a^T x >= lhs` row.
    pub fn ge(name: impl Into<String>, coefs: Vec<(usize, f64)>, lhs: f64) -> Self {
        Self { name: name.into(), coefs, lhs, rhs: f64::INFINITY }
    }

    /// Create an equality row.
    pub fn eq(name: impl Into<String>, coefs: Vec<(usize, f64)>, val: f64) -> Self {
        Self { name: name.into(), coefs, lhs: val, rhs: val }
    }

    /// Row activity at a point.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coefs.iter().map(|&(j, a)| a * x[j]).sum()
    }

    /// Whether the row is satisfied at a point within tolerance.
    pub fn is_satisfied(&self, x: &[f64], tol: f64) -> bool {
        let act = self.activity(x);
        act >= self.lhs - tol && act <= self.rhs + tol
    }
}

/// The problem being solved: variables plus linear rows, minimization.
///
/// Variables can be appended during the solve (column generation); rows
/// can be appended by constraint handlers. Indices are stable.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    /// All variables, indexed by position.
    pub vars: Vec<Variable>,

    /// All linear rows.
    pub rows: Vec<LinRow>,

    /// Indices of integral (integer + binary) variables.
    integer_vars: Vec<usize>,
}

impl Problem {
    /// Create a problem from variables and rows.
    pub fn new(vars: Vec<Variable>, rows: Vec<LinRow>) -> SolveResult<Self> {
        let n = vars.len();
        for row in &rows {
            for &(j, _) in &row.coefs {
                if j >= n {
                    return Err(SolveError::InvalidProblem(format!(
                        "row '{}' references variable {} but only {} exist",
                        row.name, j, n
                    )));
                }
            }
        }
        for (i, v) in vars.iter().enumerate() {
            if v.lb > v.ub {
                return Err(SolveError::InvalidProblem(format!(
                    "variable {} has empty domain [{}, {}]",
                    i, v.lb, v.ub
                )));
            }
        }

        let integer_vars = vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind.is_integral())
            .map(|(i, _)| i)
            .collect();

        Ok(Self { vars, rows, integer_vars })
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Number of linear rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Indices of integral variables.
    pub fn integer_vars(&self) -> &[usize] {
        &self.integer_vars
    }

    /// Number of integral variables.
    pub fn num_integers(&self) -> usize {
        self.integer_vars.len()
    }

    /// Append a variable (column generation). Returns its index.
    pub fn add_variable(&mut self, var: Variable) -> usize {
        let idx = self.vars.len();
        if var.kind.is_integral() {
            self.integer_vars.push(idx);
        }
        self.vars.push(var);
        idx
    }

    /// Append a linear row. Returns its index.
    pub fn add_row(&mut self, row: LinRow) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Objective value of an assignment.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.vars.iter().zip(x).map(|(v, &xi)| v.obj * xi).sum()
    }

    /// Fractionality of a value (distance to the nearest integer).
    pub fn fractionality(val: f64) -> f64 {
        (val - val.round()).abs()
    }

    /// Check integral feasibility of an assignment within tolerance.
    pub fn is_integer_feasible(&self, x: &[f64], tol: f64) -> bool {
        self.integer_vars.iter().all(|&i| Self::fractionality(x[i]) <= tol)
    }

    /// Fractional integral variables at a point.
    ///
    /// Returns (var index, value, fractionality) per fractional variable.
    pub fn fractional_vars(&self, x: &[f64], tol: f64) -> Vec<(usize, f64, f64)> {
        self.integer_vars
            .iter()
            .filter_map(|&i| {
                let frac = Self::fractionality(x[i]);
                (frac > tol).then_some((i, x[i], frac))
            })
            .collect()
    }

    /// Full feasibility check: global bounds, integrality, and all rows.
    pub fn check_solution(&self, x: &[f64], tol: f64) -> bool {
        if x.len() != self.num_vars() {
            return false;
        }
        let bounds_ok = self
            .vars
            .iter()
            .zip(x)
            .all(|(v, &xi)| xi >= v.lb - tol && xi <= v.ub + tol);
        bounds_ok
            && self.is_integer_feasible(x, tol)
            && self.rows.iter().all(|r| r.is_satisfied(x, tol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knapsack() -> Problem {
        // min -x0 - 2 x1  s.t.  x0 + x1 <= 1,  x0/x1 binary
        Problem::new(
            vec![Variable::binary("x0", -1.0), Variable::binary("x1", -2.0)],
            vec![LinRow::le("cap", vec![(0, 1.0), (1, 1.0)], 1.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_problem_creation() {
        let prob = knapsack();
        assert_eq!(prob.num_vars(), 2);
        assert_eq!(prob.num_integers(), 2);
        assert_eq!(prob.integer_vars(), &[0, 1]);
    }

    #[test]
    fn test_invalid_row_reference() {
        let res = Problem::new(
            vec![Variable::binary("x0", 1.0)],
            vec![LinRow::le("bad", vec![(3, 1.0)], 1.0)],
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_fractional_vars() {
        let prob = knapsack();
        let frac = prob.fractional_vars(&[0.5, 1.0], 1e-6);
        assert_eq!(frac.len(), 1);
        assert_eq!(frac[0].0, 0);
        assert!((frac[0].2 - 0.5).abs() < 1e-12);

        assert!(prob.is_integer_feasible(&[1.0, 0.0], 1e-6));
        assert!(!prob.is_integer_feasible(&[0.5, 0.0], 1e-6));
    }

    #[test]
    fn test_check_solution() {
        let prob = knapsack();
        assert!(prob.check_solution(&[1.0, 0.0], 1e-6));
        assert!(prob.check_solution(&[0.0, 1.0], 1e-6));
        // Violates the capacity row.
        assert!(!prob.check_solution(&[1.0, 1.0], 1e-6));
        // Fractional.
        assert!(!prob.check_solution(&[0.5, 0.0], 1e-6));
    }

    #[test]
    fn test_add_variable_tracks_integrality() {
        let mut prob = knapsack();
        let idx = prob.add_variable(Variable::integer("y", 1.0, 0.0, 5.0));
        assert_eq!(idx, 2);
        assert_eq!(prob.num_integers(), 3);
        let idx2 = prob.add_variable(Variable::continuous("z", 1.0, 0.0, 1.0));
        assert_eq!(idx2, 3);
        assert_eq!(prob.num_integers(), 3);
    }
}
