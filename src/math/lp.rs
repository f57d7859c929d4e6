//! Small linear-program builder on top of `minilp`.
//!
//! All variables are non-negative; free quantities are modeled as the
//! difference of two variables by the caller. Constraint rows are normalized
//! (zero terms dropped, terms sorted) and identical rows are emitted once,
//! because the fitter produces many duplicates (e.g. the constant second
//! derivative of a quadratic at every grid point).

use std::collections::HashSet;

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    AtLeast,
    AtMost,
    Equal,
}

impl Relation {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Relation::AtLeast => lhs >= rhs,
            Relation::AtMost => lhs <= rhs,
            Relation::Equal => lhs == rhs,
        }
    }

    fn op(self) -> ComparisonOp {
        match self {
            Relation::AtLeast => ComparisonOp::Ge,
            Relation::AtMost => ComparisonOp::Le,
            Relation::Equal => ComparisonOp::Eq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LpError {
    #[error("problem is infeasible")]
    Infeasible,
    #[error("solver terminated without an optimal solution: {0}")]
    Solver(String),
    #[error("solver returned a non-finite solution")]
    NonFinite,
}

/// Optimal point of a solved program.
#[derive(Debug, Clone)]
pub struct LpSolution {
    pub objective: f64,
    pub values: Vec<f64>,
}

/// Minimization problem over non-negative variables.
pub struct LinearProgram {
    problem: Problem,
    vars: Vec<Variable>,
    seen: HashSet<(Relation, Vec<(usize, u64)>, u64)>,
    constraints: usize,
    trivially_infeasible: bool,
}

impl std::fmt::Debug for LinearProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearProgram")
            .field("vars", &self.vars.len())
            .field("constraints", &self.constraints)
            .field("trivially_infeasible", &self.trivially_infeasible)
            .finish()
    }
}

impl LinearProgram {
    pub fn minimize() -> Self {
        Self {
            problem: Problem::new(OptimizationDirection::Minimize),
            vars: Vec::new(),
            seen: HashSet::new(),
            constraints: 0,
            trivially_infeasible: false,
        }
    }

    /// Add a variable `x >= 0` with objective coefficient `cost`. Returns its index.
    pub fn add_var(&mut self, cost: f64) -> usize {
        let var = self.problem.add_var(cost, (0.0, f64::INFINITY));
        self.vars.push(var);
        self.vars.len() - 1
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Number of distinct constraints actually handed to the solver.
    pub fn constraint_count(&self) -> usize {
        self.constraints
    }

    /// Add `Σ coef·x_idx (relation) rhs`.
    ///
    /// Returns `false` when the row was dropped (a duplicate, or a row with no
    /// non-zero terms).
    ///
    /// # Panics
    /// Panics if a term references a variable index that was never added.
    pub fn add_constraint(&mut self, terms: &[(usize, f64)], relation: Relation, rhs: f64) -> bool {
        let mut row: Vec<(usize, f64)> = terms.iter().copied().filter(|&(_, c)| c != 0.0).collect();
        row.sort_by_key(|&(idx, _)| idx);

        if row.is_empty() {
            if !relation.holds(0.0, rhs) {
                self.trivially_infeasible = true;
            }
            return false;
        }

        let key = (
            relation,
            row.iter().map(|&(idx, c)| (idx, c.to_bits())).collect(),
            rhs.to_bits(),
        );
        if !self.seen.insert(key) {
            return false;
        }

        let mut expr = LinearExpr::empty();
        for &(idx, c) in &row {
            expr.add(self.vars[idx], c);
        }
        self.problem.add_constraint(expr, relation.op(), rhs);
        self.constraints += 1;
        true
    }

    pub fn solve(self) -> Result<LpSolution, LpError> {
        if self.trivially_infeasible {
            return Err(LpError::Infeasible);
        }

        let solution = self.problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => LpError::Infeasible,
            other => LpError::Solver(format!("{other:?}")),
        })?;

        let values: Vec<f64> = self.vars.iter().map(|&v| solution[v]).collect();
        let objective = solution.objective();
        if !objective.is_finite() || values.iter().any(|v| !v.is_finite()) {
            return Err(LpError::NonFinite);
        }
        Ok(LpSolution { objective, values })
    }
}
