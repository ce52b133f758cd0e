//! [`SATProver`] over any incremental `rustsat` backend

use super::{SATProver, SATSolver};
use crate::error::ExplainError;
use crate::Result;
use rustsat::solvers::{Solve, SolveIncremental, SolverResult};
use rustsat::types::{Clause, Lit, TernaryVal, Var};

/// Wraps a `rustsat` solver, keeping clause counts and the last core
pub struct RustSatAdapter<S> {
    solver: S,
    num_vars: u32,
    num_clauses: u32,
    last_core: Vec<i32>,
}

impl<S> RustSatAdapter<S> {
    /// Wraps `solver`, which should hold no clauses yet
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            num_vars: 0,
            num_clauses: 0,
            last_core: Vec::new(),
        }
    }
}

fn to_lit(lit: i32) -> Result<Lit> {
    let var_idx = lit.unsigned_abs().checked_sub(1).ok_or_else(|| {
        ExplainError::Oracle("literal 0 is not a valid DIMACS literal".to_string())
    })?;
    if var_idx > Var::MAX_IDX {
        return Err(ExplainError::Oracle(format!(
            "variable index {} (from literal {}) exceeds {}",
            var_idx,
            lit,
            Var::MAX_IDX
        )));
    }
    let var = Var::new(var_idx);
    Ok(if lit > 0 { var.pos_lit() } else { var.neg_lit() })
}

fn backend_error(e: impl std::fmt::Display) -> ExplainError {
    ExplainError::Oracle(e.to_string())
}

impl<S: Solve> SATSolver for RustSatAdapter<S> {
    fn add_variables(&mut self, num_vars: u32) {
        // rustsat creates variables on first use
        self.num_vars += num_vars;
    }

    fn add_clause(&mut self, lits: &[i32]) -> Result<()> {
        let lits_vec = lits.iter().map(|&lit| to_lit(lit)).collect::<Result<Vec<Lit>>>()?;
        if let Some(max_var) = lits.iter().map(|lit| lit.unsigned_abs()).max() {
            self.num_vars = self.num_vars.max(max_var);
        }
        let clause = Clause::from(&lits_vec[..]);
        self.num_clauses += 1;
        self.solver.add_clause(clause).map_err(backend_error)
    }

    fn solve(&mut self) -> Result<bool> {
        self.last_core.clear();
        match self.solver.solve().map_err(backend_error)? {
            SolverResult::Sat => Ok(true),
            SolverResult::Unsat => Ok(false),
            SolverResult::Interrupted => Err(ExplainError::Oracle("solving interrupted".to_string())),
        }
    }

    fn value_of(&self, var: u32) -> bool {
        if var == 0 || var > self.num_vars {
            return false;
        }
        let lit = Var::new(var - 1).pos_lit();
        matches!(self.solver.lit_val(lit), Ok(TernaryVal::True))
    }

    fn num_variables(&self) -> u32 {
        self.num_vars
    }

    fn num_clauses(&self) -> u32 {
        self.num_clauses
    }
}

impl<S: SolveIncremental> SATProver for RustSatAdapter<S> {
    fn solve_with_assumptions(&mut self, assumptions: &[i32]) -> Result<bool> {
        self.last_core.clear();
        let assumps = assumptions
            .iter()
            .map(|&lit| to_lit(lit))
            .collect::<Result<Vec<Lit>>>()?;
        match self.solver.solve_assumps(&assumps).map_err(backend_error)? {
            SolverResult::Sat => Ok(true),
            SolverResult::Unsat => {
                // the backend reports the core as a clause over negated
                // assumptions; match by variable to stay sign-agnostic
                let core = self.solver.core().map_err(backend_error)?;
                let core_vars: Vec<u32> = core.iter().map(|lit| lit.var().idx32() + 1).collect();
                self.last_core = assumptions
                    .iter()
                    .copied()
                    .filter(|lit| core_vars.contains(&lit.unsigned_abs()))
                    .collect();
                Ok(false)
            }
            SolverResult::Interrupted => Err(ExplainError::Oracle("solving interrupted".to_string())),
        }
    }

    fn unsat_core(&self) -> Vec<i32> {
        self.last_core.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustsat_batsat::BasicSolver;

    fn batsat() -> RustSatAdapter<BasicSolver> {
        RustSatAdapter::new(BasicSolver::default())
    }

    #[test]
    fn counts_follow_clauses() {
        let mut solver = batsat();
        solver.add_variables(2);
        solver.add_clause(&[1, 2]).unwrap();
        // mentioning x5 grows the count
        solver.add_clause(&[-5]).unwrap();
        assert_eq!(solver.num_variables(), 5);
        assert_eq!(solver.num_clauses(), 2);
        assert!(solver.solve().unwrap());
    }

    #[test]
    fn model_values() {
        let mut solver = batsat();
        solver.add_variables(2);
        solver.add_clause(&[1]).unwrap();
        solver.add_clause(&[-2]).unwrap();
        assert!(solver.solve().unwrap());
        assert!(solver.value_of(1));
        assert!(!solver.value_of(2));
        assert!(!solver.value_of(7));

        solver.add_clause(&[-1]).unwrap();
        assert!(!solver.solve().unwrap());
    }

    #[test]
    fn core_is_subset_of_assumptions() {
        let mut solver = batsat();
        solver.add_variables(3);
        // (x1 OR x2) AND (NOT x1 OR NOT x2)
        solver.add_clause(&[1, 2]).unwrap();
        solver.add_clause(&[-1, -2]).unwrap();

        let assumptions = vec![1, 2, 3];
        assert!(!solver.solve_with_assumptions(&assumptions).unwrap());
        let core = solver.unsat_core();
        assert!(!core.is_empty());
        assert!(core.iter().all(|lit| assumptions.contains(lit)));
        assert!(core.contains(&1) && core.contains(&2));
        assert!(!core.contains(&3));

        // incremental: same clauses, new assumptions
        assert!(solver.solve_with_assumptions(&[1, 3]).unwrap());
        assert!(solver.unsat_core().is_empty());
    }

    #[test]
    fn rejects_zero_literal() {
        let mut solver = batsat();
        assert!(solver.add_clause(&[0]).is_err());
    }
}
