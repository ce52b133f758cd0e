//! SAT solver traits and the explanation oracle built on them

pub mod oracle;
pub mod rustsat_adapter;

pub use oracle::{Oracle, OracleResult};

use crate::Result;

/// A clause store that can be checked for satisfiability
///
/// Literals use DIMACS conventions: variable `v` (counted from 1) appears as
/// `v` when positive and `-v` when negated.
pub trait SATSolver {
    /// Reserves `num_vars` more variables
    fn add_variables(&mut self, num_vars: u32);

    /// Adds one clause; a zero literal is an error
    fn add_clause(&mut self, lits: &[i32]) -> Result<()>;

    /// Checks the clauses loaded so far
    fn solve(&mut self) -> Result<bool>;

    /// Value of `var` in the last model (false when unknown)
    fn value_of(&self, var: u32) -> bool;

    /// Variables reserved or mentioned so far
    fn num_variables(&self) -> u32;

    /// Clauses added so far
    fn num_clauses(&self) -> u32;
}

/// Incremental solving under assumptions, with cores
pub trait SATProver: SATSolver {
    /// Solves with `assumptions` forced for this call only
    fn solve_with_assumptions(&mut self, assumptions: &[i32]) -> Result<bool>;

    /// Assumptions of the last unsatisfiable call that conflict, as passed
    /// and in the order passed; empty after a satisfiable call
    fn unsat_core(&self) -> Vec<i32>;
}
