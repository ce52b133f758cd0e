//! Incremental explanation oracle
//!
//! Loads a ground program once and answers repeated solve-under-assumptions
//! queries without retranslation. Assumptions are ground atoms; the oracle
//! maps them to SAT literals and maps cores back.
//!
//! The invariant guard is scoped to one oracle instance. Once registered, the
//! exploration atom is assumed by every solve call and implies the marker
//! atom, so every model the oracle reports has the marker true.

use super::rustsat_adapter::RustSatAdapter;
use super::SATProver;
use crate::ast::{GroundAtom, Program};
use crate::cnf::{CompletionTranslator, VariableAllocator};
use crate::error::ExplainError;
use crate::instance::Model;
use crate::Result;
use rustsat_batsat::BasicSolver;
use tracing::debug;

/// Outcome of one oracle call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleResult {
    /// A model satisfying the program under the assumptions
    Sat(Model),
    /// The assumptions (exploration literal excluded) that cannot hold
    /// together, in the order they were passed
    Unsat(Vec<GroundAtom>),
}

impl OracleResult {
    /// Returns true for [`OracleResult::Unsat`]
    pub fn is_unsat(&self) -> bool {
        matches!(self, OracleResult::Unsat(_))
    }
}

struct Guard {
    exploration: u32,
}

/// Solve-under-assumptions oracle over a SAT backend (batsat by default)
pub struct Oracle<S: SATProver = RustSatAdapter<BasicSolver>> {
    solver: S,
    vars: VariableAllocator,
    loaded: bool,
    guard: Option<Guard>,
    calls: usize,
}

impl Oracle {
    /// Creates an oracle on the default batsat backend
    pub fn new() -> Self {
        Self::with_solver(RustSatAdapter::new(BasicSolver::default()))
    }
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SATProver> Oracle<S> {
    /// Creates an oracle on a custom backend
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            vars: VariableAllocator::new(),
            loaded: false,
            guard: None,
            calls: 0,
        }
    }

    /// Translates and loads the program; may be called once per oracle
    pub fn load(&mut self, program: &Program) -> Result<()> {
        if self.loaded {
            return Err(ExplainError::Grounding(
                "oracle already holds a program; use a fresh oracle per request".to_string(),
            ));
        }
        let cnf = CompletionTranslator::new(&mut self.vars).translate(program);
        debug!(
            variables = cnf.num_variables,
            clauses = cnf.num_clauses(),
            "loading program into oracle"
        );
        self.solver.add_variables(cnf.num_variables);
        for clause in &cnf.clauses {
            self.solver
                .add_clause(clause)
                .map_err(|e| ExplainError::Grounding(e.to_string()))?;
        }
        self.loaded = true;
        Ok(())
    }

    /// Makes `exploration` imply `marker` and assumes `exploration` in every
    /// later solve call
    ///
    /// Without the guard the marker is an ordinary atom and the program is
    /// free to leave it false.
    pub fn register_invariant_guard(
        &mut self,
        marker: &GroundAtom,
        exploration: &GroundAtom,
    ) -> Result<()> {
        let marker = self.known_var(marker)?;
        let exploration = self.known_var(exploration)?;
        self.solver
            .add_clause(&[-(exploration as i32), marker as i32])?;
        debug!(marker, exploration, "invariant guard registered");
        self.guard = Some(Guard { exploration });
        Ok(())
    }

    /// Solves under the given atoms assumed true
    pub fn solve(&mut self, assumptions: &[GroundAtom]) -> Result<OracleResult> {
        if !self.loaded {
            return Err(ExplainError::Grounding("no program loaded".to_string()));
        }
        let mut lits = assumptions
            .iter()
            .map(|atom| self.known_var(atom).map(|var| var as i32))
            .collect::<Result<Vec<i32>>>()?;
        if let Some(guard) = &self.guard {
            lits.push(guard.exploration as i32);
        }

        self.calls += 1;
        let sat = self.solver.solve_with_assumptions(&lits)?;
        debug!(assumptions = assumptions.len(), sat, call = self.calls, "oracle call");

        if sat {
            let model = Model::new(
                self.vars
                    .atoms()
                    .iter()
                    .filter(|atom| {
                        self.vars
                            .get(atom)
                            .is_some_and(|var| self.solver.value_of(var))
                    })
                    .cloned(),
            );
            return Ok(OracleResult::Sat(model));
        }

        let core_lits = self.solver.unsat_core();
        let core = assumptions
            .iter()
            .zip(&lits)
            .filter(|(_, lit)| core_lits.contains(lit))
            .map(|(atom, _)| atom.clone())
            .collect();
        Ok(OracleResult::Unsat(core))
    }

    /// Number of solve calls answered so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Number of SAT variables in use
    pub fn num_variables(&self) -> u32 {
        self.solver.num_variables()
    }

    /// Number of clauses loaded
    pub fn num_clauses(&self) -> u32 {
        self.solver.num_clauses()
    }

    fn known_var(&self, atom: &GroundAtom) -> Result<u32> {
        self.vars.get(atom).ok_or_else(|| {
            ExplainError::MalformedInput(format!("atom {} does not occur in the loaded program", atom))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_atom, parse_program};

    fn atom(s: &str) -> GroundAtom {
        parse_atom(s).unwrap()
    }

    #[test]
    fn sat_reports_model() {
        let mut oracle = Oracle::new();
        oracle.load(&parse_program("a. b :- a. {c}.").unwrap()).unwrap();
        match oracle.solve(&[atom("c")]).unwrap() {
            OracleResult::Sat(model) => {
                assert!(model.contains(&atom("a")));
                assert!(model.contains(&atom("b")));
                assert!(model.contains(&atom("c")));
            }
            other => panic!("expected a model, got {:?}", other),
        }
    }

    #[test]
    fn unsat_reports_core_in_assumption_order() {
        let mut oracle = Oracle::new();
        oracle
            .load(&parse_program("{s1; s2; s3}. a :- s1. :- a, s3.").unwrap())
            .unwrap();
        let result = oracle.solve(&[atom("s1"), atom("s2"), atom("s3")]).unwrap();
        assert_eq!(result, OracleResult::Unsat(vec![atom("s1"), atom("s3")]));
        assert_eq!(oracle.calls(), 1);
    }

    #[test]
    fn guard_demands_the_marker() {
        let program = parse_program("{q; x}. m :- not q.").unwrap();
        let mut oracle = Oracle::new();
        oracle.load(&program).unwrap();
        oracle.register_invariant_guard(&atom("m"), &atom("x")).unwrap();

        // exploration demands the marker, which needs q false: satisfiable
        match oracle.solve(&[]).unwrap() {
            OracleResult::Sat(model) => {
                assert!(model.contains(&atom("m")));
                assert!(!model.contains(&atom("q")));
            }
            other => panic!("expected a model, got {:?}", other),
        }
        // assuming q makes the marker underivable: unsat with core [q]
        assert_eq!(
            oracle.solve(&[atom("q")]).unwrap(),
            OracleResult::Unsat(vec![atom("q")])
        );
    }

    #[test]
    fn without_guard_the_marker_is_free() {
        let mut oracle = Oracle::new();
        oracle.load(&parse_program("{q; x}. m :- not q.").unwrap()).unwrap();
        match oracle.solve(&[atom("q")]).unwrap() {
            OracleResult::Sat(model) => assert!(!model.contains(&atom("m"))),
            other => panic!("expected a model, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_atoms_and_double_load() {
        let program = parse_program("a.").unwrap();
        let mut oracle = Oracle::new();
        assert!(oracle.solve(&[]).is_err());
        oracle.load(&program).unwrap();
        assert!(matches!(
            oracle.solve(&[atom("zzz")]),
            Err(ExplainError::MalformedInput(_))
        ));
        assert!(matches!(oracle.load(&program), Err(ExplainError::Grounding(_))));
    }
}
