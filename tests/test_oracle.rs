//! Tests for unsat core extraction using assumptions

use corexplain_rs::ast::GroundAtom;
use corexplain_rs::engine::{rustsat_adapter::RustSatAdapter, Oracle, OracleResult, SATProver, SATSolver};
use corexplain_rs::instance::AnswerSet;
use corexplain_rs::instrument::{ExtendedProgram, Selector, Vocabulary};
use corexplain_rs::parser::{parse_atom, parse_program};
use corexplain_rs::ExplainError;
use rustsat_batsat::BasicSolver;

fn atom(s: &str) -> GroundAtom {
    parse_atom(s).unwrap()
}

#[test]
fn test_unsat_core_simple() {
    // Formula: (x1 OR x2) AND (NOT x1 OR x3) AND (NOT x2 OR x3)
    // Assuming x1=true, x2=true, x3=false gives UNSAT
    let mut solver = RustSatAdapter::new(BasicSolver::default());
    solver.add_variables(3);

    solver.add_clause(&[1, 2]).unwrap();
    solver.add_clause(&[-1, 3]).unwrap();
    solver.add_clause(&[-2, 3]).unwrap();

    let assumptions = vec![1, 2, -3];
    assert!(!solver.solve_with_assumptions(&assumptions).unwrap(), "Should be UNSAT with these assumptions");

    let core = solver.unsat_core();
    assert!(!core.is_empty(), "Core should not be empty");
    for lit in &core {
        assert!(assumptions.contains(lit), "Core literal {} should be in assumptions", lit);
    }
    assert!(core.contains(&-3));
}

#[test]
fn test_unsat_core_irrelevant_assumption() {
    let mut solver = RustSatAdapter::new(BasicSolver::default());
    solver.add_variables(2);

    // (x1) AND (NOT x1) - directly contradictory
    solver.add_clause(&[1]).unwrap();
    solver.add_clause(&[-1]).unwrap();

    assert!(!solver.solve().unwrap(), "Should be UNSAT");

    // x2 is not part of the conflict
    assert!(!solver.solve_with_assumptions(&[2]).unwrap(), "Should still be UNSAT");
    assert!(solver.unsat_core().is_empty(), "Core should be empty for irrelevant assumptions");
}

#[test]
fn test_oracle_is_incremental() {
    let mut oracle = Oracle::new();
    oracle
        .load(&parse_program("{s1; s2; s3}. a :- s1. b :- s2. :- a, b.").unwrap())
        .unwrap();
    let clauses = oracle.num_clauses();

    assert_eq!(
        oracle.solve(&[atom("s1"), atom("s2"), atom("s3")]).unwrap(),
        OracleResult::Unsat(vec![atom("s1"), atom("s2")])
    );
    assert!(!oracle.solve(&[atom("s1"), atom("s3")]).unwrap().is_unsat());
    assert!(!oracle.solve(&[atom("s2")]).unwrap().is_unsat());
    assert_eq!(oracle.calls(), 3);
    assert_eq!(oracle.num_clauses(), clauses);
}

#[test]
fn test_oracle_on_extended_program() {
    let program = parse_program("{c}. :- not c.").unwrap();
    let answer_set = AnswerSet::parse_listing("c").unwrap();
    let extended =
        ExtendedProgram::build(&program, &answer_set, &[atom("c")], Vocabulary::default()).unwrap();

    let mut oracle = Oracle::new();
    oracle.load(extended.program()).unwrap();
    oracle
        .register_invariant_guard(&extended.marker(), &extended.exploration())
        .unwrap();

    let all: Vec<GroundAtom> = extended
        .selectors()
        .iter()
        .map(|&s| extended.selector_atom(s))
        .collect();
    assert_eq!(
        oracle.solve(&all).unwrap(),
        OracleResult::Unsat(vec![extended.selector_atom(Selector::Program(1))])
    );

    // without the constraint, c may be false: the model shows the marker
    match oracle.solve(&[extended.selector_atom(Selector::Program(0))]).unwrap() {
        OracleResult::Sat(model) => {
            assert!(model.contains(&extended.marker()));
            assert!(model.contains(&extended.exploration()));
            assert!(!model.contains(&atom("c")));
        }
        other => panic!("expected a model, got {:?}", other),
    }
}

#[test]
fn test_extended_program_needs_the_guard() {
    let program = parse_program("{c}. :- not c.").unwrap();
    let answer_set = AnswerSet::parse_listing("c").unwrap();
    let extended =
        ExtendedProgram::build(&program, &answer_set, &[atom("c")], Vocabulary::default()).unwrap();
    let all: Vec<GroundAtom> = extended
        .selectors()
        .iter()
        .map(|&s| extended.selector_atom(s))
        .collect();

    // nothing asks for the marker, so every selector set is consistent
    let mut oracle = Oracle::new();
    oracle.load(extended.program()).unwrap();
    match oracle.solve(&all).unwrap() {
        OracleResult::Sat(model) => assert!(!model.contains(&extended.marker())),
        other => panic!("expected a model, got {:?}", other),
    }
}

#[test]
fn test_guard_atoms_must_exist() {
    let mut oracle = Oracle::new();
    oracle.load(&parse_program("a.").unwrap()).unwrap();
    assert!(matches!(
        oracle.register_invariant_guard(&atom("m"), &atom("a")),
        Err(ExplainError::MalformedInput(_))
    ));
}
