use corexplain_rs::ast::{GroundAtom, Program};
use corexplain_rs::engine::{Oracle, OracleResult};
use corexplain_rs::graph::Graph;
use corexplain_rs::instance::AnswerSet;
use corexplain_rs::observer::NoopObserver;
use corexplain_rs::parser::parse_program;
use corexplain_rs::shrink::{CoreShrinker, ShrinkOutcome};
use corexplain_rs::trace::{GroundRelation, Trace, Tracer};
use corexplain_rs::{ExplainError, Explainer, Explanation, Options};
use proptest::prelude::*;
use rustc_hash::FxHashSet;

// ============================================================================
// Strategies
// ============================================================================

const ATOMS: usize = 4;

fn name(index: usize) -> String {
    format!("p{}", index)
}

prop_compose! {
    fn any_rule()(
        head in 0..ATOMS,
        constraint in any::<bool>(),
        positive in prop::collection::vec(0..ATOMS, 0..3),
        negative in prop::collection::vec(0..ATOMS, 0..2),
    ) -> String {
        let mut body: Vec<String> = positive.iter().map(|&i| name(i)).collect();
        body.extend(negative.iter().map(|&i| format!("not {}", name(i))));
        if body.is_empty() {
            format!("{}.", name(head))
        } else if constraint {
            format!(":- {}.", body.join(", "))
        } else {
            format!("{} :- {}.", name(head), body.join(", "))
        }
    }
}

prop_compose! {
    fn any_program()(
        choice in prop::collection::vec(any::<bool>(), ATOMS),
        rules in prop::collection::vec(any_rule(), 0..6),
    ) -> String {
        let chosen: Vec<String> = choice
            .iter()
            .enumerate()
            .filter(|(_, chosen)| **chosen)
            .map(|(i, _)| name(i))
            .collect();
        let mut text = String::new();
        if !chosen.is_empty() {
            text.push_str(&format!("{{{}}}.\n", chosen.join("; ")));
        }
        for rule in rules {
            text.push_str(&rule);
            text.push('\n');
        }
        text
    }
}

/// Parses the program and picks one of its supported models as the answer set
fn setup(text: &str, query: usize) -> Option<(Program, AnswerSet, GroundAtom)> {
    let program = parse_program(text).unwrap();
    let base = program.herbrand_base();
    if base.is_empty() {
        return None;
    }
    let mut oracle = Oracle::new();
    oracle.load(&program).unwrap();
    match oracle.solve(&[]).unwrap() {
        OracleResult::Sat(model) => Some((
            program,
            AnswerSet::of_atoms(model.atoms().cloned()),
            base[query % base.len()].clone(),
        )),
        OracleResult::Unsat(_) => None,
    }
}

fn explain_core(program: &Program, answer_set: &AnswerSet, query: &GroundAtom) -> Explanation {
    Explainer::new(Options::default())
        .explain(program, answer_set, std::slice::from_ref(query))
        .unwrap()
}

/// Replays the core to its fixpoint, whether or not that reaches the query
fn replay_core(
    program: &Program,
    answer_set: &AnswerSet,
    query: &GroundAtom,
) -> Option<(Trace, GroundRelation)> {
    match explain_core(program, answer_set, query) {
        Explanation::Core { core, extended, .. } => {
            let relation = GroundRelation::reduce(&extended, &core);
            let trace = Tracer::new(&relation, answer_set, std::slice::from_ref(query))
                .fixpoint(&mut NoopObserver)
                .unwrap();
            Some((trace, relation))
        }
        Explanation::FreeChoice { .. } => None,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_core_is_minimal(text in any_program(), query in 0..ATOMS) {
        let Some((program, answer_set, query)) = setup(&text, query) else {
            return Ok(());
        };
        let explanation = explain_core(&program, &answer_set, &query);
        if let Explanation::Core { core, extended, .. } = &explanation {
            let mut shrinker = CoreShrinker::new(extended).unwrap();
            prop_assert!(shrinker.check(core).unwrap().is_unsat());
            for position in 0..core.len() {
                let mut without = core.clone();
                without.remove(position);
                prop_assert!(
                    !shrinker.check(&without).unwrap().is_unsat(),
                    "{} is not needed in {:?}", core[position], core
                );
            }
        }
    }

    #[test]
    fn prop_shrinking_a_core_is_idempotent(text in any_program(), query in 0..ATOMS) {
        let Some((program, answer_set, query)) = setup(&text, query) else {
            return Ok(());
        };
        let explanation = explain_core(&program, &answer_set, &query);
        if let Explanation::Core { core, extended, .. } = &explanation {
            let mut shrinker = CoreShrinker::new(extended).unwrap();
            let again = shrinker.shrink_from(core, &mut NoopObserver).unwrap();
            prop_assert_eq!(again, ShrinkOutcome::Core(core.clone()));
        }
    }

    #[test]
    fn prop_free_choice_witness_flips_query(text in any_program(), query in 0..ATOMS) {
        let Some((program, answer_set, query)) = setup(&text, query) else {
            return Ok(());
        };
        if let Explanation::FreeChoice { witness, .. } = explain_core(&program, &answer_set, &query) {
            prop_assert_ne!(witness.contains(&query), answer_set.value_of(&query));
        }
    }

    #[test]
    fn prop_trace_agrees_with_answer_set(text in any_program(), query in 0..ATOMS) {
        let Some((program, answer_set, query)) = setup(&text, query) else {
            return Ok(());
        };
        if let Some((trace, _)) = replay_core(&program, &answer_set, &query) {
            let mut seen = FxHashSet::default();
            for (position, step) in trace.steps().iter().enumerate() {
                prop_assert_eq!(step.order, position + 1);
                prop_assert!(seen.insert(step.atom.clone()));
                prop_assert_eq!(step.value, answer_set.value_of(&step.atom));
            }
        }
    }

    #[test]
    fn prop_graph_points_backwards(text in any_program(), query in 0..ATOMS) {
        let Some((program, answer_set, query)) = setup(&text, query) else {
            return Ok(());
        };
        if let Some((trace, relation)) = replay_core(&program, &answer_set, &query) {
            let graph = Graph::build(&trace, &relation, std::slice::from_ref(&query));
            for edge in graph.edges() {
                let from = trace.order_of(&edge.from).unwrap();
                let to = trace.order_of(&edge.to).unwrap();
                prop_assert!(to < from);
                prop_assert!(graph.node(&edge.to).is_some());
            }
            if graph.is_empty() {
                prop_assert!(trace.step_of(&query).is_none());
            } else {
                prop_assert!(graph.node(&query).is_some());
            }
        }
    }

    #[test]
    fn prop_graph_requests_reach_the_query_or_fail(text in any_program(), query in 0..ATOMS) {
        let Some((program, answer_set, query)) = setup(&text, query) else {
            return Ok(());
        };
        let options = Options {
            graph: true,
            ..Options::default()
        };
        let result = Explainer::new(options).explain(&program, &answer_set, std::slice::from_ref(&query));
        match result {
            Ok(Explanation::Core { trace: Some(trace), graph: Some(graph), .. }) => {
                prop_assert!(trace.step_of(&query).is_some());
                prop_assert!(graph.node(&query).is_some());
            }
            Ok(Explanation::FreeChoice { .. }) => {}
            Err(ExplainError::Inconsistency(message)) => prop_assert!(message.contains("stalled")),
            other => prop_assert!(false, "unexpected result {:?}", other),
        }
    }
}
