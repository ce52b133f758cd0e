//! Main explanation API
//!
//! The explainer instruments the program, shrinks the selectors to a minimal
//! core and, on request, replays the core as a derivation and builds its
//! causal graph.

use crate::ast::{GroundAtom, Program};
use crate::engine::{rustsat_adapter::RustSatAdapter, Oracle, SATProver};
use crate::graph::Graph;
use crate::instance::{AnswerSet, Model};
use crate::instrument::{CoreElement, ExtendedProgram, Selector, Vocabulary};
use crate::observer::{NoopObserver, Observer};
use crate::shrink::{CoreShrinker, ShrinkOutcome};
use crate::trace::{GroundRelation, Trace, Tracer};
use crate::Result;
use rustsat_batsat::BasicSolver;
use std::time::{Duration, Instant};
use tracing::info;

/// Explainer options
#[derive(Debug, Clone)]
pub struct Options {
    /// Predicate of selector atoms
    pub selector_predicate: String,
    /// Predicate of the inconsistency marker
    pub marker_predicate: String,
    /// Predicate of the exploration literal
    pub exploration_predicate: String,
    /// Replay the core as a derivation trace
    pub trace: bool,
    /// Build the causal graph (implies `trace`)
    pub graph: bool,
}

impl Default for Options {
    fn default() -> Self {
        let vocabulary = Vocabulary::default();
        Self {
            selector_predicate: vocabulary.selector,
            marker_predicate: vocabulary.marker,
            exploration_predicate: vocabulary.exploration,
            trace: false,
            graph: false,
        }
    }
}

impl Options {
    /// The synthetic predicate names
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            selector: self.selector_predicate.clone(),
            marker: self.marker_predicate.clone(),
            exploration: self.exploration_predicate.clone(),
        }
    }

    fn wants_trace(&self) -> bool {
        self.trace || self.graph
    }
}

/// Explains query values in answer sets (uses batsat by default)
pub struct Explainer {
    options: Options,
}

impl Explainer {
    /// Creates a new explainer with the given options
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Returns the options
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Explains the values of `query` in `answer_set`, with the completed
    /// answer set as priority order
    pub fn explain(
        &self,
        program: &Program,
        answer_set: &AnswerSet,
        query: &[GroundAtom],
    ) -> Result<Explanation> {
        let solver = RustSatAdapter::new(BasicSolver::default());
        self.explain_with(solver, &mut NoopObserver, program, answer_set, query, None)
    }

    /// Explains with an explicit priority list; only the listed atoms are
    /// candidate facts
    pub fn explain_with_priority(
        &self,
        program: &Program,
        answer_set: &AnswerSet,
        query: &[GroundAtom],
        priority: &[GroundAtom],
    ) -> Result<Explanation> {
        let solver = RustSatAdapter::new(BasicSolver::default());
        self.explain_with(solver, &mut NoopObserver, program, answer_set, query, Some(priority))
    }

    /// Explains on a custom SAT backend, reporting progress to `observer`
    pub fn explain_with<S: SATProver>(
        &self,
        sat_solver: S,
        observer: &mut dyn Observer,
        program: &Program,
        answer_set: &AnswerSet,
        query: &[GroundAtom],
        priority: Option<&[GroundAtom]>,
    ) -> Result<Explanation> {
        // Step 1: Instrument
        let instrumentation_start = Instant::now();
        let vocabulary = self.options.vocabulary();
        let extended = match priority {
            Some(priority) => {
                ExtendedProgram::build_with_priority(program, answer_set, query, priority, vocabulary)?
            }
            None => ExtendedProgram::build(program, answer_set, query, vocabulary)?,
        };
        let instrumentation_time = instrumentation_start.elapsed();

        // Step 2: Shrink
        let shrinking_start = Instant::now();
        let mut shrinker = CoreShrinker::with_oracle(&extended, Oracle::with_solver(sat_solver))?;
        let outcome = shrinker.shrink(observer)?;
        let oracle = shrinker.oracle();
        let mut stats = Statistics {
            instrumentation_time,
            shrinking_time: shrinking_start.elapsed(),
            tracing_time: Duration::ZERO,
            oracle_calls: oracle.calls(),
            num_variables: oracle.num_variables(),
            num_clauses: oracle.num_clauses(),
        };
        drop(shrinker);

        let core = match outcome {
            ShrinkOutcome::FreeChoice(witness) => {
                return Ok(Explanation::FreeChoice { witness, stats });
            }
            ShrinkOutcome::Core(core) => core,
        };

        // Step 3: Replay and build the graph
        let (trace, graph) = if self.options.wants_trace() {
            let tracing_start = Instant::now();
            let relation = GroundRelation::reduce(&extended, &core);
            let trace = Tracer::new(&relation, answer_set, query).run(observer)?;
            let graph = self
                .options
                .graph
                .then(|| Graph::build(&trace, &relation, query));
            stats.tracing_time = tracing_start.elapsed();
            info!(
                steps = trace.len(),
                nodes = graph.as_ref().map(Graph::len),
                "replayed core"
            );
            (Some(trace), graph)
        } else {
            (None, None)
        };

        Ok(Explanation::Core {
            core,
            extended,
            trace,
            graph,
            stats,
        })
    }
}

/// Result of an explanation request
#[derive(Debug)]
pub enum Explanation {
    /// The query is forced by the rules and facts of the core
    Core {
        /// Minimal selectors, in priority order
        core: Vec<Selector>,
        /// The instrumented program the core refers to
        extended: ExtendedProgram,
        /// Derivation replay, if requested
        trace: Option<Trace>,
        /// Causal graph, if requested
        graph: Option<Graph>,
        /// Explanation statistics
        stats: Statistics,
    },
    /// The query could take its opposite value
    FreeChoice {
        /// An assignment of the program atoms in which it does
        witness: Model,
        /// Explanation statistics
        stats: Statistics,
    },
}

impl Explanation {
    /// Returns true for a free choice
    pub fn is_free_choice(&self) -> bool {
        matches!(self, Explanation::FreeChoice { .. })
    }

    /// Returns the core, if there is one
    pub fn core(&self) -> Option<&[Selector]> {
        match self {
            Explanation::Core { core, .. } => Some(core),
            Explanation::FreeChoice { .. } => None,
        }
    }

    /// The rules and facts of the core, in priority order
    pub fn elements(&self) -> Vec<CoreElement<'_>> {
        match self {
            Explanation::Core { core, extended, .. } => {
                core.iter().filter_map(|&s| extended.resolve(s)).collect()
            }
            Explanation::FreeChoice { .. } => Vec::new(),
        }
    }

    /// The selector-annotated program, if there is a core
    pub fn annotated(&self) -> Option<String> {
        match self {
            Explanation::Core { core, extended, .. } => Some(extended.annotated(core)),
            Explanation::FreeChoice { .. } => None,
        }
    }

    /// Returns the trace, if it was computed
    pub fn trace(&self) -> Option<&Trace> {
        match self {
            Explanation::Core { trace, .. } => trace.as_ref(),
            Explanation::FreeChoice { .. } => None,
        }
    }

    /// Returns the graph, if it was computed
    pub fn graph(&self) -> Option<&Graph> {
        match self {
            Explanation::Core { graph, .. } => graph.as_ref(),
            Explanation::FreeChoice { .. } => None,
        }
    }

    /// Returns the statistics
    pub fn statistics(&self) -> &Statistics {
        match self {
            Explanation::Core { stats, .. } => stats,
            Explanation::FreeChoice { stats, .. } => stats,
        }
    }
}

/// Statistics collected during an explanation
#[derive(Debug, Clone)]
pub struct Statistics {
    instrumentation_time: Duration,
    shrinking_time: Duration,
    tracing_time: Duration,
    oracle_calls: usize,
    num_variables: u32,
    num_clauses: u32,
}

impl Statistics {
    /// Returns instrumentation time in milliseconds
    pub fn instrumentation_time(&self) -> u64 {
        self.instrumentation_time.as_millis() as u64
    }

    /// Returns core search time in milliseconds
    pub fn shrinking_time(&self) -> u64 {
        self.shrinking_time.as_millis() as u64
    }

    /// Returns replay and graph time in milliseconds
    pub fn tracing_time(&self) -> u64 {
        self.tracing_time.as_millis() as u64
    }

    /// Returns total time in milliseconds
    pub fn total_time(&self) -> u64 {
        self.instrumentation_time() + self.shrinking_time() + self.tracing_time()
    }

    /// Returns number of oracle calls
    pub fn oracle_calls(&self) -> usize {
        self.oracle_calls
    }

    /// Returns number of variables
    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    /// Returns number of clauses
    pub fn num_clauses(&self) -> u32 {
        self.num_clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_atom, parse_program};

    fn explain(options: Options, program: &str, answer: &str, query: &str) -> Explanation {
        let program = parse_program(program).unwrap();
        let answer_set = AnswerSet::parse_listing(answer).unwrap();
        Explainer::new(options)
            .explain(&program, &answer_set, &[parse_atom(query).unwrap()])
            .unwrap()
    }

    #[test]
    fn explainer_free_choice() {
        let explanation = explain(Options::default(), "{c}.", "c", "c");
        assert!(explanation.is_free_choice());
        assert!(explanation.core().is_none());
        assert!(explanation.annotated().is_none());
    }

    #[test]
    fn explainer_core() {
        let explanation = explain(Options::default(), "a. b :- a.", "a b", "b");
        assert_eq!(
            explanation.core(),
            Some(&[Selector::Program(0), Selector::Program(1)][..])
        );
        let elements: Vec<String> = explanation.elements().iter().map(ToString::to_string).collect();
        assert_eq!(elements, vec!["a.", "b :- a."]);
        assert!(explanation.trace().is_none());
    }

    #[test]
    fn explainer_statistics() {
        let explanation = explain(Options::default(), "a. b :- a.", "a b", "b");
        let stats = explanation.statistics();
        // initial check plus at least one test per core member
        assert!(stats.oracle_calls() >= 3);
        assert!(stats.num_variables() > 0);
        assert!(stats.num_clauses() > 0);
    }

    #[test]
    fn graph_option_implies_trace() {
        let options = Options {
            graph: true,
            ..Options::default()
        };
        let explanation = explain(options, "a. b :- a.", "a b", "b");
        assert_eq!(explanation.trace().map(Trace::len), Some(2));
        assert_eq!(explanation.graph().map(Graph::len), Some(2));
    }

    #[test]
    fn custom_predicates() {
        let options = Options {
            selector_predicate: "sel".to_string(),
            ..Options::default()
        };
        let explanation = explain(options, "{c}. :- not c.", "c", "c");
        let annotated = explanation.annotated().unwrap();
        assert!(annotated.contains("sel(program,1).  %* :- not c. *%"));
    }
}
