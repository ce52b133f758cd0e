//! Program instrumentation with selector guards
//!
//! Builds the extended program the oracle explores:
//!
//! ```text
//! b :- d, __mus__(program,3).                  % every rule, guarded
//! :- not c, __mus__(answer_set,2).             % every non-query fact, guarded
//! __false__ :- not b.                          % query takes its opposite value
//! {__mus__(program,0); ...; __explore__}.
//! ```
//!
//! The oracle ties `__explore__` to `__false__` (see
//! [`Oracle::register_invariant_guard`](crate::engine::Oracle::register_invariant_guard)).
//! An unsatisfiable core over assumed selectors then certifies that the
//! selected rules and facts force the observed value of the query.

use crate::ast::{GroundAtom, Head, Literal, Program, Rule, Term};
use crate::error::ExplainError;
use crate::instance::AnswerSet;
use crate::Result;
use rustc_hash::FxHashSet;
use std::fmt;
use tracing::debug;

/// Heading of the selector listing in annotated output
pub const SELECTORS_HEADING: &str = "%* the selectors causing the inference *%";

/// Names of the synthetic predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Predicate of selector atoms
    pub selector: String,
    /// Inconsistency marker
    pub marker: String,
    /// Exploration literal
    pub exploration: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            selector: "__mus__".to_string(),
            marker: "__false__".to_string(),
            exploration: "__explore__".to_string(),
        }
    }
}

/// A synthetic guard enabling one rule or one answer-set fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selector {
    /// Guards rule `i` of the program
    Program(usize),
    /// Guards element `j` of the priority sequence
    Fact(usize),
}

impl Selector {
    /// The selector as an atom of the given predicate
    pub fn atom(&self, predicate: &str) -> GroundAtom {
        let (kind, index) = match self {
            Selector::Program(i) => ("program", *i),
            Selector::Fact(j) => ("answer_set", *j),
        };
        GroundAtom::new(predicate, vec![Term::constant(kind), Term::Int(index as i64)])
    }
}

/// Renders as `rule 3` or `fact 2`; the selector atom depends on the
/// vocabulary, see [`ExtendedProgram::selector_atom`]
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Program(i) => write!(f, "rule {}", i),
            Selector::Fact(j) => write!(f, "fact {}", j),
        }
    }
}

/// One element of the priority sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactElement {
    /// The atom
    pub atom: GroundAtom,
    /// Its observed truth value
    pub value: bool,
    /// Whether it is a query atom (query atoms are never guarded)
    pub is_query: bool,
}

impl FactElement {
    /// The literal that holds in the observed answer set
    pub fn observed_literal(&self) -> Literal {
        Literal::new(self.atom.clone(), self.value)
    }
}

impl fmt::Display for FactElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value {
            write!(f, "{}", self.atom)
        } else {
            write!(f, "not {}", self.atom)
        }
    }
}

/// A member of a core, resolved back to the input it selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreElement<'a> {
    /// Rule `index` of the original program
    Rule(usize, &'a Rule),
    /// An answer-set fact
    Fact(usize, &'a FactElement),
}

impl fmt::Display for CoreElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreElement::Rule(_, rule) => write!(f, "{}", rule),
            CoreElement::Fact(_, fact) => write!(f, "{}", fact),
        }
    }
}

/// The instrumented program with its selectors
#[derive(Debug, Clone)]
pub struct ExtendedProgram {
    original: Program,
    program: Program,
    selectors: Vec<Selector>,
    facts: Vec<FactElement>,
    query: Vec<Literal>,
    vocabulary: Vocabulary,
}

impl ExtendedProgram {
    /// Instruments `program` using the completed answer set as priority
    /// sequence
    pub fn build(
        program: &Program,
        answer_set: &AnswerSet,
        query: &[GroundAtom],
        vocabulary: Vocabulary,
    ) -> Result<Self> {
        let completed = answer_set.completed(&program.herbrand_base());
        let elements: Vec<GroundAtom> = completed.elements().iter().map(|(a, _)| a.clone()).collect();
        Self::build_with_priority(program, answer_set, query, &elements, vocabulary)
    }

    /// Instruments `program` with an explicit priority list; only the listed
    /// atoms get fact selectors, their values read from the answer set
    pub fn build_with_priority(
        program: &Program,
        answer_set: &AnswerSet,
        query: &[GroundAtom],
        priority: &[GroundAtom],
        vocabulary: Vocabulary,
    ) -> Result<Self> {
        if query.is_empty() {
            return Err(ExplainError::MalformedInput("the query has no atoms".to_string()));
        }
        for predicate in [&vocabulary.selector, &vocabulary.marker, &vocabulary.exploration] {
            if let Some(atom) = program.rules().iter().flat_map(Rule::atoms).find(|a| a.predicate() == predicate) {
                return Err(ExplainError::MalformedInput(format!(
                    "atom {} clashes with the reserved predicate {}",
                    atom, predicate
                )));
            }
        }

        let base = program.herbrand_base();
        let base_set: FxHashSet<&GroundAtom> = base.iter().collect();
        // no rule can derive such an atom, so this is not an answer set of
        // the program
        if let Some(atom) = answer_set.true_atoms().find(|atom| !base_set.contains(atom)) {
            return Err(ExplainError::MalformedInput(format!(
                "answer set atom {} does not occur in the program",
                atom
            )));
        }

        let query_set: FxHashSet<&GroundAtom> = query.iter().collect();
        let mut seen = FxHashSet::default();
        let facts: Vec<FactElement> = priority
            .iter()
            .filter(|atom| seen.insert(*atom))
            .map(|atom| FactElement {
                atom: atom.clone(),
                value: answer_set.value_of(atom),
                is_query: query_set.contains(atom),
            })
            .collect();

        let query_literals: Vec<Literal> = query
            .iter()
            .map(|atom| Literal::new(atom.clone(), answer_set.value_of(atom)))
            .collect();

        let selector_atom = |s: Selector| s.atom(&vocabulary.selector);
        let marker = GroundAtom::propositional(vocabulary.marker.clone());
        let exploration = GroundAtom::propositional(vocabulary.exploration.clone());

        let mut rules = Vec::new();
        let mut selectors = Vec::new();
        for (index, rule) in program.rules().iter().enumerate() {
            let selector = Selector::Program(index);
            rules.push(rule.with_extended_body(selector_atom(selector).positive()));
            selectors.push(selector);
        }
        for (index, fact) in facts.iter().enumerate() {
            if fact.is_query {
                continue;
            }
            let selector = Selector::Fact(index);
            // enabling the selector forbids flipping the fact
            rules.push(Rule::constraint(vec![
                fact.observed_literal().negate(),
                selector_atom(selector).positive(),
            ]));
            selectors.push(selector);
        }
        rules.push(Rule::new(
            Head::atom(marker.clone()),
            query_literals.iter().map(Literal::negate).collect(),
        ));
        let mut choice: Vec<GroundAtom> = selectors.iter().map(|&s| selector_atom(s)).collect();
        choice.push(exploration);
        rules.push(Rule::new(Head::choice(choice, None, None), Vec::new()));

        debug!(
            rules = rules.len(),
            selectors = selectors.len(),
            "instrumented program"
        );
        Ok(Self {
            original: program.clone(),
            program: Program::new(rules),
            selectors,
            facts,
            query: query_literals,
            vocabulary,
        })
    }

    /// The instrumented program
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The program before instrumentation
    pub fn original(&self) -> &Program {
        &self.original
    }

    /// All selectors in priority order
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// The priority sequence, query atoms included
    pub fn facts(&self) -> &[FactElement] {
        &self.facts
    }

    /// Query atoms with their observed values
    pub fn query(&self) -> &[Literal] {
        &self.query
    }

    /// Names of the synthetic predicates
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// The atom of a selector
    pub fn selector_atom(&self, selector: Selector) -> GroundAtom {
        selector.atom(&self.vocabulary.selector)
    }

    /// The inconsistency marker atom
    pub fn marker(&self) -> GroundAtom {
        GroundAtom::propositional(self.vocabulary.marker.clone())
    }

    /// The exploration atom
    pub fn exploration(&self) -> GroundAtom {
        GroundAtom::propositional(self.vocabulary.exploration.clone())
    }

    /// Resolves a selector to the rule or fact it guards
    pub fn resolve(&self, selector: Selector) -> Option<CoreElement<'_>> {
        match selector {
            Selector::Program(i) => self.original.get(i).map(|rule| CoreElement::Rule(i, rule)),
            Selector::Fact(j) => self.facts.get(j).map(|fact| CoreElement::Fact(j, fact)),
        }
    }

    /// The instrumented program followed by the listing of `core`
    ///
    /// ```text
    /// %* the selectors causing the inference *%
    /// __mus__(program,1).  %* :- not c. *%
    /// ```
    pub fn annotated(&self, core: &[Selector]) -> String {
        let mut out = self.program.to_string();
        out.push_str(SELECTORS_HEADING);
        out.push('\n');
        for &selector in core {
            let described = self
                .resolve(selector)
                .map(|element| element.to_string())
                .unwrap_or_default();
            out.push_str(&format!(
                "{}.  %* {} *%\n",
                self.selector_atom(selector),
                described
            ));
        }
        out
    }
}

impl fmt::Display for ExtendedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)
    }
}
