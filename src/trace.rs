//! Step-wise derivation replay
//!
//! The explanatory program is reduced to a flat [`GroundRelation`] and
//! replayed one assignment at a time. Each step scans for the first atom that
//! can be justified from the assignments made so far, in a fixed structural
//! order:
//!
//! 1. rules in relation order: support, then choice, then constraint
//!    resolution for each rule;
//! 2. true atoms in atom order whose only remaining supporter still has
//!    unknown body literals (recorded as support by that rule);
//! 3. unassigned atoms in atom order whose every supporter has a falsified
//!    body (lack of support).
//!
//! The replay stops when no unassigned atom admits a justification. A replay
//! that stops before deriving the query has stalled: the core forces the
//! query by case analysis the four justifications cannot express, and
//! [`Tracer::run`] reports it as an inconsistency.

use crate::ast::GroundAtom;
use crate::error::ExplainError;
use crate::instance::AnswerSet;
use crate::instrument::{ExtendedProgram, Selector};
use crate::observer::{ExplainEvent, Observer};
use crate::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Why an atom received its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Justification {
    /// A rule with a true body needs the atom (or needs its body literal)
    Support,
    /// A rule with a true body already has its maximum of true head atoms
    Choice,
    /// No rule with the atom in its head can fire
    LackOfSupport,
    /// The opposite value would violate a rule whose bound cannot be met
    Constraint,
}

impl Justification {
    /// Name used in exported relations
    pub fn as_str(&self) -> &'static str {
        match self {
            Justification::Support => "support",
            Justification::Choice => "choice",
            Justification::LackOfSupport => "lack_of_support",
            Justification::Constraint => "constraint",
        }
    }
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One forced assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivationStep {
    /// Position in the trace, starting at 1
    pub order: usize,
    /// The atom
    pub atom: GroundAtom,
    /// Its forced value
    pub value: bool,
    /// Kind of justification
    pub justification: Justification,
    /// Relation rule that justified it; none for lack of support
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<usize>,
}

impl fmt::Display for DerivationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} = {} ({}", self.order, self.atom, self.value, self.justification)?;
        if let Some(rule) = self.rule {
            write!(f, ", rule {}", rule)?;
        }
        write!(f, ")")
    }
}

/// A rule of the reduced program in flat form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundRule {
    /// Position in the relation
    pub id: usize,
    /// The selector that enabled (or would enable) this rule
    pub origin: Selector,
    /// Head atoms
    pub head: Vec<GroundAtom>,
    /// Minimum number of true head atoms when the body holds
    pub lower: usize,
    /// Maximum number of true head atoms when the body holds
    pub upper: usize,
    /// Atoms of positive body literals
    pub positive: Vec<GroundAtom>,
    /// Atoms of negative body literals
    pub negative: Vec<GroundAtom>,
    /// The rule is outside the core: its selector is never decided, so the
    /// body is never true
    pub open: bool,
}

impl GroundRule {
    /// Body literals as `(atom, positive)`, positives first
    pub fn body(&self) -> impl Iterator<Item = (&GroundAtom, bool)> {
        self.positive
            .iter()
            .map(|a| (a, true))
            .chain(self.negative.iter().map(|a| (a, false)))
    }

    /// A closed rule with no body literals
    pub fn has_empty_body(&self) -> bool {
        !self.open && self.positive.is_empty() && self.negative.is_empty()
    }

    /// Returns whether `atom` occurs in the body
    pub fn in_body(&self, atom: &GroundAtom) -> bool {
        self.positive.contains(atom) || self.negative.contains(atom)
    }

    /// Every atom of the rule, head first
    pub fn atoms(&self) -> impl Iterator<Item = &GroundAtom> {
        self.head.iter().chain(self.positive.iter()).chain(self.negative.iter())
    }
}

impl fmt::Display for GroundRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head.iter().map(ToString::to_string).collect::<Vec<_>>();
        write!(f, "{}{{{}}}{}", self.lower, head.join("; "), self.upper)?;
        let mut body: Vec<String> = self.body().map(|(atom, positive)| {
            if positive {
                atom.to_string()
            } else {
                format!("not {}", atom)
            }
        }).collect();
        if self.open {
            body.push(format!("{}?", self.origin));
        }
        if !body.is_empty() {
            write!(f, " :- {}", body.join(", "))?;
        }
        write!(f, ".")
    }
}

/// The reduced explanatory program
#[derive(Debug, Clone, Default)]
pub struct GroundRelation {
    rules: Vec<GroundRule>,
    supporters: FxHashMap<GroundAtom, Vec<usize>>,
}

impl GroundRelation {
    /// Creates a relation; rule ids are reassigned to positions
    pub fn new(rules: impl IntoIterator<Item = GroundRule>) -> Self {
        let mut relation = Self::default();
        for mut rule in rules {
            rule.id = relation.rules.len();
            for atom in &rule.head {
                relation.supporters.entry(atom.clone()).or_default().push(rule.id);
            }
            relation.rules.push(rule);
        }
        relation
    }

    /// Reduces an extended program by a core
    ///
    /// Rules selected by the core keep their bodies minus the selector. All
    /// other program rules stay as open rules. Answer-set facts in the core
    /// become constraints; the remaining facts and the synthetic query rules
    /// are dropped.
    pub fn reduce(extended: &ExtendedProgram, core: &[Selector]) -> Self {
        let selected: FxHashSet<Selector> = core.iter().copied().collect();
        let mut rules = Vec::new();
        for (index, rule) in extended.original().rules().iter().enumerate() {
            let origin = Selector::Program(index);
            let (positive, negative) = rule
                .body
                .iter()
                .partition::<Vec<_>, _>(|literal| literal.positive);
            rules.push(GroundRule {
                id: 0,
                origin,
                head: rule.head.atoms().to_vec(),
                lower: rule.head.lower_bound(),
                upper: rule.head.upper_bound(),
                positive: positive.into_iter().map(|l| l.atom.clone()).collect(),
                negative: negative.into_iter().map(|l| l.atom.clone()).collect(),
                open: !selected.contains(&origin),
            });
        }
        for (index, fact) in extended.facts().iter().enumerate() {
            let origin = Selector::Fact(index);
            if fact.is_query || !selected.contains(&origin) {
                continue;
            }
            let (positive, negative) = if fact.value {
                (Vec::new(), vec![fact.atom.clone()])
            } else {
                (vec![fact.atom.clone()], Vec::new())
            };
            rules.push(GroundRule {
                id: 0,
                origin,
                head: Vec::new(),
                lower: 1,
                upper: 0,
                positive,
                negative,
                open: false,
            });
        }
        Self::new(rules)
    }

    /// Rules in relation order
    pub fn rules(&self) -> &[GroundRule] {
        &self.rules
    }

    /// The rule with the given id
    pub fn get(&self, id: usize) -> Option<&GroundRule> {
        self.rules.get(id)
    }

    /// Rules with `atom` in their head, in relation order
    pub fn supporters<'a>(&'a self, atom: &GroundAtom) -> impl Iterator<Item = &'a GroundRule> + 'a {
        self.supporters
            .get(atom)
            .into_iter()
            .flatten()
            .filter_map(move |&id| self.rules.get(id))
    }

    /// Atoms mentioned by any rule
    pub fn atoms(&self) -> BTreeSet<GroundAtom> {
        self.rules.iter().flat_map(GroundRule::atoms).cloned().collect()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Display for GroundRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "r{}: {}", rule.id, rule)?;
        }
        Ok(())
    }
}

/// An ordered derivation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    steps: Vec<DerivationStep>,
    index: FxHashMap<GroundAtom, usize>,
}

impl Trace {
    /// Steps in order
    pub fn steps(&self) -> &[DerivationStep] {
        &self.steps
    }

    /// The step that assigned `atom`
    pub fn step_of(&self, atom: &GroundAtom) -> Option<&DerivationStep> {
        self.index.get(atom).and_then(|&i| self.steps.get(i))
    }

    /// Order of the step that assigned `atom`
    pub fn order_of(&self, atom: &GroundAtom) -> Option<usize> {
        self.step_of(atom).map(|step| step.order)
    }

    /// Value assigned to `atom`
    pub fn value_of(&self, atom: &GroundAtom) -> Option<bool> {
        self.step_of(atom).map(|step| step.value)
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if nothing was derived
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(&mut self, step: DerivationStep) -> Result<()> {
        if let Some(previous) = self.step_of(&step.atom) {
            return Err(ExplainError::Inconsistency(format!(
                "{} assigned twice (steps {} and {})",
                step.atom, previous.order, step.order
            )));
        }
        self.index.insert(step.atom.clone(), self.steps.len());
        self.steps.push(step);
        Ok(())
    }
}

struct BodyState<'r> {
    falsified: usize,
    unknown: Vec<(&'r GroundAtom, bool)>,
}

impl BodyState<'_> {
    fn is_true(&self, rule: &GroundRule) -> bool {
        !rule.open && self.falsified == 0 && self.unknown.is_empty()
    }
}

struct Candidate {
    atom: GroundAtom,
    value: bool,
    justification: Justification,
    rule: Option<usize>,
}

/// Replays a relation against the observed answer set
pub struct Tracer<'a> {
    relation: &'a GroundRelation,
    answer_set: &'a AnswerSet,
    query: &'a [GroundAtom],
    universe: Vec<GroundAtom>,
    trace: Trace,
}

impl<'a> Tracer<'a> {
    /// Creates a tracer over the relation atoms and the query atoms
    pub fn new(relation: &'a GroundRelation, answer_set: &'a AnswerSet, query: &'a [GroundAtom]) -> Self {
        let mut universe = relation.atoms();
        universe.extend(query.iter().cloned());
        Self {
            relation,
            answer_set,
            query,
            universe: universe.into_iter().collect(),
            trace: Trace::default(),
        }
    }

    /// Runs the replay to its fixpoint and checks that it reached the query
    ///
    /// For a query of several atoms the core only rules out flipping all of
    /// them at once, so reaching one of them is enough.
    pub fn run(self, observer: &mut dyn Observer) -> Result<Trace> {
        let query = self.query;
        let trace = self.fixpoint(observer)?;
        let missing: Vec<String> = query
            .iter()
            .filter(|atom| trace.step_of(atom).is_none())
            .map(ToString::to_string)
            .collect();
        if !query.is_empty() && missing.len() == query.len() {
            return Err(ExplainError::Inconsistency(format!(
                "replay stalled after {} steps without deriving {}",
                trace.len(),
                missing.join(", ")
            )));
        }
        if !missing.is_empty() {
            debug!(missing = %missing.join(", "), "query atoms left open");
        }
        Ok(trace)
    }

    /// Runs the replay until no atom admits a justification, wherever that
    /// leaves the query
    pub fn fixpoint(mut self, observer: &mut dyn Observer) -> Result<Trace> {
        while let Some(step) = self.next_step()? {
            let observed = self.answer_set.value_of(&step.atom);
            if observed != step.value {
                return Err(ExplainError::Inconsistency(format!(
                    "derived {} = {} by {} but the answer set says {}",
                    step.atom, step.value, step.justification, observed
                )));
            }
            debug!(%step, "derived");
            observer.on_step(&ExplainEvent::TraceStep(&step));
            self.trace.push(step)?;
        }
        Ok(self.trace)
    }

    fn next_step(&self) -> Result<Option<DerivationStep>> {
        let candidate = match self.by_rule()? {
            Some(candidate) => Some(candidate),
            None => self.by_supporter().or_else(|| self.by_lack_of_support()),
        };
        Ok(candidate.map(|c| DerivationStep {
            order: self.trace.len() + 1,
            atom: c.atom,
            value: c.value,
            justification: c.justification,
            rule: c.rule,
        }))
    }

    fn value(&self, atom: &GroundAtom) -> Option<bool> {
        self.trace.value_of(atom)
    }

    fn body_state<'r>(&self, rule: &'r GroundRule) -> BodyState<'r> {
        let mut state = BodyState {
            falsified: 0,
            unknown: Vec::new(),
        };
        for (atom, positive) in rule.body() {
            match self.value(atom) {
                Some(value) if value != positive => state.falsified += 1,
                Some(_) => {}
                None => state.unknown.push((atom, positive)),
            }
        }
        state
    }

    fn by_rule(&self) -> Result<Option<Candidate>> {
        for rule in self.relation.rules() {
            let body = self.body_state(rule);
            let true_heads = rule.head.iter().filter(|a| self.value(a) == Some(true)).count();
            let unknown_heads: Vec<&GroundAtom> =
                rule.head.iter().filter(|a| self.value(a).is_none()).collect();

            if body.is_true(rule) {
                if let Some(&first) = unknown_heads.first() {
                    if true_heads + unknown_heads.len() <= rule.lower {
                        return Ok(Some(Candidate {
                            atom: first.clone(),
                            value: true,
                            justification: Justification::Support,
                            rule: Some(rule.id),
                        }));
                    }
                    if true_heads == rule.upper {
                        return Ok(Some(Candidate {
                            atom: first.clone(),
                            value: false,
                            justification: Justification::Choice,
                            rule: Some(rule.id),
                        }));
                    }
                }
            }

            let unmeetable =
                true_heads > rule.upper || true_heads + unknown_heads.len() < rule.lower;
            if unmeetable && !rule.open && body.falsified == 0 {
                match body.unknown.as_slice() {
                    &[] => {
                        return Err(ExplainError::Inconsistency(format!(
                            "rule r{} is violated: {}",
                            rule.id, rule
                        )))
                    }
                    &[(atom, positive)] => {
                        return Ok(Some(Candidate {
                            atom: atom.clone(),
                            value: !positive,
                            justification: Justification::Constraint,
                            rule: Some(rule.id),
                        }))
                    }
                    _ => {}
                }
            }
        }
        Ok(None)
    }

    fn by_supporter(&self) -> Option<Candidate> {
        for atom in &self.universe {
            if self.value(atom) != Some(true) {
                continue;
            }
            let mut possible = self
                .relation
                .supporters(atom)
                .filter(|rule| self.body_state(rule).falsified == 0);
            let (Some(rule), None) = (possible.next(), possible.next()) else {
                continue;
            };
            if let Some(&(literal, positive)) = self.body_state(rule).unknown.first() {
                return Some(Candidate {
                    atom: literal.clone(),
                    value: positive,
                    justification: Justification::Support,
                    rule: Some(rule.id),
                });
            }
        }
        None
    }

    fn by_lack_of_support(&self) -> Option<Candidate> {
        self.universe
            .iter()
            .filter(|atom| self.value(atom).is_none())
            .find(|atom| {
                self.relation
                    .supporters(atom)
                    .all(|rule| self.body_state(rule).falsified > 0)
            })
            .map(|atom| Candidate {
                atom: atom.clone(),
                value: false,
                justification: Justification::LackOfSupport,
                rule: None,
            })
    }
}
