//! Structured rules and programs
//!
//! Rules are immutable once built and are identified by their position in the
//! program. Head cardinality bounds are first-class: a plain atom, a
//! disjunction, a choice and an empty head (constraint) all reduce to a set of
//! head atoms with a lower and an upper bound.

pub mod atom;

pub use atom::{GroundAtom, Literal, Term};

use rustc_hash::FxHashSet;
use std::fmt;

/// Shape of a rule head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadKind {
    /// A single atom: `a :- body.`
    Atom,
    /// A disjunction: `a; b :- body.`
    Disjunction,
    /// A choice, possibly bounded: `L {a; b} U :- body.`
    Choice,
    /// No head: `:- body.`
    Empty,
}

/// The head of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Head {
    atoms: Vec<GroundAtom>,
    kind: HeadKind,
    lower: Option<usize>,
    upper: Option<usize>,
}

impl Head {
    /// A single-atom head
    pub fn atom(atom: GroundAtom) -> Self {
        Self {
            atoms: vec![atom],
            kind: HeadKind::Atom,
            lower: None,
            upper: None,
        }
    }

    /// A disjunctive head; a single alternative collapses to [`Head::atom`]
    pub fn disjunction(mut atoms: Vec<GroundAtom>) -> Self {
        if atoms.len() == 1 {
            if let Some(atom) = atoms.pop() {
                return Self::atom(atom);
            }
        }
        Self {
            atoms,
            kind: HeadKind::Disjunction,
            lower: None,
            upper: None,
        }
    }

    /// A choice head with optional bounds
    pub fn choice(atoms: Vec<GroundAtom>, lower: Option<usize>, upper: Option<usize>) -> Self {
        Self {
            atoms,
            kind: HeadKind::Choice,
            lower,
            upper,
        }
    }

    /// The empty head of a constraint
    pub fn empty() -> Self {
        Self {
            atoms: Vec::new(),
            kind: HeadKind::Empty,
            lower: None,
            upper: None,
        }
    }

    /// Returns the head atoms
    pub fn atoms(&self) -> &[GroundAtom] {
        &self.atoms
    }

    /// Returns the shape of the head
    pub fn kind(&self) -> HeadKind {
        self.kind
    }

    /// Minimum number of head atoms that must be true when the body holds
    ///
    /// An empty head has lower bound 1 and can never be satisfied.
    pub fn lower_bound(&self) -> usize {
        match self.kind {
            HeadKind::Atom | HeadKind::Disjunction | HeadKind::Empty => 1,
            HeadKind::Choice => self.lower.unwrap_or(0),
        }
    }

    /// Maximum number of head atoms that may be true when the body holds
    pub fn upper_bound(&self) -> usize {
        match self.kind {
            HeadKind::Choice => self.upper.unwrap_or(self.atoms.len()),
            _ => self.atoms.len(),
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .atoms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        match self.kind {
            HeadKind::Atom | HeadKind::Disjunction | HeadKind::Empty => write!(f, "{}", joined),
            HeadKind::Choice => {
                if let Some(lower) = self.lower {
                    write!(f, "{}", lower)?;
                }
                write!(f, "{{{}}}", joined)?;
                if let Some(upper) = self.upper {
                    write!(f, "{}", upper)?;
                }
                Ok(())
            }
        }
    }
}

/// A ground rule `head :- body.`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    /// Rule head
    pub head: Head,
    /// Body literals, in source order
    pub body: Vec<Literal>,
}

impl Rule {
    /// Creates a rule
    pub fn new(head: Head, body: Vec<Literal>) -> Self {
        Self { head, body }
    }

    /// Creates a fact `atom.`
    pub fn fact(atom: GroundAtom) -> Self {
        Self::new(Head::atom(atom), Vec::new())
    }

    /// Creates a constraint `:- body.`
    pub fn constraint(body: Vec<Literal>) -> Self {
        Self::new(Head::empty(), body)
    }

    /// Returns a copy of the rule with one more body literal
    pub fn with_extended_body(&self, literal: Literal) -> Self {
        let mut body = self.body.clone();
        body.push(literal);
        Self::new(self.head.clone(), body)
    }

    /// Returns whether the rule is a constraint
    pub fn is_constraint(&self) -> bool {
        self.head.kind() == HeadKind::Empty
    }

    /// Iterates over every atom of the rule, head first
    pub fn atoms(&self) -> impl Iterator<Item = &GroundAtom> {
        self.head
            .atoms()
            .iter()
            .chain(self.body.iter().map(|literal| &literal.atom))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            if self.head.kind() != HeadKind::Empty {
                write!(f, " ")?;
            }
            let body = self
                .body
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, ":- {}", body)?;
        }
        write!(f, ".")
    }
}

/// An ordered sequence of rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    rules: Vec<Rule>,
}

impl Program {
    /// Creates a program from rules in order
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Returns the rules
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the rule at `index`
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the program has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Appends a rule
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Atoms of the program in order of first occurrence
    pub fn herbrand_base(&self) -> Vec<GroundAtom> {
        let mut seen = FxHashSet::default();
        let mut base = Vec::new();
        for atom in self.rules.iter().flat_map(Rule::atoms) {
            if seen.insert(atom) {
                base.push(atom.clone());
            }
        }
        base
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

impl FromIterator<Rule> for Program {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
