//! Answer sets and models
//!
//! An [`AnswerSet`] is the observed solution being explained: an ordered list
//! of atoms with their truth values. Atoms that are not listed are false. The
//! order of the listing is the default priority order of the explanation.
//! A [`Model`] is what the oracle reports back for a satisfiable query.

use crate::ast::GroundAtom;
use crate::error::ExplainError;
use crate::parser::{parse_answer_listing, parse_answer_literal};
use crate::Result;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;

/// The observed solution: an ordered assignment of truth values to atoms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    elements: Vec<(GroundAtom, bool)>,
    values: FxHashMap<GroundAtom, bool>,
}

impl AnswerSet {
    /// Creates an answer set from ordered elements
    ///
    /// Repeating an atom with the same value is harmless; repeating it with
    /// the opposite value is rejected.
    pub fn new(elements: impl IntoIterator<Item = (GroundAtom, bool)>) -> Result<Self> {
        let mut answer_set = Self::default();
        for (atom, value) in elements {
            answer_set.insert(atom, value)?;
        }
        Ok(answer_set)
    }

    /// Creates an answer set in which exactly the given atoms are true
    pub fn of_atoms(atoms: impl IntoIterator<Item = GroundAtom>) -> Self {
        let mut answer_set = Self::default();
        for atom in atoms {
            if !answer_set.values.contains_key(&atom) {
                answer_set.values.insert(atom.clone(), true);
                answer_set.elements.push((atom, true));
            }
        }
        answer_set
    }

    /// Parses entries such as `a`, `p(1)` or `~c` (false)
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let elements = entries
            .iter()
            .map(|entry| parse_answer_literal(entry.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(elements)
    }

    /// Parses a listing such as `a b ~c` or `a. b.`
    pub fn parse_listing(source: &str) -> Result<Self> {
        Self::new(parse_answer_listing(source)?)
    }

    fn insert(&mut self, atom: GroundAtom, value: bool) -> Result<()> {
        match self.values.get(&atom) {
            Some(&previous) if previous != value => Err(ExplainError::MalformedInput(format!(
                "atom {} is listed both as true and as false",
                atom
            ))),
            Some(_) => Ok(()),
            None => {
                self.values.insert(atom.clone(), value);
                self.elements.push((atom, value));
                Ok(())
            }
        }
    }

    /// Truth value of an atom; unlisted atoms are false
    pub fn value_of(&self, atom: &GroundAtom) -> bool {
        self.values.get(atom).copied().unwrap_or(false)
    }

    /// Returns whether the atom is explicitly listed
    pub fn mentions(&self, atom: &GroundAtom) -> bool {
        self.values.contains_key(atom)
    }

    /// The listed elements, in order
    pub fn elements(&self) -> &[(GroundAtom, bool)] {
        &self.elements
    }

    /// Atoms listed as true, in order
    pub fn true_atoms(&self) -> impl Iterator<Item = &GroundAtom> {
        self.elements
            .iter()
            .filter(|(_, value)| *value)
            .map(|(atom, _)| atom)
    }

    /// Number of listed elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if nothing is listed
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns a copy listing every atom of `base`: missing atoms are
    /// appended as false, in the order of `base`
    pub fn completed(&self, base: &[GroundAtom]) -> Self {
        let mut completed = self.clone();
        for atom in base {
            if !completed.values.contains_key(atom) {
                completed.values.insert(atom.clone(), false);
                completed.elements.push((atom.clone(), false));
            }
        }
        completed
    }
}

impl fmt::Display for AnswerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .elements
            .iter()
            .map(|(atom, value)| if *value { atom.to_string() } else { format!("~{}", atom) })
            .collect::<Vec<_>>();
        write!(f, "{}", entries.join(" "))
    }
}

/// The true atoms of a satisfying assignment reported by the oracle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    atoms: BTreeSet<GroundAtom>,
}

impl Model {
    /// Creates a model from its true atoms
    pub fn new(atoms: impl IntoIterator<Item = GroundAtom>) -> Self {
        Self {
            atoms: atoms.into_iter().collect(),
        }
    }

    /// Returns whether the atom is true in the model
    pub fn contains(&self, atom: &GroundAtom) -> bool {
        self.atoms.contains(atom)
    }

    /// True atoms in structural order
    pub fn atoms(&self) -> impl Iterator<Item = &GroundAtom> {
        self.atoms.iter()
    }

    /// Returns a copy without the atoms of the given predicates
    pub fn without_predicates(&self, predicates: &[&str]) -> Self {
        Self::new(
            self.atoms
                .iter()
                .filter(|atom| !predicates.contains(&atom.predicate()))
                .cloned(),
        )
    }

    /// Number of true atoms
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns true if no atom is true
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let atoms = self.atoms.iter().map(ToString::to_string).collect::<Vec<_>>();
        write!(f, "{}", atoms.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_atom;

    fn atom(s: &str) -> GroundAtom {
        parse_atom(s).unwrap()
    }

    #[test]
    fn unlisted_atoms_are_false() {
        let answer_set = AnswerSet::parse(&["a", "~b"]).unwrap();
        assert!(answer_set.value_of(&atom("a")));
        assert!(!answer_set.value_of(&atom("b")));
        assert!(!answer_set.value_of(&atom("c")));
        assert!(answer_set.mentions(&atom("b")));
        assert!(!answer_set.mentions(&atom("c")));
    }

    #[test]
    fn conflicting_values_are_rejected() {
        let err = AnswerSet::parse(&["a", "~a"]).unwrap_err();
        assert!(matches!(err, ExplainError::MalformedInput(_)));
        // repeating the same value is fine
        assert_eq!(AnswerSet::parse(&["a", "a"]).unwrap().len(), 1);
    }

    #[test]
    fn completion_appends_missing_atoms_in_base_order() {
        let answer_set = AnswerSet::parse_listing("c").unwrap();
        let completed = answer_set.completed(&[atom("a"), atom("c"), atom("b")]);
        let listed: Vec<_> = completed.elements().iter().map(|(a, v)| (a.to_string(), *v)).collect();
        assert_eq!(
            listed,
            vec![("c".into(), true), ("a".into(), false), ("b".into(), false)]
        );
    }

    #[test]
    fn display_marks_false_atoms() {
        let answer_set = AnswerSet::parse(&["a", "~p(1)"]).unwrap();
        assert_eq!(answer_set.to_string(), "a ~p(1)");
    }

    #[test]
    fn model_filters_predicates() {
        let model = Model::new(vec![atom("a"), atom("__mus__(program,0)")]);
        let visible = model.without_predicates(&["__mus__"]);
        assert_eq!(visible.len(), 1);
        assert!(visible.contains(&atom("a")));
    }
}
