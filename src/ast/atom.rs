//! Ground terms, atoms and literals
//!
//! A ground atom is the unit of truth assignment. Identity is structural, and
//! the derived ordering is used wherever a deterministic order over atoms is
//! needed (trace tie-breaks, model listings).

use serde::{Serialize, Serializer};
use std::fmt;

/// A ground term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// Integer constant
    Int(i64),
    /// Symbolic constant (lowercase identifier)
    Constant(String),
    /// Quoted string
    Str(String),
    /// Function term `f(t1, ..., tn)`
    Function(String, Vec<Term>),
    /// Tuple term `(t1, ..., tn)`
    Tuple(Vec<Term>),
}

impl Term {
    /// Creates a symbolic constant
    pub fn constant(name: impl Into<String>) -> Self {
        Term::Constant(name.into())
    }

    /// Returns the integer value, if this term is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the symbol name, if this term is a constant
    pub fn as_constant(&self) -> Option<&str> {
        match self {
            Term::Constant(name) => Some(name),
            _ => None,
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Int(n) => write!(f, "{}", n),
            Term::Constant(name) => write!(f, "{}", name),
            Term::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Term::Function(name, args) => {
                write!(f, "{}(", name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Term::Tuple(args) => {
                write!(f, "(")?;
                write_args(f, args)?;
                if args.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Term::Int(n)
    }
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Term::Constant(name.to_string())
    }
}

/// A fully instantiated predicate application
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroundAtom {
    predicate: String,
    args: Vec<Term>,
}

impl GroundAtom {
    /// Creates an atom from a predicate name and its arguments
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    /// Creates a propositional atom (no arguments)
    pub fn propositional(predicate: impl Into<String>) -> Self {
        Self::new(predicate, Vec::new())
    }

    /// Returns the predicate name
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Returns the arguments
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    /// Returns the arity
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Returns the positive literal over this atom
    pub fn positive(&self) -> Literal {
        Literal::new(self.clone(), true)
    }

    /// Returns the negative literal over this atom
    pub fn negative(&self) -> Literal {
        Literal::new(self.clone(), false)
    }
}

impl fmt::Display for GroundAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            write_args(f, &self.args)?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Serialize for GroundAtom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A body literal: an atom under default negation or not
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    /// The atom
    pub atom: GroundAtom,
    /// False for `not atom`
    pub positive: bool,
}

impl Literal {
    /// Creates a literal
    pub fn new(atom: GroundAtom, positive: bool) -> Self {
        Self { atom, positive }
    }

    /// Returns the complementary literal
    pub fn negate(&self) -> Self {
        Self::new(self.atom.clone(), !self.positive)
    }

    /// Returns whether the literal holds when its atom has the given value
    pub fn holds_under(&self, value: bool) -> bool {
        value == self.positive
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{}", self.atom)
        } else {
            write!(f, "not {}", self.atom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_display() {
        let atom = GroundAtom::new("__mus__", vec![Term::constant("program"), Term::Int(3)]);
        assert_eq!(atom.to_string(), "__mus__(program,3)");
        assert_eq!(GroundAtom::propositional("a").to_string(), "a");
    }

    #[test]
    fn nested_terms_display() {
        let cell = Term::Tuple(vec![Term::Int(1), Term::Int(2)]);
        let atom = GroundAtom::new("assign", vec![cell, Term::Int(-4)]);
        assert_eq!(atom.to_string(), "assign((1,2),-4)");

        let single = Term::Tuple(vec![Term::constant("x")]);
        assert_eq!(single.to_string(), "(x,)");

        let f = Term::Function("f".into(), vec![Term::Str("a\"b".into())]);
        assert_eq!(f.to_string(), "f(\"a\\\"b\")");
    }

    #[test]
    fn literal_semantics() {
        let a = GroundAtom::propositional("a");
        assert!(a.positive().holds_under(true));
        assert!(!a.positive().holds_under(false));
        assert!(a.negative().holds_under(false));
        assert_eq!(a.negative().to_string(), "not a");
        assert_eq!(a.negative().negate(), a.positive());
    }

    #[test]
    fn atoms_are_structurally_equal() {
        let a1 = GroundAtom::new("p", vec![Term::Int(1)]);
        let a2 = GroundAtom::new("p", vec![Term::Int(1)]);
        let b = GroundAtom::new("p", vec![Term::Int(2)]);
        assert_eq!(a1, a2);
        assert!(a1 < b);
    }

    #[test]
    fn atom_serializes_as_text() {
        let atom = GroundAtom::new("p", vec![Term::constant("a"), Term::Int(1)]);
        assert_eq!(serde_json::to_string(&atom).unwrap(), "\"p(a,1)\"");
    }
}
