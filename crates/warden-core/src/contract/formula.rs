//! Temporal formula AST and its canonical text form.

use std::collections::BTreeSet;
use std::fmt;

/// A finite-trace linear temporal logic formula.
///
/// Leaves reference predicate names only. `Globally` and `Eventually` are
/// kept as nodes (rather than desugared) so that formatting reproduces what
/// the author wrote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    True,
    False,
    Atom(String),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    /// `X φ`: φ holds at the next position
    Next(Box<Formula>),
    /// `φ U ψ`: ψ eventually holds, and φ holds at every position before it
    Until(Box<Formula>, Box<Formula>),
    /// `G φ`: φ holds at every remaining position
    Globally(Box<Formula>),
    /// `F φ`: φ holds at some remaining position
    Eventually(Box<Formula>),
}

impl Formula {
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    pub fn not(inner: Formula) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn and(lhs: Formula, rhs: Formula) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Formula, rhs: Formula) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn implies(lhs: Formula, rhs: Formula) -> Self {
        Self::Implies(Box::new(lhs), Box::new(rhs))
    }

    pub fn next(inner: Formula) -> Self {
        Self::Next(Box::new(inner))
    }

    pub fn until(lhs: Formula, rhs: Formula) -> Self {
        Self::Until(Box::new(lhs), Box::new(rhs))
    }

    pub fn globally(inner: Formula) -> Self {
        Self::Globally(Box::new(inner))
    }

    pub fn eventually(inner: Formula) -> Self {
        Self::Eventually(Box::new(inner))
    }

    /// Direct sub-formulas, left to right.
    pub fn children(&self) -> Vec<&Formula> {
        match self {
            Self::True | Self::False | Self::Atom(_) => vec![],
            Self::Not(inner)
            | Self::Next(inner)
            | Self::Globally(inner)
            | Self::Eventually(inner) => vec![inner],
            Self::And(lhs, rhs)
            | Self::Or(lhs, rhs)
            | Self::Implies(lhs, rhs)
            | Self::Until(lhs, rhs) => vec![lhs, rhs],
        }
    }

    /// Number of sub-formula nodes, this one included.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Predicate names referenced anywhere in the formula.
    pub fn predicates(&self) -> BTreeSet<&str> {
        let mut found = BTreeSet::new();
        self.collect_predicates(&mut found);
        found
    }

    fn collect_predicates<'a>(&'a self, found: &mut BTreeSet<&'a str>) {
        if let Self::Atom(name) = self {
            found.insert(name.as_str());
        }
        for child in self.children() {
            child.collect_predicates(found);
        }
    }
}

/// Canonical, fully parenthesized form. Atoms and constants are bare.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
            Self::Atom(name) => f.write_str(name),
            Self::Not(inner) => write!(f, "(! {})", inner),
            Self::Next(inner) => write!(f, "(X {})", inner),
            Self::Globally(inner) => write!(f, "(G {})", inner),
            Self::Eventually(inner) => write!(f, "(F {})", inner),
            Self::And(lhs, rhs) => write!(f, "({} & {})", lhs, rhs),
            Self::Or(lhs, rhs) => write!(f, "({} | {})", lhs, rhs),
            Self::Implies(lhs, rhs) => write!(f, "({} -> {})", lhs, rhs),
            Self::Until(lhs, rhs) => write!(f, "({} U {})", lhs, rhs),
        }
    }
}
