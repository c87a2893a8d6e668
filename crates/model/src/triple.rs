//! RDF triples

use crate::Term;
use std::fmt;

/// An RDF triple
///
/// Positions are plain terms; patterns with variable slots reuse the same
/// type. Containers that require ground data validate on insertion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Triple {
    /// Subject position
    pub subject: Term,
    /// Predicate position
    pub predicate: Term,
    /// Object position
    pub object: Term,
}

impl Triple {
    /// Create a new triple
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Check if every position is ground (no variables)
    pub fn is_ground(&self) -> bool {
        self.subject.is_ground() && self.predicate.is_ground() && self.object.is_ground()
    }

    /// Variable names appearing in this triple, in position order
    pub fn variables(&self) -> Vec<&str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(|t| t.as_variable())
            .collect()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_display() {
        let triple = Triple::new(
            Term::iri("http://example.org/a"),
            Term::iri("http://example.org/p"),
            Term::literal("v"),
        );

        assert_eq!(
            triple.to_string(),
            "<http://example.org/a> <http://example.org/p> \"v\" ."
        );
    }

    #[test]
    fn test_triple_variables() {
        let triple = Triple::new(
            Term::variable("s"),
            Term::iri("http://example.org/p"),
            Term::variable("o"),
        );

        assert!(!triple.is_ground());
        assert_eq!(triple.variables(), vec!["s", "o"]);
    }
}
