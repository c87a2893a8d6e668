//! RDF quads

use crate::{Term, Triple};
use std::fmt;

/// An RDF quad: a triple plus an optional named graph context
///
/// `graph: None` places the triple in the default graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quad {
    /// Subject position
    pub subject: Term,
    /// Predicate position
    pub predicate: Term,
    /// Object position
    pub object: Term,
    /// Named graph context (`None` for the default graph)
    pub graph: Option<Term>,
}

impl Quad {
    /// Create a new quad
    pub fn new(subject: Term, predicate: Term, object: Term, graph: Option<Term>) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Check if every position is ground (no variables)
    pub fn is_ground(&self) -> bool {
        self.subject.is_ground()
            && self.predicate.is_ground()
            && self.object.is_ground()
            && self.graph.as_ref().map_or(true, Term::is_ground)
    }

    /// The triple part of this quad, dropping the graph context
    pub fn as_triple(&self) -> Triple {
        Triple::new(
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
        )
    }
}

impl From<Triple> for Quad {
    fn from(triple: Triple) -> Self {
        Quad::new(triple.subject, triple.predicate, triple.object, None)
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph {
            Some(g) => write!(
                f,
                "{} {} {} {} .",
                self.subject, self.predicate, self.object, g
            ),
            None => write!(f, "{} {} {} .", self.subject, self.predicate, self.object),
        }
    }
}
