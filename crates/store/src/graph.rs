//! In-memory RDF graph

use crate::{DataSource, QuadPattern, StoreError, StoreResult};
use mirella_model::{Quad, Term, Triple};
use rustc_hash::FxHashSet;
use std::fmt;

/// An in-memory RDF graph: an insertion-ordered set of ground triples
///
/// Duplicate triples are ignored on insertion, so a graph is always a set.
/// Iteration yields triples in first-insertion order, which keeps query
/// results deterministic.
#[derive(Clone, Default)]
pub struct Graph {
    triples: Vec<Triple>,
    present: FxHashSet<Triple>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph from a sequence of triples
    pub fn from_triples<I>(triples: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = Triple>,
    {
        let mut graph = Graph::new();
        for triple in triples {
            graph.insert(triple)?;
        }
        Ok(graph)
    }

    /// Insert a triple; returns `true` if it was not already present
    ///
    /// The triple must be ground, with an IRI or blank node subject and an
    /// IRI predicate.
    pub fn insert(&mut self, triple: Triple) -> StoreResult<bool> {
        validate_statement(&triple.subject, &triple.predicate, &triple.object)?;
        if self.present.contains(&triple) {
            return Ok(false);
        }
        self.present.insert(triple.clone());
        self.triples.push(triple);
        Ok(true)
    }

    /// Remove a triple; returns `true` if it was present
    pub fn remove(&mut self, triple: &Triple) -> bool {
        if self.present.remove(triple) {
            self.triples.retain(|t| t != triple);
            true
        } else {
            false
        }
    }

    /// Check if a triple is present
    pub fn contains(&self, triple: &Triple) -> bool {
        self.present.contains(triple)
    }

    /// Number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Iterate over the triples in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Merge all triples of `other` into this graph
    pub fn extend_with(&mut self, other: &Graph) -> StoreResult<()> {
        for triple in other.iter() {
            self.insert(triple.clone())?;
        }
        Ok(())
    }
}

/// Shared statement validation for graphs and quad stores
pub(crate) fn validate_statement(subject: &Term, predicate: &Term, object: &Term) -> StoreResult<()> {
    if subject.is_variable() || predicate.is_variable() || object.is_variable() {
        return Err(StoreError::InvalidStatement(
            "statements must be ground".to_string(),
        ));
    }
    if subject.is_literal() {
        return Err(StoreError::InvalidStatement(
            "subject must be an IRI or blank node".to_string(),
        ));
    }
    if !predicate.is_iri() {
        return Err(StoreError::InvalidStatement(
            "predicate must be an IRI".to_string(),
        ));
    }
    Ok(())
}

impl DataSource for Graph {
    fn match_pattern<'a>(&'a self, pattern: &QuadPattern) -> Box<dyn Iterator<Item = Quad> + 'a> {
        let pattern = pattern.clone();
        Box::new(
            self.triples
                .iter()
                .map(|t| Quad::from(t.clone()))
                .filter(move |q| pattern.matches(q)),
        )
    }

    fn len(&self) -> usize {
        self.triples.len()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("len", &self.len()).finish()
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.present == other.present
    }
}
