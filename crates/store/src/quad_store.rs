//! Indexed in-memory quad store

use crate::graph::validate_statement;
use crate::{DataSource, Graph, QuadPattern, StoreResult, TermPattern};
use mirella_model::{Quad, Term};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// An in-memory quad store with per-position indexes
///
/// Quads are kept in insertion order; subject, predicate, object and graph
/// indexes answer bound-position lookups without scanning. The most
/// selective index (smallest posting list) is chosen per query pattern.
#[derive(Clone, Default)]
pub struct QuadStore {
    quads: Vec<Quad>,
    present: FxHashSet<Quad>,
    by_subject: FxHashMap<Term, Vec<usize>>,
    by_predicate: FxHashMap<Term, Vec<usize>>,
    by_object: FxHashMap<Term, Vec<usize>>,
    by_graph: FxHashMap<Option<Term>, Vec<usize>>,
}

impl QuadStore {
    /// Create a new empty quad store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quad; returns `true` if it was not already present
    pub fn insert(&mut self, quad: Quad) -> StoreResult<bool> {
        validate_statement(&quad.subject, &quad.predicate, &quad.object)?;
        if self.present.contains(&quad) {
            return Ok(false);
        }

        let idx = self.quads.len();
        self.by_subject
            .entry(quad.subject.clone())
            .or_default()
            .push(idx);
        self.by_predicate
            .entry(quad.predicate.clone())
            .or_default()
            .push(idx);
        self.by_object
            .entry(quad.object.clone())
            .or_default()
            .push(idx);
        self.by_graph.entry(quad.graph.clone()).or_default().push(idx);
        self.present.insert(quad.clone());
        self.quads.push(quad);
        Ok(true)
    }

    /// Merge every triple of a graph into the store under `context`
    pub fn insert_graph(&mut self, graph: &Graph, context: Option<Term>) -> StoreResult<()> {
        for triple in graph.iter() {
            let mut quad = Quad::from(triple.clone());
            quad.graph = context.clone();
            self.insert(quad)?;
        }
        Ok(())
    }

    /// Check if a quad is present
    pub fn contains(&self, quad: &Quad) -> bool {
        self.present.contains(quad)
    }

    /// Number of quads
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Iterate over the quads in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    /// The smallest posting list usable for this pattern, if any position
    /// is bound. Candidate indices are always sorted, so filtered
    /// iteration preserves insertion order.
    fn candidates(&self, pattern: &QuadPattern) -> Option<&[usize]> {
        fn consider<'a>(best: &mut Option<&'a [usize]>, list: Option<&'a Vec<usize>>) {
            // A bound position with no posting list means no match at all.
            let list = list.map(Vec::as_slice).unwrap_or(&[]);
            if best.map_or(true, |b| list.len() < b.len()) {
                *best = Some(list);
            }
        }

        let mut best: Option<&[usize]> = None;

        if let TermPattern::Concrete(t) = &pattern.subject {
            consider(&mut best, self.by_subject.get(t));
        }
        if let TermPattern::Concrete(t) = &pattern.predicate {
            consider(&mut best, self.by_predicate.get(t));
        }
        if let TermPattern::Concrete(t) = &pattern.object {
            consider(&mut best, self.by_object.get(t));
        }
        if let TermPattern::Concrete(t) = &pattern.graph {
            consider(&mut best, self.by_graph.get(&Some(t.clone())));
        }

        best
    }
}

impl DataSource for QuadStore {
    fn match_pattern<'a>(&'a self, pattern: &QuadPattern) -> Box<dyn Iterator<Item = Quad> + 'a> {
        let pattern = pattern.clone();
        match self.candidates(&pattern) {
            Some(indices) => Box::new(
                indices
                    .iter()
                    .map(|&i| &self.quads[i])
                    .filter(move |q| pattern.matches(q))
                    .cloned(),
            ),
            None => Box::new(self.quads.iter().filter(move |q| pattern.matches(q)).cloned()),
        }
    }

    fn len(&self) -> usize {
        self.quads.len()
    }
}

impl fmt::Debug for QuadStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuadStore").field("len", &self.len()).finish()
    }
}
