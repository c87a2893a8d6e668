//! Property path evaluation
//!
//! A property path is a small algebra over predicate IRIs. Evaluation
//! yields the set of (start, end) term pairs connected by the path;
//! binding those pairs against the subject/object slots of a path pattern
//! produces an ordinary binding table. Star and plus close over the
//! dataset with a breadth-first fixpoint, deduplicating pairs so cycles
//! terminate.

use crate::bindings::BindingTable;
use crate::query::PathPattern;
use mirella_model::Term;
use mirella_store::{DataSource, QuadPattern, TermPattern};
use rustc_hash::{FxHashMap, FxHashSet};

/// A property path expression over predicate IRIs
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyPath {
    /// A single predicate step
    Predicate(Term),

    /// Inverse path (`^p`)
    Inverse(Box<PropertyPath>),

    /// Sequence path (`p1 / p2`)
    Sequence(Box<PropertyPath>, Box<PropertyPath>),

    /// Alternative path (`p1 | p2`)
    Alternative(Box<PropertyPath>, Box<PropertyPath>),

    /// Zero or one step (`p?`)
    ZeroOrOne(Box<PropertyPath>),

    /// Zero or more steps (`p*`)
    ZeroOrMore(Box<PropertyPath>),

    /// One or more steps (`p+`)
    OneOrMore(Box<PropertyPath>),

    /// Any predicate not in the set (`!(p1|p2|...)`)
    NegatedPropertySet(Vec<Term>),
}

impl PropertyPath {
    /// A single predicate step
    pub fn predicate(iri: Term) -> Self {
        PropertyPath::Predicate(iri)
    }

    /// `^self`
    pub fn inverse(self) -> Self {
        PropertyPath::Inverse(Box::new(self))
    }

    /// `self / next`
    pub fn then(self, next: PropertyPath) -> Self {
        PropertyPath::Sequence(Box::new(self), Box::new(next))
    }

    /// `self | other`
    pub fn alternative(self, other: PropertyPath) -> Self {
        PropertyPath::Alternative(Box::new(self), Box::new(other))
    }

    /// `self?`
    pub fn zero_or_one(self) -> Self {
        PropertyPath::ZeroOrOne(Box::new(self))
    }

    /// `self*`
    pub fn zero_or_more(self) -> Self {
        PropertyPath::ZeroOrMore(Box::new(self))
    }

    /// `self+`
    pub fn one_or_more(self) -> Self {
        PropertyPath::OneOrMore(Box::new(self))
    }

    /// `!(predicates...)`
    pub fn negated(predicates: Vec<Term>) -> Self {
        PropertyPath::NegatedPropertySet(predicates)
    }
}

/// An insertion-ordered, deduplicated set of (start, end) pairs
#[derive(Default)]
struct PairSet {
    pairs: Vec<(Term, Term)>,
    seen: FxHashSet<(Term, Term)>,
}

impl PairSet {
    fn insert(&mut self, pair: (Term, Term)) -> bool {
        if self.seen.insert(pair.clone()) {
            self.pairs.push(pair);
            true
        } else {
            false
        }
    }

    fn extend(&mut self, other: PairSet) {
        for pair in other.pairs {
            self.insert(pair);
        }
    }
}

/// Evaluate a path pattern into a binding table over its variable slots
pub(crate) fn evaluate_path(source: &dyn DataSource, pattern: &PathPattern) -> BindingTable {
    // Ground endpoints seed the zero-length matches of `?`/`*` even when
    // the term is absent from the dataset.
    let mut seeds: Vec<Term> = Vec::new();
    if pattern.subject.is_ground() {
        seeds.push(pattern.subject.clone());
    }
    if pattern.object.is_ground() && !seeds.contains(&pattern.object) {
        seeds.push(pattern.object.clone());
    }
    let pairs = path_pairs(source, &pattern.path, &seeds);

    let mut columns: Vec<String> = Vec::new();
    if let Some(v) = pattern.subject.as_variable() {
        columns.push(v.to_string());
    }
    if let Some(v) = pattern.object.as_variable() {
        if !columns.iter().any(|c| c == v) {
            columns.push(v.to_string());
        }
    }
    let mut table = BindingTable::with_columns(columns);

    let same_variable = matches!(
        (pattern.subject.as_variable(), pattern.object.as_variable()),
        (Some(s), Some(o)) if s == o
    );

    for (start, end) in pairs.pairs {
        if pattern.subject.is_ground() && pattern.subject != start {
            continue;
        }
        if pattern.object.is_ground() && pattern.object != end {
            continue;
        }
        if same_variable && start != end {
            continue;
        }

        let mut cells = Vec::new();
        if pattern.subject.as_variable().is_some() {
            cells.push(Some(start.clone()));
        }
        if pattern.object.as_variable().is_some() && !same_variable {
            cells.push(Some(end.clone()));
        }
        table.push_row(cells);
    }

    table
}

/// All (start, end) pairs connected by the path
///
/// `seeds` carries the ground endpoints of the pattern under evaluation,
/// so zero-length steps can match terms the dataset never mentions.
fn path_pairs(source: &dyn DataSource, path: &PropertyPath, seeds: &[Term]) -> PairSet {
    match path {
        PropertyPath::Predicate(predicate) => {
            let pattern = QuadPattern::new(
                TermPattern::Any,
                predicate.clone(),
                TermPattern::Any,
                TermPattern::Any,
            );
            let mut set = PairSet::default();
            for quad in source.match_pattern(&pattern) {
                set.insert((quad.subject, quad.object));
            }
            set
        }

        PropertyPath::Inverse(inner) => {
            let mut set = PairSet::default();
            for (start, end) in path_pairs(source, inner, seeds).pairs {
                set.insert((end, start));
            }
            set
        }

        PropertyPath::Sequence(first, second) => {
            let left = path_pairs(source, first, seeds);
            let right = path_pairs(source, second, seeds);

            // Index the second leg by its start for the middle join.
            let mut by_start: FxHashMap<Term, Vec<Term>> = FxHashMap::default();
            for (start, end) in right.pairs {
                by_start.entry(start).or_default().push(end);
            }

            let mut set = PairSet::default();
            for (start, middle) in left.pairs {
                if let Some(ends) = by_start.get(&middle) {
                    for end in ends {
                        set.insert((start.clone(), end.clone()));
                    }
                }
            }
            set
        }

        PropertyPath::Alternative(left, right) => {
            let mut set = path_pairs(source, left, seeds);
            set.extend(path_pairs(source, right, seeds));
            set
        }

        PropertyPath::ZeroOrOne(inner) => {
            let mut set = identity_pairs(source, seeds);
            set.extend(path_pairs(source, inner, seeds));
            set
        }

        PropertyPath::ZeroOrMore(inner) => {
            let mut set = identity_pairs(source, seeds);
            set.extend(closure(path_pairs(source, inner, seeds)));
            set
        }

        PropertyPath::OneOrMore(inner) => closure(path_pairs(source, inner, seeds)),

        PropertyPath::NegatedPropertySet(excluded) => {
            let mut set = PairSet::default();
            for quad in source.match_pattern(&QuadPattern::all()) {
                if !excluded.contains(&quad.predicate) {
                    set.insert((quad.subject, quad.object));
                }
            }
            set
        }
    }
}

/// Zero-length path matches: the ground endpoints of the pattern under
/// evaluation plus every node of the dataset
///
/// A zero-length path connects any term to itself, so a ground endpoint
/// matches even when no statement mentions it.
fn identity_pairs(source: &dyn DataSource, seeds: &[Term]) -> PairSet {
    let mut set = PairSet::default();
    for term in seeds {
        set.insert((term.clone(), term.clone()));
    }
    for quad in source.match_pattern(&QuadPattern::all()) {
        set.insert((quad.subject.clone(), quad.subject));
        set.insert((quad.object.clone(), quad.object));
    }
    set
}

/// Transitive closure by iterated one-step composition
///
/// Each round extends the frontier by one more base step; pairs are
/// deduplicated by (start, end), so cyclic graphs reach a fixpoint.
fn closure(base: PairSet) -> PairSet {
    let mut by_start: FxHashMap<Term, Vec<Term>> = FxHashMap::default();
    for (start, end) in &base.pairs {
        by_start
            .entry(start.clone())
            .or_default()
            .push(end.clone());
    }

    let mut result = PairSet::default();
    let mut frontier: Vec<(Term, Term)> = Vec::new();
    for pair in base.pairs {
        if result.insert(pair.clone()) {
            frontier.push(pair);
        }
    }

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (start, middle) in frontier {
            if let Some(ends) = by_start.get(&middle) {
                for end in ends {
                    let pair = (start.clone(), end.clone());
                    if result.insert(pair.clone()) {
                        next.push(pair);
                    }
                }
            }
        }
        frontier = next;
    }

    result
}
