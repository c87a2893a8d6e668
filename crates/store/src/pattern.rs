//! Query pattern types for quad matching

use mirella_model::{Quad, Term};

/// Pattern for matching a single term position
///
/// `Any` is a wildcard that matches every term.
#[derive(Clone, Debug, PartialEq)]
pub enum TermPattern {
    /// Match any term (wildcard)
    Any,

    /// Match a specific term
    Concrete(Term),
}

impl TermPattern {
    /// Check if this pattern matches a term
    pub fn matches(&self, term: &Term) -> bool {
        match self {
            TermPattern::Any => true,
            TermPattern::Concrete(t) => t == term,
        }
    }

    /// Check if this is a wildcard pattern
    pub fn is_wildcard(&self) -> bool {
        matches!(self, TermPattern::Any)
    }

    /// Get the concrete term, if any
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            TermPattern::Concrete(t) => Some(t),
            TermPattern::Any => None,
        }
    }
}

impl From<Option<Term>> for TermPattern {
    fn from(opt: Option<Term>) -> Self {
        match opt {
            Some(term) => term.into(),
            None => TermPattern::Any,
        }
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        // A variable slot is a wildcard; anything ground matches exactly.
        if term.is_variable() {
            TermPattern::Any
        } else {
            TermPattern::Concrete(term)
        }
    }
}

/// Pattern for matching quads
///
/// Each position can be a concrete term or a wildcard. The graph position
/// distinguishes "any graph" (`Any`) from a specific named graph; quads in
/// the default graph match only wildcard graph patterns.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadPattern {
    /// Subject pattern
    pub subject: TermPattern,

    /// Predicate pattern
    pub predicate: TermPattern,

    /// Object pattern
    pub object: TermPattern,

    /// Graph pattern
    pub graph: TermPattern,
}

impl QuadPattern {
    /// Create a new quad pattern
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
        graph: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph: graph.into(),
        }
    }

    /// Create a pattern that matches everything
    pub fn all() -> Self {
        Self {
            subject: TermPattern::Any,
            predicate: TermPattern::Any,
            object: TermPattern::Any,
            graph: TermPattern::Any,
        }
    }

    /// Check if a quad matches this pattern
    pub fn matches(&self, quad: &Quad) -> bool {
        self.subject.matches(&quad.subject)
            && self.predicate.matches(&quad.predicate)
            && self.object.matches(&quad.object)
            && match (&self.graph, &quad.graph) {
                (TermPattern::Any, _) => true,
                (TermPattern::Concrete(pg), Some(qg)) => pg == qg,
                (TermPattern::Concrete(_), None) => false,
            }
    }

    /// Count how many positions are bound (not wildcards)
    pub fn bound_count(&self) -> usize {
        [&self.subject, &self.predicate, &self.object, &self.graph]
            .into_iter()
            .filter(|p| !p.is_wildcard())
            .count()
    }
}

impl Default for QuadPattern {
    fn default() -> Self {
        Self::all()
    }
}
