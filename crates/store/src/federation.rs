//! Federation of datasets queried as one

use crate::{DataSource, QuadPattern};
use mirella_model::Quad;
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

/// An ordered collection of datasets queried as a single dataset
///
/// Members are visited sequentially in registration order and their
/// matches are unioned; quads already produced by an earlier member are
/// suppressed, so the federation behaves as the set union of its members.
#[derive(Clone, Default)]
pub struct Federation {
    members: Vec<Arc<dyn DataSource>>,
}

impl Federation {
    /// Create a new empty federation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member dataset; chainable
    pub fn with_member(mut self, member: Arc<dyn DataSource>) -> Self {
        self.members.push(member);
        self
    }

    /// Append a member dataset
    pub fn add_member(&mut self, member: Arc<dyn DataSource>) {
        self.members.push(member);
    }

    /// Number of member datasets
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

impl DataSource for Federation {
    fn match_pattern<'a>(&'a self, pattern: &QuadPattern) -> Box<dyn Iterator<Item = Quad> + 'a> {
        let mut seen = FxHashSet::default();
        let mut matches = Vec::new();
        for member in &self.members {
            for quad in member.match_pattern(pattern) {
                if seen.insert(quad.clone()) {
                    matches.push(quad);
                }
            }
        }
        Box::new(matches.into_iter())
    }

    fn len(&self) -> usize {
        self.members.iter().map(|m| m.len()).sum()
    }
}

impl fmt::Debug for Federation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Federation")
            .field("members", &self.members.len())
            .finish()
    }
}
