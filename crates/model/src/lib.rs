//! RDF term model
//!
//! Implements the core RDF data model shared by every other crate in the
//! workspace: terms (IRIs, blank nodes, literals, variables), triples,
//! quads, and the standard vocabularies.
//!
//! Terms are owned values backed by shared `Arc<str>` lexical forms, so
//! cloning a term never copies its text and terms can cross task
//! boundaries freely.

mod quad;
mod term;
mod triple;
mod vocab;

pub use quad::Quad;
pub use term::{Literal, Term};
pub use triple::Triple;
pub use vocab::Vocabulary;
