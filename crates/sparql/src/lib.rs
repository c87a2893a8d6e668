//! SPARQL 1.1 query engine
//!
//! Queries are assembled with a builder API (no textual parsing), compiled
//! into a relational algebra over tabular bindings, and evaluated against
//! any [`mirella_store::DataSource`]: an in-memory graph, a quad store, or
//! a federation. Alternatively a query is printed to SPARQL text and
//! dispatched to a remote endpoint.
//!
//! The evaluation pipeline: per pattern group, patterns are matched against
//! the dataset and joined under compatible-binding semantics; groups are
//! combined honouring OPTIONAL/UNION/MINUS; filters and expressions run
//! row-by-row; GROUP BY aggregation, ORDER BY, DISTINCT and LIMIT/OFFSET
//! apply in a fixed order; results materialise as a binding table
//! (SELECT/ASK) or an RDF graph (DESCRIBE/CONSTRUCT).

mod aggregates;
mod bindings;
mod endpoint;
mod engine;
mod error;
mod eval;
mod expression;
mod paths;
mod printer;
mod query;
mod results;

pub use aggregates::{aggregate_rows, Aggregator};
pub use bindings::{BindingTable, RowView};
pub use eval::evaluate as evaluate_expression;
pub use endpoint::{EndpointDescriptor, ErrorPolicy};
pub use engine::QueryEngine;
pub use error::QueryError;
pub use expression::{Expression, Function};
pub use paths::PropertyPath;
pub use printer::Printer;
pub use query::{
    AskQuery, ConstructQuery, DescribeQuery, Filter, GroupMember, GroupOperator, OrderDirection,
    PathPattern, Pattern, PatternGroup, Prefix, ProjectionElement, SelectQuery, TriplePattern,
    ValuesTable,
};
pub use results::{AskResult, SelectResult};
