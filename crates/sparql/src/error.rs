//! Error types for query construction and evaluation

use thiserror::Error;

/// Error type for query evaluation
///
/// Expression-level type errors are deliberately absent: per SPARQL
/// semantics they are swallowed where they occur and surface as unbound
/// cells, never as errors.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Structural violation detected before evaluation
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// Unrecoverable runtime failure
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Remote endpoint failure under the `ThrowException` policy
    #[error("endpoint request failed: {message}")]
    Endpoint {
        /// What went wrong
        message: String,
        /// Underlying transport error, when one exists
        #[source]
        source: Option<reqwest::Error>,
    },
}
