//! Remote SPARQL endpoint dispatch
//!
//! A printed query travels to the endpoint over HTTP: GET with the
//! URL-encoded `query` parameter, or a POST form when the text outgrows a
//! sensible URL. The `Accept` header selects the response form per query
//! kind: SPARQL Results JSON for SELECT/ASK, Turtle (N-Triples) for
//! DESCRIBE/CONSTRUCT. Transport failures honour the descriptor's error
//! policy.

use crate::error::QueryError;
use crate::results::{AskResult, SelectResult};
use mirella_store::{io, Graph};
use std::time::Duration;
use tracing::debug;

/// Queries longer than this are POSTed instead of sent as a GET parameter
const MAX_GET_QUERY_LEN: usize = 2000;

const ACCEPT_BINDINGS: &str = "application/sparql-results+json";
const ACCEPT_GRAPH: &str = "text/turtle, application/n-triples;q=0.9";

/// What to do when the endpoint cannot be reached or answers with an error
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Surface the failure to the caller
    #[default]
    ThrowException,
    /// Swallow the failure and return an empty result
    ReturnEmptyResult,
}

/// Connection parameters of a remote SPARQL endpoint
#[derive(Clone, Debug)]
pub struct EndpointDescriptor {
    base_url: String,
    params: Vec<(String, String)>,
    credentials: Option<(String, String)>,
    timeout: Duration,
    error_policy: ErrorPolicy,
}

impl EndpointDescriptor {
    /// Describe an endpoint at the given base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            params: Vec::new(),
            credentials: None,
            timeout: Duration::from_millis(30_000),
            error_policy: ErrorPolicy::default(),
        }
    }

    /// Append an extra query parameter sent with every request; chainable
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Authenticate with HTTP basic auth; chainable
    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        self.credentials = Some((user.to_string(), password.to_string()));
        self
    }

    /// Per-call timeout in milliseconds; chainable
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// Error policy for transport failures; chainable
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// The endpoint base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configured error policy
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }
}

/// Dispatch a printed SELECT query
pub(crate) fn select(
    descriptor: &EndpointDescriptor,
    query_text: &str,
) -> Result<SelectResult, QueryError> {
    match dispatch(descriptor, query_text, ACCEPT_BINDINGS)? {
        Some(body) => SelectResult::from_json(&body),
        None => Ok(SelectResult::new(crate::bindings::BindingTable::new())),
    }
}

/// Dispatch a printed ASK query
pub(crate) fn ask(
    descriptor: &EndpointDescriptor,
    query_text: &str,
) -> Result<AskResult, QueryError> {
    match dispatch(descriptor, query_text, ACCEPT_BINDINGS)? {
        Some(body) => AskResult::from_json(&body),
        None => Ok(AskResult { value: false }),
    }
}

/// Dispatch a printed CONSTRUCT or DESCRIBE query
pub(crate) fn graph(
    descriptor: &EndpointDescriptor,
    query_text: &str,
) -> Result<Graph, QueryError> {
    match dispatch(descriptor, query_text, ACCEPT_GRAPH)? {
        Some(body) => io::read_ntriples(&body)
            .map_err(|e| QueryError::Evaluation(format!("invalid graph response: {}", e))),
        None => Ok(Graph::new()),
    }
}

/// Issue the HTTP request; `None` means the error policy swallowed a failure
fn dispatch(
    descriptor: &EndpointDescriptor,
    query_text: &str,
    accept: &str,
) -> Result<Option<String>, QueryError> {
    debug!(
        endpoint = %descriptor.base_url,
        bytes = query_text.len(),
        "dispatching query to endpoint"
    );

    let client = reqwest::blocking::Client::builder()
        .timeout(descriptor.timeout)
        .build()
        .map_err(|e| QueryError::Endpoint {
            message: "failed to build HTTP client".to_string(),
            source: Some(e),
        })?;

    let mut request = if query_text.len() <= MAX_GET_QUERY_LEN {
        client
            .get(&descriptor.base_url)
            .query(&[("query", query_text)])
    } else {
        client
            .post(&descriptor.base_url)
            .form(&[("query", query_text)])
    };
    for (name, value) in &descriptor.params {
        request = request.query(&[(name.as_str(), value.as_str())]);
    }
    request = request.header(reqwest::header::ACCEPT, accept);
    if let Some((user, password)) = &descriptor.credentials {
        request = request.basic_auth(user, Some(password));
    }

    let outcome = request
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text());

    match outcome {
        Ok(body) => Ok(Some(body)),
        Err(error) => match descriptor.error_policy {
            ErrorPolicy::ThrowException => Err(QueryError::Endpoint {
                message: format!("request to {} failed", descriptor.base_url),
                source: Some(error),
            }),
            ErrorPolicy::ReturnEmptyResult => {
                debug!(endpoint = %descriptor.base_url, error = %error, "returning empty result");
                Ok(None)
            }
        },
    }
}
