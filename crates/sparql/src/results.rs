//! Query results and their wire formats
//!
//! SELECT results are a binding table with a declared variable order; ASK
//! results are a single boolean. Both serialise to SPARQL Results JSON
//! (the format also parsed back from remote endpoints) and to SPARQL
//! Results XML. Graph results reuse the N-Triples writer of the store
//! layer.

use crate::bindings::BindingTable;
use crate::error::QueryError;
use mirella_model::Term;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Result of a SELECT query: a binding table with declared variable order
#[derive(Clone, Debug, PartialEq)]
pub struct SelectResult {
    table: BindingTable,
}

impl SelectResult {
    pub(crate) fn new(table: BindingTable) -> Self {
        Self { table }
    }

    /// The underlying binding table
    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    /// Column headers in declared order, each prefixed with `?`
    pub fn variables(&self) -> Vec<String> {
        self.table
            .columns()
            .iter()
            .map(|c| format!("?{}", c))
            .collect()
    }

    /// Number of result rows
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the result has no rows
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Serialise as SPARQL Results JSON
    pub fn to_json(&self) -> String {
        let document = JsonDocument {
            head: JsonHead {
                vars: self.table.columns().to_vec(),
            },
            results: Some(JsonResults {
                bindings: self
                    .table
                    .iter()
                    .map(|row| {
                        self.table
                            .columns()
                            .iter()
                            .filter_map(|c| row.get(c).map(|t| (c.clone(), JsonTerm::from_term(t))))
                            .collect()
                    })
                    .collect(),
            }),
            boolean: None,
        };
        serde_json::to_string_pretty(&document).expect("result serialisation cannot fail")
    }

    /// Parse SPARQL Results JSON
    pub fn from_json(text: &str) -> Result<Self, QueryError> {
        let document: JsonDocument = serde_json::from_str(text)
            .map_err(|e| QueryError::Evaluation(format!("invalid result document: {}", e)))?;

        let mut table = BindingTable::with_columns(document.head.vars.clone());
        let bindings = document.results.map(|r| r.bindings).unwrap_or_default();
        for binding in bindings {
            let cells = document
                .head
                .vars
                .iter()
                .map(|var| binding.get(var).map(JsonTerm::to_term).transpose())
                .collect::<Result<Vec<Option<Term>>, QueryError>>()?;
            table.push_row(cells);
        }
        Ok(Self::new(table))
    }

    /// Serialise as SPARQL Results XML
    pub fn to_xml(&self) -> String {
        let mut out = String::from(
            "<?xml version=\"1.0\"?>\n<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">\n",
        );
        out.push_str("  <head>\n");
        for column in self.table.columns() {
            let _ = writeln!(out, "    <variable name=\"{}\"/>", escape_xml(column));
        }
        out.push_str("  </head>\n  <results>\n");
        for row in self.table.iter() {
            out.push_str("    <result>\n");
            for column in self.table.columns() {
                if let Some(term) = row.get(column) {
                    let _ = writeln!(
                        out,
                        "      <binding name=\"{}\">{}</binding>",
                        escape_xml(column),
                        xml_term(term)
                    );
                }
            }
            out.push_str("    </result>\n");
        }
        out.push_str("  </results>\n</sparql>\n");
        out
    }
}

/// Result of an ASK query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AskResult {
    /// Whether the query pattern has at least one solution
    pub value: bool,
}

impl AskResult {
    /// Serialise as SPARQL Results JSON
    pub fn to_json(&self) -> String {
        let document = JsonDocument {
            head: JsonHead { vars: Vec::new() },
            results: None,
            boolean: Some(self.value),
        };
        serde_json::to_string_pretty(&document).expect("result serialisation cannot fail")
    }

    /// Parse the boolean SPARQL Results JSON envelope
    pub fn from_json(text: &str) -> Result<Self, QueryError> {
        let document: JsonDocument = serde_json::from_str(text)
            .map_err(|e| QueryError::Evaluation(format!("invalid result document: {}", e)))?;
        match document.boolean {
            Some(value) => Ok(AskResult { value }),
            None => Err(QueryError::Evaluation(
                "result document carries no boolean".to_string(),
            )),
        }
    }

    /// Serialise as SPARQL Results XML
    pub fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\"?>\n<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">\n  <head/>\n  <boolean>{}</boolean>\n</sparql>\n",
            self.value
        )
    }
}

#[derive(Serialize, Deserialize)]
struct JsonDocument {
    head: JsonHead,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<JsonResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    boolean: Option<bool>,
}

#[derive(Serialize, Deserialize)]
struct JsonHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonResults {
    #[serde(default)]
    bindings: Vec<BTreeMap<String, JsonTerm>>,
}

#[derive(Serialize, Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang", skip_serializing_if = "Option::is_none")]
    lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
}

impl JsonTerm {
    fn from_term(term: &Term) -> Self {
        match term {
            Term::Iri(iri) => JsonTerm {
                kind: "uri".to_string(),
                value: iri.to_string(),
                lang: None,
                datatype: None,
            },
            Term::BlankNode(label) => JsonTerm {
                kind: "bnode".to_string(),
                value: label.to_string(),
                lang: None,
                datatype: None,
            },
            Term::Literal(lit) => JsonTerm {
                kind: "literal".to_string(),
                value: lit.lexical.to_string(),
                lang: lit.language.as_ref().map(|l| l.to_string()),
                datatype: lit.datatype.as_ref().map(|d| d.to_string()),
            },
            Term::Variable(name) => JsonTerm {
                kind: "literal".to_string(),
                value: format!("?{}", name),
                lang: None,
                datatype: None,
            },
        }
    }

    fn to_term(&self) -> Result<Term, QueryError> {
        match self.kind.as_str() {
            "uri" => Ok(Term::iri(&self.value)),
            "bnode" => Ok(Term::blank(&self.value)),
            "literal" | "typed-literal" => Ok(match (&self.lang, &self.datatype) {
                (Some(lang), _) => Term::literal_lang(&self.value, lang),
                (None, Some(datatype)) => Term::literal_typed(&self.value, datatype),
                (None, None) => Term::literal(&self.value),
            }),
            other => Err(QueryError::Evaluation(format!(
                "unknown result term type: {}",
                other
            ))),
        }
    }
}

fn xml_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<uri>{}</uri>", escape_xml(iri)),
        Term::BlankNode(label) => format!("<bnode>{}</bnode>", escape_xml(label)),
        Term::Literal(lit) => {
            if let Some(lang) = &lit.language {
                format!(
                    "<literal xml:lang=\"{}\">{}</literal>",
                    escape_xml(lang),
                    escape_xml(&lit.lexical)
                )
            } else if let Some(datatype) = &lit.datatype {
                format!(
                    "<literal datatype=\"{}\">{}</literal>",
                    escape_xml(datatype),
                    escape_xml(&lit.lexical)
                )
            } else {
                format!("<literal>{}</literal>", escape_xml(&lit.lexical))
            }
        }
        Term::Variable(name) => format!("<literal>?{}</literal>", escape_xml(name)),
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
