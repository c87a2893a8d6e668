//! RDF terms
//!
//! A term is the atomic value of the RDF model: an IRI, a blank node, a
//! literal (plain, language-tagged, or datatyped), or a query variable.
//! All terms expose a canonical string form; literals additionally expose
//! typed value accessors used by expression evaluation.

use crate::Vocabulary;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::sync::Arc;

/// An RDF term
///
/// Variables are first-class terms so that triple and quad patterns can be
/// expressed with the same type as ground data. Variable names and blank
/// node labels are stored without their `?` / `_:` sigils; the canonical
/// form adds them back.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// IRI reference
    /// Example: <http://example.org/resource>
    Iri(Arc<str>),

    /// Blank node with a label scoped to the enclosing graph or result set
    /// Example: _:b0
    BlankNode(Arc<str>),

    /// Literal value (plain, language-tagged, or datatyped)
    /// Example: "John"@en or "42"^^xsd:integer
    Literal(Literal),

    /// Query variable (for patterns and expressions)
    /// Example: ?x
    Variable(Arc<str>),
}

impl Term {
    /// Create an IRI term
    pub fn iri(iri: &str) -> Self {
        Term::Iri(Arc::from(iri))
    }

    /// Create a blank node term; a leading `_:` is stripped from the label
    pub fn blank(label: &str) -> Self {
        let label = label.strip_prefix("_:").unwrap_or(label);
        Term::BlankNode(Arc::from(label))
    }

    /// Create a plain literal
    pub fn literal(lexical: &str) -> Self {
        Term::Literal(Literal {
            lexical: Arc::from(lexical),
            language: None,
            datatype: None,
        })
    }

    /// Create a language-tagged literal
    pub fn literal_lang(lexical: &str, language: &str) -> Self {
        Term::Literal(Literal {
            lexical: Arc::from(lexical),
            language: Some(Arc::from(language)),
            datatype: None,
        })
    }

    /// Create a datatyped literal; the lexical form is preserved verbatim
    pub fn literal_typed(lexical: &str, datatype: &str) -> Self {
        Term::Literal(Literal {
            lexical: Arc::from(lexical),
            language: None,
            datatype: Some(Arc::from(datatype)),
        })
    }

    /// Create a variable; a leading `?` or `$` is stripped from the name
    pub fn variable(name: &str) -> Self {
        let name = name
            .strip_prefix('?')
            .or_else(|| name.strip_prefix('$'))
            .unwrap_or(name);
        Term::Variable(Arc::from(name))
    }

    /// Create an `xsd:boolean` literal
    pub fn boolean(value: bool) -> Self {
        Term::literal_typed(if value { "true" } else { "false" }, Vocabulary::XSD_BOOLEAN)
    }

    /// Create an `xsd:integer` literal
    pub fn integer(value: i64) -> Self {
        Term::literal_typed(&value.to_string(), Vocabulary::XSD_INTEGER)
    }

    /// Create an `xsd:double` literal
    pub fn double(value: f64) -> Self {
        Term::literal_typed(&value.to_string(), Vocabulary::XSD_DOUBLE)
    }

    /// Check if this is an IRI
    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    /// Check if this is a blank node
    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Check if this is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Check if this is a ground term (anything but a variable)
    pub fn is_ground(&self) -> bool {
        !self.is_variable()
    }

    /// Get the IRI string, if this is an IRI
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Get the literal, if this is a literal
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Get the variable name (without sigil), if this is a variable
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Get the blank node label (without `_:`), if this is a blank node
    pub fn as_blank(&self) -> Option<&str> {
        match self {
            Term::BlankNode(label) => Some(label),
            _ => None,
        }
    }

    /// Canonical string form
    ///
    /// `<iri>`, `_:label`, `"lex"`, `"lex"@lang`, `"lex"^^<dt>`, `?name`.
    /// Equal terms always have equal canonical forms and vice versa.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "Iri({})", iri),
            Term::BlankNode(label) => write!(f, "BlankNode({})", label),
            Term::Literal(lit) => write!(f, "Literal({:?})", lit),
            Term::Variable(name) => write!(f, "Variable({})", name),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => write!(f, "{}", lit),
            Term::Variable(name) => write!(f, "?{}", name),
        }
    }
}

/// RDF literal with optional language tag or datatype
///
/// A literal is plain when it carries neither a language tag nor a
/// datatype. Language-tagged literals never carry a datatype.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    /// Lexical form, preserved verbatim
    pub lexical: Arc<str>,

    /// Language tag (e.g. "en", "fr")
    pub language: Option<Arc<str>>,

    /// Datatype IRI (e.g. "http://www.w3.org/2001/XMLSchema#integer")
    pub datatype: Option<Arc<str>>,
}

impl Literal {
    /// Check if this is a plain literal (no language tag, no datatype)
    pub fn is_plain(&self) -> bool {
        self.language.is_none() && self.datatype.is_none()
    }

    /// Check if this literal carries a language tag
    pub fn has_language(&self) -> bool {
        self.language.is_some()
    }

    /// Check if this is a string literal (plain, language-tagged, or `xsd:string`)
    pub fn is_string(&self) -> bool {
        match &self.datatype {
            None => true,
            Some(dt) => dt.as_ref() == Vocabulary::XSD_STRING,
        }
    }

    /// Check if this is a boolean literal with a valid lexical form
    pub fn is_boolean(&self) -> bool {
        self.boolean_value().is_some()
    }

    /// Check if this literal has a numeric datatype and a parseable value
    pub fn is_numeric(&self) -> bool {
        self.numeric_value().is_some()
    }

    /// Check if this literal has a temporal datatype and a parseable value
    pub fn is_temporal(&self) -> bool {
        self.datetime_value().is_some()
    }

    /// Numeric value, when the datatype is one of the XSD numeric types
    pub fn numeric_value(&self) -> Option<f64> {
        let dt = self.datatype.as_deref()?;
        if !Vocabulary::is_numeric_datatype(dt) {
            return None;
        }
        self.lexical.trim().parse::<f64>().ok()
    }

    /// Boolean value, when the datatype is `xsd:boolean`
    pub fn boolean_value(&self) -> Option<bool> {
        let dt = self.datatype.as_deref()?;
        if dt != Vocabulary::XSD_BOOLEAN {
            return None;
        }
        match self.lexical.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Temporal value, when the datatype is `xsd:dateTime` or `xsd:date`
    ///
    /// `xsd:dateTime` without a timezone is interpreted as UTC; an
    /// `xsd:date` maps to midnight UTC of that day.
    pub fn datetime_value(&self) -> Option<DateTime<FixedOffset>> {
        let dt = self.datatype.as_deref()?;
        let lexical = self.lexical.trim();
        match dt {
            Vocabulary::XSD_DATETIME => DateTime::parse_from_rfc3339(lexical).ok().or_else(|| {
                NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
            }),
            Vocabulary::XSD_DATE => NaiveDate::parse_from_str(lexical, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset()),
            _ => None,
        }
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Literal")
            .field("lexical", &self.lexical)
            .field("language", &self.language)
            .field("datatype", &self.datatype)
            .finish()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical)?;

        if let Some(lang) = &self.language {
            write!(f, "@{}", lang)?;
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{}>", dt)?;
        }

        Ok(())
    }
}
