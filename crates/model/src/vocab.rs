//! Standard RDF vocabularies (RDF, RDFS, XSD)

/// Standard RDF/RDFS/XSD vocabularies
pub struct Vocabulary;

impl Vocabulary {
    // RDF namespace
    /// RDF namespace IRI
    pub const RDF_NS: &'static str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// rdf:type - indicates class membership
    pub const RDF_TYPE: &'static str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    /// rdf:langString - datatype of language-tagged literals
    pub const RDF_LANG_STRING: &'static str =
        "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

    // RDFS namespace
    /// RDFS namespace IRI
    pub const RDFS_NS: &'static str = "http://www.w3.org/2000/01/rdf-schema#";
    /// rdfs:label - human-readable label
    pub const RDFS_LABEL: &'static str = "http://www.w3.org/2000/01/rdf-schema#label";
    /// rdfs:comment - human-readable description
    pub const RDFS_COMMENT: &'static str = "http://www.w3.org/2000/01/rdf-schema#comment";

    // XSD namespace
    /// XSD namespace IRI
    pub const XSD_NS: &'static str = "http://www.w3.org/2001/XMLSchema#";
    /// xsd:string - string datatype
    pub const XSD_STRING: &'static str = "http://www.w3.org/2001/XMLSchema#string";
    /// xsd:integer - arbitrary-precision integer
    pub const XSD_INTEGER: &'static str = "http://www.w3.org/2001/XMLSchema#integer";
    /// xsd:int - 32-bit signed integer
    pub const XSD_INT: &'static str = "http://www.w3.org/2001/XMLSchema#int";
    /// xsd:long - 64-bit signed integer
    pub const XSD_LONG: &'static str = "http://www.w3.org/2001/XMLSchema#long";
    /// xsd:decimal - arbitrary-precision decimal
    pub const XSD_DECIMAL: &'static str = "http://www.w3.org/2001/XMLSchema#decimal";
    /// xsd:float - single-precision floating point
    pub const XSD_FLOAT: &'static str = "http://www.w3.org/2001/XMLSchema#float";
    /// xsd:double - double-precision floating point
    pub const XSD_DOUBLE: &'static str = "http://www.w3.org/2001/XMLSchema#double";
    /// xsd:boolean - boolean datatype (true/false)
    pub const XSD_BOOLEAN: &'static str = "http://www.w3.org/2001/XMLSchema#boolean";
    /// xsd:date - date without time of day
    pub const XSD_DATE: &'static str = "http://www.w3.org/2001/XMLSchema#date";
    /// xsd:dateTime - date and time with optional timezone
    pub const XSD_DATETIME: &'static str = "http://www.w3.org/2001/XMLSchema#dateTime";
    /// xsd:time - time of day with optional timezone
    pub const XSD_TIME: &'static str = "http://www.w3.org/2001/XMLSchema#time";

    /// Check whether a datatype IRI is one of the XSD numeric types
    pub fn is_numeric_datatype(datatype: &str) -> bool {
        matches!(
            datatype,
            Self::XSD_INTEGER
                | Self::XSD_INT
                | Self::XSD_LONG
                | Self::XSD_DECIMAL
                | Self::XSD_FLOAT
                | Self::XSD_DOUBLE
        )
    }

    /// Check whether a datatype IRI is one of the XSD temporal types
    pub fn is_temporal_datatype(datatype: &str) -> bool {
        matches!(datatype, Self::XSD_DATE | Self::XSD_DATETIME | Self::XSD_TIME)
    }
}
