//! SPARQL expression trees
//!
//! Expressions are built programmatically and evaluated row-by-row during
//! filtering, BIND projection, ordering and aggregation. A bare term
//! (constant or variable) is itself an expression; evaluating it returns
//! the term unchanged, which is what lets `?x` or a literal appear as a
//! first-class leaf anywhere an expression is expected.

use mirella_model::Term;

/// A SPARQL expression
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// Term leaf: a constant or a variable
    Term(Term),

    /// Logical OR (three-valued)
    Or(Box<Expression>, Box<Expression>),

    /// Logical AND (three-valued)
    And(Box<Expression>, Box<Expression>),

    /// Logical NOT
    Not(Box<Expression>),

    /// Equality
    Equal(Box<Expression>, Box<Expression>),

    /// Inequality
    NotEqual(Box<Expression>, Box<Expression>),

    /// Less than
    Less(Box<Expression>, Box<Expression>),

    /// Less than or equal
    LessOrEqual(Box<Expression>, Box<Expression>),

    /// Greater than
    Greater(Box<Expression>, Box<Expression>),

    /// Greater than or equal
    GreaterOrEqual(Box<Expression>, Box<Expression>),

    /// Membership: IN
    In(Box<Expression>, Vec<Expression>),

    /// Membership: NOT IN
    NotIn(Box<Expression>, Vec<Expression>),

    /// Addition
    Add(Box<Expression>, Box<Expression>),

    /// Subtraction
    Subtract(Box<Expression>, Box<Expression>),

    /// Multiplication
    Multiply(Box<Expression>, Box<Expression>),

    /// Division
    Divide(Box<Expression>, Box<Expression>),

    /// Unary numeric negation
    Negate(Box<Expression>),

    /// Builtin function call
    Function(Function),
}

impl Expression {
    /// Variable leaf
    pub fn variable(name: &str) -> Self {
        Expression::Term(Term::variable(name))
    }

    /// Constant term leaf
    pub fn constant(term: Term) -> Self {
        Expression::Term(term)
    }

    /// `self && other`
    pub fn and(self, other: Expression) -> Self {
        Expression::And(Box::new(self), Box::new(other))
    }

    /// `self || other`
    pub fn or(self, other: Expression) -> Self {
        Expression::Or(Box::new(self), Box::new(other))
    }

    /// `!self`
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expression::Not(Box::new(self))
    }

    /// `self = other`
    pub fn equal(self, other: Expression) -> Self {
        Expression::Equal(Box::new(self), Box::new(other))
    }

    /// `self != other`
    pub fn not_equal(self, other: Expression) -> Self {
        Expression::NotEqual(Box::new(self), Box::new(other))
    }

    /// `self < other`
    pub fn less(self, other: Expression) -> Self {
        Expression::Less(Box::new(self), Box::new(other))
    }

    /// `self <= other`
    pub fn less_or_equal(self, other: Expression) -> Self {
        Expression::LessOrEqual(Box::new(self), Box::new(other))
    }

    /// `self > other`
    pub fn greater(self, other: Expression) -> Self {
        Expression::Greater(Box::new(self), Box::new(other))
    }

    /// `self >= other`
    pub fn greater_or_equal(self, other: Expression) -> Self {
        Expression::GreaterOrEqual(Box::new(self), Box::new(other))
    }

    /// `self IN (items...)`
    pub fn within(self, items: Vec<Expression>) -> Self {
        Expression::In(Box::new(self), items)
    }

    /// `self NOT IN (items...)`
    pub fn not_within(self, items: Vec<Expression>) -> Self {
        Expression::NotIn(Box::new(self), items)
    }

    /// `self + other`
    pub fn add(self, other: Expression) -> Self {
        Expression::Add(Box::new(self), Box::new(other))
    }

    /// `self - other`
    pub fn subtract(self, other: Expression) -> Self {
        Expression::Subtract(Box::new(self), Box::new(other))
    }

    /// `self * other`
    pub fn multiply(self, other: Expression) -> Self {
        Expression::Multiply(Box::new(self), Box::new(other))
    }

    /// `self / other`
    pub fn divide(self, other: Expression) -> Self {
        Expression::Divide(Box::new(self), Box::new(other))
    }

    /// `-self`
    #[allow(clippy::should_implement_trait)]
    pub fn negate(self) -> Self {
        Expression::Negate(Box::new(self))
    }

    /// Variable names referenced anywhere in this expression
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        fn push(out: &mut Vec<String>, name: &str) {
            if !out.iter().any(|v| v == name) {
                out.push(name.to_string());
            }
        }
        match self {
            Expression::Term(term) => {
                if let Some(name) = term.as_variable() {
                    push(out, name);
                }
            }
            Expression::Or(a, b)
            | Expression::And(a, b)
            | Expression::Equal(a, b)
            | Expression::NotEqual(a, b)
            | Expression::Less(a, b)
            | Expression::LessOrEqual(a, b)
            | Expression::Greater(a, b)
            | Expression::GreaterOrEqual(a, b)
            | Expression::Add(a, b)
            | Expression::Subtract(a, b)
            | Expression::Multiply(a, b)
            | Expression::Divide(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Expression::Not(inner) | Expression::Negate(inner) => inner.collect_variables(out),
            Expression::In(head, items) | Expression::NotIn(head, items) => {
                head.collect_variables(out);
                for item in items {
                    item.collect_variables(out);
                }
            }
            Expression::Function(function) => {
                for arg in function.arguments() {
                    arg.collect_variables(out);
                }
                if let Function::Bound(name) = function {
                    push(out, name);
                }
            }
        }
    }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Self {
        Expression::Term(term)
    }
}

/// Builtin SPARQL functions
#[derive(Clone, Debug, PartialEq)]
pub enum Function {
    // Term accessors and constructors
    /// STR - string form of an IRI or literal
    Str(Box<Expression>),
    /// LANG - language tag of a literal ("" when absent)
    Lang(Box<Expression>),
    /// LANGMATCHES - language range test
    LangMatches(Box<Expression>, Box<Expression>),
    /// DATATYPE - datatype IRI of a literal
    Datatype(Box<Expression>),
    /// IRI - constructs an IRI from a string or IRI
    Iri(Box<Expression>),
    /// BNODE - fresh blank node, optionally derived from a string
    BNode(Option<Box<Expression>>),
    /// STRLANG - language-tagged literal from lexical form and tag
    StrLang(Box<Expression>, Box<Expression>),
    /// STRDT - typed literal from lexical form and datatype IRI
    StrDt(Box<Expression>, Box<Expression>),

    // Tests
    /// isIRI
    IsIri(Box<Expression>),
    /// isBLANK
    IsBlank(Box<Expression>),
    /// isLITERAL
    IsLiteral(Box<Expression>),
    /// isNUMERIC
    IsNumeric(Box<Expression>),
    /// BOUND - variable is bound in the current row
    Bound(String),
    /// sameTerm - strict term identity
    SameTerm(Box<Expression>, Box<Expression>),

    // Conditionals
    /// COALESCE - first argument that evaluates without error
    Coalesce(Vec<Expression>),
    /// IF - conditional on the effective boolean value of the first argument
    If(Box<Expression>, Box<Expression>, Box<Expression>),

    // Strings
    /// STRLEN
    StrLen(Box<Expression>),
    /// SUBSTR - 1-based start and optional length
    SubStr(Box<Expression>, Box<Expression>, Option<Box<Expression>>),
    /// UCASE
    UCase(Box<Expression>),
    /// LCASE
    LCase(Box<Expression>),
    /// STRSTARTS
    StrStarts(Box<Expression>, Box<Expression>),
    /// STRENDS
    StrEnds(Box<Expression>, Box<Expression>),
    /// CONTAINS
    Contains(Box<Expression>, Box<Expression>),
    /// STRBEFORE
    StrBefore(Box<Expression>, Box<Expression>),
    /// STRAFTER
    StrAfter(Box<Expression>, Box<Expression>),
    /// ENCODE_FOR_URI
    EncodeForUri(Box<Expression>),
    /// CONCAT
    Concat(Vec<Expression>),
    /// REPLACE - regex replacement with optional flags
    Replace(
        Box<Expression>,
        Box<Expression>,
        Box<Expression>,
        Option<Box<Expression>>,
    ),
    /// REGEX - regex match with optional flags
    Regex(Box<Expression>, Box<Expression>, Option<Box<Expression>>),

    // Numerics
    /// ABS
    Abs(Box<Expression>),
    /// ROUND
    Round(Box<Expression>),
    /// CEIL
    Ceil(Box<Expression>),
    /// FLOOR
    Floor(Box<Expression>),
    /// RAND - random double in [0, 1)
    Rand,

    // Temporal
    /// NOW - evaluation-time instant
    Now,
    /// YEAR
    Year(Box<Expression>),
    /// MONTH
    Month(Box<Expression>),
    /// DAY
    Day(Box<Expression>),
    /// HOURS
    Hours(Box<Expression>),
    /// MINUTES
    Minutes(Box<Expression>),
    /// SECONDS
    Seconds(Box<Expression>),
    /// TZ - timezone designator as a string ("" when absent)
    Tz(Box<Expression>),

    // Hashing
    /// MD5
    Md5(Box<Expression>),
    /// SHA1
    Sha1(Box<Expression>),
    /// SHA256
    Sha256(Box<Expression>),
    /// SHA384
    Sha384(Box<Expression>),
    /// SHA512
    Sha512(Box<Expression>),

    // Identifiers
    /// UUID - fresh urn:uuid IRI
    Uuid,
    /// STRUUID - fresh UUID string literal
    StrUuid,
}

impl Function {
    /// The argument expressions of this function, in order
    pub fn arguments(&self) -> Vec<&Expression> {
        match self {
            Function::Rand | Function::Now | Function::Uuid | Function::StrUuid => Vec::new(),
            Function::Bound(_) => Vec::new(),
            Function::Str(a)
            | Function::Lang(a)
            | Function::Datatype(a)
            | Function::Iri(a)
            | Function::IsIri(a)
            | Function::IsBlank(a)
            | Function::IsLiteral(a)
            | Function::IsNumeric(a)
            | Function::StrLen(a)
            | Function::UCase(a)
            | Function::LCase(a)
            | Function::EncodeForUri(a)
            | Function::Abs(a)
            | Function::Round(a)
            | Function::Ceil(a)
            | Function::Floor(a)
            | Function::Year(a)
            | Function::Month(a)
            | Function::Day(a)
            | Function::Hours(a)
            | Function::Minutes(a)
            | Function::Seconds(a)
            | Function::Tz(a)
            | Function::Md5(a)
            | Function::Sha1(a)
            | Function::Sha256(a)
            | Function::Sha384(a)
            | Function::Sha512(a) => vec![a],
            Function::LangMatches(a, b)
            | Function::StrLang(a, b)
            | Function::StrDt(a, b)
            | Function::SameTerm(a, b)
            | Function::StrStarts(a, b)
            | Function::StrEnds(a, b)
            | Function::Contains(a, b)
            | Function::StrBefore(a, b)
            | Function::StrAfter(a, b) => vec![a, b],
            Function::BNode(arg) => arg.iter().map(|a| a.as_ref()).collect(),
            Function::SubStr(a, b, c) => {
                let mut args = vec![a.as_ref(), b.as_ref()];
                if let Some(c) = c {
                    args.push(c);
                }
                args
            }
            Function::Replace(a, b, c, flags) => {
                let mut args = vec![a.as_ref(), b.as_ref(), c.as_ref()];
                if let Some(f) = flags {
                    args.push(f);
                }
                args
            }
            Function::Regex(a, b, flags) => {
                let mut args = vec![a.as_ref(), b.as_ref()];
                if let Some(f) = flags {
                    args.push(f);
                }
                args
            }
            Function::If(a, b, c) => vec![a, b, c],
            Function::Coalesce(items) | Function::Concat(items) => items.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chains() {
        let expr = Expression::variable("x")
            .greater(Expression::constant(Term::integer(3)))
            .and(Expression::variable("y").less(Expression::constant(Term::integer(10))));

        assert!(matches!(expr, Expression::And(_, _)));
        assert_eq!(expr.variables(), vec!["x", "y"]);
    }

    #[test]
    fn test_variables_deduplicated() {
        let expr = Expression::variable("x").add(Expression::variable("x"));
        assert_eq!(expr.variables(), vec!["x"]);
    }

    #[test]
    fn test_function_arguments() {
        let substr = Function::SubStr(
            Box::new(Expression::variable("s")),
            Box::new(Expression::constant(Term::integer(1))),
            None,
        );
        assert_eq!(substr.arguments().len(), 2);

        let regex = Function::Regex(
            Box::new(Expression::variable("s")),
            Box::new(Expression::constant(Term::literal("^a"))),
            Some(Box::new(Expression::constant(Term::literal("i")))),
        );
        assert_eq!(regex.arguments().len(), 3);
    }

    #[test]
    fn test_bound_reports_its_variable() {
        let expr = Expression::Function(Function::Bound("x".to_string()));
        assert_eq!(expr.variables(), vec!["x"]);
    }
}
