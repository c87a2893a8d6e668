//! Row-wise expression evaluation
//!
//! Evaluates an expression tree against one binding row and returns a term
//! or unbound. Type errors never escape: the offending evaluation yields
//! unbound, and a filter treats unbound as false. Boolean connectives use
//! three-valued logic with short-circuit on a definite false/true.

use crate::bindings::RowView;
use crate::expression::{Expression, Function};
use chrono::{Datelike, SecondsFormat, Timelike, Utc};
use md5::{Digest, Md5};
use mirella_model::{Term, Vocabulary};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::cmp::Ordering;

/// Evaluate an expression against one row; unbound is `None`
///
/// This is the whole expression contract: a bare term evaluates to itself
/// (a bound variable to its binding), operators apply their class
/// semantics, and every type error inside the tree collapses to unbound.
pub fn evaluate(expr: &Expression, row: &RowView<'_>) -> Option<Term> {
    match expr {
        Expression::Term(term) => match term.as_variable() {
            Some(name) => row.get(name).cloned(),
            None => Some(term.clone()),
        },

        Expression::Or(a, b) => match (truth(a, row), truth(b, row)) {
            (Some(true), _) | (_, Some(true)) => Some(Term::boolean(true)),
            (Some(false), Some(false)) => Some(Term::boolean(false)),
            _ => None,
        },

        Expression::And(a, b) => match (truth(a, row), truth(b, row)) {
            (Some(false), _) | (_, Some(false)) => Some(Term::boolean(false)),
            (Some(true), Some(true)) => Some(Term::boolean(true)),
            _ => None,
        },

        Expression::Not(inner) => truth(inner, row).map(|b| Term::boolean(!b)),

        Expression::Equal(a, b) => {
            value_equals(&evaluate(a, row)?, &evaluate(b, row)?).map(Term::boolean)
        }
        Expression::NotEqual(a, b) => {
            value_equals(&evaluate(a, row)?, &evaluate(b, row)?).map(|eq| Term::boolean(!eq))
        }
        Expression::Less(a, b) => comparison(a, b, row, |o| o == Ordering::Less),
        Expression::LessOrEqual(a, b) => comparison(a, b, row, |o| o != Ordering::Greater),
        Expression::Greater(a, b) => comparison(a, b, row, |o| o == Ordering::Greater),
        Expression::GreaterOrEqual(a, b) => comparison(a, b, row, |o| o != Ordering::Less),

        Expression::In(head, items) => membership(head, items, row, true),
        Expression::NotIn(head, items) => membership(head, items, row, false),

        Expression::Add(a, b) => arithmetic(a, b, row, ArithmeticOp::Add),
        Expression::Subtract(a, b) => arithmetic(a, b, row, ArithmeticOp::Subtract),
        Expression::Multiply(a, b) => arithmetic(a, b, row, ArithmeticOp::Multiply),
        Expression::Divide(a, b) => arithmetic(a, b, row, ArithmeticOp::Divide),

        Expression::Negate(inner) => {
            let term = evaluate(inner, row)?;
            let lit = term.as_literal()?;
            let value = lit.numeric_value()?;
            let datatype = lit.datatype.as_deref()?;
            Some(numeric_literal(-value, datatype))
        }

        Expression::Function(function) => evaluate_function(function, row),
    }
}

/// Effective boolean value of an evaluated expression
pub(crate) fn truth(expr: &Expression, row: &RowView<'_>) -> Option<bool> {
    effective_boolean_value(evaluate(expr, row).as_ref())
}

/// SPARQL effective boolean value; `None` marks a type error
pub(crate) fn effective_boolean_value(term: Option<&Term>) -> Option<bool> {
    let lit = term?.as_literal()?;
    if let Some(b) = lit.boolean_value() {
        return Some(b);
    }
    if let Some(n) = lit.numeric_value() {
        return Some(n != 0.0 && !n.is_nan());
    }
    if lit.is_string() {
        return Some(!lit.lexical.is_empty());
    }
    None
}

/// Value comparison between two ground terms
///
/// Numeric, temporal, boolean and string operands compare by value; IRIs
/// and blank nodes compare by their identifier text. Mixed operand classes
/// are incomparable.
pub(crate) fn compare_values(a: &Term, b: &Term) -> Option<Ordering> {
    match (a, b) {
        (Term::Iri(x), Term::Iri(y)) => Some(x.cmp(y)),
        (Term::BlankNode(x), Term::BlankNode(y)) => Some(x.cmp(y)),
        (Term::Literal(x), Term::Literal(y)) => {
            if let (Some(nx), Some(ny)) = (x.numeric_value(), y.numeric_value()) {
                return nx.partial_cmp(&ny);
            }
            if let (Some(tx), Some(ty)) = (x.datetime_value(), y.datetime_value()) {
                return Some(tx.cmp(&ty));
            }
            if let (Some(bx), Some(by)) = (x.boolean_value(), y.boolean_value()) {
                return Some(bx.cmp(&by));
            }
            if x.is_string() && y.is_string() {
                return Some(
                    x.lexical
                        .cmp(&y.lexical)
                        .then_with(|| x.language.cmp(&y.language)),
                );
            }
            None
        }
        _ => None,
    }
}

/// Value equality; `None` marks incomparable operands
pub(crate) fn value_equals(a: &Term, b: &Term) -> Option<bool> {
    if let Some(ordering) = compare_values(a, b) {
        return Some(ordering == Ordering::Equal);
    }
    if a == b {
        return Some(true);
    }
    // Different term classes are definitely unequal; two literals that
    // could not be compared stay indeterminate.
    if std::mem::discriminant(a) != std::mem::discriminant(b) {
        return Some(false);
    }
    None
}

/// Total ordering for ORDER BY: bound before unbound, then blank nodes,
/// IRIs and literals by class, values within a class
pub(crate) fn compare_for_order(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a), Some(b)) => {
            fn class(term: &Term) -> u8 {
                match term {
                    Term::BlankNode(_) => 0,
                    Term::Iri(_) => 1,
                    Term::Literal(_) => 2,
                    Term::Variable(_) => 3,
                }
            }
            class(a).cmp(&class(b)).then_with(|| {
                compare_values(a, b).unwrap_or_else(|| a.canonical().cmp(&b.canonical()))
            })
        }
    }
}

/// String value used by the string builtins: literal lexical form or IRI text
pub(crate) fn string_value(term: &Term) -> Option<String> {
    match term {
        Term::Literal(lit) => Some(lit.lexical.to_string()),
        Term::Iri(iri) => Some(iri.to_string()),
        _ => None,
    }
}

fn comparison(
    a: &Expression,
    b: &Expression,
    row: &RowView<'_>,
    accept: impl Fn(Ordering) -> bool,
) -> Option<Term> {
    let left = evaluate(a, row)?;
    let right = evaluate(b, row)?;
    compare_values(&left, &right).map(|o| Term::boolean(accept(o)))
}

fn membership(
    head: &Expression,
    items: &[Expression],
    row: &RowView<'_>,
    positive: bool,
) -> Option<Term> {
    let value = evaluate(head, row)?;
    let found = items.iter().any(|item| {
        evaluate(item, row)
            .and_then(|candidate| value_equals(&value, &candidate))
            .unwrap_or(false)
    });
    Some(Term::boolean(if positive { found } else { !found }))
}

#[derive(Clone, Copy, PartialEq)]
enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Rank in the numeric promotion chain integer < decimal < float < double
fn numeric_rank(datatype: &str) -> Option<u8> {
    match datatype {
        Vocabulary::XSD_INTEGER | Vocabulary::XSD_INT | Vocabulary::XSD_LONG => Some(0),
        Vocabulary::XSD_DECIMAL => Some(1),
        Vocabulary::XSD_FLOAT => Some(2),
        Vocabulary::XSD_DOUBLE => Some(3),
        _ => None,
    }
}

fn rank_datatype(rank: u8) -> &'static str {
    match rank {
        0 => Vocabulary::XSD_INTEGER,
        1 => Vocabulary::XSD_DECIMAL,
        2 => Vocabulary::XSD_FLOAT,
        _ => Vocabulary::XSD_DOUBLE,
    }
}

/// Format a value in the lexical space of the given numeric datatype
fn numeric_literal(value: f64, datatype: &str) -> Term {
    let is_integer_type = numeric_rank(datatype) == Some(0);
    if is_integer_type && value.fract() == 0.0 {
        Term::literal_typed(&format!("{}", value as i64), datatype)
    } else {
        Term::literal_typed(&value.to_string(), datatype)
    }
}

fn arithmetic(
    a: &Expression,
    b: &Expression,
    row: &RowView<'_>,
    op: ArithmeticOp,
) -> Option<Term> {
    let left = evaluate(a, row)?;
    let right = evaluate(b, row)?;
    let (ll, rl) = (left.as_literal()?, right.as_literal()?);
    let (lv, rv) = (ll.numeric_value()?, rl.numeric_value()?);
    let (lr, rr) = (
        numeric_rank(ll.datatype.as_deref()?)?,
        numeric_rank(rl.datatype.as_deref()?)?,
    );

    let mut rank = lr.max(rr);
    let value = match op {
        ArithmeticOp::Add => lv + rv,
        ArithmeticOp::Subtract => lv - rv,
        ArithmeticOp::Multiply => lv * rv,
        ArithmeticOp::Divide => {
            if rv == 0.0 {
                return None;
            }
            // Integer division widens to decimal.
            rank = rank.max(1);
            lv / rv
        }
    };

    Some(numeric_literal(value, rank_datatype(rank)))
}

fn evaluate_function(function: &Function, row: &RowView<'_>) -> Option<Term> {
    match function {
        Function::Str(e) => {
            let term = evaluate(e, row)?;
            match &term {
                Term::Literal(lit) => Some(Term::literal(&lit.lexical)),
                Term::Iri(iri) => Some(Term::literal(iri)),
                Term::BlankNode(label) => Some(Term::literal(&format!("_:{}", label))),
                Term::Variable(_) => None,
            }
        }

        Function::Lang(e) => {
            let term = evaluate(e, row)?;
            let lit = term.as_literal()?;
            Some(Term::literal(lit.language.as_deref().unwrap_or("")))
        }

        Function::LangMatches(lang, range) => {
            let lang = string_value(&evaluate(lang, row)?)?.to_lowercase();
            let range = string_value(&evaluate(range, row)?)?.to_lowercase();
            let matched = if range == "*" {
                !lang.is_empty()
            } else {
                lang == range || lang.starts_with(&format!("{}-", range))
            };
            Some(Term::boolean(matched))
        }

        Function::Datatype(e) => {
            let term = evaluate(e, row)?;
            let lit = term.as_literal()?;
            if let Some(dt) = &lit.datatype {
                Some(Term::iri(dt))
            } else if lit.has_language() {
                Some(Term::iri(Vocabulary::RDF_LANG_STRING))
            } else {
                Some(Term::iri(Vocabulary::XSD_STRING))
            }
        }

        Function::Iri(e) => {
            let term = evaluate(e, row)?;
            if term.is_iri() {
                return Some(term);
            }
            match term.as_literal() {
                Some(lit) if lit.is_string() => Some(Term::iri(&lit.lexical)),
                _ => None,
            }
        }

        Function::BNode(arg) => {
            let label = match arg {
                Some(e) => {
                    let term = evaluate(e, row)?;
                    string_value(&term)?
                }
                None => uuid::Uuid::new_v4().simple().to_string(),
            };
            Some(Term::blank(&label))
        }

        Function::StrLang(lexical, tag) => {
            let lexical = plain_string(&evaluate(lexical, row)?)?;
            let tag = plain_string(&evaluate(tag, row)?)?;
            if tag.is_empty() {
                return None;
            }
            Some(Term::literal_lang(&lexical, &tag))
        }

        Function::StrDt(lexical, datatype) => {
            let lexical = plain_string(&evaluate(lexical, row)?)?;
            let datatype = evaluate(datatype, row)?;
            let datatype = datatype.as_iri()?;
            Some(Term::literal_typed(&lexical, datatype))
        }

        Function::IsIri(e) => Some(Term::boolean(evaluate(e, row)?.is_iri())),
        Function::IsBlank(e) => Some(Term::boolean(evaluate(e, row)?.is_blank())),
        Function::IsLiteral(e) => Some(Term::boolean(evaluate(e, row)?.is_literal())),
        Function::IsNumeric(e) => {
            let term = evaluate(e, row)?;
            Some(Term::boolean(
                term.as_literal().map(|l| l.is_numeric()).unwrap_or(false),
            ))
        }

        Function::Bound(name) => Some(Term::boolean(row.is_bound(name))),

        Function::SameTerm(a, b) => {
            Some(Term::boolean(evaluate(a, row)? == evaluate(b, row)?))
        }

        Function::Coalesce(items) => items.iter().find_map(|item| evaluate(item, row)),

        Function::If(cond, then, otherwise) => match truth(cond, row)? {
            true => evaluate(then, row),
            false => evaluate(otherwise, row),
        },

        Function::StrLen(e) => {
            let s = string_value(&evaluate(e, row)?)?;
            Some(Term::integer(s.chars().count() as i64))
        }

        Function::SubStr(e, start, length) => {
            let term = evaluate(e, row)?;
            let s = string_value(&term)?;
            let chars: Vec<char> = s.chars().collect();
            let start = literal_integer(&evaluate(start, row)?)?;
            if start < 1 || (start as usize) > chars.len() + 1 {
                return None;
            }
            let from = (start - 1) as usize;
            let until = match length {
                Some(length) => {
                    let length = literal_integer(&evaluate(length, row)?)?;
                    if length < 0 {
                        return None;
                    }
                    (from + length as usize).min(chars.len())
                }
                None => chars.len(),
            };
            let result: String = chars[from..until.max(from)].iter().collect();
            Some(string_literal_like(&term, result))
        }

        Function::UCase(e) => {
            let term = evaluate(e, row)?;
            let s = string_value(&term)?;
            Some(string_literal_like(&term, s.to_uppercase()))
        }

        Function::LCase(e) => {
            let term = evaluate(e, row)?;
            let s = string_value(&term)?;
            Some(string_literal_like(&term, s.to_lowercase()))
        }

        Function::StrStarts(a, b) => string_pair(a, b, row, |s, t| Term::boolean(s.starts_with(t))),
        Function::StrEnds(a, b) => string_pair(a, b, row, |s, t| Term::boolean(s.ends_with(t))),
        Function::Contains(a, b) => string_pair(a, b, row, |s, t| Term::boolean(s.contains(t))),

        Function::StrBefore(a, b) => string_pair(a, b, row, |s, t| {
            Term::literal(s.find(t).map(|i| &s[..i]).unwrap_or(""))
        }),

        Function::StrAfter(a, b) => string_pair(a, b, row, |s, t| {
            Term::literal(s.find(t).map(|i| &s[i + t.len()..]).unwrap_or(""))
        }),

        Function::EncodeForUri(e) => {
            let s = string_value(&evaluate(e, row)?)?;
            Some(Term::literal(&urlencoding::encode(&s)))
        }

        Function::Concat(items) => {
            let mut out = String::new();
            for item in items {
                let term = evaluate(item, row)?;
                out.push_str(&string_value(&term)?);
            }
            Some(Term::literal(&out))
        }

        Function::Replace(e, pattern, replacement, flags) => {
            let term = evaluate(e, row)?;
            let s = string_value(&term)?;
            let pattern = string_value(&evaluate(pattern, row)?)?;
            let replacement = string_value(&evaluate(replacement, row)?)?;
            let regex = build_regex(&pattern, flags.as_deref(), row)?;
            Some(string_literal_like(
                &term,
                regex.replace_all(&s, replacement.as_str()).into_owned(),
            ))
        }

        Function::Regex(e, pattern, flags) => {
            let s = string_value(&evaluate(e, row)?)?;
            let pattern = string_value(&evaluate(pattern, row)?)?;
            let regex = build_regex(&pattern, flags.as_deref(), row)?;
            Some(Term::boolean(regex.is_match(&s)))
        }

        Function::Abs(e) => numeric_unary(e, row, f64::abs),
        Function::Round(e) => numeric_unary(e, row, f64::round),
        Function::Ceil(e) => numeric_unary(e, row, f64::ceil),
        Function::Floor(e) => numeric_unary(e, row, f64::floor),

        Function::Rand => Some(Term::double(rand::random::<f64>())),

        Function::Now => Some(Term::literal_typed(
            &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Vocabulary::XSD_DATETIME,
        )),

        Function::Year(e) => temporal_unary(e, row, |dt| dt.year() as i64),
        Function::Month(e) => temporal_unary(e, row, |dt| dt.month() as i64),
        Function::Day(e) => temporal_unary(e, row, |dt| dt.day() as i64),
        Function::Hours(e) => temporal_unary(e, row, |dt| dt.hour() as i64),
        Function::Minutes(e) => temporal_unary(e, row, |dt| dt.minute() as i64),
        Function::Seconds(e) => temporal_unary(e, row, |dt| dt.second() as i64),

        Function::Tz(e) => {
            let term = evaluate(e, row)?;
            let lit = term.as_literal()?;
            lit.datetime_value()?;
            Some(Term::literal(timezone_designator(&lit.lexical)))
        }

        Function::Md5(e) => hash_function(e, row, |s| hex_digest(Md5::digest(s.as_bytes()))),
        Function::Sha1(e) => hash_function(e, row, |s| hex_digest(Sha1::digest(s.as_bytes()))),
        Function::Sha256(e) => hash_function(e, row, |s| hex_digest(Sha256::digest(s.as_bytes()))),
        Function::Sha384(e) => hash_function(e, row, |s| hex_digest(Sha384::digest(s.as_bytes()))),
        Function::Sha512(e) => hash_function(e, row, |s| hex_digest(Sha512::digest(s.as_bytes()))),

        Function::Uuid => Some(Term::iri(&format!("urn:uuid:{}", uuid::Uuid::new_v4()))),
        Function::StrUuid => Some(Term::literal(&uuid::Uuid::new_v4().to_string())),
    }
}

/// Keep the language tag of the input string when producing a derived string
fn string_literal_like(original: &Term, lexical: String) -> Term {
    match original.as_literal().and_then(|l| l.language.as_deref()) {
        Some(lang) => Term::literal_lang(&lexical, lang),
        None => Term::literal(&lexical),
    }
}

/// Lexical form of a plain or `xsd:string` literal
fn plain_string(term: &Term) -> Option<String> {
    let lit = term.as_literal()?;
    if lit.is_string() && !lit.has_language() {
        Some(lit.lexical.to_string())
    } else {
        None
    }
}

fn literal_integer(term: &Term) -> Option<i64> {
    let value = term.as_literal()?.numeric_value()?;
    if value.fract() != 0.0 {
        return None;
    }
    Some(value as i64)
}

fn string_pair(
    a: &Expression,
    b: &Expression,
    row: &RowView<'_>,
    apply: impl Fn(&str, &str) -> Term,
) -> Option<Term> {
    let left = string_value(&evaluate(a, row)?)?;
    let right = string_value(&evaluate(b, row)?)?;
    Some(apply(&left, &right))
}

fn numeric_unary(e: &Expression, row: &RowView<'_>, apply: impl Fn(f64) -> f64) -> Option<Term> {
    let term = evaluate(e, row)?;
    let lit = term.as_literal()?;
    let value = lit.numeric_value()?;
    let datatype = lit.datatype.as_deref()?;
    Some(numeric_literal(apply(value), datatype))
}

fn temporal_unary(
    e: &Expression,
    row: &RowView<'_>,
    extract: impl Fn(&chrono::DateTime<chrono::FixedOffset>) -> i64,
) -> Option<Term> {
    let term = evaluate(e, row)?;
    let datetime = term.as_literal()?.datetime_value()?;
    Some(Term::integer(extract(&datetime)))
}

/// Timezone designator of a dateTime lexical form: "Z", "+HH:MM", "-HH:MM",
/// or "" when absent
fn timezone_designator(lexical: &str) -> &str {
    let lexical = lexical.trim();
    if lexical.ends_with('Z') {
        return "Z";
    }
    // The offset, when present, is the trailing six characters (+HH:MM);
    // a bare date has no 'T' separator worth checking beyond that.
    if lexical.len() > 6 {
        let tail = &lexical[lexical.len() - 6..];
        if (tail.starts_with('+') || tail.starts_with('-')) && tail.as_bytes()[3] == b':' {
            return tail;
        }
    }
    ""
}

fn build_regex(pattern: &str, flags: Option<&Expression>, row: &RowView<'_>) -> Option<regex::Regex> {
    let mut builder = regex::RegexBuilder::new(pattern);
    if let Some(flags) = flags {
        let flags = string_value(&evaluate(flags, row)?)?;
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                's' => builder.dot_matches_new_line(true),
                'm' => builder.multi_line(true),
                'x' => builder.ignore_whitespace(true),
                _ => return None,
            };
        }
    }
    builder.build().ok()
}

fn hash_function(
    e: &Expression,
    row: &RowView<'_>,
    digest: impl Fn(&str) -> String,
) -> Option<Term> {
    let term = evaluate(e, row)?;
    let s = string_value(&term)?;
    Some(Term::literal(&digest(&s)))
}

fn hex_digest(bytes: impl AsRef<[u8]>) -> String {
    bytes
        .as_ref()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingTable;

    fn row_table(bindings: &[(&str, Term)]) -> BindingTable {
        let mut table = BindingTable::new();
        let owned: Vec<(String, Term)> = bindings
            .iter()
            .map(|(n, t)| (n.to_string(), t.clone()))
            .collect();
        table.push_bindings(&owned);
        table
    }

    fn eval_with(bindings: &[(&str, Term)], expr: &Expression) -> Option<Term> {
        let table = row_table(bindings);
        evaluate(expr, &table.row(0))
    }

    fn eval(expr: &Expression) -> Option<Term> {
        let table = BindingTable::unit();
        evaluate(expr, &table.row(0))
    }

    #[test]
    fn test_unary_identity_for_constants_and_variables() {
        let term = Term::literal_lang("chat", "fr");
        assert_eq!(eval(&Expression::constant(term.clone())), Some(term.clone()));

        let bound = eval_with(&[("x", term.clone())], &Expression::variable("x"));
        assert_eq!(bound, Some(term));

        assert_eq!(eval(&Expression::variable("missing")), None);
    }

    #[test]
    fn test_arithmetic_promotion() {
        let sum = Expression::constant(Term::integer(2)).add(Expression::constant(Term::integer(3)));
        assert_eq!(eval(&sum), Some(Term::integer(5)));

        let widened = Expression::constant(Term::integer(2))
            .add(Expression::constant(Term::double(0.5)));
        let result = eval(&widened).unwrap();
        assert_eq!(
            result.as_literal().unwrap().datatype.as_deref(),
            Some(Vocabulary::XSD_DOUBLE)
        );
        assert_eq!(result.as_literal().unwrap().numeric_value(), Some(2.5));
    }

    #[test]
    fn test_integer_division_widens_to_decimal() {
        let div = Expression::constant(Term::integer(5))
            .divide(Expression::constant(Term::integer(2)));
        let result = eval(&div).unwrap();
        let lit = result.as_literal().unwrap();
        assert_eq!(lit.datatype.as_deref(), Some(Vocabulary::XSD_DECIMAL));
        assert_eq!(lit.numeric_value(), Some(2.5));
    }

    #[test]
    fn test_division_by_zero_is_unbound() {
        let div = Expression::constant(Term::integer(1))
            .divide(Expression::constant(Term::integer(0)));
        assert_eq!(eval(&div), None);
    }

    #[test]
    fn test_non_numeric_arithmetic_is_unbound() {
        let add = Expression::constant(Term::literal("a"))
            .add(Expression::constant(Term::integer(1)));
        assert_eq!(eval(&add), None);
    }

    #[test]
    fn test_three_valued_and_or() {
        let t = Expression::constant(Term::boolean(true));
        let f = Expression::constant(Term::boolean(false));
        let unbound = Expression::variable("missing");

        assert_eq!(eval(&t.clone().and(f.clone())), Some(Term::boolean(false)));
        // AND with a definite false short-circuits past the error.
        assert_eq!(
            eval(&unbound.clone().and(f.clone())),
            Some(Term::boolean(false))
        );
        assert_eq!(eval(&unbound.clone().and(t.clone())), None);
        // OR with a definite true short-circuits past the error.
        assert_eq!(
            eval(&unbound.clone().or(t.clone())),
            Some(Term::boolean(true))
        );
        assert_eq!(eval(&unbound.clone().or(f)), None);
        assert_eq!(eval(&unbound.not()), None);
    }

    #[test]
    fn test_comparison_mismatched_types_is_unbound() {
        let cmp = Expression::constant(Term::literal("a"))
            .less(Expression::constant(Term::integer(1)));
        assert_eq!(eval(&cmp), None);
    }

    #[test]
    fn test_numeric_comparison_across_datatypes() {
        let cmp = Expression::constant(Term::integer(2))
            .less(Expression::constant(Term::double(2.5)));
        assert_eq!(eval(&cmp), Some(Term::boolean(true)));
    }

    #[test]
    fn test_equality_across_classes_is_false() {
        let eq = Expression::constant(Term::iri("http://ex.org/a"))
            .equal(Expression::constant(Term::literal("a")));
        assert_eq!(eval(&eq), Some(Term::boolean(false)));
    }

    #[test]
    fn test_language_tags_distinguish_literals() {
        let eq = Expression::constant(Term::literal_lang("a", "en"))
            .equal(Expression::constant(Term::literal_lang("a", "fr")));
        assert_eq!(eval(&eq), Some(Term::boolean(false)));
    }

    #[test]
    fn test_membership() {
        let one = Expression::constant(Term::integer(1));
        let list = vec![
            Expression::constant(Term::integer(3)),
            Expression::constant(Term::integer(1)),
        ];
        assert_eq!(
            eval(&one.clone().within(list.clone())),
            Some(Term::boolean(true))
        );
        assert_eq!(eval(&one.clone().not_within(list)), Some(Term::boolean(false)));
        // Empty lists.
        assert_eq!(eval(&one.clone().within(vec![])), Some(Term::boolean(false)));
        assert_eq!(eval(&one.not_within(vec![])), Some(Term::boolean(true)));
    }

    #[test]
    fn test_string_functions() {
        let s = Expression::constant(Term::literal("Hello World"));

        assert_eq!(
            eval(&Expression::Function(Function::StrLen(Box::new(s.clone())))),
            Some(Term::integer(11))
        );
        assert_eq!(
            eval(&Expression::Function(Function::UCase(Box::new(s.clone())))),
            Some(Term::literal("HELLO WORLD"))
        );
        assert_eq!(
            eval(&Expression::Function(Function::Contains(
                Box::new(s.clone()),
                Box::new(Expression::constant(Term::literal("lo W"))),
            ))),
            Some(Term::boolean(true))
        );
        assert_eq!(
            eval(&Expression::Function(Function::StrBefore(
                Box::new(s.clone()),
                Box::new(Expression::constant(Term::literal(" "))),
            ))),
            Some(Term::literal("Hello"))
        );
        assert_eq!(
            eval(&Expression::Function(Function::StrAfter(
                Box::new(s),
                Box::new(Expression::constant(Term::literal(" "))),
            ))),
            Some(Term::literal("World"))
        );
    }

    #[test]
    fn test_substr_is_one_based_and_bounded() {
        let s = Expression::constant(Term::literal("abcdef"));

        let sub = Function::SubStr(
            Box::new(s.clone()),
            Box::new(Expression::constant(Term::integer(2))),
            Some(Box::new(Expression::constant(Term::integer(3)))),
        );
        assert_eq!(eval(&Expression::Function(sub)), Some(Term::literal("bcd")));

        let out_of_range = Function::SubStr(
            Box::new(s),
            Box::new(Expression::constant(Term::integer(0))),
            None,
        );
        assert_eq!(eval(&Expression::Function(out_of_range)), None);
    }

    #[test]
    fn test_ucase_preserves_language() {
        let s = Expression::constant(Term::literal_lang("chat", "fr"));
        assert_eq!(
            eval(&Expression::Function(Function::UCase(Box::new(s)))),
            Some(Term::literal_lang("CHAT", "fr"))
        );
    }

    #[test]
    fn test_regex_with_flags() {
        let expr = Expression::Function(Function::Regex(
            Box::new(Expression::constant(Term::literal("Alice"))),
            Box::new(Expression::constant(Term::literal("^a"))),
            Some(Box::new(Expression::constant(Term::literal("i")))),
        ));
        assert_eq!(eval(&expr), Some(Term::boolean(true)));

        let invalid = Expression::Function(Function::Regex(
            Box::new(Expression::constant(Term::literal("x"))),
            Box::new(Expression::constant(Term::literal("("))),
            None,
        ));
        assert_eq!(eval(&invalid), None);
    }

    #[test]
    fn test_replace() {
        let expr = Expression::Function(Function::Replace(
            Box::new(Expression::constant(Term::literal("banana"))),
            Box::new(Expression::constant(Term::literal("a"))),
            Box::new(Expression::constant(Term::literal("o"))),
            None,
        ));
        assert_eq!(eval(&expr), Some(Term::literal("bonono")));
    }

    #[test]
    fn test_numeric_functions() {
        let neg = Expression::constant(Term::double(-2.6));
        assert_eq!(
            eval(&Expression::Function(Function::Abs(Box::new(neg.clone())))),
            Some(Term::double(2.6))
        );
        assert_eq!(
            eval(&Expression::Function(Function::Ceil(Box::new(neg.clone())))),
            Some(Term::double(-2.0))
        );
        assert_eq!(
            eval(&Expression::Function(Function::Floor(Box::new(neg)))),
            Some(Term::double(-3.0))
        );
        // Domain error: not numeric.
        assert_eq!(
            eval(&Expression::Function(Function::Abs(Box::new(
                Expression::constant(Term::literal("x"))
            )))),
            None
        );
    }

    #[test]
    fn test_temporal_accessors() {
        let dt = Expression::constant(Term::literal_typed(
            "2024-03-05T10:20:30+02:00",
            Vocabulary::XSD_DATETIME,
        ));

        assert_eq!(
            eval(&Expression::Function(Function::Year(Box::new(dt.clone())))),
            Some(Term::integer(2024))
        );
        assert_eq!(
            eval(&Expression::Function(Function::Minutes(Box::new(dt.clone())))),
            Some(Term::integer(20))
        );
        assert_eq!(
            eval(&Expression::Function(Function::Tz(Box::new(dt)))),
            Some(Term::literal("+02:00"))
        );
        // Non-temporal input.
        assert_eq!(
            eval(&Expression::Function(Function::Year(Box::new(
                Expression::constant(Term::literal("2024"))
            )))),
            None
        );
    }

    #[test]
    fn test_hash_functions_match_known_vectors() {
        let abc = Expression::constant(Term::literal("abc"));

        assert_eq!(
            eval(&Expression::Function(Function::Md5(Box::new(abc.clone())))),
            Some(Term::literal("900150983cd24fb0d6963f7d28e17f72"))
        );
        assert_eq!(
            eval(&Expression::Function(Function::Sha1(Box::new(abc.clone())))),
            Some(Term::literal("a9993e364706816aba3e25717850c26c9cd0d89d"))
        );
        assert_eq!(
            eval(&Expression::Function(Function::Sha256(Box::new(abc)))),
            Some(Term::literal(
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            ))
        );
    }

    #[test]
    fn test_type_tests_and_conditionals() {
        let iri = Expression::constant(Term::iri("http://ex.org/a"));
        assert_eq!(
            eval(&Expression::Function(Function::IsIri(Box::new(iri.clone())))),
            Some(Term::boolean(true))
        );
        assert_eq!(
            eval(&Expression::Function(Function::IsLiteral(Box::new(iri)))),
            Some(Term::boolean(false))
        );

        let coalesce = Expression::Function(Function::Coalesce(vec![
            Expression::variable("missing"),
            Expression::constant(Term::integer(7)),
        ]));
        assert_eq!(eval(&coalesce), Some(Term::integer(7)));

        let conditional = Expression::Function(Function::If(
            Box::new(Expression::constant(Term::boolean(false))),
            Box::new(Expression::constant(Term::literal("then"))),
            Box::new(Expression::constant(Term::literal("else"))),
        ));
        assert_eq!(eval(&conditional), Some(Term::literal("else")));
    }

    #[test]
    fn test_str_lang_and_datatype_constructors() {
        let strlang = Expression::Function(Function::StrLang(
            Box::new(Expression::constant(Term::literal("chat"))),
            Box::new(Expression::constant(Term::literal("fr"))),
        ));
        assert_eq!(eval(&strlang), Some(Term::literal_lang("chat", "fr")));

        let strdt = Expression::Function(Function::StrDt(
            Box::new(Expression::constant(Term::literal("42"))),
            Box::new(Expression::constant(Term::iri(Vocabulary::XSD_INTEGER))),
        ));
        assert_eq!(
            eval(&strdt),
            Some(Term::literal_typed("42", Vocabulary::XSD_INTEGER))
        );
    }

    #[test]
    fn test_bound() {
        let expr = Expression::Function(Function::Bound("x".to_string()));
        assert_eq!(
            eval_with(&[("x", Term::integer(1))], &expr),
            Some(Term::boolean(true))
        );
        assert_eq!(eval(&expr), Some(Term::boolean(false)));
    }

    #[test]
    fn test_lang_and_datatype_accessors() {
        let lang = Expression::Function(Function::Lang(Box::new(Expression::constant(
            Term::literal_lang("chat", "fr"),
        ))));
        assert_eq!(eval(&lang), Some(Term::literal("fr")));

        let datatype = Expression::Function(Function::Datatype(Box::new(Expression::constant(
            Term::literal("plain"),
        ))));
        assert_eq!(eval(&datatype), Some(Term::iri(Vocabulary::XSD_STRING)));
    }

    #[test]
    fn test_effective_boolean_value() {
        assert_eq!(
            effective_boolean_value(Some(&Term::boolean(true))),
            Some(true)
        );
        assert_eq!(effective_boolean_value(Some(&Term::integer(0))), Some(false));
        assert_eq!(
            effective_boolean_value(Some(&Term::literal(""))),
            Some(false)
        );
        assert_eq!(
            effective_boolean_value(Some(&Term::literal("x"))),
            Some(true)
        );
        assert_eq!(
            effective_boolean_value(Some(&Term::iri("http://ex.org/a"))),
            None
        );
        assert_eq!(effective_boolean_value(None), None);
    }

    #[test]
    fn test_order_comparison_is_total() {
        let blank = Term::blank("b");
        let iri = Term::iri("http://ex.org/a");
        let lit = Term::literal("a");

        assert_eq!(compare_for_order(Some(&blank), Some(&iri)), Ordering::Less);
        assert_eq!(compare_for_order(Some(&iri), Some(&lit)), Ordering::Less);
        assert_eq!(compare_for_order(Some(&lit), None), Ordering::Less);
        assert_eq!(compare_for_order(None, None), Ordering::Equal);
    }
}
