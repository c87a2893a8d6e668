//! Canonical SPARQL 1.1 text for query objects
//!
//! A pure function from query object to query text, used to dispatch
//! remote endpoint queries and for diagnostics. IRIs are compacted to
//! prefixed names whenever a declared prefix matches; the prologue merges
//! the prefix declarations of the query and of every nested sub-select.

use crate::aggregates::Aggregator;
use crate::expression::{Expression, Function};
use crate::paths::PropertyPath;
use crate::query::{
    AskQuery, ConstructQuery, DescribeQuery, Filter, GroupMember, GroupOperator, OrderDirection,
    Pattern, PatternGroup, Prefix, ProjectionElement, SelectQuery, TriplePattern,
};
use mirella_model::Term;
use std::fmt::Write as _;

/// Serialises query objects to canonical SPARQL text
pub struct Printer;

impl Printer {
    /// Print a SELECT query
    pub fn print_select(query: &SelectQuery) -> String {
        let prefixes = collect_select_prefixes(query);
        let ctx = Ctx {
            prefixes: &prefixes,
        };

        let mut out = ctx.prologue();
        out.push_str("SELECT ");
        if query.distinct {
            out.push_str("DISTINCT ");
        }
        out.push_str(&ctx.projection_items(query));
        out.push('\n');
        out.push_str("WHERE {\n");
        ctx.groups(&mut out, &query.groups, 1);
        out.push_str("}\n");

        if !query.group_by.is_empty() {
            let vars: Vec<String> = query.group_by.iter().map(|v| format!("?{}", v)).collect();
            let _ = writeln!(out, "GROUP BY {}", vars.join(" "));
        }
        for filter in &query.having {
            let _ = writeln!(out, "HAVING ( {} )", ctx.filter(filter, 0));
        }
        if !query.order_by.is_empty() {
            let conditions: Vec<String> = query
                .order_by
                .iter()
                .map(|(variable, direction)| match direction {
                    OrderDirection::Ascending => format!("ASC(?{})", variable),
                    OrderDirection::Descending => format!("DESC(?{})", variable),
                })
                .collect();
            let _ = writeln!(out, "ORDER BY {}", conditions.join(" "));
        }
        if let Some(limit) = query.limit {
            let _ = writeln!(out, "LIMIT {}", limit);
        }
        if let Some(offset) = query.offset {
            let _ = writeln!(out, "OFFSET {}", offset);
        }
        out
    }

    /// Print an ASK query
    pub fn print_ask(query: &AskQuery) -> String {
        let prefixes = collect_prefixes(&query.prefixes, &query.groups);
        let ctx = Ctx {
            prefixes: &prefixes,
        };

        let mut out = ctx.prologue();
        out.push_str("ASK\nWHERE {\n");
        ctx.groups(&mut out, &query.groups, 1);
        out.push_str("}\n");
        out
    }

    /// Print a CONSTRUCT query
    pub fn print_construct(query: &ConstructQuery) -> String {
        let prefixes = collect_prefixes(&query.prefixes, &query.groups);
        let ctx = Ctx {
            prefixes: &prefixes,
        };

        let mut out = ctx.prologue();
        out.push_str("CONSTRUCT {\n");
        for template in &query.template {
            let _ = writeln!(out, "  {}", ctx.triple(template));
        }
        out.push_str("}\nWHERE {\n");
        ctx.groups(&mut out, &query.groups, 1);
        out.push_str("}\n");
        if let Some(limit) = query.limit {
            let _ = writeln!(out, "LIMIT {}", limit);
        }
        if let Some(offset) = query.offset {
            let _ = writeln!(out, "OFFSET {}", offset);
        }
        out
    }

    /// Print a DESCRIBE query
    pub fn print_describe(query: &DescribeQuery) -> String {
        let prefixes = collect_prefixes(&query.prefixes, &query.groups);
        let ctx = Ctx {
            prefixes: &prefixes,
        };

        let mut out = ctx.prologue();
        let terms: Vec<String> = query.terms.iter().map(|t| ctx.term(t)).collect();
        let _ = writeln!(out, "DESCRIBE {}", terms.join(" "));
        if !query.groups.is_empty() {
            out.push_str("WHERE {\n");
            ctx.groups(&mut out, &query.groups, 1);
            out.push_str("}\n");
        }
        if let Some(limit) = query.limit {
            let _ = writeln!(out, "LIMIT {}", limit);
        }
        if let Some(offset) = query.offset {
            let _ = writeln!(out, "OFFSET {}", offset);
        }
        out
    }
}

/// Prefix declarations of a SELECT and every nested sub-select
fn collect_select_prefixes(query: &SelectQuery) -> Vec<Prefix> {
    collect_prefixes(&query.prefixes, &query.groups)
}

fn collect_prefixes(own: &[Prefix], groups: &[PatternGroup]) -> Vec<Prefix> {
    let mut out: Vec<Prefix> = Vec::new();
    let mut add = |prefix: &Prefix| {
        if !out.iter().any(|p: &Prefix| p.label == prefix.label) {
            out.push(prefix.clone());
        }
    };
    for prefix in own {
        add(prefix);
    }
    fn walk(groups: &[PatternGroup], add: &mut dyn FnMut(&Prefix)) {
        for group in groups {
            for member in &group.members {
                if let GroupMember::SubSelect(sub) = member {
                    for prefix in &sub.prefixes {
                        add(prefix);
                    }
                    walk(&sub.groups, add);
                }
            }
            for filter in &group.filters {
                walk_filter(filter, add);
            }
        }
    }
    fn walk_filter(filter: &Filter, add: &mut dyn FnMut(&Prefix)) {
        match filter {
            Filter::Exists(group) => walk(std::slice::from_ref(group), add),
            Filter::Not(inner) => walk_filter(inner, add),
            Filter::And(a, b) | Filter::Or(a, b) => {
                walk_filter(a, add);
                walk_filter(b, add);
            }
            Filter::Expression(_) => {}
        }
    }
    walk(groups, &mut add);
    out
}

struct Ctx<'a> {
    prefixes: &'a [Prefix],
}

impl Ctx<'_> {
    fn prologue(&self) -> String {
        let mut out = String::new();
        for prefix in self.prefixes {
            let _ = writeln!(out, "PREFIX {}: <{}>", prefix.label, prefix.namespace);
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn projection_items(&self, query: &SelectQuery) -> String {
        let mut items: Vec<String> = Vec::new();
        for element in &query.projection {
            match element {
                ProjectionElement::Variable(name) => items.push(format!("?{}", name)),
                ProjectionElement::Expression { expr, alias } => {
                    items.push(format!("({} AS ?{})", self.expression(expr), alias));
                }
            }
        }
        for (alias, aggregator) in &query.aggregators {
            items.push(format!("({} AS ?{})", self.aggregator(aggregator), alias));
        }
        if items.is_empty() {
            "*".to_string()
        } else {
            items.join(" ")
        }
    }

    fn groups(&self, out: &mut String, groups: &[PatternGroup], depth: usize) {
        for (index, group) in groups.iter().enumerate() {
            let pad = "  ".repeat(depth);
            match group.operator {
                GroupOperator::Join => {}
                GroupOperator::Optional => {
                    let _ = write!(out, "{}OPTIONAL\n", pad);
                }
                GroupOperator::Union if index > 0 => {
                    let _ = write!(out, "{}UNION\n", pad);
                }
                GroupOperator::Union => {}
                GroupOperator::Minus => {
                    let _ = write!(out, "{}MINUS\n", pad);
                }
            }
            let _ = write!(out, "{}{{\n", pad);
            self.group_body(out, group, depth + 1);
            let _ = write!(out, "{}}}\n", pad);
        }
    }

    fn group_body(&self, out: &mut String, group: &PatternGroup, depth: usize) {
        let pad = "  ".repeat(depth);
        let mut in_union_chain = false;

        for member in &group.members {
            match member {
                GroupMember::Pattern(pattern) => {
                    if in_union_chain {
                        let _ = write!(out, "{}UNION {{ {} }}\n", pad, self.pattern(pattern));
                        in_union_chain = pattern.union_with_next;
                    } else if pattern.union_with_next {
                        let _ = write!(out, "{}{{ {} }}\n", pad, self.pattern(pattern));
                        in_union_chain = true;
                    } else if pattern.optional {
                        let _ = write!(out, "{}OPTIONAL {{ {} }}\n", pad, self.pattern(pattern));
                    } else {
                        let _ = write!(out, "{}{}\n", pad, self.pattern(pattern));
                    }
                }
                GroupMember::Path(path) => {
                    let _ = write!(
                        out,
                        "{}{} {} {} .\n",
                        pad,
                        self.term(&path.subject),
                        self.path(&path.path),
                        self.term(&path.object)
                    );
                }
                GroupMember::Values(values) => {
                    let vars: Vec<String> =
                        values.variables.iter().map(|v| format!("?{}", v)).collect();
                    let _ = write!(out, "{}VALUES ({}) {{\n", pad, vars.join(" "));
                    for row in &values.rows {
                        let cells: Vec<String> = row
                            .iter()
                            .map(|cell| match cell {
                                Some(term) => self.term(term),
                                None => "UNDEF".to_string(),
                            })
                            .collect();
                        let _ = write!(out, "{}  ({})\n", pad, cells.join(" "));
                    }
                    let _ = write!(out, "{}}}\n", pad);
                }
                GroupMember::SubSelect(sub) => {
                    let _ = write!(out, "{}{{\n", pad);
                    self.sub_select(out, sub, depth + 1);
                    let _ = write!(out, "{}}}\n", pad);
                }
            }
        }

        for filter in &group.filters {
            let _ = write!(out, "{}FILTER ( {} )\n", pad, self.filter(filter, depth));
        }
    }

    /// A nested SELECT without its own prologue; prefixes were inlined
    /// into the outer query's prologue
    fn sub_select(&self, out: &mut String, query: &SelectQuery, depth: usize) {
        let pad = "  ".repeat(depth);
        let _ = write!(out, "{}SELECT ", pad);
        if query.distinct {
            out.push_str("DISTINCT ");
        }
        out.push_str(&self.projection_items(query));
        out.push('\n');
        let _ = write!(out, "{}WHERE {{\n", pad);
        self.groups(out, &query.groups, depth + 1);
        let _ = write!(out, "{}}}\n", pad);
        if !query.group_by.is_empty() {
            let vars: Vec<String> = query.group_by.iter().map(|v| format!("?{}", v)).collect();
            let _ = write!(out, "{}GROUP BY {}\n", pad, vars.join(" "));
        }
        for filter in &query.having {
            let _ = write!(out, "{}HAVING ( {} )\n", pad, self.filter(filter, depth));
        }
        if !query.order_by.is_empty() {
            let conditions: Vec<String> = query
                .order_by
                .iter()
                .map(|(variable, direction)| match direction {
                    OrderDirection::Ascending => format!("ASC(?{})", variable),
                    OrderDirection::Descending => format!("DESC(?{})", variable),
                })
                .collect();
            let _ = write!(out, "{}ORDER BY {}\n", pad, conditions.join(" "));
        }
        if let Some(limit) = query.limit {
            let _ = write!(out, "{}LIMIT {}\n", pad, limit);
        }
        if let Some(offset) = query.offset {
            let _ = write!(out, "{}OFFSET {}\n", pad, offset);
        }
    }

    fn pattern(&self, pattern: &Pattern) -> String {
        let triple = format!(
            "{} {} {} .",
            self.term(&pattern.subject),
            self.term(&pattern.predicate),
            self.term(&pattern.object)
        );
        match &pattern.graph {
            Some(graph) => format!("GRAPH {} {{ {} }}", self.term(graph), triple),
            None => triple,
        }
    }

    fn triple(&self, triple: &TriplePattern) -> String {
        format!(
            "{} {} {} .",
            self.term(&triple.subject),
            self.term(&triple.predicate),
            self.term(&triple.object)
        )
    }

    fn filter(&self, filter: &Filter, depth: usize) -> String {
        match filter {
            Filter::Expression(expr) => self.expression(expr),
            Filter::Exists(group) => {
                let mut body = String::new();
                self.group_body(&mut body, group, depth + 1);
                format!("EXISTS {{\n{}{}}}", body, "  ".repeat(depth))
            }
            Filter::Not(inner) => format!("!({})", self.filter(inner, depth)),
            Filter::And(a, b) => {
                format!("({} && {})", self.filter(a, depth), self.filter(b, depth))
            }
            Filter::Or(a, b) => {
                format!("({} || {})", self.filter(a, depth), self.filter(b, depth))
            }
        }
    }

    fn aggregator(&self, aggregator: &Aggregator) -> String {
        let body = |expr: &Option<&Expression>, distinct: bool| {
            let distinct = if distinct { "DISTINCT " } else { "" };
            match expr {
                Some(expr) => format!("{}{}", distinct, self.expression(expr)),
                None => format!("{}*", distinct),
            }
        };
        match aggregator {
            Aggregator::Count { expr, distinct } => {
                format!("COUNT({})", body(&expr.as_ref(), *distinct))
            }
            Aggregator::Sum { expr, distinct } => {
                format!("SUM({})", body(&Some(expr), *distinct))
            }
            Aggregator::Min { expr, distinct } => {
                format!("MIN({})", body(&Some(expr), *distinct))
            }
            Aggregator::Max { expr, distinct } => {
                format!("MAX({})", body(&Some(expr), *distinct))
            }
            Aggregator::Avg { expr, distinct } => {
                format!("AVG({})", body(&Some(expr), *distinct))
            }
            Aggregator::Sample { expr, distinct } => {
                format!("SAMPLE({})", body(&Some(expr), *distinct))
            }
            Aggregator::GroupConcat {
                expr,
                separator,
                distinct,
            } => match separator {
                Some(separator) => format!(
                    "GROUP_CONCAT({}; SEPARATOR={})",
                    body(&Some(expr), *distinct),
                    quote_string(separator)
                ),
                None => format!("GROUP_CONCAT({})", body(&Some(expr), *distinct)),
            },
        }
    }

    fn path(&self, path: &PropertyPath) -> String {
        match path {
            PropertyPath::Predicate(term) => self.term(term),
            PropertyPath::Inverse(inner) => format!("^{}", self.path_operand(inner)),
            PropertyPath::Sequence(a, b) => {
                format!("{}/{}", self.path_operand(a), self.path_operand(b))
            }
            PropertyPath::Alternative(a, b) => {
                format!("({}|{})", self.path_operand(a), self.path_operand(b))
            }
            PropertyPath::ZeroOrOne(inner) => format!("{}?", self.path_operand(inner)),
            PropertyPath::ZeroOrMore(inner) => format!("{}*", self.path_operand(inner)),
            PropertyPath::OneOrMore(inner) => format!("{}+", self.path_operand(inner)),
            PropertyPath::NegatedPropertySet(predicates) => {
                let items: Vec<String> = predicates.iter().map(|p| self.term(p)).collect();
                format!("!({})", items.join("|"))
            }
        }
    }

    fn path_operand(&self, path: &PropertyPath) -> String {
        match path {
            PropertyPath::Predicate(_) => self.path(path),
            _ => format!("({})", self.path(path)),
        }
    }

    fn expression(&self, expr: &Expression) -> String {
        match expr {
            Expression::Term(term) => self.term(term),
            Expression::Or(a, b) => format!("({} || {})", self.expression(a), self.expression(b)),
            Expression::And(a, b) => format!("({} && {})", self.expression(a), self.expression(b)),
            Expression::Not(inner) => format!("!({})", self.expression(inner)),
            Expression::Equal(a, b) => format!("({} = {})", self.expression(a), self.expression(b)),
            Expression::NotEqual(a, b) => {
                format!("({} != {})", self.expression(a), self.expression(b))
            }
            Expression::Less(a, b) => format!("({} < {})", self.expression(a), self.expression(b)),
            Expression::LessOrEqual(a, b) => {
                format!("({} <= {})", self.expression(a), self.expression(b))
            }
            Expression::Greater(a, b) => {
                format!("({} > {})", self.expression(a), self.expression(b))
            }
            Expression::GreaterOrEqual(a, b) => {
                format!("({} >= {})", self.expression(a), self.expression(b))
            }
            Expression::In(head, items) => {
                let items: Vec<String> = items.iter().map(|i| self.expression(i)).collect();
                format!("({} IN ({}))", self.expression(head), items.join(", "))
            }
            Expression::NotIn(head, items) => {
                let items: Vec<String> = items.iter().map(|i| self.expression(i)).collect();
                format!("({} NOT IN ({}))", self.expression(head), items.join(", "))
            }
            Expression::Add(a, b) => format!("({} + {})", self.expression(a), self.expression(b)),
            Expression::Subtract(a, b) => {
                format!("({} - {})", self.expression(a), self.expression(b))
            }
            Expression::Multiply(a, b) => {
                format!("({} * {})", self.expression(a), self.expression(b))
            }
            Expression::Divide(a, b) => {
                format!("({} / {})", self.expression(a), self.expression(b))
            }
            Expression::Negate(inner) => format!("-({})", self.expression(inner)),
            Expression::Function(function) => self.function(function),
        }
    }

    fn function(&self, function: &Function) -> String {
        let call = |name: &str, args: &[&Expression]| {
            let args: Vec<String> = args.iter().map(|a| self.expression(a)).collect();
            format!("{}({})", name, args.join(", "))
        };
        match function {
            Function::Str(a) => call("STR", &[a]),
            Function::Lang(a) => call("LANG", &[a]),
            Function::LangMatches(a, b) => call("LANGMATCHES", &[a, b]),
            Function::Datatype(a) => call("DATATYPE", &[a]),
            Function::Iri(a) => call("IRI", &[a]),
            Function::BNode(None) => "BNODE()".to_string(),
            Function::BNode(Some(a)) => call("BNODE", &[a]),
            Function::StrLang(a, b) => call("STRLANG", &[a, b]),
            Function::StrDt(a, b) => call("STRDT", &[a, b]),
            Function::IsIri(a) => call("isIRI", &[a]),
            Function::IsBlank(a) => call("isBLANK", &[a]),
            Function::IsLiteral(a) => call("isLITERAL", &[a]),
            Function::IsNumeric(a) => call("isNUMERIC", &[a]),
            Function::Bound(name) => format!("BOUND(?{})", name),
            Function::SameTerm(a, b) => call("sameTerm", &[a, b]),
            Function::Coalesce(items) => {
                let args: Vec<&Expression> = items.iter().collect();
                call("COALESCE", &args)
            }
            Function::If(a, b, c) => call("IF", &[a, b, c]),
            Function::StrLen(a) => call("STRLEN", &[a]),
            Function::SubStr(a, b, None) => call("SUBSTR", &[a, b]),
            Function::SubStr(a, b, Some(c)) => call("SUBSTR", &[a, b, c]),
            Function::UCase(a) => call("UCASE", &[a]),
            Function::LCase(a) => call("LCASE", &[a]),
            Function::StrStarts(a, b) => call("STRSTARTS", &[a, b]),
            Function::StrEnds(a, b) => call("STRENDS", &[a, b]),
            Function::Contains(a, b) => call("CONTAINS", &[a, b]),
            Function::StrBefore(a, b) => call("STRBEFORE", &[a, b]),
            Function::StrAfter(a, b) => call("STRAFTER", &[a, b]),
            Function::EncodeForUri(a) => call("ENCODE_FOR_URI", &[a]),
            Function::Concat(items) => {
                let args: Vec<&Expression> = items.iter().collect();
                call("CONCAT", &args)
            }
            Function::Replace(a, b, c, None) => call("REPLACE", &[a, b, c]),
            Function::Replace(a, b, c, Some(f)) => call("REPLACE", &[a, b, c, f]),
            Function::Regex(a, b, None) => call("REGEX", &[a, b]),
            Function::Regex(a, b, Some(f)) => call("REGEX", &[a, b, f]),
            Function::Abs(a) => call("ABS", &[a]),
            Function::Round(a) => call("ROUND", &[a]),
            Function::Ceil(a) => call("CEIL", &[a]),
            Function::Floor(a) => call("FLOOR", &[a]),
            Function::Rand => "RAND()".to_string(),
            Function::Now => "NOW()".to_string(),
            Function::Year(a) => call("YEAR", &[a]),
            Function::Month(a) => call("MONTH", &[a]),
            Function::Day(a) => call("DAY", &[a]),
            Function::Hours(a) => call("HOURS", &[a]),
            Function::Minutes(a) => call("MINUTES", &[a]),
            Function::Seconds(a) => call("SECONDS", &[a]),
            Function::Tz(a) => call("TZ", &[a]),
            Function::Md5(a) => call("MD5", &[a]),
            Function::Sha1(a) => call("SHA1", &[a]),
            Function::Sha256(a) => call("SHA256", &[a]),
            Function::Sha384(a) => call("SHA384", &[a]),
            Function::Sha512(a) => call("SHA512", &[a]),
            Function::Uuid => "UUID()".to_string(),
            Function::StrUuid => "STRUUID()".to_string(),
        }
    }

    fn term(&self, term: &Term) -> String {
        match term {
            Term::Iri(iri) => self.iri(iri),
            Term::BlankNode(label) => format!("_:{}", label),
            Term::Variable(name) => format!("?{}", name),
            Term::Literal(lit) => {
                let mut out = quote_string(&lit.lexical);
                if let Some(lang) = &lit.language {
                    let _ = write!(out, "@{}", lang);
                } else if let Some(datatype) = &lit.datatype {
                    let _ = write!(out, "^^{}", self.iri(datatype));
                }
                out
            }
        }
    }

    /// Compact an IRI to a prefixed name when a declared prefix matches
    fn iri(&self, iri: &str) -> String {
        for prefix in self.prefixes {
            if let Some(local) = iri.strip_prefix(&prefix.namespace) {
                if is_local_name(local) {
                    return format!("{}:{}", prefix.label, local);
                }
            }
        }
        format!("<{}>", iri)
    }
}

fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_local_name(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .next()
            .map(|c| c.is_alphabetic() || c == '_')
            .unwrap_or(false)
        && text.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
