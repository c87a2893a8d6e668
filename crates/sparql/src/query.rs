//! Query objects and the builder API
//!
//! Queries are assembled programmatically: pattern groups hold triple/quad
//! patterns, property paths, inline VALUES bindings, sub-selects and
//! filters; the query root adds prefix declarations and the solution
//! modifiers. Query objects are immutable during evaluation and can be
//! re-applied to different datasets.

use crate::aggregates::Aggregator;
use crate::expression::Expression;
use crate::paths::PropertyPath;
use mirella_model::Term;

/// A prefix declaration (`PREFIX label: <namespace>`)
#[derive(Clone, Debug, PartialEq)]
pub struct Prefix {
    /// Prefix label without the trailing colon
    pub label: String,
    /// Namespace IRI
    pub namespace: String,
}

impl Prefix {
    /// Create a new prefix declaration
    pub fn new(label: &str, namespace: &str) -> Self {
        Self {
            label: label.trim_end_matches(':').to_string(),
            namespace: namespace.to_string(),
        }
    }
}

/// How a pattern group combines with the groups before it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupOperator {
    /// Inner compatibility join (the default)
    #[default]
    Join,
    /// Left join: keep previous rows, extend when compatible
    Optional,
    /// Column-union row concatenation
    Union,
    /// Remove previous rows with a compatible match here
    Minus,
}

/// A triple/quad pattern with per-pattern flags
///
/// Slots are terms; variable terms mark wildcard slots. A blank node in
/// any slot acts as an existential and is rewritten to a fresh variable
/// during evaluation. A ground predicate must be an IRI (checked during
/// normalisation).
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    /// Subject slot
    pub subject: Term,
    /// Predicate slot
    pub predicate: Term,
    /// Object slot
    pub object: Term,
    /// Optional graph context slot
    pub graph: Option<Term>,
    /// Evaluate as OPTIONAL within the group
    pub optional: bool,
    /// UNION this pattern's solutions with the next pattern's
    pub union_with_next: bool,
}

impl Pattern {
    /// Create a triple pattern
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: None,
            optional: false,
            union_with_next: false,
        }
    }

    /// Restrict the pattern to a graph context; chainable
    pub fn with_graph(mut self, graph: Term) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Mark the pattern OPTIONAL; chainable
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// UNION with the following pattern; chainable
    pub fn union_with_next(mut self) -> Self {
        self.union_with_next = true;
        self
    }

    /// Variable names in this pattern, in slot order
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        for term in [
            Some(&self.subject),
            Some(&self.predicate),
            Some(&self.object),
            self.graph.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(name) = term.as_variable() {
                if !out.iter().any(|v| v == name) {
                    out.push(name.to_string());
                }
            }
        }
        out
    }

    /// Number of ground (non-variable) slots
    pub fn ground_slots(&self) -> usize {
        [
            Some(&self.subject),
            Some(&self.predicate),
            Some(&self.object),
            self.graph.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter(|t| t.is_ground())
        .count()
    }
}

/// A plain triple pattern used in CONSTRUCT templates
#[derive(Clone, Debug, PartialEq)]
pub struct TriplePattern {
    /// Subject slot
    pub subject: Term,
    /// Predicate slot
    pub predicate: Term,
    /// Object slot
    pub object: Term,
}

impl TriplePattern {
    /// Create a template triple pattern
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

/// A property path between two endpoint slots
#[derive(Clone, Debug, PartialEq)]
pub struct PathPattern {
    /// Start slot (term or variable)
    pub subject: Term,
    /// Path expression over predicates
    pub path: PropertyPath,
    /// End slot (term or variable)
    pub object: Term,
}

impl PathPattern {
    /// Create a path pattern
    pub fn new(subject: Term, path: PropertyPath, object: Term) -> Self {
        Self {
            subject,
            path,
            object,
        }
    }
}

/// Inline bindings (VALUES)
///
/// `None` cells are UNDEF: the variable stays unbound for that row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValuesTable {
    /// Variable names (without sigil)
    pub variables: Vec<String>,
    /// Rows of optional terms, one cell per variable
    pub rows: Vec<Vec<Option<Term>>>,
}

impl ValuesTable {
    /// Create a VALUES block over the given variables
    pub fn new<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            variables: variables
                .into_iter()
                .map(|v| {
                    let v = v.as_ref();
                    v.strip_prefix('?').unwrap_or(v).to_string()
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; chainable. Width mismatches are caught at
    /// normalisation time.
    pub fn with_row(mut self, row: Vec<Option<Term>>) -> Self {
        self.rows.push(row);
        self
    }
}

/// One member of a pattern group
#[derive(Clone, Debug, PartialEq)]
pub enum GroupMember {
    /// A triple/quad pattern
    Pattern(Pattern),
    /// A property path
    Path(PathPattern),
    /// Inline VALUES bindings
    Values(ValuesTable),
    /// A nested SELECT evaluated by recursion
    SubSelect(Box<SelectQuery>),
}

/// A filter attached to a pattern group or HAVING clause
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Keep rows where the expression's effective boolean value is true
    Expression(Expression),
    /// Keep rows for which the inner group has a compatible solution
    Exists(PatternGroup),
    /// Negation; must not wrap an EXISTS filter (checked at normalisation)
    Not(Box<Filter>),
    /// Both filters hold
    And(Box<Filter>, Box<Filter>),
    /// Either filter holds
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    /// Check whether an EXISTS filter occurs anywhere below a negation
    pub(crate) fn negates_exists(&self) -> bool {
        fn contains_exists(filter: &Filter) -> bool {
            match filter {
                Filter::Exists(_) => true,
                Filter::Expression(_) => false,
                Filter::Not(inner) => contains_exists(inner),
                Filter::And(a, b) | Filter::Or(a, b) => {
                    contains_exists(a) || contains_exists(b)
                }
            }
        }
        match self {
            Filter::Expression(_) | Filter::Exists(_) => false,
            Filter::Not(inner) => contains_exists(inner),
            Filter::And(a, b) | Filter::Or(a, b) => a.negates_exists() || b.negates_exists(),
        }
    }
}

/// A conjunctive block of patterns with group-level filters and a flag
/// describing how it combines with its preceding siblings
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternGroup {
    /// Ordered members
    pub members: Vec<GroupMember>,
    /// Filters applied over the joined group table
    pub filters: Vec<Filter>,
    /// Combination operator relative to preceding groups
    pub operator: GroupOperator,
}

impl PatternGroup {
    /// Create an empty group that joins with its siblings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the combination operator; chainable
    pub fn with_operator(mut self, operator: GroupOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Append a pattern; chainable
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.members.push(GroupMember::Pattern(pattern));
        self
    }

    /// Append a property path; chainable
    pub fn with_path(mut self, path: PathPattern) -> Self {
        self.members.push(GroupMember::Path(path));
        self
    }

    /// Append inline VALUES bindings; chainable
    pub fn with_values(mut self, values: ValuesTable) -> Self {
        self.members.push(GroupMember::Values(values));
        self
    }

    /// Append a sub-select; chainable
    pub fn with_sub_select(mut self, query: SelectQuery) -> Self {
        self.members.push(GroupMember::SubSelect(Box::new(query)));
        self
    }

    /// Append a filter; chainable
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Variable names produced by this group's members
    pub fn variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !out.iter().any(|v| v == name) {
                out.push(name.to_string());
            }
        };
        for member in &self.members {
            match member {
                GroupMember::Pattern(p) => p.variables().iter().for_each(|v| push(v)),
                GroupMember::Path(p) => {
                    if let Some(v) = p.subject.as_variable() {
                        push(v);
                    }
                    if let Some(v) = p.object.as_variable() {
                        push(v);
                    }
                }
                GroupMember::Values(v) => v.variables.iter().for_each(|v| push(v)),
                GroupMember::SubSelect(q) => {
                    q.projected_variables().iter().for_each(|v| push(v))
                }
            }
        }
        out
    }
}

/// Sort direction for ORDER BY
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One element of a SELECT projection
#[derive(Clone, Debug, PartialEq)]
pub enum ProjectionElement {
    /// Project a variable
    Variable(String),
    /// Bind an expression to a fresh variable (`expr AS ?alias`)
    Expression {
        /// Expression to evaluate per row
        expr: Expression,
        /// Result variable name (without sigil)
        alias: String,
    },
}

/// A SELECT query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectQuery {
    /// Prefix declarations
    pub prefixes: Vec<Prefix>,
    /// Pattern groups in declaration order
    pub groups: Vec<PatternGroup>,
    /// Projection; empty means `SELECT *`
    pub projection: Vec<ProjectionElement>,
    /// GROUP BY variables
    pub group_by: Vec<String>,
    /// Aggregators with their result variables
    pub aggregators: Vec<(String, Aggregator)>,
    /// HAVING filters over the aggregated rows
    pub having: Vec<Filter>,
    /// ORDER BY variable/direction pairs
    pub order_by: Vec<(String, OrderDirection)>,
    /// Eliminate duplicate rows
    pub distinct: bool,
    /// Maximum number of rows
    pub limit: Option<usize>,
    /// Number of rows to skip
    pub offset: Option<usize>,
}

impl SelectQuery {
    /// Create an empty SELECT query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix declaration; chainable
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefixes.push(prefix);
        self
    }

    /// Add a pattern group; chainable
    pub fn with_group(mut self, group: PatternGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Project a variable; chainable
    pub fn select(mut self, variable: &str) -> Self {
        let name = variable.strip_prefix('?').unwrap_or(variable);
        self.projection
            .push(ProjectionElement::Variable(name.to_string()));
        self
    }

    /// Bind an expression to a result variable; chainable
    pub fn bind(mut self, expr: Expression, alias: &str) -> Self {
        let alias = alias.strip_prefix('?').unwrap_or(alias);
        self.projection.push(ProjectionElement::Expression {
            expr,
            alias: alias.to_string(),
        });
        self
    }

    /// Group rows by a variable; chainable
    pub fn group_by(mut self, variable: &str) -> Self {
        let name = variable.strip_prefix('?').unwrap_or(variable);
        self.group_by.push(name.to_string());
        self
    }

    /// Add an aggregator bound to a result variable; chainable
    pub fn aggregate(mut self, alias: &str, aggregator: Aggregator) -> Self {
        let alias = alias.strip_prefix('?').unwrap_or(alias);
        self.aggregators.push((alias.to_string(), aggregator));
        self
    }

    /// Add a HAVING filter; chainable
    pub fn having(mut self, filter: Filter) -> Self {
        self.having.push(filter);
        self
    }

    /// Sort by a variable; chainable
    pub fn order_by(mut self, variable: &str, direction: OrderDirection) -> Self {
        let name = variable.strip_prefix('?').unwrap_or(variable);
        self.order_by.push((name.to_string(), direction));
        self
    }

    /// Eliminate duplicate rows; chainable
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Keep at most `n` rows; chainable
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` rows; chainable
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    /// The variable names this query exposes, in declaration order
    ///
    /// Empty projection (`SELECT *`) exposes every group variable, then
    /// GROUP BY variables and aggregator aliases.
    pub fn projected_variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !out.iter().any(|v| v == name) {
                out.push(name.to_string());
            }
        };
        if self.projection.is_empty() {
            if self.group_by.is_empty() && self.aggregators.is_empty() {
                for group in &self.groups {
                    group.variables().iter().for_each(|v| push(v));
                }
            } else {
                self.group_by.iter().for_each(|v| push(v));
            }
        } else {
            for element in &self.projection {
                match element {
                    ProjectionElement::Variable(name) => push(name),
                    ProjectionElement::Expression { alias, .. } => push(alias),
                }
            }
        }
        for (alias, _) in &self.aggregators {
            push(alias);
        }
        out
    }
}

/// An ASK query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AskQuery {
    /// Prefix declarations
    pub prefixes: Vec<Prefix>,
    /// Pattern groups in declaration order
    pub groups: Vec<PatternGroup>,
}

impl AskQuery {
    /// Create an empty ASK query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix declaration; chainable
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefixes.push(prefix);
        self
    }

    /// Add a pattern group; chainable
    pub fn with_group(mut self, group: PatternGroup) -> Self {
        self.groups.push(group);
        self
    }
}

/// A CONSTRUCT query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstructQuery {
    /// Prefix declarations
    pub prefixes: Vec<Prefix>,
    /// Pattern groups in declaration order
    pub groups: Vec<PatternGroup>,
    /// Template triples instantiated once per solution row
    pub template: Vec<TriplePattern>,
    /// Maximum number of solution rows fed to the template
    pub limit: Option<usize>,
    /// Number of solution rows to skip
    pub offset: Option<usize>,
}

impl ConstructQuery {
    /// Create an empty CONSTRUCT query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix declaration; chainable
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefixes.push(prefix);
        self
    }

    /// Add a pattern group; chainable
    pub fn with_group(mut self, group: PatternGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Add a template triple; chainable
    pub fn with_template(mut self, triple: TriplePattern) -> Self {
        self.template.push(triple);
        self
    }

    /// Keep at most `n` solution rows; chainable
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` solution rows; chainable
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }
}

/// A DESCRIBE query
///
/// Describe terms are ground terms and/or variables bound by the WHERE
/// body; the result graph is the symmetric one-hop concise bounded
/// description of every distinct described term.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescribeQuery {
    /// Prefix declarations
    pub prefixes: Vec<Prefix>,
    /// Pattern groups in declaration order (may be empty for ground terms)
    pub groups: Vec<PatternGroup>,
    /// Terms to describe: ground terms or variables
    pub terms: Vec<Term>,
    /// Maximum number of solution rows considered for variable terms
    pub limit: Option<usize>,
    /// Number of solution rows to skip
    pub offset: Option<usize>,
}

impl DescribeQuery {
    /// Create an empty DESCRIBE query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix declaration; chainable
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefixes.push(prefix);
        self
    }

    /// Add a pattern group; chainable
    pub fn with_group(mut self, group: PatternGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Add a term (or variable) to describe; chainable
    pub fn describe(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    /// Keep at most `n` solution rows; chainable
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` solution rows; chainable
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }
}
