//! Query evaluation engine
//!
//! Orchestrates the pipeline: normalise the query, evaluate each pattern
//! group into a binding table, combine group tables honouring
//! OPTIONAL/UNION/MINUS, apply the solution modifiers in a fixed order,
//! and materialise the result. Evaluation is single-threaded per query;
//! the async entry points wrap the synchronous ones on a worker task and
//! introduce no intra-query parallelism.

use crate::aggregates;
use crate::bindings::{BindingTable, RowView};
use crate::endpoint::{self, EndpointDescriptor};
use crate::error::QueryError;
use crate::eval;
use crate::paths;
use crate::printer::Printer;
use crate::query::{
    AskQuery, ConstructQuery, DescribeQuery, Filter, GroupMember, GroupOperator, Pattern,
    PatternGroup, ProjectionElement, SelectQuery, ValuesTable,
};
use crate::results::{AskResult, SelectResult};
use mirella_model::{Term, Triple};
use mirella_store::{DataSource, Graph, QuadPattern, TermPattern};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::debug;

/// The SPARQL query engine
///
/// Stateless: one engine value can evaluate any number of queries against
/// any number of datasets. All intermediate binding tables are owned by
/// the evaluation call and discarded when the result is produced.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryEngine;

impl QueryEngine {
    /// Create a new engine
    pub fn new() -> Self {
        QueryEngine
    }

    // ---------------------------------------------------------------
    // Local dataset entry points
    // ---------------------------------------------------------------

    /// Evaluate a SELECT query against a dataset
    pub fn select(
        &self,
        query: &SelectQuery,
        source: &dyn DataSource,
    ) -> Result<SelectResult, QueryError> {
        Ok(SelectResult::new(self.select_table(query, source)?))
    }

    /// Evaluate an ASK query against a dataset
    pub fn ask(&self, query: &AskQuery, source: &dyn DataSource) -> Result<AskResult, QueryError> {
        normalise_ask(query)?;
        let table = self.evaluate_groups(&query.groups, source)?;
        Ok(AskResult {
            value: !table.is_empty(),
        })
    }

    /// Evaluate a CONSTRUCT query against a dataset
    pub fn construct(
        &self,
        query: &ConstructQuery,
        source: &dyn DataSource,
    ) -> Result<Graph, QueryError> {
        normalise_construct(query)?;
        let mut table = self.evaluate_groups(&query.groups, source)?;
        if let Some(offset) = query.offset {
            table.offset(offset);
        }
        if let Some(limit) = query.limit {
            table.limit(limit);
        }
        debug!(rows = table.len(), "instantiating CONSTRUCT template");

        let mut graph = Graph::new();
        for (row_index, row) in table.iter().enumerate() {
            for template in &query.template {
                let (Some(s), Some(p), Some(o)) = (
                    instantiate(&template.subject, &row, row_index),
                    instantiate(&template.predicate, &row, row_index),
                    instantiate(&template.object, &row, row_index),
                ) else {
                    continue;
                };
                // Rows binding a slot to an illegal position are skipped,
                // not errors.
                if s.is_literal() || !p.is_iri() {
                    continue;
                }
                graph
                    .insert(Triple::new(s, p, o))
                    .map_err(|e| QueryError::Evaluation(e.to_string()))?;
            }
        }
        Ok(graph)
    }

    /// Evaluate a DESCRIBE query against a dataset
    ///
    /// The result is the symmetric one-hop concise bounded description of
    /// every distinct described term: all statements in which the term
    /// appears as subject or object.
    pub fn describe(
        &self,
        query: &DescribeQuery,
        source: &dyn DataSource,
    ) -> Result<Graph, QueryError> {
        normalise_describe(query)?;

        let mut described: Vec<Term> = Vec::new();
        let mut seen: FxHashSet<Term> = FxHashSet::default();
        let mut push = |term: Term| {
            if seen.insert(term.clone()) {
                described.push(term);
            }
        };

        if query.groups.is_empty() {
            for term in &query.terms {
                push(term.clone());
            }
        } else {
            let mut table = self.evaluate_groups(&query.groups, source)?;
            if let Some(offset) = query.offset {
                table.offset(offset);
            }
            if let Some(limit) = query.limit {
                table.limit(limit);
            }
            for term in &query.terms {
                match term.as_variable() {
                    Some(name) => {
                        for row in table.iter() {
                            if let Some(value) = row.get(name) {
                                push(value.clone());
                            }
                        }
                    }
                    None => push(term.clone()),
                }
            }
        }

        let mut graph = Graph::new();
        for term in &described {
            let as_subject =
                QuadPattern::new(term.clone(), TermPattern::Any, TermPattern::Any, TermPattern::Any);
            let as_object =
                QuadPattern::new(TermPattern::Any, TermPattern::Any, term.clone(), TermPattern::Any);
            for quad in source
                .match_pattern(&as_subject)
                .chain(source.match_pattern(&as_object))
            {
                graph
                    .insert(quad.as_triple())
                    .map_err(|e| QueryError::Evaluation(e.to_string()))?;
            }
        }
        Ok(graph)
    }

    // ---------------------------------------------------------------
    // Remote endpoint entry points
    // ---------------------------------------------------------------

    /// Dispatch a SELECT query to a remote endpoint
    pub fn select_endpoint(
        &self,
        query: &SelectQuery,
        descriptor: &EndpointDescriptor,
    ) -> Result<SelectResult, QueryError> {
        normalise_select(query)?;
        endpoint::select(descriptor, &Printer::print_select(query))
    }

    /// Dispatch an ASK query to a remote endpoint
    pub fn ask_endpoint(
        &self,
        query: &AskQuery,
        descriptor: &EndpointDescriptor,
    ) -> Result<AskResult, QueryError> {
        normalise_ask(query)?;
        endpoint::ask(descriptor, &Printer::print_ask(query))
    }

    /// Dispatch a CONSTRUCT query to a remote endpoint
    pub fn construct_endpoint(
        &self,
        query: &ConstructQuery,
        descriptor: &EndpointDescriptor,
    ) -> Result<Graph, QueryError> {
        normalise_construct(query)?;
        endpoint::graph(descriptor, &Printer::print_construct(query))
    }

    /// Dispatch a DESCRIBE query to a remote endpoint
    pub fn describe_endpoint(
        &self,
        query: &DescribeQuery,
        descriptor: &EndpointDescriptor,
    ) -> Result<Graph, QueryError> {
        normalise_describe(query)?;
        endpoint::graph(descriptor, &Printer::print_describe(query))
    }

    // ---------------------------------------------------------------
    // Async twins: the sync form on a worker task
    // ---------------------------------------------------------------

    /// Async form of [`QueryEngine::select`]
    pub async fn select_async(
        query: SelectQuery,
        source: Arc<dyn DataSource>,
    ) -> Result<SelectResult, QueryError> {
        Self::on_worker(move || QueryEngine::new().select(&query, source.as_ref())).await
    }

    /// Async form of [`QueryEngine::ask`]
    pub async fn ask_async(
        query: AskQuery,
        source: Arc<dyn DataSource>,
    ) -> Result<AskResult, QueryError> {
        Self::on_worker(move || QueryEngine::new().ask(&query, source.as_ref())).await
    }

    /// Async form of [`QueryEngine::construct`]
    pub async fn construct_async(
        query: ConstructQuery,
        source: Arc<dyn DataSource>,
    ) -> Result<Graph, QueryError> {
        Self::on_worker(move || QueryEngine::new().construct(&query, source.as_ref())).await
    }

    /// Async form of [`QueryEngine::describe`]
    pub async fn describe_async(
        query: DescribeQuery,
        source: Arc<dyn DataSource>,
    ) -> Result<Graph, QueryError> {
        Self::on_worker(move || QueryEngine::new().describe(&query, source.as_ref())).await
    }

    /// Async form of [`QueryEngine::select_endpoint`]
    pub async fn select_endpoint_async(
        query: SelectQuery,
        descriptor: EndpointDescriptor,
    ) -> Result<SelectResult, QueryError> {
        Self::on_worker(move || QueryEngine::new().select_endpoint(&query, &descriptor)).await
    }

    /// Async form of [`QueryEngine::ask_endpoint`]
    pub async fn ask_endpoint_async(
        query: AskQuery,
        descriptor: EndpointDescriptor,
    ) -> Result<AskResult, QueryError> {
        Self::on_worker(move || QueryEngine::new().ask_endpoint(&query, &descriptor)).await
    }

    /// Async form of [`QueryEngine::construct_endpoint`]
    pub async fn construct_endpoint_async(
        query: ConstructQuery,
        descriptor: EndpointDescriptor,
    ) -> Result<Graph, QueryError> {
        Self::on_worker(move || QueryEngine::new().construct_endpoint(&query, &descriptor)).await
    }

    /// Async form of [`QueryEngine::describe_endpoint`]
    pub async fn describe_endpoint_async(
        query: DescribeQuery,
        descriptor: EndpointDescriptor,
    ) -> Result<Graph, QueryError> {
        Self::on_worker(move || QueryEngine::new().describe_endpoint(&query, &descriptor)).await
    }

    async fn on_worker<T, F>(f: F) -> Result<T, QueryError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, QueryError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| QueryError::Evaluation(format!("worker task failed: {}", e)))?
    }

    // ---------------------------------------------------------------
    // Pipeline internals
    // ---------------------------------------------------------------

    /// Normalise, evaluate and apply modifiers; shared by `select` and
    /// sub-select recursion
    fn select_table(
        &self,
        query: &SelectQuery,
        source: &dyn DataSource,
    ) -> Result<BindingTable, QueryError> {
        normalise_select(query)?;
        let table = self.evaluate_groups(&query.groups, source)?;
        self.apply_select_modifiers(query, table, source)
    }

    /// Evaluate and combine the pattern groups in declaration order
    fn evaluate_groups(
        &self,
        groups: &[PatternGroup],
        source: &dyn DataSource,
    ) -> Result<BindingTable, QueryError> {
        let mut accumulated: Option<BindingTable> = None;
        for group in groups {
            let table = self.evaluate_group(group, source)?;
            debug!(
                rows = table.len(),
                operator = ?group.operator,
                "pattern group evaluated"
            );
            accumulated = Some(match accumulated {
                None => table,
                Some(acc) => match group.operator {
                    GroupOperator::Join => acc.join(&table),
                    GroupOperator::Optional => acc.left_join(&table),
                    GroupOperator::Union => {
                        let mut acc = acc;
                        acc.union_with(table);
                        acc
                    }
                    GroupOperator::Minus => acc.minus(&table),
                },
            });
        }
        Ok(accumulated.unwrap_or_default())
    }

    /// Evaluate one pattern group into its group table
    fn evaluate_group(
        &self,
        group: &PatternGroup,
        source: &dyn DataSource,
    ) -> Result<BindingTable, QueryError> {
        // Materialise each member into a join unit. UNION-chained patterns
        // collapse into a single unit first.
        let mut units: Vec<JoinUnit> = Vec::new();
        let mut union_chain: Option<BindingTable> = None;

        for member in &group.members {
            match member {
                GroupMember::Pattern(pattern) => {
                    let table = self.evaluate_pattern(pattern, source);
                    if let Some(mut chained) = union_chain.take() {
                        chained.union_with(table);
                        if pattern.union_with_next {
                            union_chain = Some(chained);
                        } else {
                            units.push(JoinUnit {
                                table: chained,
                                optional: pattern.optional,
                                ground_slots: 0,
                            });
                        }
                    } else if pattern.union_with_next {
                        union_chain = Some(table);
                    } else {
                        units.push(JoinUnit {
                            table,
                            optional: pattern.optional,
                            ground_slots: pattern.ground_slots(),
                        });
                    }
                }
                GroupMember::Path(path) => units.push(JoinUnit {
                    table: paths::evaluate_path(source, path),
                    optional: false,
                    ground_slots: 0,
                }),
                GroupMember::Values(values) => units.push(JoinUnit {
                    table: values_table(values),
                    optional: false,
                    ground_slots: 0,
                }),
                GroupMember::SubSelect(sub) => units.push(JoinUnit {
                    table: self.select_table(sub, source)?,
                    optional: false,
                    ground_slots: 0,
                }),
            }
        }
        // A dangling union flag on the last pattern joins what was chained.
        if let Some(chained) = union_chain.take() {
            units.push(JoinUnit {
                table: chained,
                optional: false,
                ground_slots: 0,
            });
        }

        let (plain, optional): (Vec<JoinUnit>, Vec<JoinUnit>) =
            units.into_iter().partition(|u| !u.optional);

        let mut table = BindingTable::unit();
        for unit in order_units(plain) {
            table = table.join(&unit.table);
        }
        for unit in optional {
            table = table.left_join(&unit.table);
        }

        self.apply_filters(&mut table, &group.filters, source)?;
        Ok(table)
    }

    /// Evaluate a single pattern against the dataset
    fn evaluate_pattern(&self, pattern: &Pattern, source: &dyn DataSource) -> BindingTable {
        let subject = existential(&pattern.subject);
        let predicate = existential(&pattern.predicate);
        let object = existential(&pattern.object);
        let graph = pattern.graph.as_ref().map(existential);

        let quad_pattern = QuadPattern::new(
            subject.clone(),
            predicate.clone(),
            object.clone(),
            graph.clone(),
        );

        let slots: Vec<&Term> = [Some(&subject), Some(&predicate), Some(&object), graph.as_ref()]
            .into_iter()
            .flatten()
            .collect();
        let mut columns: Vec<String> = Vec::new();
        for slot in &slots {
            if let Some(name) = slot.as_variable() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
        let mut table = BindingTable::with_columns(columns.clone());

        'quads: for quad in source.match_pattern(&quad_pattern) {
            let values = [
                Some(&quad.subject),
                Some(&quad.predicate),
                Some(&quad.object),
                quad.graph.as_ref(),
            ];
            let mut cells: Vec<Option<Term>> = vec![None; columns.len()];
            for (slot, value) in slots.iter().zip(values) {
                let Some(name) = slot.as_variable() else {
                    continue;
                };
                let Some(value) = value else {
                    continue;
                };
                let index = columns.iter().position(|c| c == name).expect("known column");
                match &cells[index] {
                    // The same variable twice must bind the same term.
                    Some(existing) if existing != value => continue 'quads,
                    _ => cells[index] = Some(value.clone()),
                }
            }
            table.push_row(cells);
        }
        table
    }

    /// Apply group or HAVING filters row-by-row
    fn apply_filters(
        &self,
        table: &mut BindingTable,
        filters: &[Filter],
        source: &dyn DataSource,
    ) -> Result<(), QueryError> {
        for filter in filters {
            let resolved = self.resolve_filter(filter, source)?;
            table.retain_rows(|row| filter_truth(&resolved, row).unwrap_or(false));
        }
        Ok(())
    }

    /// Pre-evaluate the EXISTS groups of a filter tree so the per-row test
    /// is a pure compatibility check
    fn resolve_filter<'a>(
        &self,
        filter: &'a Filter,
        source: &dyn DataSource,
    ) -> Result<ResolvedFilter<'a>, QueryError> {
        Ok(match filter {
            Filter::Expression(expr) => ResolvedFilter::Expression(expr),
            Filter::Exists(group) => ResolvedFilter::Exists(self.evaluate_group(group, source)?),
            Filter::Not(inner) => {
                ResolvedFilter::Not(Box::new(self.resolve_filter(inner, source)?))
            }
            Filter::And(a, b) => ResolvedFilter::And(
                Box::new(self.resolve_filter(a, source)?),
                Box::new(self.resolve_filter(b, source)?),
            ),
            Filter::Or(a, b) => ResolvedFilter::Or(
                Box::new(self.resolve_filter(a, source)?),
                Box::new(self.resolve_filter(b, source)?),
            ),
        })
    }

    /// The fixed modifier order: GROUP BY, HAVING, expression bindings,
    /// projection, ORDER BY, DISTINCT, OFFSET, LIMIT
    fn apply_select_modifiers(
        &self,
        query: &SelectQuery,
        mut table: BindingTable,
        source: &dyn DataSource,
    ) -> Result<BindingTable, QueryError> {
        if !query.group_by.is_empty() || !query.aggregators.is_empty() {
            let group_by: Vec<&str> = query.group_by.iter().map(String::as_str).collect();
            table = aggregates::aggregate_rows(&table, &group_by, &query.aggregators);
            debug!(partitions = table.len(), "aggregation projected");
        }

        self.apply_filters(&mut table, &query.having, source)?;

        for element in &query.projection {
            if let ProjectionElement::Expression { expr, alias } = element {
                let values: Vec<Option<Term>> = table
                    .iter()
                    .map(|row| eval::evaluate(expr, &row))
                    .collect();
                let index = table.add_column(alias);
                for (row, value) in values.into_iter().enumerate() {
                    table.set_cell(row, index, value);
                }
            }
        }

        table = table.select_columns(&query.projected_variables());

        if !query.order_by.is_empty() {
            let order = query.order_by.clone();
            table.sort_rows_by(|a, b| {
                for (variable, direction) in &order {
                    let ordering = eval::compare_for_order(a.get(variable), b.get(variable));
                    let ordering = match direction {
                        crate::query::OrderDirection::Ascending => ordering,
                        crate::query::OrderDirection::Descending => ordering.reverse(),
                    };
                    if ordering != std::cmp::Ordering::Equal {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        if query.distinct {
            table.distinct();
        }
        if let Some(offset) = query.offset {
            table.offset(offset);
        }
        if let Some(limit) = query.limit {
            table.limit(limit);
        }

        Ok(table)
    }
}

/// A group member materialised for joining
struct JoinUnit {
    table: BindingTable,
    optional: bool,
    ground_slots: usize,
}

/// Greedy join order: most ground slots first, ties broken by column
/// overlap with the already-joined units, then declaration order
fn order_units(mut units: Vec<JoinUnit>) -> Vec<JoinUnit> {
    let mut ordered = Vec::with_capacity(units.len());
    let mut bound: FxHashSet<String> = FxHashSet::default();

    while !units.is_empty() {
        let mut best = 0;
        let mut best_score = (0usize, 0usize);
        for (index, unit) in units.iter().enumerate() {
            let overlap = unit
                .table
                .columns()
                .iter()
                .filter(|c| bound.contains(*c))
                .count();
            let score = (unit.ground_slots, overlap);
            if index == 0 || score > best_score {
                best = index;
                best_score = score;
            }
        }
        let unit = units.remove(best);
        bound.extend(unit.table.columns().iter().cloned());
        ordered.push(unit);
    }
    ordered
}

/// A blank node in query position acts as an existential: an anonymous
/// variable scoped by its label
fn existential(term: &Term) -> Term {
    match term.as_blank() {
        Some(label) => Term::variable(&format!("__bnode_{}", label)),
        None => term.clone(),
    }
}

fn values_table(values: &ValuesTable) -> BindingTable {
    let mut table = BindingTable::with_columns(values.variables.clone());
    for row in &values.rows {
        table.push_row(row.clone());
    }
    table
}

fn instantiate(term: &Term, row: &RowView<'_>, row_index: usize) -> Option<Term> {
    if let Some(name) = term.as_variable() {
        return row.get(name).cloned();
    }
    if let Some(label) = term.as_blank() {
        // Template blank nodes are scoped per solution row.
        return Some(Term::blank(&format!("{}_r{}", label, row_index)));
    }
    Some(term.clone())
}

/// A filter with EXISTS groups already materialised
enum ResolvedFilter<'a> {
    Expression(&'a crate::expression::Expression),
    Exists(BindingTable),
    Not(Box<ResolvedFilter<'a>>),
    And(Box<ResolvedFilter<'a>>, Box<ResolvedFilter<'a>>),
    Or(Box<ResolvedFilter<'a>>, Box<ResolvedFilter<'a>>),
}

/// Three-valued truth of a resolved filter for one row
fn filter_truth(filter: &ResolvedFilter<'_>, row: &RowView<'_>) -> Option<bool> {
    match filter {
        ResolvedFilter::Expression(expr) => eval::truth(expr, row),
        ResolvedFilter::Exists(table) => Some(table.has_compatible_row(row)),
        ResolvedFilter::Not(inner) => filter_truth(inner, row).map(|b| !b),
        ResolvedFilter::And(a, b) => match (filter_truth(a, row), filter_truth(b, row)) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        ResolvedFilter::Or(a, b) => match (filter_truth(a, row), filter_truth(b, row)) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
    }
}

// -------------------------------------------------------------------
// Normalisation: structural validation before any evaluation
// -------------------------------------------------------------------

fn normalise_select(query: &SelectQuery) -> Result<(), QueryError> {
    if query.groups.is_empty() {
        return Err(QueryError::MalformedQuery(
            "SELECT requires at least one pattern group".to_string(),
        ));
    }
    validate_groups(&query.groups)?;

    let mut known: Vec<String> = Vec::new();
    for group in &query.groups {
        for variable in group.variables() {
            if !known.contains(&variable) {
                known.push(variable);
            }
        }
    }
    for (alias, _) in &query.aggregators {
        known.push(alias.clone());
    }
    for element in &query.projection {
        match element {
            ProjectionElement::Variable(name) => {
                if !known.contains(name) {
                    return Err(QueryError::MalformedQuery(format!(
                        "projection variable ?{} is not bound by any pattern group",
                        name
                    )));
                }
            }
            ProjectionElement::Expression { alias, .. } => known.push(alias.clone()),
        }
    }

    if !query.having.is_empty() && query.group_by.is_empty() && query.aggregators.is_empty() {
        return Err(QueryError::MalformedQuery(
            "HAVING requires GROUP BY or aggregators".to_string(),
        ));
    }
    for filter in &query.having {
        validate_filter(filter)?;
        if filter_uses_exists(filter) {
            return Err(QueryError::MalformedQuery(
                "HAVING filters must be expressions".to_string(),
            ));
        }
    }
    Ok(())
}

fn normalise_ask(query: &AskQuery) -> Result<(), QueryError> {
    if query.groups.is_empty() {
        return Err(QueryError::MalformedQuery(
            "ASK requires at least one pattern group".to_string(),
        ));
    }
    validate_groups(&query.groups)
}

fn normalise_construct(query: &ConstructQuery) -> Result<(), QueryError> {
    if query.groups.is_empty() {
        return Err(QueryError::MalformedQuery(
            "CONSTRUCT requires at least one pattern group".to_string(),
        ));
    }
    if query.template.is_empty() {
        return Err(QueryError::MalformedQuery(
            "CONSTRUCT requires a non-empty template".to_string(),
        ));
    }
    validate_groups(&query.groups)
}

fn normalise_describe(query: &DescribeQuery) -> Result<(), QueryError> {
    if query.terms.is_empty() {
        return Err(QueryError::MalformedQuery(
            "DESCRIBE requires at least one term or variable".to_string(),
        ));
    }
    validate_groups(&query.groups)?;

    let group_variables: Vec<String> = query
        .groups
        .iter()
        .flat_map(|g| g.variables())
        .collect();
    for term in &query.terms {
        if let Some(name) = term.as_variable() {
            if !group_variables.iter().any(|v| v == name) {
                return Err(QueryError::MalformedQuery(format!(
                    "DESCRIBE variable ?{} is not bound by any pattern group",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_groups(groups: &[PatternGroup]) -> Result<(), QueryError> {
    for group in groups {
        validate_group(group)?;
    }
    Ok(())
}

fn validate_group(group: &PatternGroup) -> Result<(), QueryError> {
    for member in &group.members {
        match member {
            GroupMember::Pattern(pattern) => {
                if pattern.predicate.is_ground() && !pattern.predicate.is_iri() {
                    return Err(QueryError::MalformedQuery(
                        "pattern predicate must be an IRI or variable".to_string(),
                    ));
                }
            }
            GroupMember::Path(path) => {
                validate_path_predicates(&path.path)?;
            }
            GroupMember::Values(values) => {
                if values
                    .rows
                    .iter()
                    .any(|row| row.len() != values.variables.len())
                {
                    return Err(QueryError::MalformedQuery(
                        "VALUES rows must match the declared variables".to_string(),
                    ));
                }
            }
            GroupMember::SubSelect(sub) => normalise_select(sub)?,
        }
    }
    for filter in &group.filters {
        validate_filter(filter)?;
    }
    Ok(())
}

fn validate_filter(filter: &Filter) -> Result<(), QueryError> {
    if filter.negates_exists() {
        return Err(QueryError::MalformedQuery(
            "negation filters must not wrap EXISTS".to_string(),
        ));
    }
    // EXISTS bodies are groups of their own; validate them recursively.
    fn walk(filter: &Filter) -> Result<(), QueryError> {
        match filter {
            Filter::Expression(_) => Ok(()),
            Filter::Exists(group) => validate_group(group),
            Filter::Not(inner) => walk(inner),
            Filter::And(a, b) | Filter::Or(a, b) => {
                walk(a)?;
                walk(b)
            }
        }
    }
    walk(filter)
}

fn filter_uses_exists(filter: &Filter) -> bool {
    match filter {
        Filter::Expression(_) => false,
        Filter::Exists(_) => true,
        Filter::Not(inner) => filter_uses_exists(inner),
        Filter::And(a, b) | Filter::Or(a, b) => filter_uses_exists(a) || filter_uses_exists(b),
    }
}

fn validate_path_predicates(path: &crate::paths::PropertyPath) -> Result<(), QueryError> {
    use crate::paths::PropertyPath;
    match path {
        PropertyPath::Predicate(term) => {
            if !term.is_iri() {
                return Err(QueryError::MalformedQuery(
                    "property path steps must be IRIs".to_string(),
                ));
            }
            Ok(())
        }
        PropertyPath::Inverse(inner)
        | PropertyPath::ZeroOrOne(inner)
        | PropertyPath::ZeroOrMore(inner)
        | PropertyPath::OneOrMore(inner) => validate_path_predicates(inner),
        PropertyPath::Sequence(a, b) | PropertyPath::Alternative(a, b) => {
            validate_path_predicates(a)?;
            validate_path_predicates(b)
        }
        PropertyPath::NegatedPropertySet(predicates) => {
            if predicates.iter().any(|p| !p.is_iri()) {
                return Err(QueryError::MalformedQuery(
                    "negated property sets must contain IRIs".to_string(),
                ));
            }
            Ok(())
        }
    }
}
