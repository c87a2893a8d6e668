//! GROUP BY aggregation
//!
//! Aggregators share a two-phase interface: `partition` folds one row into
//! the running accumulator of its partition, `project` emits one result
//! row per partition in first-seen order. The scratch state lives in an
//! [`AggregatorContext`] owned by the evaluation call and discarded at
//! finalisation; partitions are keyed by the tuple of grouping values, not
//! by an encoded string, so no separator can ever collide with data.

use crate::bindings::{BindingTable, RowView};
use crate::eval;
use crate::expression::Expression;
use mirella_model::Term;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;

/// An aggregation function with its input expression and DISTINCT flag
#[derive(Clone, Debug, PartialEq)]
pub enum Aggregator {
    /// COUNT - counts rows (`expr: None`) or bound evaluations
    Count {
        /// Expression to count; `None` counts every row (COUNT(*))
        expr: Option<Expression>,
        /// Count each distinct value once
        distinct: bool,
    },
    /// SUM of numeric values; a non-numeric value poisons the partition
    Sum {
        /// Expression to sum
        expr: Expression,
        /// Sum each distinct value once
        distinct: bool,
    },
    /// MIN by value comparison with string-order fallback
    Min {
        /// Expression to minimise
        expr: Expression,
        /// Consider each distinct value once
        distinct: bool,
    },
    /// MAX by value comparison with string-order fallback
    Max {
        /// Expression to maximise
        expr: Expression,
        /// Consider each distinct value once
        distinct: bool,
    },
    /// AVG of numeric values; poisoned like SUM
    Avg {
        /// Expression to average
        expr: Expression,
        /// Average each distinct value once
        distinct: bool,
    },
    /// SAMPLE - the first bound value wins
    Sample {
        /// Expression to sample
        expr: Expression,
        /// Sample from distinct values
        distinct: bool,
    },
    /// GROUP_CONCAT with a separator (default `" "`)
    GroupConcat {
        /// Expression to concatenate
        expr: Expression,
        /// Separator between values
        separator: Option<String>,
        /// Concatenate each distinct value once
        distinct: bool,
    },
}

impl Aggregator {
    /// COUNT over an expression
    pub fn count(expr: Expression, distinct: bool) -> Self {
        Aggregator::Count {
            expr: Some(expr),
            distinct,
        }
    }

    /// COUNT(*) - counts rows
    pub fn count_all() -> Self {
        Aggregator::Count {
            expr: None,
            distinct: false,
        }
    }

    /// SUM over an expression
    pub fn sum(expr: Expression, distinct: bool) -> Self {
        Aggregator::Sum { expr, distinct }
    }

    /// MIN over an expression
    pub fn min(expr: Expression, distinct: bool) -> Self {
        Aggregator::Min { expr, distinct }
    }

    /// MAX over an expression
    pub fn max(expr: Expression, distinct: bool) -> Self {
        Aggregator::Max { expr, distinct }
    }

    /// AVG over an expression
    pub fn avg(expr: Expression, distinct: bool) -> Self {
        Aggregator::Avg { expr, distinct }
    }

    /// SAMPLE over an expression
    pub fn sample(expr: Expression) -> Self {
        Aggregator::Sample {
            expr,
            distinct: false,
        }
    }

    /// GROUP_CONCAT over an expression
    pub fn group_concat(expr: Expression, separator: Option<&str>, distinct: bool) -> Self {
        Aggregator::GroupConcat {
            expr,
            separator: separator.map(str::to_string),
            distinct,
        }
    }

    fn distinct(&self) -> bool {
        match self {
            Aggregator::Count { distinct, .. }
            | Aggregator::Sum { distinct, .. }
            | Aggregator::Min { distinct, .. }
            | Aggregator::Max { distinct, .. }
            | Aggregator::Avg { distinct, .. }
            | Aggregator::Sample { distinct, .. }
            | Aggregator::GroupConcat { distinct, .. } => *distinct,
        }
    }

    /// The input expression, when one exists
    pub fn expression(&self) -> Option<&Expression> {
        match self {
            Aggregator::Count { expr, .. } => expr.as_ref(),
            Aggregator::Sum { expr, .. }
            | Aggregator::Min { expr, .. }
            | Aggregator::Max { expr, .. }
            | Aggregator::Avg { expr, .. }
            | Aggregator::Sample { expr, .. }
            | Aggregator::GroupConcat { expr, .. } => Some(expr),
        }
    }
}

/// Partition key: grouping values in GROUP BY declaration order
pub(crate) type PartitionKey = Vec<Option<Term>>;

/// Aggregate a table: partition every row by the grouping variables, then
/// project one row per partition in first-seen order
///
/// The result columns are the grouping variables followed by the
/// aggregator result variables.
pub fn aggregate_rows(
    table: &BindingTable,
    group_by: &[&str],
    aggregators: &[(String, Aggregator)],
) -> BindingTable {
    let group_by: Vec<String> = group_by.iter().map(|s| s.to_string()).collect();
    let mut context = AggregatorContext::new();
    for row in table.iter() {
        let key: PartitionKey = group_by.iter().map(|v| row.get(v).cloned()).collect();
        context.partition(key, aggregators, &row);
    }
    context.project(&group_by, aggregators)
}

/// Running state of one aggregator within one partition
enum Accumulator {
    Count(i64),
    Sum(f64),
    Extremum(Option<Term>),
    Avg { sum: f64, count: u64 },
    Sample(Option<Term>),
    Concat(Vec<String>),
}

impl Accumulator {
    fn fresh(aggregator: &Aggregator) -> Self {
        match aggregator {
            Aggregator::Count { .. } => Accumulator::Count(0),
            Aggregator::Sum { .. } => Accumulator::Sum(0.0),
            Aggregator::Min { .. } | Aggregator::Max { .. } => Accumulator::Extremum(None),
            Aggregator::Avg { .. } => Accumulator::Avg { sum: 0.0, count: 0 },
            Aggregator::Sample { .. } => Accumulator::Sample(None),
            Aggregator::GroupConcat { .. } => Accumulator::Concat(Vec::new()),
        }
    }
}

/// MIN/MAX comparison: numeric when both sides are numeric, otherwise the
/// string order of the lexical/canonical forms
fn extremum_compare(a: &Term, b: &Term) -> Ordering {
    let numeric = |t: &Term| t.as_literal().and_then(|l| l.numeric_value());
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => {
            let text = |t: &Term| match t {
                Term::Literal(lit) => lit.lexical.to_string(),
                other => other.canonical(),
            };
            text(a).cmp(&text(b))
        }
    }
}

/// Per-query scratch state for GROUP BY aggregation
///
/// Holds the partition registry (running accumulators, in first-seen
/// partition order) and the per-aggregator distinctness caches. Created
/// fresh for every evaluation; never shared.
pub(crate) struct AggregatorContext {
    order: Vec<PartitionKey>,
    registry: FxHashMap<PartitionKey, Vec<Accumulator>>,
    distinct: FxHashMap<(usize, PartitionKey), FxHashSet<PartitionKey>>,
}

impl AggregatorContext {
    pub(crate) fn new() -> Self {
        Self {
            order: Vec::new(),
            registry: FxHashMap::default(),
            distinct: FxHashMap::default(),
        }
    }

    /// Fold one row into the accumulators of its partition
    pub(crate) fn partition(
        &mut self,
        key: PartitionKey,
        aggregators: &[(String, Aggregator)],
        row: &RowView<'_>,
    ) {
        if !self.registry.contains_key(&key) {
            self.order.push(key.clone());
            self.registry.insert(
                key.clone(),
                aggregators.iter().map(|(_, a)| Accumulator::fresh(a)).collect(),
            );
        }

        for (index, (_, aggregator)) in aggregators.iter().enumerate() {
            let value = aggregator
                .expression()
                .and_then(|expr| eval::evaluate(expr, row));

            if aggregator.distinct() {
                // Distinctness fingerprint: the value, or the whole row for
                // COUNT(DISTINCT *).
                let fingerprint = match (&value, aggregator.expression()) {
                    (_, Some(_)) => vec![value.clone()],
                    (_, None) => row.cells().to_vec(),
                };
                let cache = self
                    .distinct
                    .entry((index, key.clone()))
                    .or_default();
                if !cache.insert(fingerprint) {
                    continue;
                }
            }

            let accumulator = &mut self
                .registry
                .get_mut(&key)
                .expect("partition registered above")[index];
            Self::accumulate(accumulator, aggregator, value);
        }
    }

    fn accumulate(accumulator: &mut Accumulator, aggregator: &Aggregator, value: Option<Term>) {
        match (accumulator, aggregator) {
            (Accumulator::Count(n), Aggregator::Count { expr, .. }) => {
                if expr.is_none() || value.is_some() {
                    *n += 1;
                }
            }
            (Accumulator::Sum(sum), Aggregator::Sum { .. }) => {
                if let Some(term) = value {
                    match term.as_literal().and_then(|l| l.numeric_value()) {
                        Some(v) => *sum += v,
                        None => *sum = f64::NAN,
                    }
                }
            }
            (Accumulator::Extremum(best), Aggregator::Min { .. }) => {
                if let Some(candidate) = value {
                    let replace = best
                        .as_ref()
                        .map(|b| extremum_compare(&candidate, b) == Ordering::Less)
                        .unwrap_or(true);
                    if replace {
                        *best = Some(candidate);
                    }
                }
            }
            (Accumulator::Extremum(best), Aggregator::Max { .. }) => {
                if let Some(candidate) = value {
                    let replace = best
                        .as_ref()
                        .map(|b| extremum_compare(&candidate, b) == Ordering::Greater)
                        .unwrap_or(true);
                    if replace {
                        *best = Some(candidate);
                    }
                }
            }
            (Accumulator::Avg { sum, count }, Aggregator::Avg { .. }) => {
                if let Some(term) = value {
                    match term.as_literal().and_then(|l| l.numeric_value()) {
                        Some(v) => {
                            *sum += v;
                            *count += 1;
                        }
                        None => *sum = f64::NAN,
                    }
                }
            }
            (Accumulator::Sample(slot), Aggregator::Sample { .. }) => {
                if slot.is_none() {
                    *slot = value;
                }
            }
            (Accumulator::Concat(parts), Aggregator::GroupConcat { .. }) => {
                if let Some(term) = value {
                    let text = match &term {
                        Term::Literal(lit) => lit.lexical.to_string(),
                        other => other.canonical(),
                    };
                    parts.push(text);
                }
            }
            // Accumulator variants are created from their aggregator, so the
            // pairs above are exhaustive.
            _ => unreachable!("accumulator does not match aggregator"),
        }
    }

    /// Emit one row per partition, in first-seen order
    ///
    /// Columns are the grouping variables followed by the aggregator
    /// result variables.
    pub(crate) fn project(
        mut self,
        group_by: &[String],
        aggregators: &[(String, Aggregator)],
    ) -> BindingTable {
        let columns: Vec<String> = group_by
            .iter()
            .cloned()
            .chain(aggregators.iter().map(|(alias, _)| alias.clone()))
            .collect();
        let mut table = BindingTable::with_columns(columns);

        for key in std::mem::take(&mut self.order) {
            let accumulators = self.registry.remove(&key).expect("registered partition");
            let mut cells: Vec<Option<Term>> = key.clone();
            for (accumulator, (_, aggregator)) in accumulators.into_iter().zip(aggregators) {
                cells.push(Self::final_value(accumulator, aggregator));
            }
            table.push_row(cells);
        }
        table
    }

    fn final_value(accumulator: Accumulator, aggregator: &Aggregator) -> Option<Term> {
        match accumulator {
            Accumulator::Count(n) => Some(Term::integer(n)),
            Accumulator::Sum(sum) => {
                if sum.is_nan() {
                    Some(Term::literal(""))
                } else {
                    Some(Term::double(sum))
                }
            }
            Accumulator::Extremum(best) => best,
            Accumulator::Avg { sum, count } => {
                if sum.is_nan() {
                    Some(Term::literal(""))
                } else if count == 0 {
                    Some(Term::double(0.0))
                } else {
                    Some(Term::double(sum / count as f64))
                }
            }
            Accumulator::Sample(slot) => slot,
            Accumulator::Concat(parts) => {
                let separator = match aggregator {
                    Aggregator::GroupConcat { separator, .. } => {
                        separator.as_deref().unwrap_or(" ")
                    }
                    _ => " ",
                };
                Some(Term::literal(&parts.join(separator)))
            }
        }
    }
}
