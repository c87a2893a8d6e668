//! Property tests for the algebraic invariants of the binding table

use mirella_model::Term;
use mirella_sparql::{Aggregator, BindingTable, Expression};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn term_strategy() -> impl Strategy<Value = Term> {
    prop_oneof![
        (0..4i64).prop_map(|i| Term::iri(&format!("http://ex.org/r{}", i))),
        (0..4i64).prop_map(Term::integer),
    ]
}

fn table_strategy(columns: &'static [&'static str]) -> impl Strategy<Value = BindingTable> {
    proptest::collection::vec(
        proptest::collection::vec(proptest::option::of(term_strategy()), columns.len()),
        0..6,
    )
    .prop_map(move |rows| {
        let mut table = BindingTable::with_columns(columns.iter().copied());
        for row in rows {
            table.push_row(row);
        }
        table
    })
}

/// Rows as a sorted multiset of column->value maps, ignoring column order
fn row_multiset(table: &BindingTable) -> Vec<BTreeMap<String, String>> {
    let mut rows: Vec<BTreeMap<String, String>> = table
        .iter()
        .map(|row| {
            table
                .columns()
                .iter()
                .filter_map(|c| row.get(c).map(|t| (c.clone(), t.canonical())))
                .collect()
        })
        .collect();
    rows.sort();
    rows
}

proptest! {
    #[test]
    fn inner_join_is_associative(
        a in table_strategy(&["x", "y"]),
        b in table_strategy(&["y", "z"]),
        c in table_strategy(&["z", "w"]),
    ) {
        let left_first = a.join(&b).join(&c);
        let right_first = a.join(&b.join(&c));
        prop_assert_eq!(row_multiset(&left_first), row_multiset(&right_first));
    }

    #[test]
    fn left_join_preserves_left_rows(
        left in table_strategy(&["x", "y"]),
        right in table_strategy(&["y", "z"]),
    ) {
        let joined = left.left_join(&right);
        for row in left.iter() {
            // Some joined row restricts to this left row.
            let preserved = joined.iter().any(|j| {
                left.columns().iter().all(|c| match row.get(c) {
                    Some(term) => j.get(c) == Some(term),
                    // An unbound left cell may pick up a value from the
                    // right side; it only has to stay compatible.
                    None => true,
                })
            });
            prop_assert!(preserved);
        }
        prop_assert!(joined.len() >= left.len() || left.is_empty());
    }

    #[test]
    fn minus_is_anti_monotone(
        left in table_strategy(&["x", "y"]),
        right in table_strategy(&["y", "z"]),
        keep in 0usize..6,
    ) {
        let full = left.minus(&right);
        prop_assert!(full.len() <= left.len());

        // Dropping rows from the right side can only grow the result.
        let mut smaller = BindingTable::with_columns(right.columns().iter().cloned());
        for (index, row) in right.iter().enumerate() {
            if index < keep {
                smaller.push_row(row.cells().to_vec());
            }
        }
        let reduced = left.minus(&smaller);
        prop_assert!(reduced.len() >= full.len());
    }

    #[test]
    fn distinct_is_idempotent(table in table_strategy(&["x", "y"])) {
        let mut once = table;
        once.distinct();
        let mut twice = once.clone();
        twice.distinct();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn offset_limit_is_a_window(
        table in table_strategy(&["x"]),
        start in 0usize..8,
        width in 0usize..8,
    ) {
        let mut windowed = table.clone();
        windowed.offset(start);
        windowed.limit(width);

        let expected: Vec<_> = table
            .iter()
            .skip(start)
            .take(width)
            .map(|r| r.cells().to_vec())
            .collect();
        let actual: Vec<_> = windowed.iter().map(|r| r.cells().to_vec()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn union_row_count_is_additive(
        a in table_strategy(&["x", "y"]),
        b in table_strategy(&["y", "z"]),
    ) {
        let mut union = a.clone();
        union.union_with(b.clone());
        prop_assert_eq!(union.len(), a.len() + b.len());
    }

    #[test]
    fn unary_expression_is_identity(term in term_strategy()) {
        // A bare term used as an expression evaluates to itself on any row.
        let mut table = BindingTable::with_columns(["x"]);
        table.push_row(vec![Some(Term::integer(0))]);

        let result = mirella_sparql::evaluate_expression(
            &Expression::constant(term.clone()),
            &table.row(0),
        );
        prop_assert_eq!(result, Some(term));
    }

    #[test]
    fn aggregates_are_row_order_invariant(
        rows in proptest::collection::vec((0..3i64, 0..10i64), 1..12),
    ) {
        let build = |rows: &[(i64, i64)]| {
            let mut table = BindingTable::with_columns(["x", "v"]);
            for (x, v) in rows {
                table.push_row(vec![
                    Some(Term::iri(&format!("http://ex.org/{}", x))),
                    Some(Term::integer(*v)),
                ]);
            }
            table
        };
        let aggregators = vec![
            ("n".to_string(), Aggregator::count(Expression::variable("v"), false)),
            ("s".to_string(), Aggregator::sum(Expression::variable("v"), false)),
            ("lo".to_string(), Aggregator::min(Expression::variable("v"), false)),
            ("hi".to_string(), Aggregator::max(Expression::variable("v"), false)),
            ("a".to_string(), Aggregator::avg(Expression::variable("v"), false)),
        ];

        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = mirella_sparql::aggregate_rows(&build(&rows), &["x"], &aggregators);
        let backward = mirella_sparql::aggregate_rows(&build(&reversed), &["x"], &aggregators);

        prop_assert_eq!(row_multiset(&forward), row_multiset(&backward));
    }
}
