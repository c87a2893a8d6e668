//! End-to-end engine tests over in-memory datasets

use mirella_model::{Quad, Term, Triple};
use mirella_sparql::{
    Aggregator, AskQuery, ConstructQuery, DescribeQuery, Expression, Filter, GroupOperator,
    OrderDirection, PathPattern, Pattern, PatternGroup, PropertyPath, QueryEngine, SelectQuery,
    TriplePattern, ValuesTable,
};
use mirella_store::{DataSource, Federation, Graph, QuadStore};
use std::sync::Arc;

fn ex(name: &str) -> Term {
    Term::iri(&format!("http://example.org/{}", name))
}

fn knows_graph() -> Graph {
    // { :a :knows :b . :b :knows :c . :a :knows :c . }
    let mut graph = Graph::new();
    for (s, o) in [("a", "b"), ("b", "c"), ("a", "c")] {
        graph
            .insert(Triple::new(ex(s), ex("knows"), ex(o)))
            .unwrap();
    }
    graph
}

fn numbers_graph() -> Graph {
    // { :a :p 1 . :a :p 2 . :b :p 3 . }
    let mut graph = Graph::new();
    for (s, v) in [("a", 1), ("a", 2), ("b", 3)] {
        graph
            .insert(Triple::new(ex(s), ex("p"), Term::integer(v)))
            .unwrap();
    }
    graph
}

fn knows_query() -> SelectQuery {
    SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("knows"),
            Term::variable("y"),
        )))
        .select("x")
        .select("y")
        .order_by("x", OrderDirection::Ascending)
        .order_by("y", OrderDirection::Ascending)
}

fn rows(result: &mirella_sparql::SelectResult, var: &str) -> Vec<Term> {
    result
        .table()
        .iter()
        .filter_map(|row| row.get(var).cloned())
        .collect()
}

#[test]
fn select_ordered_pairs() {
    let engine = QueryEngine::new();
    let result = engine.select(&knows_query(), &knows_graph()).unwrap();

    assert_eq!(result.variables(), vec!["?x", "?y"]);
    let pairs: Vec<(Term, Term)> = result
        .table()
        .iter()
        .map(|row| (row.get("x").cloned().unwrap(), row.get("y").cloned().unwrap()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (ex("a"), ex("b")),
            (ex("a"), ex("c")),
            (ex("b"), ex("c")),
        ]
    );
}

#[test]
fn group_by_with_count() {
    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("knows"),
            Term::variable("y"),
        )))
        .select("x")
        .group_by("x")
        .aggregate("n", Aggregator::count(Expression::variable("y"), false))
        .order_by("x", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &knows_graph()).unwrap();
    let counts: Vec<(Term, Term)> = result
        .table()
        .iter()
        .map(|row| (row.get("x").cloned().unwrap(), row.get("n").cloned().unwrap()))
        .collect();
    assert_eq!(
        counts,
        vec![(ex("a"), Term::integer(2)), (ex("b"), Term::integer(1))]
    );
}

#[test]
fn sum_without_group_by_is_one_partition() {
    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("p"),
            Term::variable("v"),
        )))
        .aggregate("s", Aggregator::sum(Expression::variable("v"), false));

    let result = QueryEngine::new().select(&query, &numbers_graph()).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.table().row(0).get("s"), Some(&Term::double(6.0)));
}

#[test]
fn optional_keeps_unmatched_rows_unbound() {
    // { :a :p :b . } with OPTIONAL { ?z :q ?y }
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("b"))).unwrap();

    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("p"),
            Term::variable("z"),
        )))
        .with_group(
            PatternGroup::new()
                .with_operator(GroupOperator::Optional)
                .with_pattern(Pattern::new(
                    Term::variable("z"),
                    ex("q"),
                    Term::variable("y"),
                )),
        )
        .select("x")
        .select("y");

    let result = QueryEngine::new().select(&query, &graph).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.table().row(0).get("x"), Some(&ex("a")));
    assert_eq!(result.table().row(0).get("y"), None);
}

#[test]
fn minus_removes_compatible_rows() {
    // { :a :p 1 . :b :p 2 . } MINUS { ?x :p 2 }
    let mut graph = Graph::new();
    graph
        .insert(Triple::new(ex("a"), ex("p"), Term::integer(1)))
        .unwrap();
    graph
        .insert(Triple::new(ex("b"), ex("p"), Term::integer(2)))
        .unwrap();

    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("p"),
            Term::variable("v"),
        )))
        .with_group(
            PatternGroup::new()
                .with_operator(GroupOperator::Minus)
                .with_pattern(Pattern::new(Term::variable("x"), ex("p"), Term::integer(2))),
        )
        .select("x");

    let result = QueryEngine::new().select(&query, &graph).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("a")]);
}

#[test]
fn union_concatenates_group_tables() {
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("b"))).unwrap();
    graph.insert(Triple::new(ex("c"), ex("q"), ex("d"))).unwrap();

    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("p"),
            Term::variable("y"),
        )))
        .with_group(
            PatternGroup::new()
                .with_operator(GroupOperator::Union)
                .with_pattern(Pattern::new(
                    Term::variable("x"),
                    ex("q"),
                    Term::variable("z"),
                )),
        )
        .select("x")
        .order_by("x", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &graph).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("a"), ex("c")]);
}

#[test]
fn filters_swallow_expression_errors() {
    // ?v > 1 errors on non-numeric bindings; those rows drop out instead
    // of failing the query.
    let mut graph = numbers_graph();
    graph
        .insert(Triple::new(ex("c"), ex("p"), Term::literal("not a number")))
        .unwrap();

    let query = SelectQuery::new()
        .with_group(
            PatternGroup::new()
                .with_pattern(Pattern::new(
                    Term::variable("x"),
                    ex("p"),
                    Term::variable("v"),
                ))
                .with_filter(Filter::Expression(
                    Expression::variable("v").greater(Expression::constant(Term::integer(1))),
                )),
        )
        .select("x")
        .order_by("x", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &graph).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("a"), ex("b")]);
}

#[test]
fn exists_filter_requires_partner() {
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("b"))).unwrap();
    graph.insert(Triple::new(ex("c"), ex("p"), ex("d"))).unwrap();
    graph.insert(Triple::new(ex("b"), ex("q"), ex("e"))).unwrap();

    let query = SelectQuery::new()
        .with_group(
            PatternGroup::new()
                .with_pattern(Pattern::new(
                    Term::variable("x"),
                    ex("p"),
                    Term::variable("y"),
                ))
                .with_filter(Filter::Exists(PatternGroup::new().with_pattern(
                    Pattern::new(Term::variable("y"), ex("q"), Term::variable("z")),
                ))),
        )
        .select("x");

    let result = QueryEngine::new().select(&query, &graph).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("a")]);
}

#[test]
fn negated_exists_is_malformed() {
    let query = SelectQuery::new()
        .with_group(
            PatternGroup::new()
                .with_pattern(Pattern::new(
                    Term::variable("x"),
                    ex("p"),
                    Term::variable("y"),
                ))
                .with_filter(Filter::Not(Box::new(Filter::Exists(
                    PatternGroup::new().with_pattern(Pattern::new(
                        Term::variable("y"),
                        ex("q"),
                        Term::variable("z"),
                    )),
                )))),
        )
        .select("x");

    let error = QueryEngine::new()
        .select(&query, &Graph::new())
        .unwrap_err();
    assert!(matches!(
        error,
        mirella_sparql::QueryError::MalformedQuery(_)
    ));
}

#[test]
fn projection_of_unbound_variable_is_malformed() {
    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("p"),
            Term::variable("y"),
        )))
        .select("nope");

    assert!(matches!(
        QueryEngine::new().select(&query, &Graph::new()),
        Err(mirella_sparql::QueryError::MalformedQuery(_))
    ));
}

#[test]
fn bind_adds_computed_column() {
    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("p"),
            Term::variable("v"),
        )))
        .select("x")
        .bind(
            Expression::variable("v").multiply(Expression::constant(Term::integer(10))),
            "scaled",
        )
        .order_by("scaled", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &numbers_graph()).unwrap();
    assert_eq!(result.variables(), vec!["?x", "?scaled"]);
    assert_eq!(
        rows(&result, "scaled"),
        vec![Term::integer(10), Term::integer(20), Term::integer(30)]
    );
}

#[test]
fn values_join_restricts_solutions() {
    let query = SelectQuery::new()
        .with_group(
            PatternGroup::new()
                .with_pattern(Pattern::new(
                    Term::variable("x"),
                    ex("p"),
                    Term::variable("v"),
                ))
                .with_values(ValuesTable::new(["v"]).with_row(vec![Some(Term::integer(2))])),
        )
        .select("x");

    let result = QueryEngine::new().select(&query, &numbers_graph()).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("a")]);
}

#[test]
fn sub_select_joins_its_projection() {
    let inner = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("knows"),
            Term::variable("y"),
        )))
        .select("y")
        .distinct();

    let query = SelectQuery::new()
        .with_group(
            PatternGroup::new()
                .with_sub_select(inner)
                .with_pattern(Pattern::new(
                    Term::variable("y"),
                    ex("knows"),
                    Term::variable("z"),
                )),
        )
        .select("y")
        .select("z");

    let result = QueryEngine::new().select(&query, &knows_graph()).unwrap();
    // Only :b among the known people knows somebody.
    assert_eq!(result.len(), 1);
    assert_eq!(result.table().row(0).get("y"), Some(&ex("b")));
    assert_eq!(result.table().row(0).get("z"), Some(&ex("c")));
}

#[test]
fn property_path_one_or_more() {
    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_path(PathPattern::new(
            ex("a"),
            PropertyPath::predicate(ex("knows")).one_or_more(),
            Term::variable("y"),
        )))
        .select("y")
        .order_by("y", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &knows_graph()).unwrap();
    assert_eq!(rows(&result, "y"), vec![ex("b"), ex("c")]);
}

#[test]
fn distinct_limit_offset_window() {
    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("knows"),
            Term::variable("y"),
        )))
        .select("x")
        .distinct()
        .order_by("x", OrderDirection::Ascending)
        .offset(1)
        .limit(1);

    let result = QueryEngine::new().select(&query, &knows_graph()).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("b")]);
}

#[test]
fn having_filters_aggregated_rows() {
    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("knows"),
            Term::variable("y"),
        )))
        .select("x")
        .group_by("x")
        .aggregate("n", Aggregator::count(Expression::variable("y"), false))
        .having(Filter::Expression(
            Expression::variable("n").greater(Expression::constant(Term::integer(1))),
        ));

    let result = QueryEngine::new().select(&query, &knows_graph()).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("a")]);
}

#[test]
fn ask_reports_pattern_presence() {
    let engine = QueryEngine::new();
    let graph = knows_graph();

    let hit = AskQuery::new().with_group(PatternGroup::new().with_pattern(Pattern::new(
        ex("a"),
        ex("knows"),
        Term::variable("y"),
    )));
    assert!(engine.ask(&hit, &graph).unwrap().value);

    let miss = AskQuery::new().with_group(PatternGroup::new().with_pattern(Pattern::new(
        ex("c"),
        ex("knows"),
        Term::variable("y"),
    )));
    assert!(!engine.ask(&miss, &graph).unwrap().value);
}

#[test]
fn construct_builds_deduplicated_graph() {
    let query = ConstructQuery::new()
        .with_template(TriplePattern::new(
            Term::variable("x"),
            ex("connected"),
            Term::variable("y"),
        ))
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("knows"),
            Term::variable("y"),
        )));

    let graph = QueryEngine::new().construct(&query, &knows_graph()).unwrap();
    assert_eq!(graph.len(), 3);
    assert!(graph.contains(&Triple::new(ex("a"), ex("connected"), ex("b"))));
}

#[test]
fn construct_skips_rows_with_unbound_template_slots() {
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("b"))).unwrap();

    let query = ConstructQuery::new()
        .with_template(TriplePattern::new(
            Term::variable("x"),
            ex("connected"),
            Term::variable("missing"),
        ))
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("p"),
            Term::variable("y"),
        )));

    let constructed = QueryEngine::new().construct(&query, &graph).unwrap();
    assert!(constructed.is_empty());
}

#[test]
fn describe_is_symmetric_one_hop() {
    // { :a :p :b . :c :q :a . }
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("b"))).unwrap();
    graph.insert(Triple::new(ex("c"), ex("q"), ex("a"))).unwrap();

    let query = DescribeQuery::new().describe(ex("a"));
    let described = QueryEngine::new().describe(&query, &graph).unwrap();

    assert_eq!(described.len(), 2);
    assert!(described.contains(&Triple::new(ex("a"), ex("p"), ex("b"))));
    assert!(described.contains(&Triple::new(ex("c"), ex("q"), ex("a"))));

    // A term with no incident statements describes to an empty graph.
    let lonely = DescribeQuery::new().describe(ex("z"));
    assert!(QueryEngine::new().describe(&lonely, &graph).unwrap().is_empty());
}

#[test]
fn describe_variable_bound_by_pattern() {
    let query = DescribeQuery::new()
        .describe(Term::variable("x"))
        .with_group(PatternGroup::new().with_pattern(Pattern::new(
            Term::variable("x"),
            ex("knows"),
            ex("c"),
        )));

    let described = QueryEngine::new().describe(&query, &knows_graph()).unwrap();
    // ?x binds :a and :b; their one-hop descriptions cover all statements.
    assert_eq!(described.len(), 3);
}

#[test]
fn quad_store_named_graph_pattern() {
    let mut store = QuadStore::new();
    store.insert_graph(&knows_graph(), Some(ex("g1"))).unwrap();

    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(
            Pattern::new(Term::variable("x"), ex("knows"), Term::variable("y"))
                .with_graph(ex("g1")),
        ))
        .select("x");

    let result = QueryEngine::new().select(&query, &store).unwrap();
    assert_eq!(result.len(), 3);

    let other = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(
            Pattern::new(Term::variable("x"), ex("knows"), Term::variable("y"))
                .with_graph(ex("g2")),
        ))
        .select("x");
    assert!(QueryEngine::new().select(&other, &store).unwrap().is_empty());
}

#[test]
fn graph_variable_binds_named_graph_context() {
    let mut store = QuadStore::new();
    store
        .insert(Quad::new(ex("a"), ex("p"), ex("b"), Some(ex("g1"))))
        .unwrap();
    store
        .insert(Quad::new(ex("c"), ex("p"), ex("d"), Some(ex("g2"))))
        .unwrap();
    store
        .insert(Quad::new(ex("e"), ex("p"), ex("f"), None))
        .unwrap();

    let query = SelectQuery::new()
        .with_group(PatternGroup::new().with_pattern(
            Pattern::new(Term::variable("s"), ex("p"), Term::variable("o"))
                .with_graph(Term::variable("g")),
        ))
        .select("s")
        .select("g")
        .order_by("s", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &store).unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.table().row(0).get("g"), Some(&ex("g1")));
    assert_eq!(result.table().row(1).get("g"), Some(&ex("g2")));
    // Default-graph statements match with the graph variable unbound.
    assert_eq!(result.table().row(2).get("s"), Some(&ex("e")));
    assert_eq!(result.table().row(2).get("g"), None);
}

#[test]
fn federation_queries_members_as_one() {
    let mut g1 = Graph::new();
    g1.insert(Triple::new(ex("a"), ex("knows"), ex("b"))).unwrap();
    let mut g2 = Graph::new();
    g2.insert(Triple::new(ex("b"), ex("knows"), ex("c"))).unwrap();
    g2.insert(Triple::new(ex("a"), ex("knows"), ex("b"))).unwrap();

    let federation = Federation::new()
        .with_member(Arc::new(g1))
        .with_member(Arc::new(g2));

    let result = QueryEngine::new()
        .select(&knows_query(), &federation)
        .unwrap();
    // The duplicate member statement collapses.
    assert_eq!(result.len(), 2);
}

#[test]
fn queries_are_reusable_across_datasets() {
    let engine = QueryEngine::new();
    let query = knows_query();

    let full = engine.select(&query, &knows_graph()).unwrap();
    let empty = engine.select(&query, &Graph::new()).unwrap();

    assert_eq!(full.len(), 3);
    assert!(empty.is_empty());
}

#[test]
fn blank_nodes_in_patterns_are_existentials() {
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("b"))).unwrap();

    // _:who matches anything, like a fresh variable.
    let query = AskQuery::new().with_group(PatternGroup::new().with_pattern(Pattern::new(
        Term::blank("who"),
        ex("p"),
        ex("b"),
    )));

    assert!(QueryEngine::new().ask(&query, &graph).unwrap().value);
}

#[test]
fn optional_pattern_inside_group() {
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("b"))).unwrap();
    graph.insert(Triple::new(ex("b"), ex("q"), ex("c"))).unwrap();
    graph.insert(Triple::new(ex("d"), ex("p"), ex("e"))).unwrap();

    let query = SelectQuery::new()
        .with_group(
            PatternGroup::new()
                .with_pattern(Pattern::new(
                    Term::variable("x"),
                    ex("p"),
                    Term::variable("y"),
                ))
                .with_pattern(
                    Pattern::new(Term::variable("y"), ex("q"), Term::variable("z")).optional(),
                ),
        )
        .select("x")
        .select("z")
        .order_by("x", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &graph).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.table().row(0).get("z"), Some(&ex("c")));
    assert_eq!(result.table().row(1).get("z"), None);
}

#[test]
fn union_chained_patterns_inside_group() {
    let mut graph = Graph::new();
    graph.insert(Triple::new(ex("a"), ex("p"), ex("v"))).unwrap();
    graph.insert(Triple::new(ex("b"), ex("q"), ex("v"))).unwrap();

    let query = SelectQuery::new()
        .with_group(
            PatternGroup::new()
                .with_pattern(
                    Pattern::new(Term::variable("x"), ex("p"), Term::variable("v"))
                        .union_with_next(),
                )
                .with_pattern(Pattern::new(
                    Term::variable("x"),
                    ex("q"),
                    Term::variable("v"),
                )),
        )
        .select("x")
        .order_by("x", OrderDirection::Ascending);

    let result = QueryEngine::new().select(&query, &graph).unwrap();
    assert_eq!(rows(&result, "x"), vec![ex("a"), ex("b")]);
}

#[tokio::test]
async fn async_entry_points_wrap_sync_evaluation() {
    let source: Arc<dyn DataSource> = Arc::new(knows_graph());

    let result = QueryEngine::select_async(knows_query(), Arc::clone(&source))
        .await
        .unwrap();
    assert_eq!(result.len(), 3);

    let ask = AskQuery::new().with_group(PatternGroup::new().with_pattern(Pattern::new(
        ex("a"),
        ex("knows"),
        Term::variable("y"),
    )));
    assert!(QueryEngine::ask_async(ask, source).await.unwrap().value);
}
