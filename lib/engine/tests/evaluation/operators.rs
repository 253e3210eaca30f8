use crate::test_utils::{column, context, dataset, ex, parse, people, render, run, run_optimized};
use rdf_walk_algebra::optimizer::OptimizationLevel;
use rdf_walk_algebra::Algebra;
use rdf_walk_engine::{evaluate, Multiset, QueryEvaluationError};
use rdf_walk_model::{GraphName, NamedOrBlankNode, Quad};
use rdf_walk_storage::MemoryDataset;
use std::sync::Arc;

fn null() -> Algebra {
    Algebra::Values {
        variables: Vec::new(),
        bindings: Vec::new(),
    }
}

fn unoptimized_join(left: Algebra, right: Algebra) -> Algebra {
    Algebra::Join {
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn eval(tree: &Algebra) -> Multiset {
    evaluate(tree, &context(people())).expect("The evaluation must succeed")
}

#[test]
fn test_cross_product_of_disjoint_patterns() {
    let data = dataset(&[("s1", "p1", "o1"), ("s2", "p2", "o2")]);
    let query = "SELECT * WHERE { ?s ?p ?o . ?x ?y ?z }";

    let strict = run(&data, query);
    let optimized = run_optimized(&data, query, OptimizationLevel::Default);
    let full = run_optimized(&data, query, OptimizationLevel::Full);

    assert_eq!(strict.len(), 4);
    assert!(strict.bag_eq(&optimized));
    assert!(strict.bag_eq(&full));
}

#[test]
fn test_join_with_identity_is_neutral() {
    let pattern = parse("SELECT ?p ?n WHERE { ?p <http://example.com/name> ?n }");
    let plain = eval(&pattern);

    let left = eval(&unoptimized_join(Algebra::identity(), pattern.clone()));
    let right = eval(&unoptimized_join(pattern, Algebra::identity()));

    assert_eq!(plain.len(), 3);
    assert!(plain.bag_eq(&left));
    assert!(plain.bag_eq(&right));
}

#[test]
fn test_join_with_null_is_empty() {
    let pattern = parse("SELECT ?p ?n WHERE { ?p <http://example.com/name> ?n }");

    assert!(eval(&unoptimized_join(null(), pattern.clone())).is_empty());
    assert!(eval(&unoptimized_join(pattern, null())).is_empty());
}

#[test]
fn test_join_is_commutative() {
    let knows = parse("SELECT ?p ?q WHERE { ?p <http://example.com/knows> ?q }");
    let age = parse("SELECT ?p ?a WHERE { ?p <http://example.com/age> ?a }");

    let left = eval(&unoptimized_join(knows.clone(), age.clone()));
    let right = eval(&unoptimized_join(age, knows));

    assert_eq!(left.len(), 2);
    assert!(left.bag_eq(&right));
}

#[test]
fn test_parallel_join_matches_join() {
    let knows = parse("SELECT ?p ?q WHERE { ?p <http://example.com/knows> ?q }");
    let name = parse("SELECT ?q ?n WHERE { ?q <http://example.com/name> ?n }");

    let sequential = eval(&unoptimized_join(knows.clone(), name.clone()));
    let parallel = eval(&Algebra::ParallelJoin {
        left: Box::new(knows),
        right: Box::new(name),
    });

    assert_eq!(sequential.len(), 2);
    assert!(sequential.bag_eq(&parallel));
}

#[test]
fn test_optional() {
    let result = run(
        &people(),
        "SELECT ?p ?a WHERE { ?p ex:name ?n OPTIONAL { ?p ex:age ?a } }",
    );

    insta::assert_snapshot!(render(&result), @r#"
    {?a -> "25"^^<xsd:integer>, ?p -> <ex:bob>}
    {?a -> "30"^^<xsd:integer>, ?p -> <ex:alice>}
    {?p -> <ex:carol>}
    "#);
}

#[test]
fn test_optional_with_condition() {
    let result = run(
        &people(),
        "SELECT ?p ?a WHERE { ?p ex:name ?n OPTIONAL { ?p ex:age ?a FILTER(?a > 26) } }",
    );

    insta::assert_snapshot!(render(&result), @r#"
    {?a -> "30"^^<xsd:integer>, ?p -> <ex:alice>}
    {?p -> <ex:bob>}
    {?p -> <ex:carol>}
    "#);
}

#[test]
fn test_minus_without_shared_variables_removes_nothing() {
    let result = run(
        &people(),
        "SELECT ?p WHERE { { ?p ex:name ?n } MINUS { ?x ex:knows ?y } }",
    );

    assert_eq!(result.len(), 3);
}

#[test]
fn test_minus_removes_compatible_solutions() {
    let result = run(
        &people(),
        "SELECT ?p WHERE { { ?p ex:name ?n } MINUS { ?p ex:age ?a } }",
    );

    insta::assert_snapshot!(render(&result), @"{?p -> <ex:carol>}");
}

#[test]
fn test_filter_drops_solutions_with_errors() {
    let result = run(
        &people(),
        "SELECT ?p WHERE { ?p ex:name ?n OPTIONAL { ?p ex:age ?a } FILTER(?a > 26) }",
    );

    insta::assert_snapshot!(render(&result), @"{?p -> <ex:alice>}");
}

#[test]
fn test_bind_error_leaves_variable_unbound() {
    let result = run(
        &people(),
        "SELECT ?p ?b WHERE { ?p ex:name ?n OPTIONAL { ?p ex:age ?a } BIND(?a + 1 AS ?b) }",
    );

    insta::assert_snapshot!(render(&result), @r#"
    {?b -> "26"^^<xsd:integer>, ?p -> <ex:bob>}
    {?b -> "31"^^<xsd:integer>, ?p -> <ex:alice>}
    {?p -> <ex:carol>}
    "#);
}

#[test]
fn test_order_by_puts_unbound_first() {
    let result = run(
        &people(),
        "SELECT ?p WHERE { ?p ex:name ?n OPTIONAL { ?p ex:age ?a } } ORDER BY ?a",
    );

    assert_eq!(column(&result, "p"), ["<ex:carol>", "<ex:bob>", "<ex:alice>"]);
}

#[test]
fn test_order_by_descending() {
    let result = run(
        &people(),
        "SELECT ?n WHERE { ?p ex:name ?n } ORDER BY DESC(?n)",
    );

    assert_eq!(column(&result, "n"), ["\"Carol\"", "\"Bob\"", "\"Alice\""]);
}

#[test]
fn test_slice() {
    let result = run(
        &people(),
        "SELECT ?n WHERE { ?p ex:name ?n } ORDER BY ?n LIMIT 1 OFFSET 1",
    );

    assert_eq!(column(&result, "n"), ["\"Bob\""]);
}

#[test]
fn test_distinct() {
    let result = run(&people(), "SELECT DISTINCT ?p WHERE { ?p ?x ?y }");

    assert_eq!(result.len(), 3);
}

#[test]
fn test_count_ignores_unbound_values() {
    let result = run(
        &people(),
        "SELECT (COUNT(?a) AS ?c) WHERE { ?p ex:name ?n OPTIONAL { ?p ex:age ?a } }",
    );

    assert_eq!(column(&result, "c"), ["\"2\"^^<xsd:integer>"]);
}

#[test]
fn test_aggregate_over_empty_input_has_one_group() {
    let result = run(
        &people(),
        "SELECT (COUNT(*) AS ?c) WHERE { ?p ex:missing ?o }",
    );

    assert_eq!(column(&result, "c"), ["\"0\"^^<xsd:integer>"]);
}

#[test]
fn test_group_by_with_numeric_aggregates() {
    let result = run(
        &people(),
        "SELECT (SUM(?a) AS ?sum) (AVG(?a) AS ?avg) (MIN(?a) AS ?min) (MAX(?a) AS ?max) \
         WHERE { ?p ex:age ?a }",
    );

    insta::assert_snapshot!(render(&result), @r#"{?avg -> "27.5"^^<xsd:decimal>, ?max -> "30"^^<xsd:integer>, ?min -> "25"^^<xsd:integer>, ?sum -> "55"^^<xsd:integer>}"#);
}

#[test]
fn test_group_by_variable() {
    let result = run(
        &people(),
        "SELECT ?p (COUNT(?o) AS ?c) WHERE { ?p ?x ?o } GROUP BY ?p",
    );

    insta::assert_snapshot!(render(&result), @r#"
    {?c -> "1"^^<xsd:integer>, ?p -> <ex:carol>}
    {?c -> "3"^^<xsd:integer>, ?p -> <ex:alice>}
    {?c -> "3"^^<xsd:integer>, ?p -> <ex:bob>}
    "#);
}

#[test]
fn test_group_concat() {
    let result = run(
        &people(),
        "SELECT ?p (GROUP_CONCAT(?n; SEPARATOR=\", \") AS ?names) WHERE { ?p ex:name ?n } GROUP BY ?p",
    );

    assert_eq!(result.len(), 3);
    assert!(column(&result, "names").contains(&"\"Bob\"".to_owned()));
}

#[test]
fn test_values_restrict_pattern() {
    let result = run(
        &people(),
        "SELECT ?n WHERE { VALUES ?p { ex:alice ex:carol } ?p ex:name ?n }",
    );

    insta::assert_snapshot!(render(&result), @r#"
    {?n -> "Alice"}
    {?n -> "Carol"}
    "#);
}

#[test]
fn test_union() {
    let result = run(
        &people(),
        "SELECT ?x WHERE { { ?x ex:age ?a } UNION { ex:bob ex:knows ?x } }",
    );

    insta::assert_snapshot!(render(&result), @r"
    {?x -> <ex:alice>}
    {?x -> <ex:bob>}
    {?x -> <ex:carol>}
    ");
}

#[test]
fn test_exists_and_not_exists() {
    let exists = run(
        &people(),
        "SELECT ?p WHERE { ?p ex:name ?n FILTER EXISTS { ?p ex:knows ?x } }",
    );
    let not_exists = run(
        &people(),
        "SELECT ?p WHERE { ?p ex:name ?n FILTER NOT EXISTS { ?p ex:knows ?x } }",
    );

    insta::assert_snapshot!(render(&exists), @r"
    {?p -> <ex:alice>}
    {?p -> <ex:bob>}
    ");
    insta::assert_snapshot!(render(&not_exists), @"{?p -> <ex:carol>}");
}

#[test]
fn test_filtered_product_matches_filter() {
    let query = "SELECT ?a ?b WHERE { ?a ex:age ?x . ?b ex:age ?y FILTER(?x < ?y) }";

    let strict = run(&people(), query);
    let optimized = run_optimized(&people(), query, OptimizationLevel::Default);

    insta::assert_snapshot!(render(&strict), @"{?a -> <ex:bob>, ?b -> <ex:alice>}");
    assert!(strict.bag_eq(&optimized));
}

#[test]
fn test_specialized_ask_finds_solution() {
    let query = "ASK { ?p ex:knows ?q . ?q ex:knows ?r }";

    let result = run_optimized(&people(), query, OptimizationLevel::Default);

    assert_eq!(result.len(), 1);
}

#[test]
fn test_lazy_nodes_keep_limit() {
    let query = "SELECT ?x WHERE { { ?x ex:name ?n } UNION { ?x ex:age ?a } } LIMIT 2";

    let result = run_optimized(&people(), query, OptimizationLevel::Default);

    assert_eq!(result.len(), 2);
}

fn graphs() -> Arc<MemoryDataset> {
    let graph = |name: &str| GraphName::NamedNode(ex(name));
    Arc::new(
        [
            Quad::new(ex("a"), ex("p"), ex("b"), graph("g1")),
            Quad::new(ex("c"), ex("p"), ex("d"), graph("g2")),
            Quad::new(ex("e"), ex("p"), ex("f"), GraphName::DefaultGraph),
        ]
        .into_iter()
        .collect(),
    )
}

#[test]
fn test_graph_variable_iterates_named_graphs() {
    let result = run(&graphs(), "SELECT ?g ?s WHERE { GRAPH ?g { ?s ex:p ?o } }");

    insta::assert_snapshot!(render(&result), @r"
    {?g -> <ex:g1>, ?s -> <ex:a>}
    {?g -> <ex:g2>, ?s -> <ex:c>}
    ");
}

#[test]
fn test_constant_graph() {
    let result = run(&graphs(), "SELECT ?s WHERE { GRAPH ex:g2 { ?s ex:p ?o } }");

    insta::assert_snapshot!(render(&result), @"{?s -> <ex:c>}");
}

#[test]
fn test_named_graph_restriction() {
    let tree = parse("SELECT ?g ?s WHERE { GRAPH ?g { ?s <http://example.com/p> ?o } }");
    let context = context(graphs()).with_named_graphs(vec![NamedOrBlankNode::from(ex("g1"))]);

    let result = evaluate(&tree, &context).expect("The evaluation must succeed");

    insta::assert_snapshot!(render(&result), @"{?g -> <ex:g1>, ?s -> <ex:a>}");
}

#[test]
fn test_default_graph_excludes_named_graphs() {
    let result = run(&graphs(), "SELECT ?s WHERE { ?s ex:p ?o }");

    insta::assert_snapshot!(render(&result), @"{?s -> <ex:e>}");
}

#[test]
fn test_silent_service_is_identity() {
    let result = run(
        &people(),
        "SELECT ?p WHERE { ?p ex:age ?a SERVICE SILENT <http://example.com/sparql> { ?x ?y ?z } }",
    );

    assert_eq!(result.len(), 2);
}

#[test]
fn test_service_is_not_supported() {
    let tree = parse("SELECT * WHERE { SERVICE <http://example.com/sparql> { ?x ?y ?z } }");

    let result = evaluate(&tree, &context(people()));

    assert!(matches!(
        result,
        Err(QueryEvaluationError::UnsupportedService(name)) if name == ex("sparql")
    ));
}
