use crate::test_utils::{optimized, parse};
use rdf_walk_algebra::optimizer::OptimizationLevel;
use rdf_walk_algebra::Algebra;

#[test]
fn test_selective_patterns_first() {
    let plan = optimized(
        "SELECT ?s WHERE { ?s ?p ?o . ?s <http://example.com/name> <http://example.com/alice> }",
        OptimizationLevel::Default,
    );

    insta::assert_snapshot!(plan, @r"
    Project: ?s
      Bgp: ?s <http://example.com/name> <http://example.com/alice> . ?s ?p ?o
    ");
}

#[test]
fn test_limit_makes_union_lazy() {
    let plan = optimized(
        "SELECT ?s ?o WHERE { { ?s <http://example.com/p> ?o } UNION { ?o <http://example.com/q> ?s } } LIMIT 5",
        OptimizationLevel::Default,
    );

    insta::assert_snapshot!(plan, @r"
    Slice: start=0, length=5
      Project: ?s ?o
        LazyUnion (limit=5)
          LazyBgp (limit=5): ?s <http://example.com/p> ?o
          LazyBgp (limit=5): ?o <http://example.com/q> ?s
    ");
}

#[test]
fn test_ask_stops_after_first_solution() {
    let plan = optimized(
        "ASK { ?s <http://example.com/p> ?o . ?o <http://example.com/q> ?x }",
        OptimizationLevel::Default,
    );

    insta::assert_snapshot!(plan, @"AskBgp: ?s <http://example.com/p> ?o . ?o <http://example.com/q> ?x");
}

#[test]
fn test_same_term_filter_becomes_join() {
    let plan = optimized(
        "SELECT ?x ?y WHERE { ?a <http://example.com/p> ?x . ?b <http://example.com/q> ?y . FILTER(sameTerm(?a, ?b)) }",
        OptimizationLevel::Default,
    );

    insta::assert_snapshot!(plan, @r"
    Project: ?x ?y
      Extend: ?b := ?a
        Bgp: ?a <http://example.com/p> ?x . ?a <http://example.com/q> ?y
    ");
}

#[test]
fn test_filter_is_placed_after_binding_pattern() {
    let plan = optimized(
        "SELECT ?s WHERE { ?s <http://example.com/p> ?a . ?s <http://example.com/q> ?b . FILTER(?a < 3) }",
        OptimizationLevel::Default,
    );

    let Algebra::Project { inner, .. } = plan else {
        panic!("Expected a projection, got {plan}");
    };
    let Algebra::Join { left, right } = *inner else {
        panic!("Expected a join, got {inner}");
    };
    assert!(matches!(*left, Algebra::Filter { .. }));
    assert!(matches!(*right, Algebra::Bgp { patterns } if patterns.len() == 1));
}

#[test]
fn test_filter_over_product_is_filtered_product() {
    let plan = optimized(
        "SELECT ?x ?y WHERE { ?a <http://example.com/p> ?x . ?b <http://example.com/q> ?y FILTER(?x < ?y) }",
        OptimizationLevel::Default,
    );

    assert!(plan.any(&|node| matches!(node, Algebra::FilteredProduct { .. })));
    assert!(!plan.any(&|node| matches!(node, Algebra::Filter { .. })));
}

#[test]
fn test_closures_are_kept_for_evaluation() {
    let plan = optimized(
        "SELECT ?s ?o WHERE { ?s (<http://example.com/p>|<http://example.com/q>)* ?o }",
        OptimizationLevel::Default,
    );

    insta::assert_snapshot!(plan, @r"
    Project: ?s ?o
      Path: ?s (<http://example.com/p> | <http://example.com/q>)* ?o
    ");
}

#[test]
fn test_strict_mode_has_no_specialized_nodes() {
    let queries = [
        "ASK { ?s <http://example.com/p> ?o . ?o <http://example.com/q> ?x }",
        "SELECT ?s WHERE { ?s <http://example.com/p> ?o } LIMIT 1",
        "SELECT ?x ?y WHERE { ?a <http://example.com/p> ?x . ?b <http://example.com/q> ?y FILTER(?x < ?y) }",
    ];

    for query in queries {
        let (canonical, _) = parse(query);
        let strict = optimized(query, OptimizationLevel::None);
        assert_eq!(strict, canonical, "Strict mode changed {query}");
    }
}

#[test]
fn test_full_level_marks_parallel_joins() {
    let plan = optimized(
        "SELECT * WHERE { ?s <http://example.com/p> ?o . ?x <http://example.com/q>+ ?y }",
        OptimizationLevel::Full,
    );

    assert!(plan.any(&|node| matches!(node, Algebra::ParallelJoin { .. })));
}

#[test]
fn test_full_level_keeps_correlated_joins() {
    let plan = optimized(
        "SELECT * WHERE { VALUES ?s { \"lit\" } ?s <http://example.com/p>* ?o }",
        OptimizationLevel::Full,
    );

    assert!(plan.any(&|node| matches!(node, Algebra::Join { .. })));
    assert!(!plan.any(&|node| matches!(node, Algebra::ParallelJoin { .. })));
}
