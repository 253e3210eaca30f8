use crate::test_utils::{context, dataset, ex, render, run};
use rdf_walk_algebra::paths::PropertyPath;
use rdf_walk_algebra::Algebra;
use rdf_walk_engine::{evaluate, Multiset};
use rdf_walk_model::{Literal, TermPattern, Variable};
use std::sync::Arc;

fn cycle() -> Arc<rdf_walk_storage::MemoryDataset> {
    dataset(&[("a", "p", "b"), ("b", "p", "c"), ("c", "p", "a")])
}

fn chain() -> Arc<rdf_walk_storage::MemoryDataset> {
    dataset(&[("a", "p", "b"), ("b", "p", "c"), ("c", "p", "d")])
}

#[test]
fn test_one_or_more_on_cycle_reaches_start() {
    let result = run(&cycle(), "SELECT ?y WHERE { ex:a ex:p+ ?y }");

    insta::assert_snapshot!(render(&result), @r"
    {?y -> <ex:a>}
    {?y -> <ex:b>}
    {?y -> <ex:c>}
    ");
}

#[test]
fn test_one_or_more_on_chain() {
    let result = run(&chain(), "SELECT ?y WHERE { ex:a ex:p+ ?y }");

    insta::assert_snapshot!(render(&result), @r"
    {?y -> <ex:b>}
    {?y -> <ex:c>}
    {?y -> <ex:d>}
    ");
}

#[test]
fn test_zero_or_more_includes_start() {
    let result = run(&chain(), "SELECT ?y WHERE { ex:b ex:p* ?y }");

    insta::assert_snapshot!(render(&result), @r"
    {?y -> <ex:b>}
    {?y -> <ex:c>}
    {?y -> <ex:d>}
    ");
}

#[test]
fn test_zero_or_more_on_cycle_has_no_duplicates() {
    let result = run(&cycle(), "SELECT ?y WHERE { ex:a ex:p* ?y }");

    assert_eq!(result.len(), 3);
}

#[test]
fn test_closure_between_variables_is_complete() {
    let result = run(&cycle(), "SELECT ?x ?y WHERE { ?x ex:p+ ?y }");

    assert_eq!(result.len(), 9);
}

#[test]
fn test_reflexive_closure_between_variables() {
    let result = run(&chain(), "SELECT ?x ?y WHERE { ?x ex:p* ?y }");

    // Four reflexive pairs and six pairs connected by at least one step.
    assert_eq!(result.len(), 10);
}

#[test]
fn test_closure_walks_backward_from_fixed_object() {
    let result = run(&chain(), "SELECT ?x WHERE { ?x ex:p+ ex:c }");

    insta::assert_snapshot!(render(&result), @r"
    {?x -> <ex:a>}
    {?x -> <ex:b>}
    ");
}

#[test]
fn test_closure_with_same_variable_on_both_ends() {
    let on_cycle = run(&cycle(), "SELECT ?x WHERE { ?x ex:p+ ?x }");
    let on_chain = run(&chain(), "SELECT ?x WHERE { ?x ex:p+ ?x }");

    assert_eq!(on_cycle.len(), 3);
    assert!(on_chain.is_empty());
}

#[test]
fn test_closure_with_both_ends_fixed() {
    let connected = run(&chain(), "ASK { ex:a ex:p+ ex:d }");
    let disconnected = run(&chain(), "ASK { ex:d ex:p+ ex:a }");

    assert!(!connected.is_empty());
    assert!(disconnected.is_empty());
}

#[test]
fn test_closure_uses_bindings_of_preceding_pattern() {
    let data = dataset(&[
        ("a", "p", "b"),
        ("b", "p", "c"),
        ("x", "p", "y"),
        ("start", "q", "b"),
    ]);

    let result = run(&data, "SELECT ?y WHERE { ex:start ex:q ?x . ?x ex:p+ ?y }");

    insta::assert_snapshot!(render(&result), @"{?y -> <ex:c>}");
}

#[test]
fn test_zero_or_one() {
    let result = run(&chain(), "SELECT ?y WHERE { ex:a ex:p? ?y }");

    insta::assert_snapshot!(render(&result), @r"
    {?y -> <ex:a>}
    {?y -> <ex:b>}
    ");
}

#[test]
fn test_inverse_path() {
    let result = run(&chain(), "SELECT ?x WHERE { ex:c ^ex:p ?x }");

    insta::assert_snapshot!(render(&result), @"{?x -> <ex:b>}");
}

#[test]
fn test_alternative_path() {
    let data = dataset(&[("a", "p", "b"), ("a", "q", "c"), ("a", "r", "d")]);

    let result = run(&data, "SELECT ?y WHERE { ex:a ex:p|ex:q ?y }");

    insta::assert_snapshot!(render(&result), @r"
    {?y -> <ex:b>}
    {?y -> <ex:c>}
    ");
}

#[test]
fn test_sequence_path() {
    let result = run(&chain(), "SELECT ?y WHERE { ex:a ex:p/ex:p ?y }");

    insta::assert_snapshot!(render(&result), @"{?y -> <ex:c>}");
}

#[test]
fn test_closure_of_sequence() {
    let result = run(&chain(), "SELECT ?y WHERE { ex:a (ex:p/ex:p)+ ?y }");

    insta::assert_snapshot!(render(&result), @"{?y -> <ex:c>}");
}

#[test]
fn test_negated_property_set() {
    let data = dataset(&[("a", "p", "b"), ("a", "q", "c"), ("a", "r", "d")]);

    let result = run(&data, "SELECT ?y WHERE { ex:a !(ex:p|ex:q) ?y }");

    insta::assert_snapshot!(render(&result), @"{?y -> <ex:d>}");
}

fn evaluate_path(path: PropertyPath) -> Multiset {
    let tree = Algebra::Path {
        subject: TermPattern::NamedNode(ex("a")),
        path,
        object: TermPattern::Variable(Variable::new_unchecked("y")),
    };
    evaluate(&tree, &context(chain())).expect("The path must evaluate")
}

#[test]
fn test_fixed_cardinality() {
    let result = evaluate_path(PropertyPath::FixedCardinality(
        Box::new(PropertyPath::Predicate(ex("p"))),
        2,
    ));

    insta::assert_snapshot!(render(&result.without_temporary_variables()), @"{?y -> <ex:c>}");
}

#[test]
fn test_bounded_cardinality() {
    let result = evaluate_path(PropertyPath::Cardinality {
        path: Box::new(PropertyPath::Predicate(ex("p"))),
        min: 1,
        max: Some(2),
    });

    insta::assert_snapshot!(render(&result.without_temporary_variables()), @r"
    {?y -> <ex:b>}
    {?y -> <ex:c>}
    ");
}

#[test]
fn test_cardinality_with_open_upper_bound() {
    let result = evaluate_path(PropertyPath::Cardinality {
        path: Box::new(PropertyPath::Predicate(ex("p"))),
        min: 2,
        max: None,
    });

    insta::assert_snapshot!(render(&result.without_temporary_variables()), @r"
    {?y -> <ex:c>}
    {?y -> <ex:d>}
    ");
}

#[test]
fn test_empty_cardinality_range_matches_nothing() {
    let result = evaluate_path(PropertyPath::Cardinality {
        path: Box::new(PropertyPath::Predicate(ex("p"))),
        min: 3,
        max: Some(1),
    });

    assert!(result.is_empty());
}

#[test]
fn test_closure_ignores_bound_values_outside_graph() {
    let result = run(
        &chain(),
        "SELECT ?x ?y WHERE { VALUES ?x { \"lit\" ex:c } ?x ex:p* ?y }",
    );

    insta::assert_snapshot!(render(&result), @r"
    {?x -> <ex:c>, ?y -> <ex:c>}
    {?x -> <ex:c>, ?y -> <ex:d>}
    ");
}

fn bound_starts() -> Algebra {
    Algebra::Values {
        variables: vec![Variable::new_unchecked("x")],
        bindings: vec![
            vec![Some(Literal::new_simple_literal("lit").into())],
            vec![Some(ex("a").into())],
        ],
    }
}

fn join_both_ways(right: Algebra) -> (Multiset, Multiset) {
    let data = chain();
    let joined = evaluate(
        &Algebra::join(bound_starts(), right.clone()),
        &context(Arc::clone(&data)),
    )
    .expect("The join must evaluate");
    let parallel = evaluate(
        &Algebra::ParallelJoin {
            left: Box::new(bound_starts()),
            right: Box::new(right),
        },
        &context(data),
    )
    .expect("The parallel join must evaluate");
    (joined, parallel)
}

#[test]
fn test_correlated_closure_matches_independent_evaluation() {
    let (joined, parallel) = join_both_ways(Algebra::ZeroOrMorePath {
        subject: Variable::new_unchecked("x").into(),
        path: PropertyPath::Predicate(ex("p")),
        object: Variable::new_unchecked("y").into(),
    });

    assert_eq!(joined.len(), 4);
    assert!(joined.bag_eq(&parallel), "{joined}\n---\n{parallel}");
}

#[test]
fn test_correlated_zero_length_path_matches_independent_evaluation() {
    let (joined, parallel) = join_both_ways(Algebra::ZeroLengthPath {
        subject: Variable::new_unchecked("x").into(),
        object: Variable::new_unchecked("y").into(),
    });

    insta::assert_snapshot!(render(&joined), @"{?x -> <ex:a>, ?y -> <ex:a>}");
    assert!(joined.bag_eq(&parallel), "{joined}\n---\n{parallel}");
}
