use crate::test_utils::{ex, parse};
use rdf_walk_engine::{evaluate, EvaluationContext, QueryEvaluationError, QueryOptions};
use rdf_walk_model::{GraphName, Quad};
use rdf_walk_storage::MemoryDataset;
use std::sync::Arc;
use std::time::Duration;

const NODES: usize = 200;

/// A chain of `NODES` edges.
fn chain() -> Arc<MemoryDataset> {
    Arc::new(
        (0..NODES)
            .map(|i| {
                Quad::new(
                    ex(&format!("n{i}")),
                    ex("p"),
                    ex(&format!("n{}", i + 1)),
                    GraphName::DefaultGraph,
                )
            })
            .collect(),
    )
}

const PRODUCT: &str = "SELECT * WHERE { ?a ?b ?c . ?d ?e ?f . ?g ?h ?i }";

#[test]
fn test_deadline_aborts_evaluation() {
    let options = QueryOptions::default().with_timeout(Duration::from_millis(20));
    let context = EvaluationContext::new(chain(), options);

    let result = evaluate(&parse(PRODUCT), &context);

    assert!(matches!(result, Err(QueryEvaluationError::Timeout)));
    assert!(context.timed_out());
}

#[test]
fn test_deadline_returns_partial_results() {
    let options = QueryOptions::default()
        .with_timeout(Duration::from_millis(20))
        .with_partial_results_on_timeout(true);
    let context = EvaluationContext::new(chain(), options);

    let result = evaluate(&parse(PRODUCT), &context).expect("Partial results are requested");

    assert!(context.timed_out());
    assert!(result.len() < NODES * NODES * NODES);
}

#[test]
fn test_deadline_aborts_closure() {
    let options = QueryOptions::default().with_timeout(Duration::ZERO);
    let context = EvaluationContext::new(chain(), options);

    let result = evaluate(
        &parse("SELECT * WHERE { ?x <http://example.com/p>* ?y }"),
        &context,
    );

    assert!(result.is_err_and(|error| error.is_timeout()));
}

#[test]
fn test_partial_closure_is_subset() {
    let options = QueryOptions::default()
        .with_timeout(Duration::ZERO)
        .with_partial_results_on_timeout(true);
    let context = EvaluationContext::new(chain(), options);

    let result = evaluate(
        &parse("SELECT * WHERE { ?x <http://example.com/p>* ?y }"),
        &context,
    )
    .expect("Partial results are requested");

    // The complete closure has one pair per ordered pair of chain nodes.
    assert!(result.len() < (NODES + 1) * (NODES + 2) / 2);
    assert!(context.timed_out());
}

#[test]
fn test_query_without_deadline_completes() {
    let context = EvaluationContext::new(chain(), QueryOptions::default());

    let result = evaluate(
        &parse("SELECT * WHERE { <http://example.com/n0> <http://example.com/p>+ ?y }"),
        &context,
    )
    .expect("The evaluation must succeed");

    assert_eq!(result.len(), NODES);
    assert!(!context.timed_out());
}
