use crate::test_utils::parse;
use rdf_walk_common::error::{CorruptionError, StorageError};
use rdf_walk_common::{ActiveGraph, TripleIter, TriplePatternMatch, TripleSource};
use rdf_walk_engine::{evaluate, EvaluationContext, QueryEvaluationError, QueryOptions};
use rdf_walk_model::{NamedNode, NamedOrBlankNode, Triple};
use std::sync::Arc;

/// Fails either when a match is requested or while the matches are read.
#[derive(Debug)]
struct FailingSource {
    fail_on_read: bool,
}

impl TripleSource for FailingSource {
    fn match_triples(
        &self,
        _pattern: &TriplePatternMatch,
        _active_graph: &ActiveGraph,
    ) -> Result<TripleIter<'_>, StorageError> {
        if !self.fail_on_read {
            return Err(CorruptionError::msg("broken index").into());
        }
        let node = NamedNode::new_unchecked("http://example.com/a");
        let triple = Triple::new(node.clone(), node.clone(), node);
        Ok(Box::new(
            [
                Ok(triple),
                Err(CorruptionError::msg("broken page").into()),
            ]
            .into_iter(),
        ))
    }

    fn named_graphs(&self) -> Result<Vec<NamedOrBlankNode>, StorageError> {
        Err(CorruptionError::msg("broken graph list").into())
    }
}

fn evaluate_on(fail_on_read: bool, query: &str) -> Result<usize, QueryEvaluationError> {
    let context = EvaluationContext::new(
        Arc::new(FailingSource { fail_on_read }),
        QueryOptions::default(),
    );
    evaluate(&parse(query), &context).map(|result| result.len())
}

#[test]
fn test_storage_error_on_match_is_fatal() {
    let result = evaluate_on(false, "SELECT * WHERE { ?s ?p ?o }");

    let Err(QueryEvaluationError::Storage(error)) = result else {
        panic!("Expected a storage error, got {result:?}");
    };
    assert_eq!(error.to_string(), "broken index");
}

#[test]
fn test_storage_error_while_reading_is_fatal() {
    let result = evaluate_on(true, "SELECT * WHERE { ?s ?p ?o }");

    assert!(matches!(result, Err(QueryEvaluationError::Storage(_))));
}

#[test]
fn test_storage_error_in_closure_is_fatal() {
    let result = evaluate_on(true, "SELECT * WHERE { ?s <http://example.com/a>+ ?o }");

    assert!(matches!(result, Err(QueryEvaluationError::Storage(_))));
}

#[test]
fn test_storage_error_in_exists_is_not_swallowed() {
    let result = evaluate_on(
        true,
        "SELECT * WHERE { VALUES ?s { <http://example.com/a> } FILTER EXISTS { ?s ?p ?o } }",
    );

    assert!(matches!(result, Err(QueryEvaluationError::Storage(_))));
}

#[test]
fn test_storage_error_while_listing_graphs_is_fatal() {
    let result = evaluate_on(true, "SELECT * WHERE { GRAPH ?g { ?s ?p ?o } }");

    assert!(matches!(result, Err(QueryEvaluationError::Storage(_))));
}
