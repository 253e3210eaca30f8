use crate::error::QueryEvaluationError;
use crate::expression::{ExpressionEvaluator, SimpleExpressionEvaluator};
use crate::multiset::Multiset;
use crate::options::QueryOptions;
use rdf_walk_common::{ActiveGraph, TripleSource};
use rdf_walk_model::NamedOrBlankNode;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Everything an operator needs to know about the evaluation it is part of.
///
/// A context is created once per query and then passed down the tree. Operators never change a
/// context. Instead, they derive new contexts for their children (e.g., with a narrower
/// [input](Self::input) or another [active graph](Self::active_graph)). Cloning a context is cheap
/// and all clones share the same deadline.
#[derive(Clone)]
pub struct EvaluationContext {
    source: Arc<dyn TripleSource>,
    expressions: Arc<dyn ExpressionEvaluator>,
    input: Arc<Multiset>,
    active_graph: ActiveGraph,
    named_graphs: Option<Arc<[NamedOrBlankNode]>>,
    deadline: Option<Instant>,
    options: Arc<QueryOptions>,
    timed_out: Arc<AtomicBool>,
}

impl EvaluationContext {
    /// Creates a context for evaluating a query against `source`.
    ///
    /// The deadline is computed from [QueryOptions::timeout] when the context is created.
    pub fn new(source: Arc<dyn TripleSource>, options: QueryOptions) -> Self {
        let deadline = options
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        Self {
            source,
            expressions: Arc::new(SimpleExpressionEvaluator::new()),
            input: Arc::new(Multiset::Identity),
            active_graph: ActiveGraph::DefaultGraph,
            named_graphs: None,
            deadline,
            options: Arc::new(options),
            timed_out: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replaces the expression evaluator.
    #[must_use]
    pub fn with_expression_evaluator(mut self, expressions: Arc<dyn ExpressionEvaluator>) -> Self {
        self.expressions = expressions;
        self
    }

    /// Restricts the named graphs that can be matched by `GRAPH` patterns. By default, all named
    /// graphs of the source are visible.
    #[must_use]
    pub fn with_named_graphs(mut self, named_graphs: Vec<NamedOrBlankNode>) -> Self {
        self.named_graphs = Some(named_graphs.into());
        self
    }

    /// Returns a context whose solutions are restricted by `input`.
    #[must_use]
    pub fn with_input(&self, input: impl Into<Arc<Multiset>>) -> Self {
        Self {
            input: input.into(),
            ..self.clone()
        }
    }

    /// Returns a context without any restricting input.
    #[must_use]
    pub fn without_input(&self) -> Self {
        self.with_input(Multiset::Identity)
    }

    /// Returns a context that matches patterns against `active_graph`.
    #[must_use]
    pub fn with_active_graph(&self, active_graph: ActiveGraph) -> Self {
        Self {
            active_graph,
            ..self.clone()
        }
    }

    pub fn source(&self) -> &dyn TripleSource {
        self.source.as_ref()
    }

    pub fn expressions(&self) -> &dyn ExpressionEvaluator {
        self.expressions.as_ref()
    }

    /// The solutions that the result of the current operator will be joined with.
    ///
    /// Operators may use the input to skip solutions that the join with the input would remove.
    /// The input must never add solutions, as the result is always joined with the input
    /// afterward.
    pub fn input(&self) -> &Multiset {
        &self.input
    }

    pub fn active_graph(&self) -> &ActiveGraph {
        &self.active_graph
    }

    /// Returns the named graphs that are visible to `GRAPH` patterns. `None` if every named graph
    /// of the source is visible.
    pub fn named_graphs(&self) -> Option<&[NamedOrBlankNode]> {
        self.named_graphs.as_deref()
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns whether the deadline has been reached by any operator of this evaluation.
    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::Relaxed)
    }

    /// Checks the deadline.
    ///
    /// Returns `Ok(true)` if the deadline has passed and partial results are requested. The
    /// caller must then stop and return what it has produced so far. Returns
    /// [QueryEvaluationError::Timeout] if the deadline has passed and partial results are not
    /// requested.
    pub fn should_stop(&self) -> Result<bool, QueryEvaluationError> {
        let expired = self.timed_out()
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline);
        if !expired {
            return Ok(false);
        }

        let first = !self.timed_out.swap(true, Ordering::Relaxed);
        if !self.options.partial_results_on_timeout {
            return Err(QueryEvaluationError::Timeout);
        }
        if first {
            tracing::warn!("Deadline reached, returning partial results");
        }
        Ok(true)
    }
}

impl Debug for EvaluationContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("input", &self.input.len())
            .field("active_graph", &self.active_graph)
            .field("named_graphs", &self.named_graphs)
            .field("deadline", &self.deadline)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_walk_common::error::StorageError;
    use rdf_walk_common::{TripleIter, TriplePatternMatch};
    use std::time::Duration;

    #[derive(Debug)]
    struct EmptySource;

    impl TripleSource for EmptySource {
        fn match_triples(
            &self,
            _pattern: &TriplePatternMatch,
            _active_graph: &ActiveGraph,
        ) -> Result<TripleIter<'_>, StorageError> {
            Ok(Box::new(std::iter::empty()))
        }

        fn named_graphs(&self) -> Result<Vec<NamedOrBlankNode>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn no_deadline_never_stops() {
        let context = EvaluationContext::new(Arc::new(EmptySource), QueryOptions::default());
        assert!(!context.should_stop().unwrap());
        assert!(!context.timed_out());
    }

    #[test]
    fn expired_deadline_is_an_error() {
        let context = EvaluationContext::new(
            Arc::new(EmptySource),
            QueryOptions::default().with_timeout(Duration::ZERO),
        );
        assert!(matches!(
            context.should_stop(),
            Err(QueryEvaluationError::Timeout)
        ));
        assert!(context.timed_out());
    }

    #[test]
    fn expired_deadline_with_partial_results_stops() {
        let context = EvaluationContext::new(
            Arc::new(EmptySource),
            QueryOptions::default()
                .with_timeout(Duration::ZERO)
                .with_partial_results_on_timeout(true),
        );
        let child = context.without_input();

        assert!(child.should_stop().unwrap());
        assert!(context.timed_out());
    }
}
