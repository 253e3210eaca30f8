//! The entry point of the crate: an in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset)
//! that can be queried with SPARQL.

use crate::error::QueryError;
use crate::results::{QueryResults, QuerySolutions};
use rdf_walk_algebra::optimizer::{optimize, OptimizerPassKind, QueryForm};
use rdf_walk_algebra::{from_sparql, Algebra};
use rdf_walk_common::ActiveGraph;
use rdf_walk_engine::{evaluate_query, EvaluationContext, QueryOptions};
use rdf_walk_model::{
    GraphName, GraphPattern, NamedOrBlankNode, Quad, Query, QueryDataset, Variable,
};
use rdf_walk_storage::MemoryDataset;
use std::sync::{Arc, PoisonError, RwLock};

/// An in-memory RDF dataset.
///
/// Queries are evaluated against a snapshot of the dataset that is taken when the query starts.
/// Insertions that happen during an evaluation are not visible to it.
///
/// ```
/// use rdf_walk::model::{GraphName, NamedNode, Quad};
/// use rdf_walk::{QueryOptions, QueryResults, Store};
///
/// let store = Store::new();
/// let ex = NamedNode::new("http://example.com")?;
/// store.insert(Quad::new(ex.clone(), ex.clone(), ex.clone(), GraphName::DefaultGraph));
///
/// let results = store.query("ASK { ?s ?p ?o }", &QueryOptions::default())?;
/// assert_eq!(results, QueryResults::Boolean { value: true, partial: false });
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default)]
pub struct Store {
    dataset: RwLock<Arc<MemoryDataset>>,
}

impl Store {
    /// Creates an empty [Store].
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a quad. Returns `false` if the quad was already part of the store.
    pub fn insert(&self, quad: Quad) -> bool {
        self.with_dataset_mut(|dataset| dataset.insert(quad))
    }

    /// Inserts all `quads` and returns the number of new quads.
    pub fn extend(&self, quads: impl IntoIterator<Item = Quad>) -> usize {
        self.with_dataset_mut(|dataset| dataset.extend(quads))
    }

    /// Returns the number of quads in the store.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Executes a SPARQL `SELECT` or `ASK` query.
    ///
    /// `FROM` clauses replace the default graph by the union of the given graphs. `FROM NAMED`
    /// clauses restrict the graphs visible to `GRAPH` patterns.
    pub fn query(&self, query: &str, options: &QueryOptions) -> Result<QueryResults, QueryError> {
        let query = Query::parse(query, None)?;
        let prepared = PreparedQuery::try_new(&query, options)?;

        let mut context = EvaluationContext::new(self.snapshot(), options.clone());
        if let Some(dataset) = prepared.dataset {
            context = with_dataset(context, dataset);
        }

        let result = evaluate_query(&prepared.plan, &context)?.without_temporary_variables();
        let partial = context.timed_out();
        Ok(match prepared.form {
            QueryForm::Select => QueryResults::Solutions(QuerySolutions::new(
                prepared.variables,
                result.into_solutions(),
                partial,
            )),
            QueryForm::Ask => QueryResults::Boolean {
                value: !result.is_empty(),
                partial,
            },
        })
    }

    /// Returns the optimized algebra tree of a query without evaluating it.
    ///
    /// ```
    /// use rdf_walk::{QueryOptions, Store};
    ///
    /// let plan = Store::new().explain(
    ///     "SELECT ?s WHERE { ?s <http://example.com/p> ?o } LIMIT 1",
    ///     &QueryOptions::default(),
    /// )?;
    /// assert_eq!(plan.name(), "Slice");
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn explain(&self, query: &str, options: &QueryOptions) -> Result<Algebra, QueryError> {
        let query = Query::parse(query, None)?;
        Ok(PreparedQuery::try_new(&query, options)?.plan)
    }

    fn snapshot(&self) -> Arc<MemoryDataset> {
        let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&dataset)
    }

    /// Applies `f` to a private copy of the dataset if a query still uses the current snapshot.
    fn with_dataset_mut<T>(&self, f: impl FnOnce(&mut MemoryDataset) -> T) -> T {
        let mut dataset = self.dataset.write().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut dataset))
    }
}

/// A parsed and optimized query.
struct PreparedQuery<'query> {
    form: QueryForm,
    plan: Algebra,
    variables: Vec<Variable>,
    dataset: Option<&'query QueryDataset>,
}

impl<'query> PreparedQuery<'query> {
    fn try_new(query: &'query Query, options: &QueryOptions) -> Result<Self, QueryError> {
        let (form, pattern, dataset) = match query {
            Query::Select {
                pattern, dataset, ..
            } => (QueryForm::Select, pattern, dataset),
            Query::Ask {
                pattern, dataset, ..
            } => (QueryForm::Ask, pattern, dataset),
            Query::Construct { .. } => return Err(QueryError::UnsupportedQueryForm("CONSTRUCT")),
            Query::Describe { .. } => return Err(QueryError::UnsupportedQueryForm("DESCRIBE")),
        };

        let tree = from_sparql(pattern)?;
        let passes = options
            .optimizer_passes(form)
            .into_iter()
            .map(OptimizerPassKind::create)
            .collect::<Vec<_>>();
        let plan = optimize(&tree, &passes);
        tracing::debug!(?form, passes = passes.len(), "Prepared query");

        Ok(Self {
            form,
            plan,
            variables: projected_variables(pattern),
            dataset: dataset.as_ref(),
        })
    }
}

fn with_dataset(context: EvaluationContext, dataset: &QueryDataset) -> EvaluationContext {
    let default_graph = dataset
        .default
        .iter()
        .cloned()
        .map(GraphName::NamedNode)
        .collect();
    let context = context.with_active_graph(ActiveGraph::Union(default_graph));
    match &dataset.named {
        Some(named) => context.with_named_graphs(
            named
                .iter()
                .cloned()
                .map(NamedOrBlankNode::NamedNode)
                .collect(),
        ),
        None => context,
    }
}

/// The variables of the outermost projection of a query pattern.
fn projected_variables(pattern: &GraphPattern) -> Vec<Variable> {
    match pattern {
        GraphPattern::Project { variables, .. } => variables.clone(),
        GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::OrderBy { inner, .. } => projected_variables(inner),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_walk_model::NamedNode;

    fn quad(s: &str, o: &str) -> Quad {
        let ex = |name: &str| NamedNode::new_unchecked(format!("http://example.com/{name}"));
        Quad::new(ex(s), ex("p"), ex(o), GraphName::DefaultGraph)
    }

    #[test]
    fn running_query_keeps_its_snapshot() {
        let store = Store::new();
        store.insert(quad("a", "b"));

        let snapshot = store.snapshot();
        store.insert(quad("b", "c"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn duplicate_quads_are_ignored() {
        let store = Store::new();

        assert_eq!(store.extend([quad("a", "b"), quad("a", "b"), quad("b", "c")]), 2);
        assert!(!store.insert(quad("a", "b")));
    }

    #[test]
    fn projection_is_found_below_modifiers() {
        let query = Query::parse(
            "SELECT DISTINCT ?s WHERE { ?s ?p ?o } ORDER BY ?o LIMIT 3",
            None,
        )
        .unwrap();
        let Query::Select { pattern, .. } = query else {
            panic!("Expected a SELECT query");
        };

        assert_eq!(projected_variables(&pattern), [Variable::new_unchecked("s")]);
    }
}
