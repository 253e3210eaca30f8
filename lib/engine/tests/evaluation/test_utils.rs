use rdf_walk_algebra::optimizer::{create_optimizer_passes, optimize, OptimizationLevel, QueryForm};
use rdf_walk_algebra::{from_sparql, Algebra};
use rdf_walk_engine::{evaluate, EvaluationContext, Multiset, QueryOptions};
use rdf_walk_model::{GraphName, Literal, NamedNode, Quad, Query, Term};
use rdf_walk_storage::MemoryDataset;
use std::sync::Arc;

pub fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

/// Creates a dataset whose default graph contains the given `(subject, predicate, object)` edges
/// between `http://example.com/` IRIs.
pub fn dataset(edges: &[(&str, &str, &str)]) -> Arc<MemoryDataset> {
    Arc::new(
        edges
            .iter()
            .map(|(s, p, o)| Quad::new(ex(s), ex(p), ex(o), GraphName::DefaultGraph))
            .collect(),
    )
}

/// A small social graph. Carol has no age.
pub fn people() -> Arc<MemoryDataset> {
    let quad = |s: &str, p: &str, o: Term| Quad::new(ex(s), ex(p), o, GraphName::DefaultGraph);
    Arc::new(
        [
            quad("alice", "name", Literal::new_simple_literal("Alice").into()),
            quad("bob", "name", Literal::new_simple_literal("Bob").into()),
            quad("carol", "name", Literal::new_simple_literal("Carol").into()),
            quad("alice", "age", Literal::from(30).into()),
            quad("bob", "age", Literal::from(25).into()),
            quad("alice", "knows", ex("bob").into()),
            quad("bob", "knows", ex("carol").into()),
        ]
        .into_iter()
        .collect(),
    )
}

pub fn context(dataset: Arc<MemoryDataset>) -> EvaluationContext {
    EvaluationContext::new(dataset, QueryOptions::default())
}

/// Parses the pattern of a `SELECT` or `ASK` query.
pub fn parse(query: &str) -> Algebra {
    parse_with_form(query).0
}

fn parse_with_form(query: &str) -> (Algebra, QueryForm) {
    let query = Query::parse(&format!("PREFIX ex: <http://example.com/>\n{query}"), None)
        .expect("The test query must be valid");
    let (pattern, form) = match &query {
        Query::Select { pattern, .. } => (pattern, QueryForm::Select),
        Query::Ask { pattern, .. } => (pattern, QueryForm::Ask),
        _ => panic!("Only SELECT and ASK queries are supported in tests"),
    };
    let tree = from_sparql(pattern).expect("The test query must be supported");
    (tree, form)
}

/// Parses `query` and applies the optimizer passes of `level`.
pub fn optimized(query: &str, level: OptimizationLevel) -> Algebra {
    let (tree, form) = parse_with_form(query);
    let passes = create_optimizer_passes(level, form)
        .into_iter()
        .map(|pass| pass.create())
        .collect::<Vec<_>>();
    optimize(&tree, &passes)
}

/// Evaluates `query` against `dataset` without optimizations.
pub fn run(dataset: &Arc<MemoryDataset>, query: &str) -> Multiset {
    evaluate(&parse(query), &context(Arc::clone(dataset)))
        .expect("The evaluation must succeed")
        .without_temporary_variables()
}

/// Evaluates `query` against `dataset` after applying the optimizer passes of `level`.
pub fn run_optimized(dataset: &Arc<MemoryDataset>, query: &str, level: OptimizationLevel) -> Multiset {
    evaluate(&optimized(query, level), &context(Arc::clone(dataset)))
        .expect("The evaluation must succeed")
        .without_temporary_variables()
}

/// Returns the value of `variable` in each solution, in order. Unbound values are rendered as
/// `-`.
pub fn column(multiset: &Multiset, variable: &str) -> Vec<String> {
    let variable = rdf_walk_model::Variable::new_unchecked(variable);
    multiset
        .iter()
        .map(|solution| {
            solution
                .get(&variable)
                .map_or_else(|| "-".to_owned(), |term| shorten(&term.to_string()))
        })
        .collect()
}

fn shorten(text: &str) -> String {
    text.replace("http://example.com/", "ex:")
        .replace("http://www.w3.org/2001/XMLSchema#", "xsd:")
}

/// Renders the solutions in a stable order.
pub fn render(multiset: &Multiset) -> String {
    let mut lines = multiset
        .iter()
        .map(|solution| shorten(&solution.to_string()))
        .collect::<Vec<_>>();
    lines.sort();
    lines.join("\n")
}
