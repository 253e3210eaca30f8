use rdf_walk_algebra::optimizer::{create_optimizer_passes, optimize, OptimizationLevel, QueryForm};
use rdf_walk_algebra::{from_sparql, Algebra};
use rdf_walk_model::Query;

/// Parses `query` and returns its pattern together with its form.
pub fn parse(query: &str) -> (Algebra, QueryForm) {
    let query = Query::parse(query, None).expect("The test query must be valid");
    let (pattern, form) = match &query {
        Query::Select { pattern, .. } => (pattern, QueryForm::Select),
        Query::Ask { pattern, .. } => (pattern, QueryForm::Ask),
        _ => panic!("Only SELECT and ASK queries are supported in tests"),
    };
    (
        from_sparql(pattern).expect("The test query must be supported"),
        form,
    )
}

/// Parses and optimizes `query` with the given `level`.
pub fn optimized(query: &str, level: OptimizationLevel) -> Algebra {
    let (tree, form) = parse(query);
    let passes = create_optimizer_passes(level, form)
        .into_iter()
        .map(|kind| kind.create())
        .collect::<Vec<_>>();
    optimize(&tree, &passes)
}
