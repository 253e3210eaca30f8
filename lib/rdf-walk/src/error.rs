use rdf_walk_algebra::AlgebraError;
use rdf_walk_engine::QueryEvaluationError;
use rdf_walk_model::SparqlSyntaxError;

/// An error raised while running a query on a [Store](crate::Store).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryError {
    /// The query text is not valid SPARQL.
    #[error(transparent)]
    Syntax(#[from] SparqlSyntaxError),
    /// The query form is not supported. Only `SELECT` and `ASK` queries can be evaluated.
    #[error("{0} queries are not supported")]
    UnsupportedQueryForm(&'static str),
    #[error(transparent)]
    Evaluation(#[from] QueryEvaluationError),
}

impl From<AlgebraError> for QueryError {
    fn from(error: AlgebraError) -> Self {
        Self::Evaluation(error.into())
    }
}

impl QueryError {
    /// Returns whether the query was aborted because its deadline passed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Evaluation(error) if error.is_timeout())
    }
}
