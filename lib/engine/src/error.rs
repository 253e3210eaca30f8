use rdf_walk_algebra::AlgebraError;
use rdf_walk_common::error::StorageError;
use rdf_walk_model::{NamedNode, ThinError};
use std::convert::Infallible;

/// An error that aborts the evaluation of a query.
///
/// Errors of single expressions are not part of this type. They are handled by the operator that
/// evaluates the expression (e.g., a filter drops the solution).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error from the triple source.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The deadline of the query has passed and partial results were not requested.
    #[error("The query did not finish before its deadline")]
    Timeout,
    /// The given `SERVICE` is not supported.
    #[error("The service {0} is not supported")]
    UnsupportedService(NamedNode),
    /// The variable storing the `SERVICE` name is unbound.
    #[error("The variable encoding the service name is unbound")]
    UnboundService,
    /// The query could not be translated into an algebra tree.
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
    #[error("A feature has not yet been implemented: {0}")]
    NotImplemented(String),
    #[error("An internal error that likely indicates towards a bug in RDF Walk: {0}")]
    Internal(String),
}

impl QueryEvaluationError {
    pub fn internal<T>(cause: impl Into<String>) -> Result<T, Self> {
        Err(QueryEvaluationError::Internal(cause.into()))
    }

    /// Returns whether the error was caused by the deadline of the query.
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryEvaluationError::Timeout)
    }
}

impl From<Infallible> for QueryEvaluationError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}

/// The error of evaluating an expression against a single solution.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// An expected failure (e.g., an unbound variable or a type error). The operator that
    /// evaluates the expression decides how to continue.
    #[error(transparent)]
    Expected(#[from] ThinError),
    /// A failure that aborts the query (e.g., a storage error while evaluating `EXISTS`).
    #[error(transparent)]
    Fatal(#[from] QueryEvaluationError),
}

/// The result of evaluating an expression against a single solution.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

impl ExpressionError {
    /// Returns a result with an [ExpressionError::Expected] error.
    pub fn expected<T>() -> ExpressionResult<T> {
        Err(ExpressionError::Expected(ThinError::default()))
    }
}

/// Turns an expected failure into `None` and propagates fatal ones.
pub(crate) fn recover<T>(result: ExpressionResult<T>) -> Result<Option<T>, QueryEvaluationError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ExpressionError::Expected(_)) => Ok(None),
        Err(ExpressionError::Fatal(error)) => Err(error),
    }
}
