use rdf_walk_model::Term;

/// An error raised while translating between query patterns and [Algebra](crate::Algebra)
/// trees.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AlgebraError {
    /// The query pattern uses a construct that the engine does not support.
    #[error("The pattern is not supported: {0}")]
    UnsupportedPattern(String),
    /// The algebra tree contains a term that cannot be written in a query (e.g., a concrete blank
    /// node).
    #[error("The term {0} cannot be expressed in a query")]
    NotExpressible(Term),
}
