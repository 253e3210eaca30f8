//! The algebra of RDF Walk: operator trees, property paths, and the optimizer.
//!
//! Queries are represented as immutable [Algebra] trees. Trees are created from parsed queries
//! with [from_sparql], rewritten by [optimizer] passes, and can be written back into a query with
//! [to_query].

mod algebra;
mod error;
pub mod optimizer;
pub mod paths;
mod rewriting;
mod tree;
mod variables;

pub use algebra::Algebra;
pub use error::AlgebraError;
pub use rewriting::{from_sparql, to_query, VariableSubstitution};
pub use tree::Transformed;
pub use variables::{
    expression_variables, is_movable_expression, pattern_variables, term_pattern_variable,
};
