mod error;
mod solution;
mod variable;

pub use error::*;
pub use solution::Solution;
pub use variable::*;

// Re-export the oxrdf data model.
pub use oxrdf::vocab;
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, Literal, LiteralRef, NamedNode,
    NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, Subject, SubjectRef, Term,
    TermRef, Triple, TripleRef, Variable, VariableRef,
};

// Re-export the numeric data types used by the expression evaluator.
pub use oxsdatatypes::{Boolean, Decimal, Double, Float, Integer};

// Re-export the query-side model of spargebra.
pub use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, Function, GraphPattern,
    OrderExpression, PropertyPathExpression, QueryDataset,
};
pub use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
pub use spargebra::{Query, SparqlSyntaxError};
