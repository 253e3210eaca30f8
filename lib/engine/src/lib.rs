//! The evaluation engine of RDF Walk.
//!
//! The engine evaluates [Algebra](rdf_walk_algebra::Algebra) trees against a
//! [TripleSource](rdf_walk_common::TripleSource). The entry point is [evaluate], which maps a tree
//! and an [EvaluationContext] to a [Multiset] of solutions.

mod context;
mod error;
mod eval;
mod expression;
mod multiset;
mod options;

pub use context::EvaluationContext;
pub use error::{ExpressionError, ExpressionResult, QueryEvaluationError};
pub use eval::{evaluate, evaluate_query};
pub use expression::{
    effective_boolean_value, order_terms, ExpressionEvaluator, SimpleExpressionEvaluator,
};
pub use multiset::{Bag, Multiset};
pub use options::QueryOptions;
pub use rdf_walk_algebra::optimizer::{OptimizationLevel, OptimizerPassKind, QueryForm};
