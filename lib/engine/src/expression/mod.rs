//! Evaluation of expressions against single solutions.

mod functions;
mod value;

pub use value::{effective_boolean_value, order_terms};

use crate::context::EvaluationContext;
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval::evaluate;
use crate::multiset::Multiset;
use rdf_walk_algebra::from_sparql;
use rdf_walk_model::{Expression, GraphPattern, Solution, Term, ThinError};
use std::cmp::Ordering;
use std::fmt::Debug;
use value::{boolean_term, value_compare, value_equals, Numeric};

/// Evaluates the expressions of filters, extensions, orderings, and aggregates.
///
/// Evaluating an expression against a solution regularly fails (e.g., because a variable is
/// unbound). Such failures are reported as [ExpressionError::Expected] and handled by the calling
/// operator. Implementations must be usable from multiple threads.
pub trait ExpressionEvaluator: Debug + Send + Sync {
    /// Evaluates `expression` against `solution`.
    fn evaluate(
        &self,
        expression: &Expression,
        solution: &Solution,
        context: &EvaluationContext,
    ) -> ExpressionResult<Term>;

    /// Evaluates `expression` and computes its effective boolean value.
    fn evaluate_boolean(
        &self,
        expression: &Expression,
        solution: &Solution,
        context: &EvaluationContext,
    ) -> ExpressionResult<bool> {
        let term = self.evaluate(expression, solution, context)?;
        Ok(effective_boolean_value(&term)?)
    }

    /// The order of two (possibly unbound) values in `ORDER BY`. Must be a total order.
    fn order(&self, lhs: Option<&Term>, rhs: Option<&Term>) -> Ordering {
        order_terms(lhs, rhs)
    }
}

/// An [ExpressionEvaluator] for the operators and a subset of the built-in functions of SPARQL.
#[derive(Debug, Default)]
pub struct SimpleExpressionEvaluator;

impl SimpleExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn numeric(
        &self,
        expression: &Expression,
        solution: &Solution,
        context: &EvaluationContext,
    ) -> ExpressionResult<Numeric> {
        let term = self.evaluate(expression, solution, context)?;
        Ok(Numeric::from_term(&term).ok_or(ThinError::default())?)
    }

    fn arithmetic(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        solution: &Solution,
        context: &EvaluationContext,
        operation: impl FnOnce(Numeric, Numeric) -> rdf_walk_model::ThinResult<Numeric>,
    ) -> ExpressionResult<Term> {
        let lhs = self.numeric(lhs, solution, context)?;
        let rhs = self.numeric(rhs, solution, context)?;
        Ok(operation(lhs, rhs)?.into_term())
    }

    fn comparison(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        solution: &Solution,
        context: &EvaluationContext,
        accept: impl FnOnce(Ordering) -> bool,
    ) -> ExpressionResult<Term> {
        let lhs = self.evaluate(lhs, solution, context)?;
        let rhs = self.evaluate(rhs, solution, context)?;
        Ok(boolean_term(accept(value_compare(&lhs, &rhs)?)))
    }

    /// `EXISTS`: evaluates the pattern restricted to `solution` and looks for a compatible
    /// solution.
    fn exists(
        &self,
        pattern: &GraphPattern,
        solution: &Solution,
        context: &EvaluationContext,
    ) -> ExpressionResult<bool> {
        let algebra = from_sparql(pattern).map_err(|error| ExpressionError::Fatal(error.into()))?;
        let inner = context.with_input(Multiset::single(solution.clone()));
        let result = evaluate(&algebra, &inner)?;
        let found = result
            .iter()
            .any(|candidate| candidate.is_compatible_with(solution));
        Ok(found)
    }
}

impl ExpressionEvaluator for SimpleExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &Expression,
        solution: &Solution,
        context: &EvaluationContext,
    ) -> ExpressionResult<Term> {
        match expression {
            Expression::NamedNode(node) => Ok(node.clone().into()),
            Expression::Literal(literal) => Ok(literal.clone().into()),
            Expression::Variable(variable) => match solution.get(variable) {
                Some(term) => Ok(term.clone()),
                None => ExpressionError::expected(),
            },
            Expression::Or(lhs, rhs) => {
                let lhs = self.evaluate_boolean(lhs, solution, context);
                if matches!(lhs, Ok(true)) {
                    return Ok(boolean_term(true));
                }
                match (lhs, self.evaluate_boolean(rhs, solution, context)?) {
                    (_, true) => Ok(boolean_term(true)),
                    (Ok(false), false) => Ok(boolean_term(false)),
                    (Err(error), false) => Err(error),
                    (Ok(true), false) => ExpressionError::expected(),
                }
            }
            Expression::And(lhs, rhs) => {
                let lhs = self.evaluate_boolean(lhs, solution, context);
                if matches!(lhs, Ok(false)) {
                    return Ok(boolean_term(false));
                }
                match (lhs, self.evaluate_boolean(rhs, solution, context)?) {
                    (_, false) => Ok(boolean_term(false)),
                    (Ok(true), true) => Ok(boolean_term(true)),
                    (Err(error), true) => Err(error),
                    (Ok(false), true) => ExpressionError::expected(),
                }
            }
            Expression::Not(inner) => Ok(boolean_term(
                !self.evaluate_boolean(inner, solution, context)?,
            )),
            Expression::Equal(lhs, rhs) => {
                let lhs = self.evaluate(lhs, solution, context)?;
                let rhs = self.evaluate(rhs, solution, context)?;
                Ok(boolean_term(value_equals(&lhs, &rhs)?))
            }
            Expression::SameTerm(lhs, rhs) => {
                let lhs = self.evaluate(lhs, solution, context)?;
                let rhs = self.evaluate(rhs, solution, context)?;
                Ok(boolean_term(lhs == rhs))
            }
            Expression::Greater(lhs, rhs) => {
                self.comparison(lhs, rhs, solution, context, Ordering::is_gt)
            }
            Expression::GreaterOrEqual(lhs, rhs) => {
                self.comparison(lhs, rhs, solution, context, Ordering::is_ge)
            }
            Expression::Less(lhs, rhs) => {
                self.comparison(lhs, rhs, solution, context, Ordering::is_lt)
            }
            Expression::LessOrEqual(lhs, rhs) => {
                self.comparison(lhs, rhs, solution, context, Ordering::is_le)
            }
            Expression::In(needle, haystack) => {
                let needle = self.evaluate(needle, solution, context)?;
                let mut failed = false;
                for candidate in haystack {
                    let equal = self
                        .evaluate(candidate, solution, context)
                        .and_then(|candidate| Ok(value_equals(&needle, &candidate)?));
                    match equal {
                        Ok(true) => return Ok(boolean_term(true)),
                        Ok(false) => {}
                        Err(ExpressionError::Expected(_)) => failed = true,
                        Err(error) => return Err(error),
                    }
                }
                if failed {
                    ExpressionError::expected()
                } else {
                    Ok(boolean_term(false))
                }
            }
            Expression::Add(lhs, rhs) => {
                self.arithmetic(lhs, rhs, solution, context, Numeric::add)
            }
            Expression::Subtract(lhs, rhs) => {
                self.arithmetic(lhs, rhs, solution, context, Numeric::subtract)
            }
            Expression::Multiply(lhs, rhs) => {
                self.arithmetic(lhs, rhs, solution, context, Numeric::multiply)
            }
            Expression::Divide(lhs, rhs) => {
                self.arithmetic(lhs, rhs, solution, context, Numeric::divide)
            }
            Expression::UnaryPlus(inner) => Ok(self.numeric(inner, solution, context)?.into_term()),
            Expression::UnaryMinus(inner) => {
                Ok(self.numeric(inner, solution, context)?.negate()?.into_term())
            }
            Expression::Exists(pattern) => {
                Ok(boolean_term(self.exists(pattern, solution, context)?))
            }
            Expression::Bound(variable) => Ok(boolean_term(solution.contains(variable))),
            Expression::If(condition, then, otherwise) => {
                if self.evaluate_boolean(condition, solution, context)? {
                    self.evaluate(then, solution, context)
                } else {
                    self.evaluate(otherwise, solution, context)
                }
            }
            Expression::Coalesce(alternatives) => {
                for alternative in alternatives {
                    match self.evaluate(alternative, solution, context) {
                        Err(ExpressionError::Expected(_)) => {}
                        result => return result,
                    }
                }
                ExpressionError::expected()
            }
            Expression::FunctionCall(function, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, solution, context))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Ok(functions::call(function, &args)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_walk_common::error::StorageError;
    use rdf_walk_common::{ActiveGraph, TripleIter, TriplePatternMatch, TripleSource};
    use rdf_walk_model::vocab::xsd;
    use rdf_walk_model::{Function, Literal, NamedOrBlankNode, Variable};
    use crate::options::QueryOptions;
    use std::sync::Arc;

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

    fn context() -> EvaluationContext {
        EvaluationContext::new(Arc::new(EmptySource), QueryOptions::default())
    }

    fn integer(value: i64) -> Expression {
        Expression::Literal(Literal::new_typed_literal(value.to_string(), xsd::INTEGER))
    }

    fn x() -> Variable {
        Variable::new_unchecked("x")
    }

    fn eval(expression: &Expression, solution: &Solution) -> Option<Term> {
        SimpleExpressionEvaluator::new()
            .evaluate(expression, solution, &context())
            .ok()
    }

    #[test]
    fn unbound_variable_is_expected_error() {
        let result =
            SimpleExpressionEvaluator::new().evaluate(&Expression::Variable(x()), &Solution::new(), &context());
        assert!(matches!(result, Err(ExpressionError::Expected(_))));
    }

    #[test]
    fn or_recovers_from_errors() {
        let expression = Expression::Or(
            Box::new(Expression::Variable(x())),
            Box::new(Expression::Equal(Box::new(integer(1)), Box::new(integer(1)))),
        );
        assert_eq!(eval(&expression, &Solution::new()), Some(boolean_term(true)));

        let expression = Expression::And(
            Box::new(Expression::Variable(x())),
            Box::new(Expression::Equal(Box::new(integer(1)), Box::new(integer(1)))),
        );
        assert_eq!(eval(&expression, &Solution::new()), None);
    }

    #[test]
    fn arithmetic_with_bound_variable() {
        let solution = Solution::new().with(
            x(),
            Literal::new_typed_literal("2", xsd::INTEGER).into(),
        );
        let expression = Expression::Multiply(
            Box::new(Expression::Add(
                Box::new(Expression::Variable(x())),
                Box::new(integer(1)),
            )),
            Box::new(integer(2)),
        );

        assert_eq!(
            eval(&expression, &solution),
            Some(Literal::new_typed_literal("6", xsd::INTEGER).into())
        );
    }

    #[test]
    fn coalesce_skips_errors() {
        let expression = Expression::Coalesce(vec![Expression::Variable(x()), integer(3)]);
        assert_eq!(
            eval(&expression, &Solution::new()),
            Some(Literal::new_typed_literal("3", xsd::INTEGER).into())
        );
    }

    #[test]
    fn in_with_error_and_no_match_fails() {
        let expression = Expression::In(
            Box::new(integer(1)),
            vec![Expression::Variable(x()), integer(2)],
        );
        assert_eq!(eval(&expression, &Solution::new()), None);

        let expression = Expression::In(
            Box::new(integer(1)),
            vec![Expression::Variable(x()), integer(1)],
        );
        assert_eq!(eval(&expression, &Solution::new()), Some(boolean_term(true)));
    }

    #[test]
    fn unsupported_function_is_expected_error() {
        let expression = Expression::FunctionCall(Function::Rand, Vec::new());
        assert_eq!(eval(&expression, &Solution::new()), None);
    }
}
