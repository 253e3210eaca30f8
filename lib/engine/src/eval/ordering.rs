use crate::context::EvaluationContext;
use crate::error::{recover, QueryEvaluationError};
use crate::multiset::Multiset;
use rdf_walk_model::{OrderExpression, Term};
use std::cmp::Ordering;

/// Sorts the solutions of `multiset` by `order`.
///
/// The sort is stable. Expressions that fail for a solution are treated like unbound values, which
/// come first in ascending order.
pub(super) fn order_by(
    multiset: Multiset,
    order: &[OrderExpression],
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let variables = multiset.variables().to_vec();
    let mut keyed = multiset
        .into_solutions()
        .into_iter()
        .map(|solution| {
            let key = order
                .iter()
                .map(|expression| {
                    let (OrderExpression::Asc(expression) | OrderExpression::Desc(expression)) =
                        expression;
                    recover(
                        context
                            .expressions()
                            .evaluate(expression, &solution, context),
                    )
                })
                .collect::<Result<Vec<Option<Term>>, _>>()?;
            Ok((key, solution))
        })
        .collect::<Result<Vec<_>, QueryEvaluationError>>()?;

    let evaluator = context.expressions();
    keyed.sort_by(|(lhs, _), (rhs, _)| {
        for ((lhs, rhs), expression) in lhs.iter().zip(rhs).zip(order) {
            let ordering = evaluator.order(lhs.as_ref(), rhs.as_ref());
            let ordering = match expression {
                OrderExpression::Asc(_) => ordering,
                OrderExpression::Desc(_) => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    let solutions = keyed.into_iter().map(|(_, solution)| solution).collect();
    Ok(Multiset::new(variables, solutions))
}
