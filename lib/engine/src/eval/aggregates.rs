use crate::context::EvaluationContext;
use crate::error::{recover, QueryEvaluationError};
use crate::multiset::Multiset;
use rdf_walk_model::vocab::xsd;
use rdf_walk_model::{
    AggregateExpression, AggregateFunction, Expression, Literal, Solution, Term, Variable,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;

/// Groups the solutions of `multiset` by the values of `variables` and computes the aggregates of
/// each group.
///
/// Without grouping variables, all solutions form a single group, even if there are none.
/// Aggregates that cannot be computed leave their variable unbound.
pub(super) fn group(
    multiset: &Multiset,
    variables: &[Variable],
    aggregates: &[(Variable, AggregateExpression)],
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let mut groups: Vec<(Vec<Option<Term>>, Vec<&Solution>)> = Vec::new();
    let mut positions: FxHashMap<Vec<Option<Term>>, usize> = FxHashMap::default();
    for solution in multiset.iter() {
        let key = variables
            .iter()
            .map(|variable| solution.get(variable).cloned())
            .collect::<Vec<_>>();
        let position = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(solution);
    }
    if groups.is_empty() && variables.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }

    let mut solutions = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        if context.should_stop()? {
            break;
        }
        let mut bindings = variables
            .iter()
            .zip(key)
            .filter_map(|(variable, term)| Some((variable.clone(), term?)))
            .collect::<Vec<_>>();
        for (variable, aggregate) in aggregates {
            if let Some(value) = aggregate_group(aggregate, &members, context)? {
                bindings.push((variable.clone(), value));
            }
        }
        solutions.push(Solution::from_iter(bindings));
    }

    let declared = variables
        .iter()
        .chain(aggregates.iter().map(|(variable, _)| variable))
        .cloned()
        .collect::<Vec<_>>();
    Ok(Multiset::new(declared, solutions))
}

fn aggregate_group(
    aggregate: &AggregateExpression,
    members: &[&Solution],
    context: &EvaluationContext,
) -> Result<Option<Term>, QueryEvaluationError> {
    let (function, expression, distinct) = match aggregate {
        AggregateExpression::CountSolutions { distinct } => {
            let count = if *distinct {
                members
                    .iter()
                    .map(|solution| solution.without_temporary_variables())
                    .collect::<FxHashSet<_>>()
                    .len()
            } else {
                members.len()
            };
            return Ok(Some(integer(count)));
        }
        AggregateExpression::FunctionCall {
            name,
            expr,
            distinct,
        } => (name, expr, *distinct),
    };

    let mut values = Vec::with_capacity(members.len());
    for solution in members {
        values.push(recover(
            context.expressions().evaluate(expression, solution, context),
        )?);
    }
    if distinct {
        let mut seen = FxHashSet::default();
        values.retain(|value| seen.insert(value.clone()));
    }

    Ok(match function {
        AggregateFunction::Count => Some(integer(values.iter().flatten().count())),
        AggregateFunction::Sample => values.into_iter().flatten().next(),
        AggregateFunction::Sum => sum(values, context)?,
        AggregateFunction::Avg => {
            let count = values.len();
            match sum(values, context)? {
                Some(total) if count > 0 => arithmetic(
                    Expression::Divide,
                    total,
                    integer(count),
                    context,
                )?,
                Some(total) => Some(total),
                None => None,
            }
        }
        AggregateFunction::Min => extremum(values, Ordering::Less, context),
        AggregateFunction::Max => extremum(values, Ordering::Greater, context),
        AggregateFunction::GroupConcat { separator } => {
            group_concat(values, separator.as_deref().unwrap_or(" "))
        }
        #[allow(unreachable_patterns)]
        _ => None,
    })
}

/// Sums the values with the `+` operator of the expression evaluator. Any failure makes the sum
/// fail.
fn sum(
    values: Vec<Option<Term>>,
    context: &EvaluationContext,
) -> Result<Option<Term>, QueryEvaluationError> {
    let mut total = integer(0);
    for value in values {
        let Some(value) = value else {
            return Ok(None);
        };
        match arithmetic(Expression::Add, total, value, context)? {
            Some(next) => total = next,
            None => return Ok(None),
        }
    }
    Ok(Some(total))
}

fn arithmetic(
    operator: fn(Box<Expression>, Box<Expression>) -> Expression,
    lhs: Term,
    rhs: Term,
    context: &EvaluationContext,
) -> Result<Option<Term>, QueryEvaluationError> {
    let (Some(lhs), Some(rhs)) = (constant(lhs), constant(rhs)) else {
        return Ok(None);
    };
    let expression = operator(Box::new(lhs), Box::new(rhs));
    recover(
        context
            .expressions()
            .evaluate(&expression, &Solution::new(), context),
    )
}

fn constant(term: Term) -> Option<Expression> {
    match term {
        Term::NamedNode(node) => Some(Expression::NamedNode(node)),
        Term::Literal(literal) => Some(Expression::Literal(literal)),
        _ => None,
    }
}

/// The smallest (`Ordering::Less`) or largest (`Ordering::Greater`) value in `ORDER BY` order.
fn extremum(
    values: Vec<Option<Term>>,
    wanted: Ordering,
    context: &EvaluationContext,
) -> Option<Term> {
    let evaluator = context.expressions();
    let mut values = values.into_iter();
    let mut best = values.next()??;
    for value in values {
        let value = value?;
        if evaluator.order(Some(&value), Some(&best)) == wanted {
            best = value;
        }
    }
    Some(best)
}

fn group_concat(values: Vec<Option<Term>>, separator: &str) -> Option<Term> {
    let parts = values
        .into_iter()
        .map(|value| match value? {
            Term::Literal(literal) => Some(literal.value().to_owned()),
            Term::NamedNode(node) => Some(node.into_string()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Literal::new_simple_literal(parts.join(separator)).into())
}

fn integer(value: usize) -> Term {
    Literal::new_typed_literal(value.to_string(), xsd::INTEGER).into()
}
