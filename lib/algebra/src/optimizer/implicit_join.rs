use crate::optimizer::OptimizerPass;
use crate::rewriting::VariableSubstitution;
use crate::tree::Transformed;
use crate::variables::expression_variables;
use crate::Algebra;
use rdf_walk_model::{is_temporary_variable, Expression, OrderExpression, Variable};

/// Replaces a filter that tests two variables for equality with a join on a single variable.
///
/// ```text
/// Filter: sameTerm(?a, ?b)
///   Join
///     Bgp: ?x <p> ?a
///     Bgp: ?y <q> ?b
/// ```
///
/// becomes
///
/// ```text
/// Extend: ?b := ?a
///   Join
///     Bgp: ?x <p> ?a
///     Bgp: ?y <q> ?a
/// ```
///
/// The rewrite requires that
/// - both variables are bound in every solution below the filter,
/// - for `=`, one of them is never bound to a literal (two literals can be equal without being
///   the same term),
/// - renaming `?b` to `?a` below the filter cannot change any intermediate result that is not
///   removed by the filter anyway.
///
/// The last condition holds if every operator below the filter that observes `?a` or `?b`
/// observes both of them as bound. Operators that only combine solutions by compatibility (joins,
/// unions, basic graph patterns) are fine. Expressions, optional and negated sides, and
/// duplicate elimination need both variables bound in their input. Nested projections, groups,
/// slices, inline data, services, and closures are never renamed.
#[derive(Debug, Default)]
pub struct ImplicitJoinPass;

impl ImplicitJoinPass {
    /// Creates an [ImplicitJoinPass].
    pub fn new() -> Self {
        Self
    }
}

impl OptimizerPass for ImplicitJoinPass {
    fn name(&self) -> &str {
        "implicit-join"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        tree.transform_up(&mut |node| match node {
            Algebra::Filter { inner, expression } => match rewrite_filter(&inner, &expression) {
                Some(rewritten) => Transformed::yes(rewritten),
                None => Transformed::no(Algebra::Filter { inner, expression }),
            },
            node => Transformed::no(node),
        })
    }
}

fn rewrite_filter(inner: &Algebra, expression: &Expression) -> Option<Algebra> {
    let (lhs, rhs, same_term) = match expression {
        Expression::SameTerm(lhs, rhs) => (lhs, rhs, true),
        Expression::Equal(lhs, rhs) => (lhs, rhs, false),
        _ => return None,
    };
    let (Expression::Variable(a), Expression::Variable(b)) = (lhs.as_ref(), rhs.as_ref()) else {
        return None;
    };
    if a == b || is_temporary_variable(a) || is_temporary_variable(b) {
        return None;
    }

    let fixed = inner.fixed_variables();
    if !fixed.contains(a) || !fixed.contains(b) {
        return None;
    }
    if !same_term {
        let non_literal = inner.non_literal_variables();
        if !non_literal.contains(a) && !non_literal.contains(b) {
            return None;
        }
    }

    [(a, b), (b, a)]
        .into_iter()
        .find_map(|(keep, replace)| replace_variable(inner, keep, replace))
}

fn replace_variable(inner: &Algebra, keep: &Variable, replace: &Variable) -> Option<Algebra> {
    if !is_safe_to_rename(inner, keep, replace) {
        return None;
    }
    let renamed = VariableSubstitution::new(replace.clone(), keep.clone()).apply(inner)?;
    Some(Algebra::Extend {
        inner: Box::new(renamed),
        variable: replace.clone(),
        expression: Expression::Variable(keep.clone()),
    })
}

/// Checks that renaming `b` to `a` in `tree` only changes solutions in which `a` and `b` are bound
/// to different terms.
fn is_safe_to_rename(tree: &Algebra, a: &Variable, b: &Variable) -> bool {
    let mentions = |node: &Algebra| node.mentions_variable(a) || node.mentions_variable(b);
    if !mentions(tree) {
        return true;
    }
    let both_fixed = |node: &Algebra| {
        let fixed = node.fixed_variables();
        fixed.contains(a) && fixed.contains(b)
    };
    let expression_is_safe = |expression: &Expression, input: &Algebra| {
        let variables = expression_variables(expression);
        !(variables.contains(a) || variables.contains(b)) || both_fixed(input)
    };

    match tree {
        Algebra::Bgp { .. }
        | Algebra::AskBgp { .. }
        | Algebra::LazyBgp { .. }
        | Algebra::ZeroLengthPath { .. }
        | Algebra::NegatedPropertySet { .. } => true,
        Algebra::Path { path, .. } => !path.has_variable_cardinality(),
        Algebra::Join { left, right }
        | Algebra::ParallelJoin { left, right }
        | Algebra::Union { left, right }
        | Algebra::AskUnion { left, right }
        | Algebra::LazyUnion { left, right, .. } => {
            is_safe_to_rename(left, a, b) && is_safe_to_rename(right, a, b)
        }
        Algebra::FilteredProduct {
            left,
            right,
            expression,
        } => {
            is_safe_to_rename(left, a, b)
                && is_safe_to_rename(right, a, b)
                && expression_is_safe(expression, tree)
        }
        Algebra::LeftJoin {
            left,
            right,
            expression,
        } => {
            is_safe_to_rename(left, a, b)
                && is_safe_to_rename(right, a, b)
                && (!mentions(right) || both_fixed(left))
                && expression
                    .as_ref()
                    .map_or(true, |e| expression_is_safe(e, left))
        }
        Algebra::Minus { left, right } => {
            is_safe_to_rename(left, a, b)
                && is_safe_to_rename(right, a, b)
                && (!mentions(right) || both_fixed(left))
        }
        Algebra::Filter { inner, expression } => {
            is_safe_to_rename(inner, a, b) && expression_is_safe(expression, inner)
        }
        Algebra::Extend {
            inner,
            variable,
            expression,
        } => {
            variable != a
                && variable != b
                && is_safe_to_rename(inner, a, b)
                && expression_is_safe(expression, inner)
        }
        Algebra::OrderBy { inner, expression } => {
            is_safe_to_rename(inner, a, b)
                && expression.iter().all(|e| match e {
                    OrderExpression::Asc(e) | OrderExpression::Desc(e) => {
                        expression_is_safe(e, inner)
                    }
                })
        }
        Algebra::Distinct { inner } | Algebra::Reduced { inner } => {
            is_safe_to_rename(inner, a, b) && both_fixed(inner)
        }
        Algebra::Graph { inner, .. } => is_safe_to_rename(inner, a, b),
        Algebra::ZeroOrOnePath { .. }
        | Algebra::ZeroOrMorePath { .. }
        | Algebra::OneOrMorePath { .. }
        | Algebra::Group { .. }
        | Algebra::Slice { .. }
        | Algebra::Project { .. }
        | Algebra::Values { .. }
        | Algebra::Service { .. } => false,
    }
}
