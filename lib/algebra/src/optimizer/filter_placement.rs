use crate::optimizer::OptimizerPass;
use crate::tree::Transformed;
use crate::variables::{expression_variables, is_movable_expression, pattern_variables};
use crate::Algebra;
use rdf_walk_model::{Expression, NamedNodePattern, Variable};
use rustc_hash::FxHashSet;

/// Moves filters down the tree, as close as possible to the patterns that bind their variables.
///
/// A filter is moved below a node only if every solution that reaches the filter agrees with the
/// solution below the node on the filter's variables. For joins, this requires the variables to
/// be bound in all solutions of the child. Basic graph patterns are split after the shortest
/// prefix that binds all variables of the filter:
///
/// ```text
/// Filter: ?a = ?b
///   Bgp: ?x <p> ?a . ?x <q> ?b . ?x <r> ?c
/// ```
///
/// becomes
///
/// ```text
/// Join
///   Filter: ?a = ?b
///     Bgp: ?x <p> ?a . ?x <q> ?b
///   Bgp: ?x <r> ?c
/// ```
///
/// Filters with `EXISTS` or non-deterministic functions are never moved.
#[derive(Debug, Default)]
pub struct FilterPlacementPass;

impl FilterPlacementPass {
    /// Creates a [FilterPlacementPass].
    pub fn new() -> Self {
        Self
    }
}

impl OptimizerPass for FilterPlacementPass {
    fn name(&self) -> &str {
        "filter-placement"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        tree.transform_up(&mut |node| match node {
            Algebra::Filter { inner, expression } if is_movable_expression(&expression) => {
                let variables = expression_variables(&expression)
                    .into_iter()
                    .collect::<FxHashSet<_>>();
                place_filter(expression, &variables, *inner)
            }
            node => Transformed::no(node),
        })
    }
}

/// Returns a tree that is equivalent to `Filter(inner, expression)`.
fn place_filter(
    expression: Expression,
    variables: &FxHashSet<Variable>,
    inner: Algebra,
) -> Transformed<Algebra> {
    match inner {
        Algebra::Bgp { patterns } if patterns.len() > 1 => {
            let mut bound = FxHashSet::default();
            let mut split = patterns.len();
            for (index, pattern) in patterns.iter().enumerate() {
                bound.extend(pattern_variables(pattern).cloned());
                if variables.iter().all(|v| bound.contains(v)) {
                    split = index + 1;
                    break;
                }
            }

            if split == patterns.len() {
                return Transformed::no(Algebra::filter(Algebra::Bgp { patterns }, expression));
            }

            let mut prefix = patterns;
            let suffix = prefix.split_off(split);
            Transformed::yes(Algebra::join(
                Algebra::filter(Algebra::Bgp { patterns: prefix }, expression),
                Algebra::Bgp { patterns: suffix },
            ))
        }
        Algebra::Join { left, right } => {
            if is_subset(variables, &left.fixed_variables()) {
                let left = place_filter(expression, variables, *left);
                Transformed::yes(Algebra::Join {
                    left: Box::new(left.data),
                    right,
                })
            } else if is_subset(variables, &right.fixed_variables()) {
                let right = place_filter(expression, variables, *right);
                Transformed::yes(Algebra::Join {
                    left,
                    right: Box::new(right.data),
                })
            } else {
                Transformed::no(Algebra::filter(Algebra::Join { left, right }, expression))
            }
        }
        Algebra::LeftJoin {
            left,
            right,
            expression: optional_expression,
        } if is_subset(variables, &left.fixed_variables()) => {
            let left = place_filter(expression, variables, *left);
            Transformed::yes(Algebra::LeftJoin {
                left: Box::new(left.data),
                right,
                expression: optional_expression,
            })
        }
        Algebra::Union { left, right } => {
            let left = place_filter(expression.clone(), variables, *left);
            let right = place_filter(expression, variables, *right);
            Transformed::yes(Algebra::union(left.data, right.data))
        }
        Algebra::Extend {
            inner,
            variable,
            expression: extension,
        } if !variables.contains(&variable) => {
            let inner = place_filter(expression, variables, *inner);
            Transformed::yes(Algebra::Extend {
                inner: Box::new(inner.data),
                variable,
                expression: extension,
            })
        }
        Algebra::Project {
            inner,
            variables: projection,
        } if variables.iter().all(|v| projection.contains(v)) => {
            let inner = place_filter(expression, variables, *inner);
            Transformed::yes(Algebra::project(inner.data, projection))
        }
        Algebra::Distinct { inner } => {
            let inner = place_filter(expression, variables, *inner);
            Transformed::yes(Algebra::Distinct {
                inner: Box::new(inner.data),
            })
        }
        Algebra::OrderBy {
            inner,
            expression: order,
        } => {
            let inner = place_filter(expression, variables, *inner);
            Transformed::yes(Algebra::OrderBy {
                inner: Box::new(inner.data),
                expression: order,
            })
        }
        Algebra::Graph { name, inner }
            if !matches!(&name, NamedNodePattern::Variable(v) if variables.contains(v)) =>
        {
            let inner = place_filter(expression, variables, *inner);
            Transformed::yes(Algebra::Graph {
                name,
                inner: Box::new(inner.data),
            })
        }
        Algebra::Filter {
            inner,
            expression: other,
        } if is_movable_expression(&other) => {
            let inner = place_filter(expression, variables, *inner);
            Transformed {
                data: Algebra::filter(inner.data, other),
                transformed: inner.transformed,
            }
        }
        inner => Transformed::no(Algebra::filter(inner, expression)),
    }
}

fn is_subset(variables: &FxHashSet<Variable>, fixed: &FxHashSet<Variable>) -> bool {
    variables.iter().all(|v| fixed.contains(v))
}
