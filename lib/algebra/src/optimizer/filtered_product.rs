use crate::optimizer::OptimizerPass;
use crate::tree::Transformed;
use crate::variables::{expression_variables, pattern_variables};
use crate::Algebra;
use rdf_walk_model::{Expression, TriplePattern, Variable};
use rustc_hash::FxHashSet;

/// Replaces a filter over a cross product with a [Algebra::FilteredProduct].
///
/// A join of two children that cannot share a variable is a cross product. If the filter above it
/// depends on both children, it cannot be moved into one of them. The filtered product evaluates
/// the filter for every pair while the pairs are generated instead of materializing the product.
///
/// Basic graph patterns whose triple patterns form more than one connected component are cross
/// products as well. They are split into the first component and the rest.
#[derive(Debug, Default)]
pub struct FilteredProductPass;

impl FilteredProductPass {
    /// Creates a [FilteredProductPass].
    pub fn new() -> Self {
        Self
    }
}

impl OptimizerPass for FilteredProductPass {
    fn name(&self) -> &str {
        "filtered-product"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        tree.transform_up(&mut |node| match node {
            Algebra::Filter { inner, expression } => match *inner {
                Algebra::Join { left, right } if is_product(&left, &right, &expression) => {
                    Transformed::yes(Algebra::FilteredProduct {
                        left,
                        right,
                        expression,
                    })
                }
                Algebra::Bgp { patterns } => match split_components(&patterns) {
                    Some((left, right)) if is_product(&left, &right, &expression) => {
                        Transformed::yes(Algebra::FilteredProduct {
                            left: Box::new(left),
                            right: Box::new(right),
                            expression,
                        })
                    }
                    _ => Transformed::no(Algebra::filter(Algebra::Bgp { patterns }, expression)),
                },
                inner => Transformed::no(Algebra::filter(inner, expression)),
            },
            node => Transformed::no(node),
        })
    }
}

/// The children share no variable and the filter depends on both of them.
fn is_product(left: &Algebra, right: &Algebra, expression: &Expression) -> bool {
    let left_variables = left.in_scope_variables();
    let right_variables = right.in_scope_variables();
    if left_variables.iter().any(|v| right_variables.contains(v)) {
        return false;
    }

    let variables = expression_variables(expression);
    let covered_by = |fixed: FxHashSet<Variable>| variables.iter().all(|v| fixed.contains(v));
    !covered_by(left.fixed_variables()) && !covered_by(right.fixed_variables())
}

/// Splits the patterns into the connected component of the first pattern and the rest.
fn split_components(patterns: &[TriplePattern]) -> Option<(Algebra, Algebra)> {
    let first = patterns.first()?;
    let mut component = pattern_variables(first).cloned().collect::<FxHashSet<_>>();
    let mut in_component = vec![false; patterns.len()];
    in_component[0] = true;

    let mut changed = true;
    while changed {
        changed = false;
        for (index, pattern) in patterns.iter().enumerate() {
            if !in_component[index] && pattern_variables(pattern).any(|v| component.contains(v)) {
                in_component[index] = true;
                component.extend(pattern_variables(pattern).cloned());
                changed = true;
            }
        }
    }

    let (left, right): (Vec<_>, Vec<_>) = patterns
        .iter()
        .zip(&in_component)
        .partition(|(_, in_component)| **in_component);
    if right.is_empty() {
        return None;
    }

    let collect = |patterns: Vec<(&TriplePattern, &bool)>| Algebra::Bgp {
        patterns: patterns.into_iter().map(|(p, _)| p.clone()).collect(),
    };
    Some((collect(left), collect(right)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_walk_model::NamedNode;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn pattern(s: &str, o: &str) -> TriplePattern {
        TriplePattern {
            subject: var(s).into(),
            predicate: NamedNode::new_unchecked("http://example.com/p").into(),
            object: var(o).into(),
        }
    }

    fn less(a: &str, b: &str) -> Expression {
        Expression::Less(
            Box::new(Expression::Variable(var(a))),
            Box::new(Expression::Variable(var(b))),
        )
    }

    #[test]
    fn disconnected_bgp_becomes_filtered_product() {
        let tree = Algebra::filter(
            Algebra::Bgp {
                patterns: vec![pattern("a", "x"), pattern("b", "y"), pattern("a", "z")],
            },
            less("x", "y"),
        );

        let result = FilteredProductPass::new().rewrite(tree);

        assert_eq!(
            result.data,
            Algebra::FilteredProduct {
                left: Box::new(Algebra::Bgp {
                    patterns: vec![pattern("a", "x"), pattern("a", "z")]
                }),
                right: Box::new(Algebra::Bgp {
                    patterns: vec![pattern("b", "y")]
                }),
                expression: less("x", "y"),
            }
        );
    }

    #[test]
    fn filter_on_one_side_is_kept() {
        let tree = Algebra::filter(
            Algebra::join(
                Algebra::Bgp {
                    patterns: vec![pattern("a", "x")],
                },
                Algebra::Bgp {
                    patterns: vec![pattern("b", "y")],
                },
            ),
            less("a", "x"),
        );

        let result = FilteredProductPass::new().rewrite(tree.clone());

        assert!(!result.transformed);
        assert_eq!(result.data, tree);
    }

    #[test]
    fn connected_join_is_kept() {
        let tree = Algebra::filter(
            Algebra::join(
                Algebra::Bgp {
                    patterns: vec![pattern("a", "x")],
                },
                Algebra::Bgp {
                    patterns: vec![pattern("x", "y")],
                },
            ),
            less("a", "y"),
        );

        let result = FilteredProductPass::new().rewrite(tree.clone());

        assert_eq!(result.data, tree);
    }
}
