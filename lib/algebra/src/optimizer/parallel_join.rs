use crate::optimizer::OptimizerPass;
use crate::tree::Transformed;
use crate::Algebra;

/// Marks joins whose children can be evaluated independently of each other.
///
/// A join passes the result of its left child to its right child, which uses it to skip work. If
/// the children share no in-scope variable, the left result cannot restrict the right child and
/// both children only depend on the input of the join. Such joins become
/// [Algebra::ParallelJoin]. All other joins are kept.
#[derive(Debug, Default)]
pub struct ParallelJoinPass;

impl ParallelJoinPass {
    /// Creates a [ParallelJoinPass].
    pub fn new() -> Self {
        Self
    }
}

impl OptimizerPass for ParallelJoinPass {
    fn name(&self) -> &str {
        "parallel-join"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        tree.transform_up(&mut |node| match node {
            Algebra::Join { left, right } if are_independent(&left, &right) => {
                Transformed::yes(Algebra::ParallelJoin { left, right })
            }
            node => Transformed::no(node),
        })
    }
}

fn are_independent(left: &Algebra, right: &Algebra) -> bool {
    let left = left.in_scope_variables();
    right
        .in_scope_variables()
        .iter()
        .all(|variable| !left.contains(variable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PropertyPath;
    use rdf_walk_model::{NamedNode, TriplePattern, Variable};

    fn p() -> NamedNode {
        NamedNode::new_unchecked("http://example.com/p")
    }

    fn bgp() -> Algebra {
        Algebra::Bgp {
            patterns: vec![TriplePattern {
                subject: Variable::new_unchecked("s").into(),
                predicate: p().into(),
                object: Variable::new_unchecked("o").into(),
            }],
        }
    }

    #[test]
    fn joins_with_patterns_are_kept() {
        let tree = Algebra::join(bgp(), bgp());
        let result = ParallelJoinPass::new().rewrite(tree.clone());
        assert_eq!(result.data, tree);
    }

    fn closure(subject: &str, object: &str) -> Algebra {
        Algebra::OneOrMorePath {
            subject: Variable::new_unchecked(subject).into(),
            path: PropertyPath::Predicate(p()),
            object: Variable::new_unchecked(object).into(),
        }
    }

    #[test]
    fn joins_with_disjoint_children_are_marked() {
        let tree = Algebra::join(bgp(), closure("x", "y"));
        let result = ParallelJoinPass::new().rewrite(tree);
        assert_eq!(result.data.name(), "ParallelJoin");
    }

    #[test]
    fn joins_with_shared_variables_are_kept() {
        let tree = Algebra::join(bgp(), closure("o", "x"));
        let result = ParallelJoinPass::new().rewrite(tree.clone());
        assert!(!result.transformed);
        assert_eq!(result.data, tree);

        let values = Algebra::Values {
            variables: vec![Variable::new_unchecked("s")],
            bindings: vec![vec![Some(p().into())]],
        };
        let tree = Algebra::join(values, closure("s", "y"));
        assert_eq!(ParallelJoinPass::new().rewrite(tree.clone()).data, tree);
    }
}
