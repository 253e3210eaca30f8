use crate::optimizer::OptimizerPass;
use crate::tree::Transformed;
use crate::Algebra;

/// Specializes the pattern of an `ASK` query such that it stops after the first solution.
///
/// Only the existence of a solution matters for an `ASK` query. Starting at the root, the pass
/// looks through operators that produce a solution if and only if their input does (projections,
/// duplicate elimination, ordering, extensions, and slices without an offset). Basic graph
/// patterns become [Algebra::AskBgp], unions become [Algebra::AskUnion], and joins of two basic
/// graph patterns are merged into a single [Algebra::AskBgp].
///
/// The result of the rewritten tree has the same existence of solutions, but not the same
/// solutions. The pass must therefore only be used for `ASK` queries.
#[derive(Debug, Default)]
pub struct AskPass;

impl AskPass {
    /// Creates an [AskPass].
    pub fn new() -> Self {
        Self
    }
}

impl OptimizerPass for AskPass {
    fn name(&self) -> &str {
        "ask"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        specialize(tree)
    }
}

fn specialize(tree: Algebra) -> Transformed<Algebra> {
    match tree {
        Algebra::Bgp { patterns } if !patterns.is_empty() => {
            Transformed::yes(Algebra::AskBgp { patterns })
        }
        Algebra::Union { left, right } => {
            let left = specialize(*left);
            let right = specialize(*right);
            Transformed::yes(Algebra::AskUnion {
                left: Box::new(left.data),
                right: Box::new(right.data),
            })
        }
        Algebra::Join { left, right } => match (*left, *right) {
            (Algebra::Bgp { patterns: mut left }, Algebra::Bgp { patterns: right }) => {
                left.extend(right);
                specialize(Algebra::Bgp { patterns: left })
            }
            (left, right) => Transformed::no(Algebra::Join {
                left: Box::new(left),
                right: Box::new(right),
            }),
        },
        Algebra::Project { inner, variables } => {
            specialize(*inner).map_data(|inner| Algebra::project(inner, variables))
        }
        Algebra::Distinct { inner } => specialize(*inner).map_data(|inner| Algebra::Distinct {
            inner: Box::new(inner),
        }),
        Algebra::Reduced { inner } => specialize(*inner).map_data(|inner| Algebra::Reduced {
            inner: Box::new(inner),
        }),
        Algebra::OrderBy { inner, expression } => {
            specialize(*inner).map_data(|inner| Algebra::OrderBy {
                inner: Box::new(inner),
                expression,
            })
        }
        Algebra::Extend {
            inner,
            variable,
            expression,
        } => specialize(*inner).map_data(|inner| Algebra::Extend {
            inner: Box::new(inner),
            variable,
            expression,
        }),
        Algebra::Slice {
            inner,
            start: 0,
            length,
        } if length != Some(0) => specialize(*inner).map_data(|inner| Algebra::Slice {
            inner: Box::new(inner),
            start: 0,
            length,
        }),
        tree => Transformed::no(tree),
    }
}
