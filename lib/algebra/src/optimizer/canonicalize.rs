use crate::optimizer::OptimizerPass;
use crate::tree::Transformed;
use crate::Algebra;

/// Replaces every specialized node with its canonical counterpart.
///
/// Running this pass last disables all specializations of the other passes. This is the strict
/// mode of the optimizer.
#[derive(Debug, Default)]
pub struct CanonicalizePass;

impl CanonicalizePass {
    /// Creates a [CanonicalizePass].
    pub fn new() -> Self {
        Self
    }
}

impl OptimizerPass for CanonicalizePass {
    fn name(&self) -> &str {
        "canonicalize"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        tree.transform_up(&mut |node| match node {
            Algebra::AskBgp { patterns } | Algebra::LazyBgp { patterns, .. } => {
                Transformed::yes(Algebra::Bgp { patterns })
            }
            Algebra::AskUnion { left, right } | Algebra::LazyUnion { left, right, .. } => {
                Transformed::yes(Algebra::Union { left, right })
            }
            Algebra::ParallelJoin { left, right } => Transformed::yes(Algebra::Join { left, right }),
            Algebra::FilteredProduct {
                left,
                right,
                expression,
            } => Transformed::yes(Algebra::Filter {
                inner: Box::new(Algebra::Join { left, right }),
                expression,
            }),
            node => Transformed::no(node),
        })
    }
}
