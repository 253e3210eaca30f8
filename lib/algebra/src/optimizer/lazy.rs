use crate::optimizer::OptimizerPass;
use crate::tree::Transformed;
use crate::Algebra;

/// Pushes the limit of a slice down to the pattern that produces the solutions.
///
/// Basic graph patterns and unions below a slice with a length are replaced by lazy variants that
/// stop once `start + length` solutions have been produced. The limit is only pushed through
/// operators that keep the number and the order of solutions (projections, extensions, and other
/// slices).
#[derive(Debug, Default)]
pub struct LazyPass;

impl LazyPass {
    /// Creates a [LazyPass].
    pub fn new() -> Self {
        Self
    }
}

impl OptimizerPass for LazyPass {
    fn name(&self) -> &str {
        "lazy-evaluation"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        tree.transform_up(&mut |node| match node {
            Algebra::Slice {
                inner,
                start,
                length: Some(length),
            } => push_limit(*inner, start.saturating_add(length)).map_data(|inner| {
                Algebra::Slice {
                    inner: Box::new(inner),
                    start,
                    length: Some(length),
                }
            }),
            node => Transformed::no(node),
        })
    }
}

/// Rewrites `tree` such that it only produces its first `limit` solutions.
fn push_limit(tree: Algebra, limit: usize) -> Transformed<Algebra> {
    match tree {
        Algebra::Bgp { patterns } if !patterns.is_empty() => {
            Transformed::yes(Algebra::LazyBgp { patterns, limit })
        }
        Algebra::LazyBgp {
            patterns,
            limit: previous,
        } if limit < previous => Transformed::yes(Algebra::LazyBgp { patterns, limit }),
        Algebra::Union { left, right } => {
            let left = push_limit(*left, limit);
            let right = push_limit(*right, limit);
            Transformed::yes(Algebra::LazyUnion {
                left: Box::new(left.data),
                right: Box::new(right.data),
                limit,
            })
        }
        Algebra::LazyUnion {
            left,
            right,
            limit: previous,
        } if limit < previous => {
            let left = push_limit(*left, limit);
            let right = push_limit(*right, limit);
            Transformed::yes(Algebra::LazyUnion {
                left: Box::new(left.data),
                right: Box::new(right.data),
                limit,
            })
        }
        Algebra::Project { inner, variables } => {
            push_limit(*inner, limit).map_data(|inner| Algebra::project(inner, variables))
        }
        Algebra::Extend {
            inner,
            variable,
            expression,
        } => push_limit(*inner, limit).map_data(|inner| Algebra::Extend {
            inner: Box::new(inner),
            variable,
            expression,
        }),
        Algebra::Slice {
            inner,
            start,
            length,
        } => {
            let needed = start.saturating_add(length.map_or(limit, |length| length.min(limit)));
            push_limit(*inner, needed).map_data(|inner| Algebra::Slice {
                inner: Box::new(inner),
                start,
                length,
            })
        }
        tree => Transformed::no(tree),
    }
}
